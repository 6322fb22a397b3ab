//! Portal configuration types.
//!
//! Per Iron Lotus Framework: Configuration is validated at load time (Poka-Yoke),
//! with sensible defaults and clear error messages.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{RealtimeError, Result};

/// Well-known name, object path and interface of RealtimeKit.
pub const RTKIT_NAME: &str = "org.freedesktop.RealtimeKit1";
/// Object path RealtimeKit exports its interface on.
pub const RTKIT_PATH: &str = "/org/freedesktop/RealtimeKit1";

/// Portal configuration.
///
/// Every section has defaults, so an empty file is a valid configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortalConfig {
    /// Where the realtime interface is exported.
    #[serde(default)]
    pub portal: ExportConfig,

    /// How RealtimeKit is reached.
    #[serde(default)]
    pub realtimekit: RealtimeKitConfig,

    /// Sandbox inspection settings.
    #[serde(default)]
    pub sandbox: SandboxConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl PortalConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<()> {
        self.portal.validate()?;
        self.realtimekit.validate()?;
        self.sandbox.validate()?;
        Ok(())
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| RealtimeError::config(format!("failed to read config: {e}")))?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from a TOML string.
    ///
    /// # Errors
    /// Returns an error if the content cannot be parsed or is invalid.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| RealtimeError::config(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }
}

/// Export settings for the `org.freedesktop.portal.Realtime` object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Object path the interface is served at.
    #[serde(default = "default_portal_path")]
    pub object_path: String,

    /// Well-known bus name to own.
    #[serde(default = "default_portal_name")]
    pub bus_name: String,

    /// Whether to request `bus_name` at all.
    #[serde(default = "default_true")]
    pub request_name: bool,

    /// Bus address to export on. Defaults to the session bus.
    #[serde(default)]
    pub bus_address: Option<String>,
}

fn default_portal_path() -> String {
    "/org/freedesktop/portal/desktop".to_string()
}

fn default_portal_name() -> String {
    "org.freedesktop.portal.Desktop".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            object_path: default_portal_path(),
            bus_name: default_portal_name(),
            request_name: default_true(),
            bus_address: None,
        }
    }
}

impl ExportConfig {
    /// Validates export settings.
    ///
    /// # Errors
    /// Returns an error if a name or path is malformed.
    pub fn validate(&self) -> Result<()> {
        validate_object_path("portal.object_path", &self.object_path)?;
        validate_dotted_name("portal.bus_name", &self.bus_name)?;
        Ok(())
    }
}

/// How a high-priority request is passed to RealtimeKit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum HighPriorityRouting {
    /// Call `MakeThreadHighPriorityWithPID` with the signed nice level.
    #[default]
    Native,
    /// Call `MakeThreadRealtimeWithPID`, reinterpreting the nice level as
    /// an unsigned priority. Matches older portal releases.
    Legacy,
}

/// RealtimeKit connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeKitConfig {
    /// Bus name of the service.
    #[serde(default = "default_rtkit_name")]
    pub service: String,

    /// Object path of the service.
    #[serde(default = "default_rtkit_path")]
    pub object_path: String,

    /// Interface holding the scheduling methods and properties.
    #[serde(default = "default_rtkit_name")]
    pub interface: String,

    /// Routing for `MakeThreadHighPriorityWithPID`.
    #[serde(default)]
    pub high_priority_routing: HighPriorityRouting,

    /// Bus address to connect to. Defaults to the system bus.
    #[serde(default)]
    pub bus_address: Option<String>,
}

fn default_rtkit_name() -> String {
    RTKIT_NAME.to_string()
}

fn default_rtkit_path() -> String {
    RTKIT_PATH.to_string()
}

impl Default for RealtimeKitConfig {
    fn default() -> Self {
        Self {
            service: default_rtkit_name(),
            object_path: default_rtkit_path(),
            interface: default_rtkit_name(),
            high_priority_routing: HighPriorityRouting::default(),
            bus_address: None,
        }
    }
}

impl RealtimeKitConfig {
    /// Validates RealtimeKit settings.
    ///
    /// # Errors
    /// Returns an error if a name or path is malformed.
    pub fn validate(&self) -> Result<()> {
        validate_dotted_name("realtimekit.service", &self.service)?;
        validate_object_path("realtimekit.object_path", &self.object_path)?;
        validate_dotted_name("realtimekit.interface", &self.interface)?;
        Ok(())
    }
}

/// Sandbox inspection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Mount point of procfs.
    #[serde(default = "default_proc_root")]
    pub proc_root: PathBuf,
}

fn default_proc_root() -> PathBuf {
    PathBuf::from("/proc")
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            proc_root: default_proc_root(),
        }
    }
}

impl SandboxConfig {
    /// Validates sandbox settings.
    ///
    /// # Errors
    /// Returns an error if `proc_root` is empty.
    pub fn validate(&self) -> Result<()> {
        if self.proc_root.as_os_str().is_empty() {
            return Err(RealtimeError::config("sandbox.proc_root cannot be empty"));
        }
        Ok(())
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing` filter directive, overridden by `RUST_LOG`.
    #[serde(default = "default_filter")]
    pub filter: String,
}

fn default_filter() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

fn validate_object_path(field: &str, path: &str) -> Result<()> {
    if !path.starts_with('/') {
        return Err(RealtimeError::config(format!(
            "{field} must be an absolute object path"
        )));
    }
    if path.len() > 1 && path.ends_with('/') {
        return Err(RealtimeError::config(format!(
            "{field} must not end with '/'"
        )));
    }
    if !path
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '/')
    {
        return Err(RealtimeError::config(format!(
            "{field} may contain only [A-Za-z0-9_/]"
        )));
    }
    Ok(())
}

fn validate_dotted_name(field: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(RealtimeError::config(format!("{field} cannot be empty")));
    }
    if name.split('.').count() < 2 || name.split('.').any(str::is_empty) {
        return Err(RealtimeError::config(format!(
            "{field} must be a dotted name"
        )));
    }
    Ok(())
}
