//! Caller identification.
//!
//! The bus daemon reports the host pid of a caller's connection; whether that
//! process lives in a Flatpak sandbox is read from the `.flatpak-info` file
//! at the root of its mount namespace.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rtportal_core::{AppInfo, Caller};
use tokio::sync::OnceCell;
use zbus::fdo::DBusProxy;
use zbus::message::Header;
use zbus::names::BusName;

use crate::error::{PortalError, Result};

/// Resolves the sender of a message into a [`Caller`].
///
/// A resolver serves one connection: the bus daemon proxy is built on the
/// first call and reused by every later one, clones included.
#[derive(Debug, Clone)]
pub struct BusCallerResolver {
    proc_root: PathBuf,
    dbus: Arc<OnceCell<DBusProxy<'static>>>,
}

impl BusCallerResolver {
    /// Creates a resolver reading process state below `proc_root`.
    #[must_use]
    pub fn new(proc_root: impl Into<PathBuf>) -> Self {
        Self {
            proc_root: proc_root.into(),
            dbus: Arc::new(OnceCell::new()),
        }
    }

    async fn bus_daemon(&self, conn: &zbus::Connection) -> Result<&DBusProxy<'static>> {
        let proxy = self
            .dbus
            .get_or_try_init(|| async { DBusProxy::new(conn).await })
            .await?;
        Ok(proxy)
    }

    /// Identifies the sender of `header`.
    ///
    /// # Errors
    /// Returns an error if the message has no sender, the bus cannot report
    /// its pid, or the process has an unreadable `.flatpak-info`.
    pub async fn resolve(&self, conn: &zbus::Connection, header: &Header<'_>) -> Result<Caller> {
        let sender = header
            .sender()
            .ok_or_else(|| PortalError::caller("message has no sender"))?;

        let pid = self
            .bus_daemon(conn)
            .await?
            .get_connection_unix_process_id(BusName::from(sender.clone()))
            .await?;

        let proc_root = self.proc_root.clone();
        let app = tokio::task::spawn_blocking(move || app_info_for_pid(&proc_root, pid))
            .await
            .map_err(|e| PortalError::caller(format!("caller lookup task failed: {e}")))??;

        tracing::debug!(sender = %sender, pid, app = %app, "caller identified");
        Ok(Caller::new(sender.to_string(), app))
    }
}

impl Default for BusCallerResolver {
    fn default() -> Self {
        Self::new("/proc")
    }
}

/// Reads the sandbox identity of host process `pid`.
///
/// # Errors
/// Returns an error if the process is gone or its `.flatpak-info` exists but
/// cannot be read or names no application.
pub fn app_info_for_pid(proc_root: &Path, pid: u32) -> Result<AppInfo> {
    let proc_dir = proc_root.join(pid.to_string());
    if !proc_dir.exists() {
        return Err(PortalError::caller(format!("process {pid} is gone")));
    }

    let info_path = proc_dir.join("root").join(".flatpak-info");
    let content = match std::fs::read_to_string(&info_path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(AppInfo::Host),
        Err(e) => {
            return Err(PortalError::caller(format!(
                "cannot read {}: {e}",
                info_path.display()
            )));
        }
    };

    let app_id = parse_flatpak_info(&content).ok_or_else(|| {
        PortalError::caller(format!("no application name in {}", info_path.display()))
    })?;
    Ok(AppInfo::Flatpak {
        app_id,
        instance_pid: pid,
    })
}

/// Extracts `name` from the `[Application]` group of a keyfile.
pub(crate) fn parse_flatpak_info(content: &str) -> Option<String> {
    let mut in_application = false;
    for line in content.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(group) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            in_application = group == "Application";
            continue;
        }
        if !in_application {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            let value = value.trim();
            if key.trim() == "name" && !value.is_empty() {
                return Some(value.to_owned());
            }
        }
    }
    None
}
