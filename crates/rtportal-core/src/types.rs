//! Core types for realtime request handling.
//!
//! Per Iron Lotus Framework: UUIDs for stable IDs,
//! explicit state machines, no implicit transitions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier for one caller invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(uuid::Uuid);

impl RequestId {
    /// Creates a new random request ID.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Returns the inner UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of the application behind a D-Bus caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppInfo {
    /// Unsandboxed process sharing the host's pid namespace.
    Host,
    /// Flatpak sandbox.
    Flatpak {
        /// Application ID (e.g. `org.example.Player`).
        app_id: String,
        /// Host pid of the process that sent the request.
        instance_pid: u32,
    },
}

impl AppInfo {
    /// Returns true for unsandboxed callers.
    #[must_use]
    pub const fn is_host(&self) -> bool {
        matches!(self, Self::Host)
    }

    /// Returns the application ID, empty for host callers.
    #[must_use]
    pub fn app_id(&self) -> &str {
        match self {
            Self::Host => "",
            Self::Flatpak { app_id, .. } => app_id,
        }
    }
}

impl fmt::Display for AppInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host => f.write_str("host"),
            Self::Flatpak { app_id, .. } => write!(f, "flatpak:{app_id}"),
        }
    }
}

/// A resolved caller: who sent the request and from which sandbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    /// Unique bus name of the sender (e.g. `:1.42`).
    pub sender: String,
    /// Sandbox context of the sender.
    pub app: AppInfo,
}

impl Caller {
    /// Creates a caller.
    #[must_use]
    pub fn new(sender: impl Into<String>, app: AppInfo) -> Self {
        Self {
            sender: sender.into(),
            app,
        }
    }

    /// Creates an unsandboxed caller.
    #[must_use]
    pub fn host(sender: impl Into<String>) -> Self {
        Self::new(sender, AppInfo::Host)
    }
}

/// Scheduling change requested for a thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    /// Real-time priority (`SCHED_RR` level).
    Realtime(u32),
    /// Nice level for the high-priority class.
    HighPriority(i32),
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Realtime(p) => write!(f, "realtime({p})"),
            Self::HighPriority(n) => write!(f, "nice({n})"),
        }
    }
}

/// A property value as RealtimeKit encoded it on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    /// `x`
    Int64(i64),
    /// `i`
    Int32(i32),
    /// Any other encoding, identified by its signature.
    Other {
        /// D-Bus signature of the value.
        signature: String,
    },
}

impl PropertyValue {
    /// Widens an integer encoding to `i64`, `None` for anything else.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int64(v) => Some(*v),
            Self::Int32(v) => Some(i64::from(*v)),
            Self::Other { .. } => None,
        }
    }

    /// Returns the D-Bus signature of this value.
    #[must_use]
    pub fn signature(&self) -> &str {
        match self {
            Self::Int64(_) => "x",
            Self::Int32(_) => "i",
            Self::Other { signature } => signature,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_unique() {
        let a = RequestId::new();
        let b = RequestId::new();
        assert_ne!(a, b);
        assert!(!a.as_uuid().is_nil());
    }

    #[test]
    fn test_app_info_host() {
        assert!(AppInfo::Host.is_host());
        assert_eq!(AppInfo::Host.app_id(), "");
        assert_eq!(AppInfo::Host.to_string(), "host");
    }

    #[test]
    fn test_app_info_flatpak() {
        let app = AppInfo::Flatpak {
            app_id: "org.example.Player".into(),
            instance_pid: 1234,
        };
        assert!(!app.is_host());
        assert_eq!(app.app_id(), "org.example.Player");
        assert_eq!(app.to_string(), "flatpak:org.example.Player");
    }

    #[test]
    fn test_property_value_widening() {
        assert_eq!(PropertyValue::Int32(20).as_i64(), Some(20));
        assert_eq!(PropertyValue::Int32(-5).as_i64(), Some(-5));
        assert_eq!(PropertyValue::Int64(i64::MIN).as_i64(), Some(i64::MIN));
        assert_eq!(
            PropertyValue::Other {
                signature: "u".into()
            }
            .as_i64(),
            None
        );
    }

    #[test]
    fn test_property_value_signature() {
        assert_eq!(PropertyValue::Int64(0).signature(), "x");
        assert_eq!(PropertyValue::Int32(0).signature(), "i");
        assert_eq!(
            PropertyValue::Other {
                signature: "as".into()
            }
            .signature(),
            "as"
        );
    }

    #[test]
    fn test_priority_display() {
        assert_eq!(Priority::Realtime(10).to_string(), "realtime(10)");
        assert_eq!(Priority::HighPriority(-11).to_string(), "nice(-11)");
    }
}
