//! rtportal: realtime scheduling portal for sandboxed applications.
//!
//! Sandboxed applications cannot reach RealtimeKit on the system bus. The
//! portal accepts their requests on the session bus, translates the pids they
//! name into host pids, and forwards the requests.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use rtportal::prelude::*;
//!
//! let config = PortalConfig::default();
//! assert_eq!(config.portal.object_path, "/org/freedesktop/portal/desktop");
//! ```

pub use rtportal_core as core;
pub use rtportal_dbus as dbus;

/// Prelude module for common imports.
pub mod prelude {
    pub use rtportal_core::{
        AppInfo, Caller, ConnectorState, HighPriorityRouting, LoggingConfig, MetricsSnapshot,
        PortalConfig, RealtimeError, RealtimeForwarder, RealtimeKit, ServiceConnector,
    };
    pub use rtportal_dbus::{
        PortalError, RealtimePortal, RtkitClient, connect_portal_bus, connect_realtimekit,
        export_if_ready,
    };
}
