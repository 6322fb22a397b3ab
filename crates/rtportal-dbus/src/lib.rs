// Iron Lotus: Allow unwrap/expect in tests for clear failure messages
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! # rtportal-dbus
//!
//! D-Bus side of the realtime portal:
//!
//! - [`RtkitClient`]: RealtimeKit proxy on the system bus
//! - [`RealtimePortal`]: the `org.freedesktop.portal.Realtime` interface
//! - [`BusCallerResolver`]: identifies the sandbox a caller runs in
//! - [`PortalError`]: maps failures onto D-Bus error replies
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use rtportal_dbus::{connect_portal_bus, connect_realtimekit, RealtimePortal};
//!
//! let rtkit = Arc::new(connect_realtimekit(&config.realtimekit).await?);
//! let conn = connect_portal_bus(&config.portal).await?;
//! RealtimePortal::from_config(&config, rtkit)
//!     .export(&conn, &config.portal.object_path)
//!     .await?;
//! ```

#![warn(missing_docs)]

pub mod app_info;
pub mod connector;
pub mod error;
pub mod portal;
pub mod rtkit;

pub use app_info::{BusCallerResolver, app_info_for_pid};
pub use connector::{connect_portal_bus, connect_realtimekit};
pub use error::{PORTAL_ERROR_FAILED, PortalError, Result};
pub use portal::{PORTAL_VERSION, RealtimePortal, export_if_ready};
pub use rtkit::RtkitClient;
