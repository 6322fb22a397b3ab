// Iron Lotus: Allow unwrap/expect in tests for clear failure messages
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! # rtportal-core
//!
//! Transport-neutral core of the realtime portal: sandboxed applications ask
//! for real-time or high-priority scheduling of their threads, and the portal
//! forwards those requests to RealtimeKit after translating sandbox pids into
//! host pids.
//!
//! - [`PidTranslator`] maps a caller's pid into the host pid namespace
//! - [`RealtimeForwarder`] issues the privileged call and relays the answer
//! - [`ServiceConnector`] holds the single RealtimeKit handle
//! - [`PortalConfig`] for service configuration
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use rtportal_core::{
//!     Caller, HighPriorityRouting, PidTranslator, ProcPidMapper, RealtimeForwarder,
//! };
//!
//! let forwarder = RealtimeForwarder::new(
//!     rtkit,
//!     PidTranslator::new(Arc::new(ProcPidMapper::default())),
//!     HighPriorityRouting::Native,
//! );
//! forwarder.make_thread_realtime(&Caller::host(":1.42"), pid, tid, 10).await?;
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod connector;
pub mod error;
pub mod forwarder;
pub mod metrics;
pub mod procfs;
pub mod realtimekit;
#[cfg(test)]
pub mod tests;
pub mod translate;
pub mod types;

pub use config::{
    ExportConfig, HighPriorityRouting, LoggingConfig, PortalConfig, RealtimeKitConfig,
    SandboxConfig,
};
pub use connector::{ConnectorState, ServiceConnector};
pub use error::{DownstreamError, MappingError, RealtimeError, Result};
pub use forwarder::{PendingRequest, RealtimeForwarder, RequestKind};
pub use metrics::{ForwarderMetrics, MetricsSnapshot, Outcome};
pub use procfs::ProcPidMapper;
pub use realtimekit::{DownstreamResult, RealtimeKit};
pub use translate::{PidMapper, PidTranslator};
pub use types::{AppInfo, Caller, Priority, PropertyValue, RequestId};
