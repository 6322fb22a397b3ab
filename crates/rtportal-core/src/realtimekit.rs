//! Downstream service abstraction.
//!
//! # Toyota Way: Standardized Work (標準作業)
//! The forwarder talks to RealtimeKit only through this contract, so the
//! D-Bus client and test doubles are interchangeable.

use async_trait::async_trait;

use crate::error::DownstreamError;
use crate::types::PropertyValue;

/// Result of a downstream call.
pub type DownstreamResult<T> = std::result::Result<T, DownstreamError>;

/// The privileged scheduling service (`org.freedesktop.RealtimeKit1`).
///
/// Calls are made without a timeout and are never cancelled by the caller.
#[async_trait]
pub trait RealtimeKit: Send + Sync {
    /// `MakeThreadRealtimeWithPID(t process, t thread, u priority)`.
    ///
    /// # Errors
    /// Returns the service's error verbatim.
    async fn make_thread_realtime_with_pid(
        &self,
        process: u64,
        thread: u64,
        priority: u32,
    ) -> DownstreamResult<()>;

    /// `MakeThreadHighPriorityWithPID(t process, t thread, i priority)`.
    ///
    /// # Errors
    /// Returns the service's error verbatim.
    async fn make_thread_high_priority_with_pid(
        &self,
        process: u64,
        thread: u64,
        priority: i32,
    ) -> DownstreamResult<()>;

    /// `org.freedesktop.DBus.Properties.Get` on the service interface.
    ///
    /// Always a live round-trip; implementations must not cache.
    ///
    /// # Errors
    /// Returns the service's error verbatim.
    async fn get_property(&self, name: &str) -> DownstreamResult<PropertyValue>;
}
