//! Error types for rtportal-core.
//!
//! Per Iron Lotus Framework: All errors are explicit, no panics allowed.
//! Every request ends in exactly one of these or a success value.

use std::fmt;

/// Result type alias for portal operations.
pub type Result<T> = std::result::Result<T, RealtimeError>;

/// Error returned to a realtime portal caller.
#[derive(Debug, thiserror::Error)]
pub enum RealtimeError {
    /// The sandbox-local pid could not be mapped to a host pid.
    #[error("Could not map pid: {0}")]
    PidMapping(#[source] MappingError),

    /// RealtimeKit rejected the call or the transport failed.
    ///
    /// Relayed to the caller unmodified.
    #[error("{0}")]
    Downstream(DownstreamError),

    /// RealtimeKit answered a property read with an unexpected encoding.
    #[error("Invalid response type received")]
    InvalidResponse {
        /// D-Bus signature of the value that was received.
        signature: String,
    },

    /// RealtimeKit was not reached at startup; the interface stays disabled.
    #[error("RealtimeKit unavailable: {0}")]
    Unavailable(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RealtimeError {
    /// Creates a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an unavailable error.
    #[must_use]
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Creates an invalid response error for a value with the given signature.
    #[must_use]
    pub fn invalid_response(signature: impl Into<String>) -> Self {
        Self::InvalidResponse {
            signature: signature.into(),
        }
    }

    /// Returns true if this error came from RealtimeKit itself.
    #[must_use]
    pub const fn is_downstream(&self) -> bool {
        matches!(self, Self::Downstream(_))
    }

    /// Returns true if this error is a pid mapping failure.
    #[must_use]
    pub const fn is_mapping_failure(&self) -> bool {
        matches!(self, Self::PidMapping(_))
    }
}

impl From<MappingError> for RealtimeError {
    fn from(err: MappingError) -> Self {
        Self::PidMapping(err)
    }
}

impl From<DownstreamError> for RealtimeError {
    fn from(err: DownstreamError) -> Self {
        Self::Downstream(err)
    }
}

/// Why a sandbox pid could not be translated.
#[derive(Debug, thiserror::Error)]
pub enum MappingError {
    /// The requested pid cannot be a valid `pid_t`.
    #[error("pid {0} out of range")]
    OutOfRange(u64),

    /// No process in the sandbox namespace carries the requested pid.
    #[error("process {0} not found in sandbox")]
    NotFound(u64),

    /// The calling sandbox process no longer exists.
    #[error("sandbox process {0} is gone")]
    SandboxGone(u32),

    /// The caller runs outside any sandbox, so there is nothing to map.
    #[error("caller {0} has no sandbox instance")]
    NoInstance(String),

    /// Reading `/proc` failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error reported by the downstream service, kept verbatim.
///
/// `name` is the D-Bus error name (e.g. `org.freedesktop.DBus.Error.AccessDenied`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownstreamError {
    /// D-Bus error name.
    pub name: String,
    /// Optional human-readable message.
    pub message: Option<String>,
}

impl DownstreamError {
    /// Creates a downstream error.
    #[must_use]
    pub fn new(name: impl Into<String>, message: Option<String>) -> Self {
        Self {
            name: name.into(),
            message,
        }
    }
}

impl fmt::Display for DownstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{}: {}", self.name, message),
            None => f.write_str(&self.name),
        }
    }
}

impl std::error::Error for DownstreamError {}
