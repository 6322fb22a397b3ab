//! D-Bus facing error types.
//!
//! Downstream errors keep RealtimeKit's error name and message; everything
//! the portal itself rejects is reported as `org.freedesktop.portal.Error.Failed`.

use rtportal_core::RealtimeError;
use zbus::message::{Builder, Header, Message};
use zbus::names::ErrorName;

/// Result type alias for D-Bus operations.
pub type Result<T> = std::result::Result<T, PortalError>;

/// Error name for failures originating in the portal.
pub const PORTAL_ERROR_FAILED: &str = "org.freedesktop.portal.Error.Failed";

/// Errors returned over D-Bus.
#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    /// Request handling failed.
    #[error(transparent)]
    Realtime(#[from] RealtimeError),

    /// The calling application could not be identified.
    #[error("could not identify caller: {0}")]
    Caller(String),

    /// Bus or proxy error.
    #[error("D-Bus error: {0}")]
    Bus(#[from] zbus::Error),

    /// Standard D-Bus error from a bus service.
    #[error("D-Bus error: {0}")]
    Fdo(#[from] zbus::fdo::Error),
}

impl PortalError {
    /// Creates a caller identification error.
    #[must_use]
    pub fn caller(msg: impl Into<String>) -> Self {
        Self::Caller(msg.into())
    }

    /// Text sent as the error message body.
    fn reply_text(&self) -> Option<String> {
        match self {
            Self::Realtime(RealtimeError::Downstream(e)) => e.message.clone(),
            other => Some(other.to_string()),
        }
    }
}

impl zbus::DBusError for PortalError {
    fn create_reply(&self, call: &Header<'_>) -> zbus::Result<Message> {
        let builder = Builder::error(call, self.name())?;
        match self.reply_text() {
            Some(text) => builder.build(&(text,)),
            None => builder.build(&()),
        }
    }

    fn name(&self) -> ErrorName<'_> {
        if let Self::Realtime(RealtimeError::Downstream(e)) = self {
            if let Ok(name) = ErrorName::try_from(e.name.as_str()) {
                return name;
            }
        }
        ErrorName::from_static_str_unchecked(PORTAL_ERROR_FAILED)
    }

    fn description(&self) -> Option<&str> {
        match self {
            Self::Realtime(RealtimeError::Downstream(e)) => e.message.as_deref(),
            Self::Caller(msg) => Some(msg),
            _ => None,
        }
    }
}
