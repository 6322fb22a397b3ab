//! One-shot connection to the downstream service.
//!
//! State transitions follow a strict state machine:
//! ```text
//! Uninitialized ──connect──→ Ready
//!              └───────────→ Failed
//! ```
//! Both outcomes are terminal: no retries, no reconnection, and the handle
//! is never replaced once stored.

use std::fmt;
use std::future::Future;

use tokio::sync::OnceCell;

use crate::error::RealtimeError;

/// Connector lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectorState {
    /// `connect` has not run yet.
    Uninitialized,
    /// The service handle is available.
    Ready,
    /// Connecting failed; the interface stays disabled.
    Failed,
}

impl fmt::Display for ConnectorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "uninitialized"),
            Self::Ready => write!(f, "ready"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Holds the single service handle of the process.
pub struct ServiceConnector<T> {
    slot: OnceCell<Result<T, String>>,
}

impl<T: Clone> ServiceConnector<T> {
    /// Creates an uninitialized connector.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slot: OnceCell::new(),
        }
    }

    /// Runs `connect` once and stores its outcome.
    ///
    /// Later calls return the stored outcome without running `connect`.
    /// Returns `None` when the service is unavailable.
    pub async fn connect_with<F, Fut, E>(&self, connect: F) -> Option<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let outcome = self
            .slot
            .get_or_init(|| async move {
                match connect().await {
                    Ok(handle) => {
                        tracing::info!("connected to RealtimeKit");
                        Ok(handle)
                    }
                    Err(e) => {
                        tracing::warn!("Failed to connect to RealtimeKit: {}", e);
                        Err(e.to_string())
                    }
                }
            })
            .await;
        outcome.as_ref().ok().cloned()
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> ConnectorState {
        match self.slot.get() {
            None => ConnectorState::Uninitialized,
            Some(Ok(_)) => ConnectorState::Ready,
            Some(Err(_)) => ConnectorState::Failed,
        }
    }

    /// Returns the handle if connected.
    #[must_use]
    pub fn handle(&self) -> Option<T> {
        self.slot.get().and_then(|r| r.as_ref().ok().cloned())
    }

    /// Returns the handle, or why there is none.
    ///
    /// # Errors
    /// Returns [`RealtimeError::Unavailable`] unless the connector is ready.
    pub fn require(&self) -> crate::error::Result<T> {
        match self.slot.get() {
            Some(Ok(handle)) => Ok(handle.clone()),
            Some(Err(reason)) => Err(RealtimeError::unavailable(reason.as_str())),
            None => Err(RealtimeError::unavailable("not connected")),
        }
    }

    /// Returns the failure message if connecting failed.
    #[must_use]
    pub fn failure(&self) -> Option<&str> {
        self.slot.get().and_then(|r| r.as_ref().err().map(String::as_str))
    }
}

impl<T: Clone> Default for ServiceConnector<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for ServiceConnector<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.slot.get() {
            None => ConnectorState::Uninitialized,
            Some(Ok(_)) => ConnectorState::Ready,
            Some(Err(_)) => ConnectorState::Failed,
        };
        f.debug_struct("ServiceConnector")
            .field("state", &state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_starts_uninitialized() {
        let connector: ServiceConnector<u32> = ServiceConnector::new();
        assert_eq!(connector.state(), ConnectorState::Uninitialized);
        assert!(connector.handle().is_none());
        assert!(connector.failure().is_none());
        assert!(matches!(
            connector.require(),
            Err(RealtimeError::Unavailable(ref reason)) if reason == "not connected"
        ));
    }

    #[tokio::test]
    async fn test_connect_ready() {
        let connector = ServiceConnector::new();
        let handle = connector
            .connect_with(|| async { Ok::<_, String>(7u32) })
            .await;

        assert_eq!(handle, Some(7));
        assert_eq!(connector.state(), ConnectorState::Ready);
        assert_eq!(connector.handle(), Some(7));
        assert_eq!(connector.require().unwrap(), 7);
    }

    #[tokio::test]
    async fn test_connect_failed_is_terminal() {
        let attempts = AtomicU32::new(0);
        let connector: ServiceConnector<u32> = ServiceConnector::new();

        let first = connector
            .connect_with(|| async {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>("system bus unreachable")
            })
            .await;
        assert!(first.is_none());
        assert_eq!(connector.state(), ConnectorState::Failed);
        assert_eq!(connector.failure(), Some("system bus unreachable"));
        assert_eq!(
            connector.require().unwrap_err().to_string(),
            "RealtimeKit unavailable: system bus unreachable"
        );

        // No retry
        let second = connector
            .connect_with(|| async {
                attempts.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(1u32)
            })
            .await;
        assert!(second.is_none());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(connector.state(), ConnectorState::Failed);
    }

    #[tokio::test]
    async fn test_ready_handle_never_replaced() {
        let connector = ServiceConnector::new();
        connector
            .connect_with(|| async { Ok::<_, String>(1u32) })
            .await;
        let again = connector
            .connect_with(|| async { Ok::<_, String>(2u32) })
            .await;
        assert_eq!(again, Some(1));
    }

    #[test]
    fn test_state_display() {
        assert_eq!(ConnectorState::Uninitialized.to_string(), "uninitialized");
        assert_eq!(ConnectorState::Ready.to_string(), "ready");
        assert_eq!(ConnectorState::Failed.to_string(), "failed");
    }
}
