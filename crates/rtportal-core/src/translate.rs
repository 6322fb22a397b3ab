//! Sandbox-to-host pid translation.
//!
//! A sandboxed caller names its threads by pids from its own pid namespace.
//! Those must be mapped to host pids before RealtimeKit sees them.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{MappingError, RealtimeError, Result};
use crate::types::AppInfo;

/// Maps a pid from a sandbox's namespace to the host namespace.
#[async_trait]
pub trait PidMapper: Send + Sync {
    /// Maps one sandbox-local pid for the given (sandboxed) app.
    ///
    /// # Errors
    /// Returns an error if no host pid corresponds to `pid`.
    async fn map_pid(&self, app: &AppInfo, pid: u64) -> std::result::Result<u64, MappingError>;
}

/// Resolves host pids for incoming requests.
#[derive(Clone)]
pub struct PidTranslator {
    mapper: Arc<dyn PidMapper>,
}

impl PidTranslator {
    /// Creates a translator backed by the given mapper.
    #[must_use]
    pub fn new(mapper: Arc<dyn PidMapper>) -> Self {
        Self { mapper }
    }

    /// Translates `pid` as seen by `app` into a host pid.
    ///
    /// Host callers get `pid` back unchanged; the mapper is not consulted.
    ///
    /// # Errors
    /// Returns [`RealtimeError::PidMapping`] if the mapper fails.
    pub async fn translate(&self, app: &AppInfo, pid: u64) -> Result<u64> {
        if app.is_host() {
            return Ok(pid);
        }

        match self.mapper.map_pid(app, pid).await {
            Ok(host_pid) => {
                tracing::debug!(app = %app, pid, host_pid, "mapped sandbox pid");
                Ok(host_pid)
            }
            Err(e) => {
                let err = RealtimeError::PidMapping(e);
                tracing::warn!(app = %app, pid, "Realtime error: {}", err);
                Err(err)
            }
        }
    }
}

impl std::fmt::Debug for PidTranslator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PidTranslator").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::mocks::MockPidMapper;
    use proptest::prelude::*;

    fn sandboxed() -> AppInfo {
        AppInfo::Flatpak {
            app_id: "org.example.Player".into(),
            instance_pid: 5000,
        }
    }

    #[tokio::test]
    async fn test_host_is_identity() {
        let mapper = Arc::new(MockPidMapper::new().map(42, 9001));
        let translator = PidTranslator::new(mapper.clone());

        assert_eq!(translator.translate(&AppInfo::Host, 42).await.unwrap(), 42);
        assert_eq!(mapper.calls(), 0);
    }

    #[tokio::test]
    async fn test_sandboxed_uses_mapper() {
        let mapper = Arc::new(MockPidMapper::new().map(42, 9001));
        let translator = PidTranslator::new(mapper.clone());

        assert_eq!(translator.translate(&sandboxed(), 42).await.unwrap(), 9001);
        assert_eq!(mapper.calls(), 1);
    }

    #[tokio::test]
    async fn test_mapping_failure_is_prefixed() {
        let translator = PidTranslator::new(Arc::new(MockPidMapper::new()));

        let err = translator.translate(&sandboxed(), 42).await.unwrap_err();
        assert!(err.is_mapping_failure());
        assert!(err.to_string().starts_with("Could not map pid: "));
    }

    proptest! {
        /// Host callers always get their own pid back.
        #[test]
        fn host_translation_is_identity(pid in any::<u64>()) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let translator = PidTranslator::new(Arc::new(MockPidMapper::new()));
            let mapped = rt.block_on(translator.translate(&AppInfo::Host, pid)).unwrap();
            prop_assert_eq!(mapped, pid);
        }
    }
}
