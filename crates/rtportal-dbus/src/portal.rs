//! The `org.freedesktop.portal.Realtime` interface.

use std::sync::Arc;

use rtportal_core::{
    PidTranslator, PortalConfig, ProcPidMapper, RealtimeForwarder, RealtimeKit, ServiceConnector,
};
use zbus::message::Header;

use crate::app_info::BusCallerResolver;
use crate::error::{PortalError, Result};

/// Interface version reported by the `version` property.
pub const PORTAL_VERSION: u32 = 1;

/// Object served at the portal path.
///
/// Each method call resolves its sender, then hands the request to the
/// shared [`RealtimeForwarder`]; the reply is sent when that future returns.
#[derive(Debug, Clone)]
pub struct RealtimePortal {
    forwarder: Arc<RealtimeForwarder>,
    callers: BusCallerResolver,
}

impl RealtimePortal {
    /// Creates the interface object around a forwarder.
    #[must_use]
    pub const fn new(forwarder: Arc<RealtimeForwarder>, callers: BusCallerResolver) -> Self {
        Self { forwarder, callers }
    }

    /// Builds the forwarder for `rtkit` from configuration.
    #[must_use]
    pub fn from_config(config: &PortalConfig, rtkit: Arc<dyn RealtimeKit>) -> Self {
        let proc_root = config.sandbox.proc_root.clone();
        let translator = PidTranslator::new(Arc::new(ProcPidMapper::new(proc_root.clone())));
        let forwarder = RealtimeForwarder::new(
            rtkit,
            translator,
            config.realtimekit.high_priority_routing,
        );
        Self::new(Arc::new(forwarder), BusCallerResolver::new(proc_root))
    }

    /// Returns the shared forwarder.
    #[must_use]
    pub fn forwarder(&self) -> Arc<RealtimeForwarder> {
        Arc::clone(&self.forwarder)
    }

    /// Serves the interface at `path` on `conn`.
    ///
    /// Returns false if an interface of this name is already served there.
    ///
    /// # Errors
    /// Returns an error if `path` is not a valid object path.
    pub async fn export(self, conn: &zbus::Connection, path: &str) -> Result<bool> {
        let added = conn.object_server().at(path.to_owned(), self).await?;
        if added {
            tracing::info!(path, "org.freedesktop.portal.Realtime exported");
        } else {
            tracing::warn!(path, "org.freedesktop.portal.Realtime already exported");
        }
        Ok(added)
    }
}

/// Exports the interface on `conn` if RealtimeKit was reached.
///
/// Returns the forwarder serving requests, or `None` when the connector is
/// not ready and nothing was registered.
///
/// # Errors
/// Returns an error if the interface cannot be served at the configured path.
pub async fn export_if_ready<K>(
    conn: &zbus::Connection,
    connector: &ServiceConnector<Arc<K>>,
    config: &PortalConfig,
) -> Result<Option<Arc<RealtimeForwarder>>>
where
    K: RealtimeKit + 'static,
{
    let rtkit = match connector.require() {
        Ok(rtkit) => rtkit,
        Err(e) => {
            tracing::warn!(
                state = %connector.state(),
                error = %e,
                "realtime interface not exported"
            );
            return Ok(None);
        }
    };

    let portal = RealtimePortal::from_config(config, rtkit);
    let forwarder = portal.forwarder();
    portal.export(conn, &config.portal.object_path).await?;
    Ok(Some(forwarder))
}

#[zbus::interface(name = "org.freedesktop.portal.Realtime")]
impl RealtimePortal {
    #[zbus(name = "MakeThreadRealtimeWithPID")]
    async fn make_thread_realtime_with_pid(
        &self,
        process: u64,
        thread: u64,
        priority: u32,
        #[zbus(header)] header: Header<'_>,
        #[zbus(connection)] conn: &zbus::Connection,
    ) -> Result<()> {
        let caller = self.callers.resolve(conn, &header).await?;
        self.forwarder
            .make_thread_realtime(&caller, process, thread, priority)
            .await
            .map_err(PortalError::from)
    }

    #[zbus(name = "MakeThreadHighPriorityWithPID")]
    async fn make_thread_high_priority_with_pid(
        &self,
        process: u64,
        thread: u64,
        priority: i32,
        #[zbus(header)] header: Header<'_>,
        #[zbus(connection)] conn: &zbus::Connection,
    ) -> Result<()> {
        let caller = self.callers.resolve(conn, &header).await?;
        self.forwarder
            .make_thread_high_priority(&caller, process, thread, priority)
            .await
            .map_err(PortalError::from)
    }

    #[zbus(name = "GetProperty")]
    async fn get_property(
        &self,
        name: String,
        #[zbus(header)] header: Header<'_>,
    ) -> Result<i64> {
        let sender = header
            .sender()
            .map(ToString::to_string)
            .unwrap_or_default();
        self.forwarder
            .get_property(&sender, &name)
            .await
            .map_err(PortalError::from)
    }

    #[zbus(property, name = "version")]
    fn version(&self) -> u32 {
        PORTAL_VERSION
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rtportal_core::{ConnectorState, DownstreamResult, HighPriorityRouting, PropertyValue};

    struct FixedRealtimeKit;

    #[async_trait]
    impl RealtimeKit for FixedRealtimeKit {
        async fn make_thread_realtime_with_pid(
            &self,
            _: u64,
            _: u64,
            _: u32,
        ) -> DownstreamResult<()> {
            Ok(())
        }

        async fn make_thread_high_priority_with_pid(
            &self,
            _: u64,
            _: u64,
            _: i32,
        ) -> DownstreamResult<()> {
            Ok(())
        }

        async fn get_property(&self, _: &str) -> DownstreamResult<PropertyValue> {
            Ok(PropertyValue::Int32(20))
        }
    }

    #[test]
    fn test_version_is_one() {
        let portal =
            RealtimePortal::from_config(&PortalConfig::default(), Arc::new(FixedRealtimeKit));
        assert_eq!(portal.version(), 1);
    }

    #[test]
    fn test_routing_from_config() {
        let config = PortalConfig::from_toml(
            "[realtimekit]\nhigh_priority_routing = \"legacy\"\n",
        )
        .unwrap();
        let portal = RealtimePortal::from_config(&config, Arc::new(FixedRealtimeKit));
        assert_eq!(portal.forwarder().routing(), HighPriorityRouting::Legacy);
    }

    #[tokio::test]
    async fn test_forwarder_is_shared() {
        let portal =
            RealtimePortal::from_config(&PortalConfig::default(), Arc::new(FixedRealtimeKit));
        let clone = portal.clone();
        portal
            .forwarder()
            .get_property(":1.1", "MaxRealtimePriority")
            .await
            .unwrap();
        assert_eq!(clone.forwarder().metrics().successes_total(), 1);
    }

    /// Both ends of an in-process peer-to-peer connection.
    async fn peer_pair() -> (zbus::Connection, zbus::Connection) {
        let guid = zbus::Guid::generate();
        let (server, client) = tokio::net::UnixStream::pair().unwrap();
        tokio::try_join!(
            zbus::connection::Builder::unix_stream(server)
                .server(guid)
                .unwrap()
                .p2p()
                .build(),
            zbus::connection::Builder::unix_stream(client).p2p().build(),
        )
        .unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_failed_connector_exports_nothing() {
        let (server, _client) = peer_pair().await;
        let config = PortalConfig::default();
        let connector: ServiceConnector<Arc<FixedRealtimeKit>> = ServiceConnector::new();
        connector
            .connect_with(|| async { Err::<Arc<FixedRealtimeKit>, _>("system bus unreachable") })
            .await;
        assert_eq!(connector.state(), ConnectorState::Failed);

        let forwarder = export_if_ready(&server, &connector, &config).await.unwrap();

        assert!(forwarder.is_none());
        assert!(
            server
                .object_server()
                .interface::<_, RealtimePortal>(config.portal.object_path.as_str())
                .await
                .is_err()
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_uninitialized_connector_exports_nothing() {
        let (server, _client) = peer_pair().await;
        let connector: ServiceConnector<Arc<FixedRealtimeKit>> = ServiceConnector::new();

        let forwarder = export_if_ready(&server, &connector, &PortalConfig::default())
            .await
            .unwrap();
        assert!(forwarder.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_ready_connector_exports_interface() {
        let (server, _client) = peer_pair().await;
        let config = PortalConfig::default();
        let connector = ServiceConnector::new();
        connector
            .connect_with(|| async { Ok::<_, String>(Arc::new(FixedRealtimeKit)) })
            .await;

        let forwarder = export_if_ready(&server, &connector, &config).await.unwrap();

        assert!(forwarder.is_some());
        let exported = server
            .object_server()
            .interface::<_, RealtimePortal>(config.portal.object_path.as_str())
            .await
            .unwrap();
        assert_eq!(exported.get().await.version(), PORTAL_VERSION);
    }
}
