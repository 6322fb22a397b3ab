//! RealtimeKit client over the system bus.

use async_trait::async_trait;
use rtportal_core::{
    DownstreamError, DownstreamResult, PropertyValue, RealtimeKit, RealtimeKitConfig,
};
use zbus::DBusError;
use zbus::names::InterfaceName;
use zbus::proxy::CacheProperties;
use zbus::zvariant::{OwnedValue, Value};

use crate::error::Result;

/// Error name used when a failure carries no D-Bus error name of its own.
const DBUS_ERROR_FAILED: &str = "org.freedesktop.DBus.Error.Failed";

#[zbus::proxy(
    interface = "org.freedesktop.RealtimeKit1",
    default_service = "org.freedesktop.RealtimeKit1",
    default_path = "/org/freedesktop/RealtimeKit1",
    gen_blocking = false
)]
trait RealtimeKit1 {
    #[zbus(name = "MakeThreadRealtimeWithPID")]
    fn make_thread_realtime_with_pid(
        &self,
        process: u64,
        thread: u64,
        priority: u32,
    ) -> zbus::Result<()>;

    #[zbus(name = "MakeThreadHighPriorityWithPID")]
    fn make_thread_high_priority_with_pid(
        &self,
        process: u64,
        thread: u64,
        priority: i32,
    ) -> zbus::Result<()>;
}

/// Handle on RealtimeKit.
///
/// Properties are never cached; every read is a `Properties.Get` round-trip.
#[derive(Clone, Debug)]
pub struct RtkitClient {
    proxy: RealtimeKit1Proxy<'static>,
    properties: zbus::fdo::PropertiesProxy<'static>,
    interface: InterfaceName<'static>,
}

impl RtkitClient {
    /// Builds proxies for the configured service on `conn`.
    ///
    /// No call is made to the service itself.
    ///
    /// # Errors
    /// Returns an error if a configured name or path is malformed.
    pub async fn new(conn: &zbus::Connection, config: &RealtimeKitConfig) -> Result<Self> {
        let proxy = RealtimeKit1Proxy::builder(conn)
            .destination(config.service.clone())?
            .path(config.object_path.clone())?
            .interface(config.interface.clone())?
            .cache_properties(CacheProperties::No)
            .build()
            .await?;
        let properties = zbus::fdo::PropertiesProxy::builder(conn)
            .destination(config.service.clone())?
            .path(config.object_path.clone())?
            .cache_properties(CacheProperties::No)
            .build()
            .await?;
        let interface =
            InterfaceName::try_from(config.interface.clone()).map_err(zbus::Error::from)?;

        tracing::debug!(
            service = %config.service,
            path = %config.object_path,
            interface = %config.interface,
            "RealtimeKit proxy ready"
        );
        Ok(Self {
            proxy,
            properties,
            interface,
        })
    }
}

#[async_trait]
impl RealtimeKit for RtkitClient {
    async fn make_thread_realtime_with_pid(
        &self,
        process: u64,
        thread: u64,
        priority: u32,
    ) -> DownstreamResult<()> {
        self.proxy
            .make_thread_realtime_with_pid(process, thread, priority)
            .await
            .map_err(downstream_from_zbus)
    }

    async fn make_thread_high_priority_with_pid(
        &self,
        process: u64,
        thread: u64,
        priority: i32,
    ) -> DownstreamResult<()> {
        self.proxy
            .make_thread_high_priority_with_pid(process, thread, priority)
            .await
            .map_err(downstream_from_zbus)
    }

    async fn get_property(&self, name: &str) -> DownstreamResult<PropertyValue> {
        let value = self
            .properties
            .get(self.interface.clone(), name)
            .await
            .map_err(downstream_from_fdo)?;
        Ok(decode_value(&value))
    }
}

/// Keeps the name and message of a failed call.
pub(crate) fn downstream_from_zbus(err: zbus::Error) -> DownstreamError {
    match err {
        zbus::Error::MethodError(name, message, _) => {
            DownstreamError::new(name.to_string(), message)
        }
        zbus::Error::FDO(fdo) => downstream_from_fdo(*fdo),
        other => DownstreamError::new(DBUS_ERROR_FAILED, Some(other.to_string())),
    }
}

pub(crate) fn downstream_from_fdo(err: zbus::fdo::Error) -> DownstreamError {
    match err {
        zbus::fdo::Error::ZBus(inner) => downstream_from_zbus(inner),
        other => DownstreamError::new(
            other.name().to_string(),
            other.description().map(str::to_owned),
        ),
    }
}

/// Classifies a property value by its wire type.
///
/// `Properties.Get` already strips the reply's own variant, so a nested
/// variant is just another unexpected type.
pub(crate) fn decode_value(value: &OwnedValue) -> PropertyValue {
    match &**value {
        Value::I64(v) => PropertyValue::Int64(*v),
        Value::I32(v) => PropertyValue::Int32(*v),
        other => PropertyValue::Other {
            signature: other.value_signature().as_str().to_owned(),
        },
    }
}
