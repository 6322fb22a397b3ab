//! Bus connections.

use rtportal_core::{ExportConfig, RealtimeKitConfig};

use crate::error::Result;
use crate::rtkit::RtkitClient;

/// Opens a connection to `address`, or to the bus `fallback` returns.
async fn open<F, Fut>(address: Option<&str>, fallback: F) -> Result<zbus::Connection>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = zbus::Result<zbus::Connection>>,
{
    let conn = match address {
        Some(addr) => zbus::connection::Builder::address(addr)?.build().await?,
        None => fallback().await?,
    };
    Ok(conn)
}

/// Connects to RealtimeKit, on the system bus unless an address is configured.
///
/// # Errors
/// Returns an error if the bus is unreachable or a configured name is malformed.
pub async fn connect_realtimekit(config: &RealtimeKitConfig) -> Result<RtkitClient> {
    let conn = open(config.bus_address.as_deref(), zbus::Connection::system).await?;
    tracing::debug!(unique_name = ?conn.unique_name(), "system bus connected");
    RtkitClient::new(&conn, config).await
}

/// Connects the bus the portal is exported on, the session bus by default.
///
/// # Errors
/// Returns an error if the bus is unreachable.
pub async fn connect_portal_bus(config: &ExportConfig) -> Result<zbus::Connection> {
    let conn = open(config.bus_address.as_deref(), zbus::Connection::session).await?;
    tracing::debug!(unique_name = ?conn.unique_name(), "portal bus connected");
    Ok(conn)
}
