// Iron Lotus: Allow unwrap/expect in tests for clear failure messages
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! `rtportal` service binary.
//!
//! Exports `org.freedesktop.portal.Realtime` on the session bus and runs
//! until SIGINT or SIGTERM.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use rtportal::prelude::*;
use tokio::signal::unix::{SignalKind, signal};
use tracing_subscriber::EnvFilter;

/// Command line options.
#[derive(Debug, Default, PartialEq, Eq)]
struct Args {
    config: Option<PathBuf>,
    verbose: bool,
    no_name: bool,
    help: bool,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Args> {
    let mut parsed = Args::default();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let path = args.next().context("--config needs a path")?;
                parsed.config = Some(PathBuf::from(path));
            }
            "--verbose" | "-v" => parsed.verbose = true,
            "--no-name" => parsed.no_name = true,
            "--help" | "-h" => parsed.help = true,
            other => bail!("unknown argument: {other}"),
        }
    }
    Ok(parsed)
}

fn print_help() {
    println!("rtportal - realtime scheduling portal");
    println!();
    println!("Usage: rtportal [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -c, --config <PATH>  Load configuration from a TOML file");
    println!("  -v, --verbose        Log at debug level unless RUST_LOG is set");
    println!("      --no-name        Do not request the portal bus name");
    println!("  -h, --help           Show this help");
}

fn init_logging(config: &LoggingConfig, verbose: bool) -> Result<()> {
    let fallback = if verbose { "debug" } else { config.filter.as_str() };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .with_context(|| format!("invalid log filter: {fallback}"))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("cannot install log subscriber: {e}"))
}

async fn wait_for_shutdown() -> Result<()> {
    let mut term = signal(SignalKind::terminate()).context("cannot listen for SIGTERM")?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => res.context("cannot listen for SIGINT")?,
        _ = term.recv() => {}
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = parse_args(std::env::args().skip(1))?;
    if args.help {
        print_help();
        return Ok(());
    }

    let config = match &args.config {
        Some(path) => PortalConfig::load(path)
            .with_context(|| format!("cannot load {}", path.display()))?,
        None => PortalConfig::default(),
    };
    init_logging(&config.logging, args.verbose)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "rtportal starting");

    let conn = connect_portal_bus(&config.portal)
        .await
        .context("cannot connect to the portal bus")?;

    // One attempt; without RealtimeKit the interface stays unregistered
    let connector: ServiceConnector<Arc<RtkitClient>> = ServiceConnector::new();
    connector
        .connect_with(|| async { connect_realtimekit(&config.realtimekit).await.map(Arc::new) })
        .await;

    let forwarder = export_if_ready(&conn, &connector, &config)
        .await
        .context("cannot export the realtime interface")?;

    if config.portal.request_name && !args.no_name {
        conn.request_name(config.portal.bus_name.as_str())
            .await
            .with_context(|| format!("cannot own {}", config.portal.bus_name))?;
        tracing::info!(name = %config.portal.bus_name, "bus name acquired");
    }

    wait_for_shutdown().await?;

    match forwarder {
        Some(forwarder) => {
            let snapshot = forwarder.metrics().snapshot();
            tracing::info!(?snapshot, "rtportal stopping");
        }
        None => tracing::info!("rtportal stopping"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<Args> {
        parse_args(list.iter().map(|s| (*s).to_string()))
    }

    #[test]
    fn test_no_arguments() {
        assert_eq!(args(&[]).unwrap(), Args::default());
    }

    #[test]
    fn test_all_flags() {
        let parsed = args(&["--config", "/etc/rtportal.toml", "--verbose", "--no-name"]).unwrap();
        assert_eq!(parsed.config, Some(PathBuf::from("/etc/rtportal.toml")));
        assert!(parsed.verbose);
        assert!(parsed.no_name);
        assert!(!parsed.help);
    }

    #[test]
    fn test_short_flags() {
        let parsed = args(&["-c", "x.toml", "-v", "-h"]).unwrap();
        assert_eq!(parsed.config, Some(PathBuf::from("x.toml")));
        assert!(parsed.verbose);
        assert!(parsed.help);
    }

    #[test]
    fn test_config_requires_path() {
        assert!(args(&["--config"]).is_err());
    }

    #[test]
    fn test_unknown_argument() {
        let err = args(&["--daemonize"]).unwrap_err();
        assert!(err.to_string().contains("--daemonize"));
    }
}
