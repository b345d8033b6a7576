//! Rill DNS server.
//!
//! A recursive resolver that also serves one authoritative zone. Startup
//! loads the zone, seeds the shared cache from it, and binds a single UDP
//! listener; every query is then routed by the dispatcher to the
//! authoritative responder or the recursor.

use anyhow::{Context, Result};
use clap::Parser;
use rill_cache::RecordCache;
use rill_resolver::Recursor;
use rill_server::{Dispatcher, UdpServer};
use rill_zone::Zone;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{info, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Interval for the background cache sweep.
const SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// Recursive DNS resolver with one authoritative zone.
#[derive(Parser, Debug)]
#[command(name = "rill")]
#[command(author, version, about)]
struct Cli {
    /// IPv4 address of the root server recursion starts from.
    root_ip: Ipv4Addr,

    /// Path to the zone master file.
    zone_file: PathBuf,

    /// Listen port; 0 selects an ephemeral port.
    #[arg(long, default_value_t = 53)]
    port: u16,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long, default_value = "info")]
    log_level: String,
}

fn parse_log_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

fn init_tracing(level: Level) {
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .init();
}

async fn shutdown_signal() {
    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
        .expect("failed to register SIGTERM handler");

    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("received SIGINT, shutting down");
        }
        _ = sigterm.recv() => {
            info!("received SIGTERM, shutting down");
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(parse_log_level(&cli.log_level));

    let zone = Zone::from_file(&cli.zone_file)
        .with_context(|| format!("failed to load zone file {}", cli.zone_file.display()))?;
    info!(
        origin = %zone.origin(),
        records = zone.records().len(),
        default_ttl = zone.default_ttl(),
        "zone loaded"
    );

    let cache = Arc::new(RecordCache::new());
    let recursor = Arc::new(Recursor::new(cli.root_ip, cache.clone()));
    let dispatcher = Arc::new(Dispatcher::new(&zone, cache, recursor));

    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, cli.port));
    let server = UdpServer::bind(addr, dispatcher.clone())
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    // Harnesses match this line byte-for-byte; it goes to stdout while all
    // diagnostics go to stderr through tracing.
    println!("Bound to port {}", server.local_addr().port());

    let sweeper = dispatcher.clone();
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            tick.tick().await;
            sweeper.sweep();
        }
    });

    info!(root = %cli.root_ip, origin = %dispatcher.origin(), "rill started");

    tokio::select! {
        result = server.run() => {
            result.context("server error")?;
        }
        _ = shutdown_signal() => {}
    }

    info!("rill stopped");
    Ok(())
}
