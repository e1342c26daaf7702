//! Rotawatch - Entry Point
//!
//! Builds the proxy pool from `SEED_PROXIES` and the public feed, then prints it.
//! Useful to check feed reachability and configuration before wiring the watchdog
//! into a transfer engine.

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rotawatch::config::LogConfig;
use rotawatch::{Config, MemoryCoordinator, ProxyAddress, ProxyCoordinator, ProxyFeedClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env();
    init_tracing(&config.log);

    info!("Starting rotawatch");

    let feed = ProxyFeedClient::new(config.feed.clone())
        .context("failed to build feed HTTP client")?;

    let seeds: Vec<ProxyAddress> = config
        .seed_proxies
        .iter()
        .filter_map(|raw| match ProxyAddress::parse(raw) {
            Ok(addr) => Some(addr),
            Err(e) => {
                warn!("Ignoring seed proxy: {}", e);
                None
            }
        })
        .collect();
    info!("Loaded {} seed proxies", seeds.len());

    let coordinator = MemoryCoordinator::new(seeds);

    let initial = feed.initial_proxies().await;
    if !initial.is_empty() {
        coordinator.merge_fresh_proxies(initial).await;
    }

    let proxies = coordinator.list_proxies().await?;
    info!("Proxy pool ready with {} addresses", proxies.len());

    for proxy in proxies {
        println!("{}", proxy);
    }

    Ok(())
}

/// Logs go to stderr so stdout carries only the address list
fn init_tracing(log: &LogConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("rotawatch={}", log.level).into());

    let registry = tracing_subscriber::registry().with(filter);

    if log.format.eq_ignore_ascii_case("json") {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
