//! Rotawatch - Stagnation-Triggered Proxy Rotation
//!
//! Watches parallel chunked transfers whose workers each go through an upstream
//! proxy, and rotates proxies when a transfer stops making progress.
//!
//! ## Features
//!
//! - One stagnation watchdog per transfer, woken on a timer or on demand
//! - Eviction of every proxy a stalled transfer's workers are using
//! - Fallback to a rate-limited public proxy feed when the pool runs dry
//! - Collaborator traits for transfers, workers and the proxy coordinator

pub mod config;
pub mod error;
pub mod models;
pub mod proxy;
pub mod services;
pub mod transfer;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::Config;
pub use error::{Result, WatchdogError};
pub use models::{ProxyAddress, RefreshResult, RuntimeSettings};
pub use proxy::{MemoryCoordinator, ProxyCoordinator, ProxyFeedClient, ProxySource};
pub use services::{StagnationWatchdog, WatchdogHandle, WatchdogRegistry};
pub use transfer::{ChunkWorker, Transfer};
