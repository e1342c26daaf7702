//! Proxy coordinator seam
//!
//! The coordinator owns proxy health and assignment. The watchdog only asks it how
//! many proxies are still usable, tells it which ones stalled, and hands it fresh
//! candidates from the feed.

mod memory;

pub use memory::{BlockEntry, MemoryCoordinator};

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{ProxyAddress, RefreshResult};

/// Block reason recorded for proxies evicted by the stagnation watchdog
pub const STAGNANT_REASON: &str = "stagnant, no progress";

/// Authority over the proxy pool shared by a transfer's workers
#[async_trait]
pub trait ProxyCoordinator: Send + Sync {
    /// Every address the coordinator knows, blocked or not
    async fn list_proxies(&self) -> Result<Vec<ProxyAddress>>;

    /// Number of addresses workers could still be assigned
    async fn available_count(&self) -> Result<usize>;

    /// Take an address out of rotation
    async fn block_proxy(&self, address: &ProxyAddress, reason: &str);

    /// Merge freshly fetched candidates into the pool
    async fn merge_fresh_proxies(&self, candidates: Vec<ProxyAddress>) -> RefreshResult;
}
