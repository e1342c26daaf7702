use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::{debug, info};

use super::ProxyCoordinator;
use crate::error::Result;
use crate::models::{ProxyAddress, RefreshResult};

/// Why and when an address was taken out of rotation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockEntry {
    pub reason: String,
    pub blocked_at: DateTime<Utc>,
}

/// In-process coordinator: an ordered address list plus a blocklist
///
/// Blocks never expire, and a blocked address announced again by the feed stays
/// blocked.
#[derive(Debug, Default)]
pub struct MemoryCoordinator {
    proxies: RwLock<Vec<ProxyAddress>>,
    blocked: DashMap<ProxyAddress, BlockEntry>,
}

impl MemoryCoordinator {
    pub fn new(proxies: Vec<ProxyAddress>) -> Self {
        let coordinator = Self::default();
        coordinator.insert_new(proxies);
        coordinator
    }

    pub fn is_blocked(&self, address: &ProxyAddress) -> bool {
        self.blocked.contains_key(address)
    }

    pub fn block_entry(&self, address: &ProxyAddress) -> Option<BlockEntry> {
        self.blocked.get(address).map(|e| e.value().clone())
    }

    /// Addresses that are not blocked, in insertion order
    pub fn usable_proxies(&self) -> Vec<ProxyAddress> {
        self.proxies
            .read()
            .iter()
            .filter(|p| !self.blocked.contains_key(*p))
            .cloned()
            .collect()
    }

    fn insert_new(&self, candidates: Vec<ProxyAddress>) -> usize {
        let mut proxies = self.proxies.write();
        let mut added = 0;
        for candidate in candidates {
            if !proxies.contains(&candidate) {
                proxies.push(candidate);
                added += 1;
            }
        }
        added
    }
}

#[async_trait]
impl ProxyCoordinator for MemoryCoordinator {
    async fn list_proxies(&self) -> Result<Vec<ProxyAddress>> {
        Ok(self.proxies.read().clone())
    }

    async fn available_count(&self) -> Result<usize> {
        Ok(self.usable_proxies().len())
    }

    async fn block_proxy(&self, address: &ProxyAddress, reason: &str) {
        debug!("Blocking proxy {} ({})", address, reason);
        self.blocked.insert(
            address.clone(),
            BlockEntry {
                reason: reason.to_string(),
                blocked_at: Utc::now(),
            },
        );
    }

    async fn merge_fresh_proxies(&self, candidates: Vec<ProxyAddress>) -> RefreshResult {
        let offered = candidates.len();
        let added = self.insert_new(candidates);
        info!("Merged fresh proxies: {} offered, {} new", offered, added);
        RefreshResult::added(added)
    }
}
