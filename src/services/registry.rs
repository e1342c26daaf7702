//! Registry of running watchdogs, one per monitored transfer

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::watchdog::{StagnationWatchdog, WatchdogHandle};
use crate::config::WatchdogConfig;
use crate::models::RuntimeSettings;
use crate::proxy::{ProxyCoordinator, ProxySource};
use crate::transfer::Transfer;

struct RunningWatchdog {
    handle: WatchdogHandle,
    task: JoinHandle<()>,
}

/// Spawns and tracks stagnation watchdogs keyed by transfer id
///
/// All watchdogs share one coordinator and one proxy source, so feed rate limiting
/// applies across every transfer.
pub struct WatchdogRegistry {
    coordinator: Arc<dyn ProxyCoordinator>,
    feed: Arc<dyn ProxySource>,
    config: WatchdogConfig,
    settings_rx: watch::Receiver<RuntimeSettings>,
    watchdogs: DashMap<u64, RunningWatchdog>,
}

impl WatchdogRegistry {
    pub fn new(
        coordinator: Arc<dyn ProxyCoordinator>,
        feed: Arc<dyn ProxySource>,
        config: WatchdogConfig,
        settings_rx: watch::Receiver<RuntimeSettings>,
    ) -> Self {
        Self {
            coordinator,
            feed,
            config,
            settings_rx,
            watchdogs: DashMap::new(),
        }
    }

    /// Start monitoring a transfer, replacing any watchdog already registered for it
    pub fn start(&self, transfer_id: u64, transfer: Arc<dyn Transfer>) {
        self.prune_finished();

        let (watchdog, handle) = StagnationWatchdog::new(
            transfer,
            self.coordinator.clone(),
            self.feed.clone(),
            self.config,
            self.settings_rx.clone(),
        );
        let task = tokio::spawn(watchdog.run());

        if let Some(previous) = self
            .watchdogs
            .insert(transfer_id, RunningWatchdog { handle, task })
        {
            debug!("Replacing watchdog for transfer {}", transfer_id);
            previous.handle.shutdown();
        }

        info!("Monitoring transfer {} for stagnation", transfer_id);
    }

    /// Stop a transfer's watchdog; returns false if none was registered
    pub fn stop(&self, transfer_id: u64) -> bool {
        match self.watchdogs.remove(&transfer_id) {
            Some((_, running)) => {
                running.handle.shutdown();
                true
            }
            None => false,
        }
    }

    /// Wake a transfer's watchdog so it re-evaluates immediately
    pub fn notify(&self, transfer_id: u64) -> bool {
        self.with_handle(transfer_id, WatchdogHandle::notify)
    }

    pub fn set_enabled(&self, transfer_id: u64, enabled: bool) -> bool {
        self.with_handle(transfer_id, |h| h.set_enabled(enabled))
    }

    pub fn is_monitoring(&self, transfer_id: u64) -> bool {
        self.watchdogs
            .get(&transfer_id)
            .map(|w| !w.task.is_finished())
            .unwrap_or(false)
    }

    /// Number of watchdogs still running
    pub fn active_count(&self) -> usize {
        self.prune_finished();
        self.watchdogs.len()
    }

    /// Stop every watchdog and wait for their tasks to finish
    ///
    /// Returns how many watchdog tasks had failed (panicked or been cancelled).
    pub async fn shutdown_all(&self) -> usize {
        let ids: Vec<u64> = self.watchdogs.iter().map(|e| *e.key()).collect();
        let mut tasks = Vec::with_capacity(ids.len());

        for id in ids {
            if let Some((_, running)) = self.watchdogs.remove(&id) {
                running.handle.shutdown();
                tasks.push((id, running.task));
            }
        }

        info!("Stopping {} watchdogs", tasks.len());
        let mut failed = 0;
        for (id, task) in tasks {
            if let Err(e) = task.await {
                error!("Watchdog for transfer {} failed: {}", id, e);
                failed += 1;
            }
        }
        failed
    }

    fn with_handle<F>(&self, transfer_id: u64, f: F) -> bool
    where
        F: FnOnce(&WatchdogHandle),
    {
        match self.watchdogs.get(&transfer_id) {
            Some(running) => {
                f(&running.handle);
                true
            }
            None => false,
        }
    }

    /// Drop entries whose watchdog exited on its own (transfer stopped or finished)
    fn prune_finished(&self) {
        self.watchdogs.retain(|_, w| !w.task.is_finished());
    }
}
