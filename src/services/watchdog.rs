//! Stagnation watchdog
//!
//! One watchdog runs per monitored transfer. Every `check_interval` it samples the
//! transfer's byte counter; when the counter has not moved for
//! `stagnation_timeout` it escalates:
//!
//! 1. If the coordinator still has usable proxies, every worker holding a proxy
//!    gets that proxy blocked and is told to drop its chunk.
//! 2. If nothing is usable, or no worker held a proxy, fresh candidates are pulled
//!    from the feed and every worker is reset onto the refreshed pool.
//!
//! A successful escalation restarts the stagnation window.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Notify};
use tokio::time::{sleep, Instant};
use tracing::{debug, info, instrument, warn};

use crate::config::WatchdogConfig;
use crate::models::RuntimeSettings;
use crate::proxy::{ProxyCoordinator, ProxySource, STAGNANT_REASON};
use crate::transfer::Transfer;

/// What a single check cycle did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Exit requested or the transfer is over
    Stopped,
    /// Paused transfer, smart proxy mode off, or watchdog disabled
    Skipped,
    /// Progress moved forward; stagnation window restarted
    Progressed,
    /// No progress yet, but still inside the window
    Waiting { stalled_for: Duration },
    /// Window exceeded; `intervened` tells whether any recovery action landed
    Escalated { intervened: bool },
}

/// Per-transfer stagnation watchdog
pub struct StagnationWatchdog {
    transfer: Arc<dyn Transfer>,
    coordinator: Arc<dyn ProxyCoordinator>,
    feed: Arc<dyn ProxySource>,
    config: WatchdogConfig,
    settings_rx: watch::Receiver<RuntimeSettings>,
    enabled: Arc<AtomicBool>,
    notify: Arc<Notify>,
    exit_rx: watch::Receiver<bool>,
    exit_requested: bool,
    last_progress: u64,
    last_progress_time: Instant,
}

impl StagnationWatchdog {
    /// Create a watchdog and the handle used to control it
    ///
    /// The transfer's current progress becomes the initial baseline.
    pub fn new(
        transfer: Arc<dyn Transfer>,
        coordinator: Arc<dyn ProxyCoordinator>,
        feed: Arc<dyn ProxySource>,
        config: WatchdogConfig,
        settings_rx: watch::Receiver<RuntimeSettings>,
    ) -> (Self, WatchdogHandle) {
        let (exit_tx, exit_rx) = watch::channel(false);
        let enabled = Arc::new(AtomicBool::new(config.enabled));
        let notify = Arc::new(Notify::new());

        debug!(
            "Watchdog for {}: enabled={}, check_interval={}s, stagnation_timeout={}s",
            transfer.file_name(),
            config.enabled,
            config.check_interval.as_secs(),
            config.stagnation_timeout.as_secs()
        );

        let handle = WatchdogHandle {
            exit_tx,
            notify: notify.clone(),
            enabled: enabled.clone(),
        };

        let last_progress = transfer.progress();

        let watchdog = Self {
            transfer,
            coordinator,
            feed,
            config,
            settings_rx,
            enabled,
            notify,
            exit_rx,
            exit_requested: false,
            last_progress,
            last_progress_time: Instant::now(),
        };

        (watchdog, handle)
    }

    /// Progress baseline and when it was last moved
    pub fn baseline(&self) -> (u64, Instant) {
        (self.last_progress, self.last_progress_time)
    }

    /// Run until exit is requested or the transfer ends (call in a spawned task)
    #[instrument(skip(self), fields(file = %self.transfer.file_name()))]
    pub async fn run(mut self) {
        info!("Stagnation watchdog started");

        while self.check_cycle().await != CycleOutcome::Stopped {
            self.wait().await;
        }

        info!("Stagnation watchdog stopped");
    }

    /// Evaluate the transfer once, escalating if the window has run out
    pub async fn check_cycle(&mut self) -> CycleOutcome {
        if self.should_stop() {
            return CycleOutcome::Stopped;
        }

        if !self.is_active() {
            return CycleOutcome::Skipped;
        }

        let now = Instant::now();
        let progress = self.transfer.progress();

        if progress > self.last_progress {
            self.last_progress = progress;
            self.last_progress_time = now;
            debug!("Progress detected: {} bytes", progress);
            return CycleOutcome::Progressed;
        }

        let stalled_for = now.saturating_duration_since(self.last_progress_time);
        if stalled_for < self.config.stagnation_timeout {
            return CycleOutcome::Waiting { stalled_for };
        }

        warn!(
            "No progress for {} seconds in {}, attempting proxy switch",
            stalled_for.as_secs(),
            self.transfer.file_name()
        );

        let intervened = self.escalate().await;
        if intervened {
            self.last_progress_time = now;
            info!(
                "Switched proxies for stagnant transfer: {}",
                self.transfer.file_name()
            );
        }

        CycleOutcome::Escalated { intervened }
    }

    fn should_stop(&self) -> bool {
        self.exit_requested
            || *self.exit_rx.borrow()
            || self.transfer.is_terminated()
            || self.transfer.is_stopped()
    }

    fn is_active(&self) -> bool {
        !self.transfer.is_paused()
            && self.settings_rx.borrow().smart_proxy_enabled
            && self.enabled.load(Ordering::Relaxed)
    }

    /// Sleep for `check_interval` unless notified or told to exit first
    async fn wait(&mut self) {
        let exit_closed = tokio::select! {
            _ = sleep(self.config.check_interval) => false,
            _ = self.notify.notified() => false,
            changed = self.exit_rx.changed() => changed.is_err(),
        };

        // Handle dropped: exit can no longer be requested.
        if exit_closed {
            self.exit_requested = true;
        }
    }

    #[instrument(skip(self))]
    async fn escalate(&self) -> bool {
        let has_available = match self.coordinator.available_count().await {
            Ok(count) => count > 0,
            Err(e) => {
                warn!("Error checking available proxies: {}", e);
                false
            }
        };

        if !has_available {
            warn!(
                "No available proxies for {}, requesting fresh proxies",
                self.transfer.file_name()
            );
            return self.refresh_from_feed().await;
        }

        if self.evict_stalled_proxies().await > 0 {
            return true;
        }

        debug!("No worker held a proxy, falling back to feed refresh");
        self.refresh_from_feed().await
    }

    /// Block every assigned proxy and reset its worker; returns how many were blocked
    async fn evict_stalled_proxies(&self) -> usize {
        let workers = self.transfer.workers().lock().await;
        let mut blocked = 0;

        for worker in workers.iter() {
            let Some(proxy) = worker.current_proxy() else {
                continue;
            };

            info!(
                "Blocking stagnant proxy {} for worker [{}]",
                proxy,
                worker.id()
            );
            self.coordinator.block_proxy(&proxy, STAGNANT_REASON).await;
            worker.reset_current_chunk();
            blocked += 1;
        }

        blocked
    }

    /// Pull fresh proxies and move every worker onto them
    async fn refresh_from_feed(&self) -> bool {
        let candidates = self.feed.fetch_fresh_proxies().await;
        if candidates.is_empty() {
            debug!("Feed produced no candidates");
            return false;
        }

        let result = self.coordinator.merge_fresh_proxies(candidates).await;
        if !result.has_new_proxies() {
            info!("Feed refresh added no new proxies");
            return false;
        }

        let workers = self.transfer.workers().lock().await;
        for worker in workers.iter() {
            worker.reset_current_chunk();
        }

        info!(
            "Added {} fresh proxies, reset {} workers",
            result.proxies_added,
            workers.len()
        );
        true
    }
}

/// Control handle for a running watchdog
pub struct WatchdogHandle {
    exit_tx: watch::Sender<bool>,
    notify: Arc<Notify>,
    enabled: Arc<AtomicBool>,
}

impl WatchdogHandle {
    /// Ask the watchdog to stop; it wakes and exits without a final check
    pub fn shutdown(&self) {
        let _ = self.exit_tx.send(true);
        self.notify.notify_one();
    }

    /// Wake the watchdog early so it re-evaluates the transfer
    pub fn notify(&self) {
        self.notify.notify_one();
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }
}
