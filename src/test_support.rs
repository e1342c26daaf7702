//! In-memory collaborators for unit tests

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{Result, WatchdogError};
use crate::models::{ProxyAddress, RefreshResult};
use crate::proxy::{ProxyCoordinator, ProxySource};
use crate::transfer::{ChunkWorker, Transfer, WorkerList};

pub fn addr(s: &str) -> ProxyAddress {
    ProxyAddress::parse(s).unwrap()
}

pub struct MockWorker {
    id: u64,
    proxy: Mutex<Option<ProxyAddress>>,
    resets: AtomicUsize,
}

impl MockWorker {
    pub fn new(id: u64, proxy: Option<&str>) -> Arc<Self> {
        Arc::new(Self {
            id,
            proxy: Mutex::new(proxy.map(addr)),
            resets: AtomicUsize::new(0),
        })
    }

    pub fn resets(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }
}

impl ChunkWorker for MockWorker {
    fn id(&self) -> u64 {
        self.id
    }

    fn current_proxy(&self) -> Option<ProxyAddress> {
        self.proxy.lock().clone()
    }

    fn reset_current_chunk(&self) {
        self.resets.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct MockTransfer {
    progress: AtomicU64,
    paused: AtomicBool,
    stopped: AtomicBool,
    terminated: AtomicBool,
    workers: WorkerList,
}

impl MockTransfer {
    pub fn new(progress: u64, workers: &[Arc<MockWorker>]) -> Arc<Self> {
        let workers = workers
            .iter()
            .map(|w| w.clone() as Arc<dyn ChunkWorker>)
            .collect();

        Arc::new(Self {
            progress: AtomicU64::new(progress),
            paused: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            terminated: AtomicBool::new(false),
            workers: tokio::sync::Mutex::new(workers),
        })
    }

    pub fn set_progress(&self, bytes: u64) {
        self.progress.store(bytes, Ordering::SeqCst);
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::SeqCst);
    }

    pub fn set_stopped(&self, stopped: bool) {
        self.stopped.store(stopped, Ordering::SeqCst);
    }

    pub fn set_terminated(&self, terminated: bool) {
        self.terminated.store(terminated, Ordering::SeqCst);
    }
}

impl Transfer for MockTransfer {
    fn file_name(&self) -> &str {
        "archive.bin"
    }

    fn progress(&self) -> u64 {
        self.progress.load(Ordering::SeqCst)
    }

    fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }

    fn workers(&self) -> &WorkerList {
        &self.workers
    }
}

/// Coordinator that records every call and answers from canned values
pub struct RecordingCoordinator {
    available: Mutex<Option<usize>>,
    merge_result: Mutex<RefreshResult>,
    blocked: Mutex<Vec<(ProxyAddress, String)>>,
    merged: Mutex<Vec<Vec<ProxyAddress>>>,
}

impl RecordingCoordinator {
    /// `None` makes `available_count` fail
    pub fn new(available: Option<usize>) -> Arc<Self> {
        Arc::new(Self {
            available: Mutex::new(available),
            merge_result: Mutex::new(RefreshResult::failed()),
            blocked: Mutex::new(Vec::new()),
            merged: Mutex::new(Vec::new()),
        })
    }

    pub fn set_merge_result(&self, result: RefreshResult) {
        *self.merge_result.lock() = result;
    }

    pub fn blocked(&self) -> Vec<(ProxyAddress, String)> {
        self.blocked.lock().clone()
    }

    pub fn merges(&self) -> Vec<Vec<ProxyAddress>> {
        self.merged.lock().clone()
    }
}

#[async_trait]
impl ProxyCoordinator for RecordingCoordinator {
    async fn list_proxies(&self) -> Result<Vec<ProxyAddress>> {
        Ok(Vec::new())
    }

    async fn available_count(&self) -> Result<usize> {
        let available = *self.available.lock();
        available.ok_or_else(|| WatchdogError::Coordinator("probe failed".to_string()))
    }

    async fn block_proxy(&self, address: &ProxyAddress, reason: &str) {
        self.blocked
            .lock()
            .push((address.clone(), reason.to_string()));
    }

    async fn merge_fresh_proxies(&self, candidates: Vec<ProxyAddress>) -> RefreshResult {
        self.merged.lock().push(candidates);
        *self.merge_result.lock()
    }
}

/// Proxy source returning the same batch on every call
pub struct StaticSource {
    batch: Vec<ProxyAddress>,
    calls: AtomicUsize,
}

impl StaticSource {
    pub fn new(batch: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            batch: batch.iter().map(|s| addr(s)).collect(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProxySource for StaticSource {
    async fn fetch_fresh_proxies(&self) -> Vec<ProxyAddress> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.batch.clone()
    }
}
