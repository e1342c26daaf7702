//! Transfer and worker collaborator contracts
//!
//! Chunk I/O and transfer lifecycle live outside this crate. The watchdog sees a
//! transfer only through these traits.

use std::sync::Arc;

use crate::models::ProxyAddress;

/// A transfer's worker collection and the lock guarding it
///
/// Async so the watchdog can keep it held while it talks to the coordinator.
pub type WorkerList = tokio::sync::Mutex<Vec<Arc<dyn ChunkWorker>>>;

/// One worker moving chunks of a transfer through at most one proxy
pub trait ChunkWorker: Send + Sync {
    fn id(&self) -> u64;

    /// Proxy the worker is currently bound to, if any
    fn current_proxy(&self) -> Option<ProxyAddress>;

    /// Drop the chunk in flight and go back for a new assignment (and proxy)
    fn reset_current_chunk(&self);
}

/// A parallel chunked transfer being monitored
pub trait Transfer: Send + Sync {
    fn file_name(&self) -> &str;

    /// Bytes transferred so far; never decreases
    fn progress(&self) -> u64;

    fn is_paused(&self) -> bool;

    fn is_stopped(&self) -> bool;

    /// The transfer has finished or been torn down
    fn is_terminated(&self) -> bool;

    fn workers(&self) -> &WorkerList;
}
