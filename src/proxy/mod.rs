//! Proxy pool collaborators
//!
//! - `feed`: rate-limited client for the remote candidate list
//! - `coordinator`: the pool authority the watchdog blocks and refreshes through

pub mod coordinator;
pub mod feed;

pub use coordinator::{MemoryCoordinator, ProxyCoordinator, STAGNANT_REASON};
pub use feed::{parse_feed_body, ProxyFeedClient, ProxySource};
