use thiserror::Error;

/// Unified error type for the watchdog and feed client
#[derive(Error, Debug)]
pub enum WatchdogError {
    // Proxy errors
    #[error("Invalid proxy address: {0}")]
    InvalidProxyAddress(String),

    // Feed errors
    #[error("Feed request failed: {0}")]
    FeedTransport(#[from] reqwest::Error),

    #[error("Feed returned HTTP {0}")]
    FeedStatus(u16),

    #[error("Feed body exceeds {0} bytes")]
    FeedBodyTooLarge(usize),

    // Collaborator errors
    #[error("Proxy coordinator error: {0}")]
    Coordinator(String),
}

/// Result type alias for watchdog operations
pub type Result<T> = std::result::Result<T, WatchdogError>;

impl WatchdogError {
    /// The feed answered, but with an error status or an oversized body.
    ///
    /// Such failures consume the rate-limit window; transport failures do not.
    pub fn is_feed_rejection(&self) -> bool {
        matches!(
            self,
            WatchdogError::FeedStatus(_) | WatchdogError::FeedBodyTooLarge(_)
        )
    }
}
