//! Remote proxy feed client
//!
//! Pulls a newline-delimited list of `host:port` candidates from a public feed.
//! The feed is unreliable by nature, so every failure is logged and collapses to
//! an empty list. Requests are rate limited per client instance.

use std::collections::HashSet;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::StatusCode;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};

use crate::config::FeedConfig;
use crate::error::{Result, WatchdogError};
use crate::models::ProxyAddress;

/// Somewhere fresh candidate proxies can be pulled from
///
/// An empty list is the uniform "nothing obtained" signal; implementations do not
/// report errors.
#[async_trait]
pub trait ProxySource: Send + Sync {
    async fn fetch_fresh_proxies(&self) -> Vec<ProxyAddress>;
}

/// Rate-limited client for the remote proxy feed
///
/// Safe to share between watchdogs behind an `Arc`; concurrent callers are
/// serialized so only one of them can pass the rate-limit check per window.
pub struct ProxyFeedClient {
    config: FeedConfig,
    http: reqwest::Client,
    /// When the last request that reached the feed was issued
    last_request: Mutex<Option<Instant>>,
    /// Held across check, request and timestamp update
    fetch_gate: tokio::sync::Mutex<()>,
}

impl ProxyFeedClient {
    pub fn new(config: FeedConfig) -> Result<Self> {
        // Feed requests bypass any system proxy. The read timeout bounds each gap
        // in the body, not the whole download.
        let http = reqwest::Client::builder()
            .connect_timeout(config.request_timeout)
            .read_timeout(config.request_timeout)
            .no_proxy()
            .build()?;

        if config.enabled {
            info!(
                "Proxy feed client ready: {} (min interval {}s)",
                config.url,
                config.min_interval.as_secs()
            );
        } else {
            info!("Proxy feed client disabled; set FEED_ENABLED=yes to enable");
        }

        Ok(Self {
            config,
            http,
            last_request: Mutex::new(None),
            fetch_gate: tokio::sync::Mutex::new(()),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Whether the minimum interval since the last counted request has elapsed
    pub fn can_fetch(&self) -> bool {
        self.can_fetch_at(Instant::now())
    }

    fn can_fetch_at(&self, now: Instant) -> bool {
        match *self.last_request.lock() {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.config.min_interval,
        }
    }

    /// Fetch a fresh batch of candidate proxies
    ///
    /// Returns an empty list when disabled, rate limited, or on any failure.
    #[instrument(skip(self), fields(url = %self.config.url))]
    pub async fn fetch_fresh_proxies(&self) -> Vec<ProxyAddress> {
        if !self.config.enabled {
            debug!("Proxy feed disabled, skipping fetch");
            return Vec::new();
        }

        let _gate = self.fetch_gate.lock().await;

        let now = Instant::now();
        if !self.can_fetch_at(now) {
            info!("Proxy feed rate limit active, skipping request");
            return Vec::new();
        }

        info!("Fetching proxies from feed");

        match self.request().await {
            Ok(proxies) => {
                *self.last_request.lock() = Some(now);
                info!("Retrieved {} proxies from feed", proxies.len());
                proxies
            }
            Err(e) if e.is_feed_rejection() => {
                // The service is up but refusing; wait a full window before asking again.
                *self.last_request.lock() = Some(now);
                warn!("Failed to fetch proxy list: {}", e);
                Vec::new()
            }
            Err(e) => {
                error!("Error fetching proxies: {}", e);
                Vec::new()
            }
        }
    }

    /// Seed the initial proxy list at startup
    ///
    /// Same behaviour as [`fetch_fresh_proxies`](Self::fetch_fresh_proxies).
    pub async fn initial_proxies(&self) -> Vec<ProxyAddress> {
        if !self.config.enabled {
            info!("Proxy feed disabled, no initial proxies");
            return Vec::new();
        }

        info!("Getting initial proxy list from feed");
        self.fetch_fresh_proxies().await
    }

    async fn request(&self) -> Result<Vec<ProxyAddress>> {
        let mut response = self.http.get(self.config.url.clone()).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(WatchdogError::FeedStatus(status.as_u16()));
        }

        let limit = self.config.max_body_bytes;
        if response.content_length().is_some_and(|len| len > limit as u64) {
            return Err(WatchdogError::FeedBodyTooLarge(limit));
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if body.len() + chunk.len() > limit {
                return Err(WatchdogError::FeedBodyTooLarge(limit));
            }
            body.extend_from_slice(&chunk);
        }

        Ok(parse_feed_body(&String::from_utf8_lossy(&body)))
    }
}

#[async_trait]
impl ProxySource for ProxyFeedClient {
    async fn fetch_fresh_proxies(&self) -> Vec<ProxyAddress> {
        ProxyFeedClient::fetch_fresh_proxies(self).await
    }
}

/// Extract valid proxy addresses from a feed body
///
/// Malformed lines are dropped; duplicates are kept once in first-seen order.
pub fn parse_feed_body(body: &str) -> Vec<ProxyAddress> {
    let mut seen = HashSet::new();
    let mut rejected = 0usize;
    let mut proxies = Vec::new();

    for line in body.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match ProxyAddress::parse(line) {
            Ok(addr) => {
                if seen.insert(addr.clone()) {
                    proxies.push(addr);
                }
            }
            Err(_) => rejected += 1,
        }
    }

    if rejected > 0 {
        debug!("Dropped {} malformed feed lines", rejected);
    }

    proxies
}
