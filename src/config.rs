use std::env;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;
use url::Url;

/// Public Proxifly list of plain HTTP proxies
pub const DEFAULT_FEED_URL: &str =
    "https://cdn.jsdelivr.net/gh/proxifly/free-proxy-list@main/proxies/protocols/http/data.txt";

pub const DEFAULT_FEED_MIN_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_FEED_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_FEED_MAX_BODY_BYTES: usize = 4 * 1024 * 1024;
pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_STAGNATION_TIMEOUT_SECS: u64 = 120;

/// Application configuration
///
/// Every value has a default; missing or unparsable entries fall back to it.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Proxy feed client configuration
    pub feed: FeedConfig,
    /// Stagnation watchdog configuration
    pub watchdog: WatchdogConfig,
    /// Logging configuration
    pub log: LogConfig,
    /// Static proxies the binary seeds its coordinator with
    pub seed_proxies: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    /// Fetch from the remote feed at all (default: false)
    pub enabled: bool,
    /// Newline-delimited proxy list
    pub url: Url,
    /// Minimum time between two feed requests (default: 300s)
    pub min_interval: Duration,
    /// Connect timeout and per-read timeout (default: 10s)
    pub request_timeout: Duration,
    /// Largest feed body accepted (default: 4 MiB)
    pub max_body_bytes: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: default_feed_url(),
            min_interval: Duration::from_secs(DEFAULT_FEED_MIN_INTERVAL_SECS),
            request_timeout: Duration::from_secs(DEFAULT_FEED_TIMEOUT_SECS),
            max_body_bytes: DEFAULT_FEED_MAX_BODY_BYTES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchdogConfig {
    /// Monitor transfers for stagnation (default: true)
    pub enabled: bool,
    /// How often each watchdog samples progress (default: 30s)
    pub check_interval: Duration,
    /// Time without progress before escalating (default: 120s)
    pub stagnation_timeout: Duration,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            check_interval: Duration::from_secs(DEFAULT_CHECK_INTERVAL_SECS),
            stagnation_timeout: Duration::from_secs(DEFAULT_STAGNATION_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Log level (debug, info, warn, error)
    pub level: String,
    /// Output format (json, pretty)
    pub format: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let feed_defaults = FeedConfig::default();
        let watchdog_defaults = WatchdogConfig::default();
        let log_defaults = LogConfig::default();

        Config {
            feed: FeedConfig {
                enabled: parse_bool(&lookup, "FEED_ENABLED", feed_defaults.enabled),
                url: parse_url(&lookup, "FEED_URL", feed_defaults.url),
                min_interval: parse_secs(
                    &lookup,
                    "FEED_MIN_INTERVAL_SECS",
                    feed_defaults.min_interval,
                ),
                request_timeout: parse_secs(
                    &lookup,
                    "FEED_TIMEOUT_SECS",
                    feed_defaults.request_timeout,
                ),
                max_body_bytes: parse_or(
                    &lookup,
                    "FEED_MAX_BODY_BYTES",
                    feed_defaults.max_body_bytes,
                ),
            },
            watchdog: WatchdogConfig {
                enabled: parse_bool(&lookup, "WATCHDOG_ENABLED", watchdog_defaults.enabled),
                check_interval: parse_secs(
                    &lookup,
                    "WATCHDOG_CHECK_INTERVAL_SECS",
                    watchdog_defaults.check_interval,
                ),
                stagnation_timeout: parse_secs(
                    &lookup,
                    "WATCHDOG_STAGNATION_TIMEOUT_SECS",
                    watchdog_defaults.stagnation_timeout,
                ),
            },
            log: LogConfig {
                level: lookup("LOG_LEVEL").unwrap_or(log_defaults.level),
                format: lookup("LOG_FORMAT").unwrap_or(log_defaults.format),
            },
            seed_proxies: lookup("SEED_PROXIES")
                .unwrap_or_default()
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }
}

fn default_feed_url() -> Url {
    Url::parse(DEFAULT_FEED_URL).expect("default feed URL is valid")
}

/// Parse a value, falling back to the default when it is absent or malformed
fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => default,
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                warn!("{} has unparsable value {:?}, using default", key, raw);
                default
            }
        },
    }
}

/// Whole seconds; zero is rejected since every duration here paces a loop
fn parse_secs<F>(lookup: &F, key: &str, default: Duration) -> Duration
where
    F: Fn(&str) -> Option<String>,
{
    match parse_or(lookup, key, default.as_secs()) {
        0 => {
            warn!("{} must be positive, using default", key);
            default
        }
        secs => Duration::from_secs(secs),
    }
}

fn parse_bool<F>(lookup: &F, key: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return default;
    };

    match raw.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => true,
        "false" | "no" | "0" | "off" => false,
        _ => {
            warn!("{} has unparsable value {:?}, using default", key, raw);
            default
        }
    }
}

fn parse_url<F>(lookup: &F, key: &str, default: Url) -> Url
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return default;
    };

    match Url::parse(raw.trim()) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => url,
        Ok(url) => {
            warn!("{} has unsupported scheme {}, using default", key, url.scheme());
            default
        }
        Err(e) => {
            warn!("{} must be a valid URL ({}), using default", key, e);
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const CONFIG_ENV_KEYS: &[&str] = &[
        "FEED_ENABLED",
        "FEED_URL",
        "FEED_MIN_INTERVAL_SECS",
        "FEED_TIMEOUT_SECS",
        "FEED_MAX_BODY_BYTES",
        "WATCHDOG_ENABLED",
        "WATCHDOG_CHECK_INTERVAL_SECS",
        "WATCHDOG_STAGNATION_TIMEOUT_SECS",
        "LOG_LEVEL",
        "LOG_FORMAT",
        "SEED_PROXIES",
    ];

    struct EnvGuard {
        saved: Vec<(String, Option<String>)>,
    }

    impl EnvGuard {
        fn new(keys: &[&str]) -> Self {
            let saved = keys
                .iter()
                .map(|&key| {
                    let old = env::var(key).ok();
                    env::remove_var(key);
                    (key.to_string(), old)
                })
                .collect();

            Self { saved }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (key, value) in self.saved.drain(..) {
                match value {
                    Some(v) => env::set_var(key, v),
                    None => env::remove_var(key),
                }
            }
        }
    }

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_feed_url_parses() {
        assert_eq!(default_feed_url().as_str(), DEFAULT_FEED_URL);
    }

    #[test]
    fn test_config_from_env_defaults() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guard = EnvGuard::new(CONFIG_ENV_KEYS);

        let config = Config::from_env();

        assert!(!config.feed.enabled);
        assert_eq!(config.feed.min_interval, Duration::from_secs(300));
        assert_eq!(config.feed.request_timeout, Duration::from_secs(10));
        assert_eq!(config.feed.max_body_bytes, 4 * 1024 * 1024);
        assert!(config.watchdog.enabled);
        assert_eq!(config.watchdog.check_interval, Duration::from_secs(30));
        assert_eq!(config.watchdog.stagnation_timeout, Duration::from_secs(120));
        assert_eq!(config.log.level, "info");
        assert!(config.seed_proxies.is_empty());
    }

    #[test]
    fn test_config_from_env_overrides() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guard = EnvGuard::new(CONFIG_ENV_KEYS);

        env::set_var("FEED_ENABLED", "yes");
        env::set_var("FEED_URL", "http://feed.example/list.txt");
        env::set_var("WATCHDOG_STAGNATION_TIMEOUT_SECS", "45");
        env::set_var("SEED_PROXIES", "1.2.3.4:8080, 5.6.7.8:3128");

        let config = Config::from_env();

        assert!(config.feed.enabled);
        assert_eq!(config.feed.url.as_str(), "http://feed.example/list.txt");
        assert_eq!(config.watchdog.stagnation_timeout, Duration::from_secs(45));
        assert_eq!(
            config.seed_proxies,
            vec!["1.2.3.4:8080".to_string(), "5.6.7.8:3128".to_string()]
        );
    }

    #[test]
    fn test_unparsable_values_fall_back_to_defaults() {
        let config = Config::from_lookup(lookup_from(&[
            ("FEED_MIN_INTERVAL_SECS", "five minutes"),
            ("WATCHDOG_CHECK_INTERVAL_SECS", "-3"),
            ("WATCHDOG_STAGNATION_TIMEOUT_SECS", "0"),
            ("WATCHDOG_ENABLED", "maybe"),
            ("FEED_URL", "not a url"),
            ("FEED_MAX_BODY_BYTES", "lots"),
        ]));

        assert_eq!(config.feed.min_interval, Duration::from_secs(300));
        assert_eq!(config.watchdog.check_interval, Duration::from_secs(30));
        assert_eq!(config.watchdog.stagnation_timeout, Duration::from_secs(120));
        assert!(config.watchdog.enabled);
        assert_eq!(config.feed.url.as_str(), DEFAULT_FEED_URL);
        assert_eq!(config.feed.max_body_bytes, DEFAULT_FEED_MAX_BODY_BYTES);
    }

    #[test]
    fn test_feed_url_requires_http_scheme() {
        let config = Config::from_lookup(lookup_from(&[("FEED_URL", "ftp://feed.example/x")]));
        assert_eq!(config.feed.url.as_str(), DEFAULT_FEED_URL);
    }

    #[test]
    fn test_bool_spellings() {
        let config = Config::from_lookup(lookup_from(&[
            ("FEED_ENABLED", "TRUE"),
            ("WATCHDOG_ENABLED", "off"),
        ]));
        assert!(config.feed.enabled);
        assert!(!config.watchdog.enabled);
    }
}
