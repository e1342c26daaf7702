use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WatchdogError};

/// Scheme prefix some feeds put in front of plain HTTP proxies
const HTTP_SCHEME: &str = "http://";

/// Longest accepted port, in digits
const MAX_PORT_DIGITS: usize = 5;

/// Upstream proxy address in `host:port` form
///
/// The only way to build one is [`ProxyAddress::parse`], so every value held by the
/// crate has already been validated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProxyAddress(String);

impl ProxyAddress {
    /// Parse an address, stripping a leading `http://` first
    ///
    /// Accepts `host:port` where the host is non-empty without whitespace, `/` or `@`, and the
    /// port is 1-5 digits naming a port in `1..=65535`.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let candidate = trimmed.strip_prefix(HTTP_SCHEME).unwrap_or(trimmed);

        let invalid = || WatchdogError::InvalidProxyAddress(raw.to_string());

        let (host, port) = candidate.rsplit_once(':').ok_or_else(invalid)?;

        if host.is_empty()
            || host
                .chars()
                .any(|c| c.is_whitespace() || matches!(c, '/' | '@'))
        {
            return Err(invalid());
        }

        if port.is_empty()
            || port.len() > MAX_PORT_DIGITS
            || !port.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }

        match port.parse::<u16>() {
            Ok(0) | Err(_) => Err(invalid()),
            Ok(_) => Ok(Self(candidate.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn host(&self) -> &str {
        self.0.rsplit_once(':').map(|(h, _)| h).unwrap_or(&self.0)
    }

    pub fn port(&self) -> u16 {
        self.0
            .rsplit_once(':')
            .and_then(|(_, p)| p.parse().ok())
            .unwrap_or_default()
    }
}

impl FromStr for ProxyAddress {
    type Err = WatchdogError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ProxyAddress {
    type Error = WatchdogError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<ProxyAddress> for String {
    fn from(addr: ProxyAddress) -> Self {
        addr.0
    }
}

impl fmt::Display for ProxyAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of merging freshly fetched addresses into the coordinator's pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RefreshResult {
    pub success: bool,
    pub proxies_added: usize,
}

impl RefreshResult {
    pub fn added(count: usize) -> Self {
        Self {
            success: true,
            proxies_added: count,
        }
    }

    pub fn failed() -> Self {
        Self::default()
    }

    /// True when the merge brought at least one usable new address
    pub fn has_new_proxies(&self) -> bool {
        self.success && self.proxies_added > 0
    }
}
