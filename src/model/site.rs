//! Per-host crawl configuration.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for one target host.
///
/// The `domain` is the identity the [`ClientPool`](crate::ClientPool) keys
/// clients by; every other field shapes the client built for that domain or
/// the requests sent through it. Loading sites from disk is left to the
/// caller; `Site` only derives `Deserialize` so any format works.
///
/// # Example
///
/// ```
/// use crawl_downloader::Site;
///
/// let site = Site::new("example.com")
///     .with_charset("UTF-8")
///     .with_header("Accept-Language", "en");
/// assert_eq!(site.domain(), "example.com");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Site {
    domain: String,
    user_agent: Option<String>,
    charset: Option<String>,
    headers: BTreeMap<String, String>,
    cookies: BTreeMap<String, String>,
    /// Consumed by the scheduler's retry policy, never by the downloader.
    retry_times: u32,
    timeout_ms: Option<u64>,
    use_gzip: bool,
    disable_cookie_management: bool,
}

impl Default for Site {
    fn default() -> Self {
        Self {
            domain: String::new(),
            user_agent: None,
            charset: None,
            headers: BTreeMap::new(),
            cookies: BTreeMap::new(),
            retry_times: 0,
            timeout_ms: None,
            use_gzip: true,
            disable_cookie_management: false,
        }
    }
}

impl Site {
    /// Creates a site for the given domain with default settings.
    #[must_use]
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Sets the default charset used when a request carries no override.
    #[must_use]
    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Some(charset.into());
        self
    }

    /// Adds a default header sent with every request to this site.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Adds a cookie sent with every request to this site.
    #[must_use]
    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_retry_times(mut self, retry_times: u32) -> Self {
        self.retry_times = retry_times;
        self
    }

    /// Sets both the connect and the overall request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    #[must_use]
    pub fn with_gzip(mut self, use_gzip: bool) -> Self {
        self.use_gzip = use_gzip;
        self
    }

    /// Disables the client cookie store; only explicit cookies are sent.
    #[must_use]
    pub fn with_cookie_management_disabled(mut self, disabled: bool) -> Self {
        self.disable_cookie_management = disabled;
        self
    }

    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    #[must_use]
    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    /// Site-wide default charset.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.charset.as_deref()
    }

    #[must_use]
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    #[must_use]
    pub fn cookies(&self) -> &BTreeMap<String, String> {
        &self.cookies
    }

    #[must_use]
    pub fn retry_times(&self) -> u32 {
        self.retry_times
    }

    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    #[must_use]
    pub fn use_gzip(&self) -> bool {
        self.use_gzip
    }

    #[must_use]
    pub fn is_cookie_management_disabled(&self) -> bool {
        self.disable_cookie_management
    }

    /// Key used by the client pool: the domain, lower-cased.
    #[must_use]
    pub(crate) fn pool_key(&self) -> String {
        self.domain.to_ascii_lowercase()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_site_defaults() {
        let site = Site::new("example.com");
        assert_eq!(site.domain(), "example.com");
        assert!(site.charset().is_none());
        assert!(site.use_gzip());
        assert!(!site.is_cookie_management_disabled());
        assert!(site.timeout().is_none());
        assert_eq!(site.retry_times(), 0);
    }

    #[test]
    fn test_site_timeout_round_trips_through_millis() {
        let site = Site::new("example.com").with_timeout(Duration::from_millis(2500));
        assert_eq!(site.timeout(), Some(Duration::from_millis(2500)));
    }

    #[test]
    fn test_site_pool_key_is_case_insensitive() {
        assert_eq!(
            Site::new("Example.COM").pool_key(),
            Site::new("example.com").pool_key()
        );
    }

    #[test]
    fn test_site_deserializes_partial_json() {
        let site: Site =
            serde_json::from_str(r#"{"domain":"example.com","charset":"GBK","timeout_ms":1000}"#)
                .unwrap();
        assert_eq!(site.charset(), Some("GBK"));
        assert_eq!(site.timeout(), Some(Duration::from_secs(1)));
        assert!(site.use_gzip(), "missing fields fall back to defaults");
    }
}
