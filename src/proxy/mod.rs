//! Proxy rotation contract consumed by the downloader.
//!
//! The downloader never selects proxies itself. It asks a [`ProxyProvider`]
//! for one per attempt and hands it back when the attempt ends. The hand-back
//! is tied to a [`ProxyLease`] so it happens exactly once on every exit path,
//! including early returns, panics and dropped futures.

mod lease;
mod round_robin;

pub(crate) use lease::ProxyLease;
pub use round_robin::RoundRobinProxyProvider;

use std::fmt;
use std::str::FromStr;

use crate::model::Task;

/// An HTTP proxy endpoint with optional basic-auth credentials.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Proxy {
    host: String,
    port: u16,
    username: Option<String>,
    password: Option<String>,
}

impl Proxy {
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            username: None,
            password: None,
        }
    }

    /// Attaches basic-auth credentials.
    #[must_use]
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    #[must_use]
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Proxy URL without credentials, e.g. `http://10.0.0.1:3128`.
    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

impl fmt::Display for Proxy {
    // Credentials never reach logs.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Error returned when a proxy address cannot be parsed.
#[derive(Debug, thiserror::Error)]
#[error("invalid proxy '{input}': expected [user:password@]host:port")]
pub struct ProxyParseError {
    input: String,
}

impl FromStr for Proxy {
    type Err = ProxyParseError;

    /// Parses `host:port` or `user:password@host:port`.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let err = || ProxyParseError {
            input: input.to_string(),
        };
        let (credentials, address) = match input.rsplit_once('@') {
            Some((credentials, address)) => (Some(credentials), address),
            None => (None, input),
        };
        let (host, port) = address.rsplit_once(':').ok_or_else(err)?;
        if host.is_empty() {
            return Err(err());
        }
        let port = port.parse::<u16>().map_err(|_| err())?;
        let proxy = Self::new(host, port);
        match credentials {
            Some(credentials) => {
                let (username, password) = credentials.split_once(':').ok_or_else(err)?;
                Ok(proxy.with_credentials(username, password))
            }
            None => Ok(proxy),
        }
    }
}

/// Outcome information handed back with a released proxy.
///
/// Only carries facts observed by the transport; interpreting them (health
/// scoring, banning) is the provider's business.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProxyOutcome {
    status_code: u16,
}

impl ProxyOutcome {
    #[must_use]
    pub fn new(status_code: u16) -> Self {
        Self { status_code }
    }

    /// HTTP status the target returned through the proxy.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.status_code
    }
}

/// Source of proxies for download attempts.
///
/// Both calls are synchronous and must be cheap; they run on the download
/// path of every request.
pub trait ProxyProvider: Send + Sync {
    /// Picks a proxy for the next attempt of `task`, or `None` to go direct.
    fn acquire(&self, task: &dyn Task) -> Option<Proxy>;

    /// Returns a proxy after the attempt that used it.
    ///
    /// `outcome` is `None` when the transport call failed before a status
    /// code was observed.
    fn release(&self, proxy: Proxy, outcome: Option<&ProxyOutcome>, task: &dyn Task);
}
