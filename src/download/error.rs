//! Error types for the download module.
//!
//! Only two kinds of error ever leave [`Downloader::download`](super::Downloader::download):
//! caller contract violations ([`DownloadError::InvalidArgument`]) and client
//! configurations that cannot be built ([`DownloadError::ClientBuild`]). Every
//! other variant is produced inside the download path, logged, and folded into
//! a failed [`Response`](crate::Response).

use thiserror::Error;

/// Errors that can occur while downloading a request.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The caller broke the download contract (missing task or site).
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// What was wrong with the call.
        reason: &'static str,
    },

    /// An HTTP client could not be constructed for a site.
    #[error("failed to build HTTP client for domain '{domain}': {source}")]
    ClientBuild {
        /// Domain the client was being built for (empty for the default client).
        domain: String,
        /// The underlying builder error.
        #[source]
        source: reqwest::Error,
    },

    /// A site or request header could not be turned into a valid HTTP header.
    #[error("invalid header '{name}' for domain '{domain}'")]
    InvalidHeader {
        /// Domain the header was configured for.
        domain: String,
        /// The offending header name.
        name: String,
    },

    /// The request could not be turned into a transport request.
    #[error("cannot build request for {url}: {reason}")]
    InvalidRequest {
        /// The request URL.
        url: String,
        /// Why the request was rejected.
        reason: String,
    },

    /// Network-level error (DNS resolution, connection refused or reset, TLS errors, etc.)
    #[error("network error downloading {url}: {source}")]
    Network {
        /// The URL that failed to download.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout downloading {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// The client pool was closed while the request waited for a connection slot.
    #[error("client pool closed while downloading {url}")]
    PoolClosed {
        /// The URL that was waiting.
        url: String,
    },
}

impl DownloadError {
    /// Creates an invalid-argument error.
    #[must_use]
    pub fn invalid_argument(reason: &'static str) -> Self {
        Self::InvalidArgument { reason }
    }

    /// Creates a client construction error.
    pub fn client_build(domain: impl Into<String>, source: reqwest::Error) -> Self {
        Self::ClientBuild {
            domain: domain.into(),
            source,
        }
    }

    /// Creates an invalid header error.
    pub fn invalid_header(domain: impl Into<String>, name: impl Into<String>) -> Self {
        Self::InvalidHeader {
            domain: domain.into(),
            name: name.into(),
        }
    }

    /// Creates an invalid request error.
    pub fn invalid_request(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Classifies a transport error as a timeout or a network error.
    pub fn transport(url: impl Into<String>, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout { url: url.into() }
        } else {
            Self::Network {
                url: url.into(),
                source,
            }
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates a pool-closed error.
    pub fn pool_closed(url: impl Into<String>) -> Self {
        Self::PoolClosed { url: url.into() }
    }

    /// Returns true for caller contract violations, which are never retried.
    #[must_use]
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument { .. })
    }
}

// No `From<reqwest::Error>`: every variant needs the URL or domain for context,
// which the source error does not carry. Use the constructors above.
