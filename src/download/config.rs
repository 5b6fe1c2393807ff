//! Downloader configuration surface.

use super::constants::{DEFAULT_POOL_SIZE, MAX_POOL_SIZE, MIN_POOL_SIZE};

/// Error type for downloader configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Invalid pool size value provided.
    #[error("invalid pool size {value}: must be between {MIN_POOL_SIZE} and {MAX_POOL_SIZE}")]
    InvalidPoolSize {
        /// The invalid value that was provided.
        value: usize,
    },
}

/// Validates a pool size (the downloader's concurrency hint).
///
/// # Errors
///
/// Returns [`ConfigError::InvalidPoolSize`] outside `1..=1000`.
pub fn validate_pool_size(value: usize) -> Result<usize, ConfigError> {
    if (MIN_POOL_SIZE..=MAX_POOL_SIZE).contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::InvalidPoolSize { value })
    }
}

/// Settings for an [`HttpClientDownloader`](super::HttpClientDownloader).
///
/// # Default Values
///
/// - `pool_size`: 10 concurrent connections per host
/// - `capture_headers`: `true` (pages carry a copy of the response headers)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloaderConfig {
    pool_size: usize,
    capture_headers: bool,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            pool_size: DEFAULT_POOL_SIZE,
            capture_headers: true,
        }
    }
}

impl DownloaderConfig {
    /// Creates a config with the given pool size and header capture enabled.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPoolSize`] outside `1..=1000`.
    pub fn new(pool_size: usize) -> Result<Self, ConfigError> {
        Ok(Self {
            pool_size: validate_pool_size(pool_size)?,
            ..Self::default()
        })
    }

    /// Enables or disables copying response headers into pages.
    #[must_use]
    pub fn with_capture_headers(mut self, capture_headers: bool) -> Self {
        self.capture_headers = capture_headers;
        self
    }

    #[must_use]
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    #[must_use]
    pub fn capture_headers(&self) -> bool {
        self.capture_headers
    }
}
