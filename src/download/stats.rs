//! Success and failure signals recorded by the downloader.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::model::Request;

/// Counters of download outcomes.
///
/// Uses atomic counters so concurrent download tasks can record without
/// locking. Shared via `Arc` between the downloader and whoever reports on it.
#[derive(Debug, Default)]
pub struct DownloadStats {
    succeeded: AtomicUsize,
    failed: AtomicUsize,
}

impl DownloadStats {
    /// Creates a new stats tracker with zero counts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of requests whose transport call succeeded.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.succeeded.load(Ordering::SeqCst)
    }

    /// Returns the number of requests whose transport call failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    /// Returns the total number of requests processed (succeeded + failed).
    #[must_use]
    pub fn total(&self) -> usize {
        self.succeeded() + self.failed()
    }

    pub(crate) fn increment_succeeded(&self) {
        self.succeeded.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_failed(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Callback notified after each download attempt.
///
/// Hooks run on the download task, so implementations should return quickly.
pub trait DownloadListener: Send + Sync {
    /// The transport call succeeded and the response was processed.
    fn on_success(&self, request: &Request);

    /// The transport call failed; the caller receives a failed response.
    fn on_error(&self, request: &Request);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_start_at_zero() {
        let stats = DownloadStats::new();
        assert_eq!(stats.succeeded(), 0);
        assert_eq!(stats.failed(), 0);
        assert_eq!(stats.total(), 0);
    }

    #[test]
    fn test_stats_count_independently() {
        let stats = DownloadStats::new();
        stats.increment_succeeded();
        stats.increment_succeeded();
        stats.increment_failed();
        assert_eq!(stats.succeeded(), 2);
        assert_eq!(stats.failed(), 1);
        assert_eq!(stats.total(), 3);
    }
}
