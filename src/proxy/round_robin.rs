//! Fixed-list proxy rotation.

use std::sync::atomic::{AtomicUsize, Ordering};

use super::{Proxy, ProxyOutcome, ProxyProvider};
use crate::model::Task;

/// Hands out proxies from a fixed list in rotation.
///
/// Release is a no-op: every proxy stays in rotation regardless of outcome.
#[derive(Debug)]
pub struct RoundRobinProxyProvider {
    proxies: Vec<Proxy>,
    cursor: AtomicUsize,
}

impl RoundRobinProxyProvider {
    #[must_use]
    pub fn new(proxies: Vec<Proxy>) -> Self {
        Self {
            proxies,
            cursor: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }
}

impl ProxyProvider for RoundRobinProxyProvider {
    fn acquire(&self, _task: &dyn Task) -> Option<Proxy> {
        if self.proxies.is_empty() {
            return None;
        }
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.proxies.len();
        self.proxies.get(index).cloned()
    }

    fn release(&self, _proxy: Proxy, _outcome: Option<&ProxyOutcome>, _task: &dyn Task) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CrawlTask;

    #[test]
    fn test_rotates_through_all_proxies() {
        let provider =
            RoundRobinProxyProvider::new(vec![Proxy::new("a", 1), Proxy::new("b", 2)]);
        let task = CrawlTask::for_url("https://example.com/");
        let picked: Vec<String> = (0..4)
            .filter_map(|_| provider.acquire(&task))
            .map(|p| p.host().to_string())
            .collect();
        assert_eq!(picked, ["a", "b", "a", "b"]);
    }

    #[test]
    fn test_empty_provider_goes_direct() {
        let provider = RoundRobinProxyProvider::new(Vec::new());
        let task = CrawlTask::for_url("https://example.com/");
        assert!(provider.is_empty());
        assert!(provider.acquire(&task).is_none());
    }
}
