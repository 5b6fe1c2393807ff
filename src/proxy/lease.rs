//! Scoped proxy borrowing.

use tracing::debug;

use super::{Proxy, ProxyOutcome, ProxyProvider};
use crate::model::Task;

/// A proxy borrowed from a [`ProxyProvider`] for one download attempt.
///
/// Dropping the lease releases the proxy. Because release lives in `Drop`,
/// it runs exactly once whether the attempt returns normally, bails out with
/// `?`, panics, or the download future is dropped mid-flight.
pub(crate) struct ProxyLease<'a> {
    provider: Option<&'a dyn ProxyProvider>,
    task: &'a dyn Task,
    proxy: Option<Proxy>,
    outcome: Option<ProxyOutcome>,
}

impl<'a> ProxyLease<'a> {
    /// Acquires a proxy from `provider`, if one is configured and has a proxy to give.
    pub(crate) fn acquire(provider: Option<&'a dyn ProxyProvider>, task: &'a dyn Task) -> Self {
        let proxy = provider.and_then(|provider| provider.acquire(task));
        if let Some(proxy) = &proxy {
            debug!(proxy = %proxy, task = task.uuid(), "acquired proxy");
        }
        Self {
            provider,
            task,
            proxy,
            outcome: None,
        }
    }

    pub(crate) fn proxy(&self) -> Option<&Proxy> {
        self.proxy.as_ref()
    }

    /// Records what the transport observed; passed to the provider on release.
    pub(crate) fn record(&mut self, outcome: ProxyOutcome) {
        self.outcome = Some(outcome);
    }
}

impl Drop for ProxyLease<'_> {
    fn drop(&mut self) {
        if let (Some(provider), Some(proxy)) = (self.provider, self.proxy.take()) {
            debug!(proxy = %proxy, task = self.task.uuid(), "releasing proxy");
            provider.release(proxy, self.outcome.as_ref(), self.task);
        }
    }
}
