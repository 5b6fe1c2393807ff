//! The downloader facade.
//!
//! [`HttpClientDownloader`] ties the pieces together for one attempt:
//!
//! 1. validate the task and its site (the only error returned to callers)
//! 2. get the host's pooled client and a connection slot
//! 3. borrow a proxy from the provider, if one is configured
//! 4. build and send the transport request
//! 5. hand the response to the strategy for the request's resource type
//! 6. release the proxy and the connection slot on every exit path
//!
//! Transport failures never surface as errors: they are counted, logged, and
//! returned as a [`Response`] carrying a failed [`Page`](crate::Page).

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use super::client_pool::{ClientPool, HostClient};
use super::config::{ConfigError, DownloaderConfig};
use super::converter::{HttpRequestConverter, RequestConverter};
use super::error::DownloadError;
use super::stats::{DownloadListener, DownloadStats};
use super::strategy::{ProcessContext, ProcessStrategy, StrategyRegistry};
use crate::model::{Request, ResourceType, Response, Site, Task};
use crate::proxy::{Proxy, ProxyLease, ProxyOutcome, ProxyProvider};

/// Something that can download a [`Request`] for a [`Task`].
///
/// # Object Safety
///
/// This trait uses `async_trait` so schedulers can hold `Arc<dyn Downloader>`
/// and tests can substitute canned downloaders.
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Downloads `request` in the context of `task`.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::InvalidArgument`] when `task` or its site is
    /// absent. Download failures are reported inside the returned
    /// [`Response`], never as errors.
    async fn download(
        &self,
        request: &Request,
        task: Option<&dyn Task>,
    ) -> Result<Response, DownloadError>;

    /// Applies the scheduler's worker count as the per-host connection hint.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPoolSize`] when `threads` is out of range.
    fn set_thread(&self, threads: usize) -> Result<(), ConfigError>;
}

/// HTTP downloader with per-host client pooling and optional proxy rotation.
///
/// Designed to be created once per crawl and shared (via `Arc`) by every
/// worker task.
///
/// # Example
///
/// ```no_run
/// use crawl_downloader::{CrawlTask, Downloader, HttpClientDownloader, Request, Site};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let downloader = HttpClientDownloader::default();
/// let task = CrawlTask::for_site(Site::new("example.com").with_charset("UTF-8"));
/// let response = downloader
///     .download(&Request::new("https://example.com/"), Some(&task))
///     .await?;
/// if let Some(page) = response.page().filter(|p| p.is_download_success()) {
///     println!("{}", page.raw_text().unwrap_or_default());
/// }
/// # Ok(())
/// # }
/// ```
pub struct HttpClientDownloader {
    pool: ClientPool,
    converter: Arc<dyn RequestConverter>,
    proxy_provider: Option<Arc<dyn ProxyProvider>>,
    strategies: StrategyRegistry,
    capture_headers: bool,
    stats: Arc<DownloadStats>,
    listener: Option<Arc<dyn DownloadListener>>,
}

impl Default for HttpClientDownloader {
    fn default() -> Self {
        Self::new(DownloaderConfig::default())
    }
}

impl HttpClientDownloader {
    /// Creates a downloader with the default converter and strategies and no proxies.
    #[must_use]
    pub fn new(config: DownloaderConfig) -> Self {
        Self {
            pool: ClientPool::new(config.pool_size()),
            converter: Arc::new(HttpRequestConverter),
            proxy_provider: None,
            strategies: StrategyRegistry::new(),
            capture_headers: config.capture_headers(),
            stats: Arc::new(DownloadStats::new()),
            listener: None,
        }
    }

    /// Routes requests through proxies from `provider`.
    #[must_use]
    pub fn with_proxy_provider(mut self, provider: Arc<dyn ProxyProvider>) -> Self {
        self.proxy_provider = Some(provider);
        self
    }

    /// Replaces the request converter.
    #[must_use]
    pub fn with_request_converter(mut self, converter: Arc<dyn RequestConverter>) -> Self {
        self.converter = converter;
        self
    }

    /// Replaces the strategy used for `resource_type`.
    #[must_use]
    pub fn with_strategy(
        mut self,
        resource_type: ResourceType,
        strategy: Arc<dyn ProcessStrategy>,
    ) -> Self {
        self.strategies.register(resource_type, strategy);
        self
    }

    /// Notifies `listener` after every attempt.
    #[must_use]
    pub fn with_listener(mut self, listener: Arc<dyn DownloadListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Records outcomes into a shared stats tracker instead of a private one.
    #[must_use]
    pub fn with_stats(mut self, stats: Arc<DownloadStats>) -> Self {
        self.stats = stats;
        self
    }

    /// The per-host client pool.
    #[must_use]
    pub fn pool(&self) -> &ClientPool {
        &self.pool
    }

    /// Success and failure counters.
    #[must_use]
    pub fn stats(&self) -> &Arc<DownloadStats> {
        &self.stats
    }

    #[must_use]
    pub fn capture_headers(&self) -> bool {
        self.capture_headers
    }

    /// Closes all pooled clients.
    pub fn close(&self) {
        self.pool.close();
    }

    async fn attempt(
        &self,
        host: &HostClient,
        request: &Request,
        site: &Site,
        task: &dyn Task,
    ) -> Response {
        let mut lease = ProxyLease::acquire(self.proxy_provider.as_deref(), task);

        let raw = match self.execute(host, request, site, lease.proxy()).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(url = request.url(), error = %e, "download failed");
                self.record_error(request);
                return Response::failed(request.clone());
            }
        };
        lease.record(ProxyOutcome::new(raw.status().as_u16()));

        let ctx = ProcessContext {
            request,
            site,
            capture_headers: self.capture_headers,
        };
        let response = self
            .strategies
            .get(request.resource_type())
            .process(ctx, raw)
            .await;
        self.record_success(request);
        info!(url = request.url(), "download succeeded");
        response
    }

    async fn execute(
        &self,
        host: &HostClient,
        request: &Request,
        site: &Site,
        proxy: Option<&Proxy>,
    ) -> Result<reqwest::Response, DownloadError> {
        let client = self.pool.client_for(host, proxy)?;
        self.converter
            .convert(&client, request, site)?
            .send()
            .await
            .map_err(|e| DownloadError::transport(request.url(), e))
    }

    fn record_success(&self, request: &Request) {
        self.stats.increment_succeeded();
        if let Some(listener) = &self.listener {
            listener.on_success(request);
        }
    }

    fn record_error(&self, request: &Request) {
        self.stats.increment_failed();
        if let Some(listener) = &self.listener {
            listener.on_error(request);
        }
    }
}

#[async_trait]
impl Downloader for HttpClientDownloader {
    #[instrument(skip_all, fields(url = %request.url(), resource_type = ?request.resource_type()))]
    async fn download(
        &self,
        request: &Request,
        task: Option<&dyn Task>,
    ) -> Result<Response, DownloadError> {
        let task = task.ok_or_else(|| DownloadError::invalid_argument("task can not be absent"))?;
        let site = task
            .site()
            .ok_or_else(|| DownloadError::invalid_argument("site can not be absent"))?;

        let host = self.pool.get(Some(site))?;
        // Held until the body has been consumed; released on every exit path.
        let _slot = match host.acquire_slot(request.url()).await {
            Ok(slot) => slot,
            Err(e) => {
                warn!(url = request.url(), error = %e, "download failed");
                self.record_error(request);
                return Ok(Response::failed(request.clone()));
            }
        };

        Ok(self.attempt(&host, request, site, task).await)
    }

    fn set_thread(&self, threads: usize) -> Result<(), ConfigError> {
        self.pool.set_pool_size(threads)
    }
}

impl std::fmt::Debug for HttpClientDownloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClientDownloader")
            .field("pool", &self.pool)
            .field("proxy_provider", &self.proxy_provider.is_some())
            .field("capture_headers", &self.capture_headers)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::download::constants::DEFAULT_POOL_SIZE;
    use crate::model::CrawlTask;

    #[tokio::test]
    async fn test_missing_task_is_invalid_argument() {
        let downloader = HttpClientDownloader::default();
        let result = downloader
            .download(&Request::new("http://127.0.0.1:1/"), None)
            .await;
        assert!(matches!(result, Err(DownloadError::InvalidArgument { .. })));
        assert_eq!(downloader.stats().total(), 0);
        assert!(downloader.pool().is_empty(), "no client may be built");
    }

    #[tokio::test]
    async fn test_missing_site_is_invalid_argument() {
        let downloader = HttpClientDownloader::default();
        let task = CrawlTask::without_site("job");
        let result = downloader
            .download(&Request::new("http://127.0.0.1:1/"), Some(&task))
            .await;
        let err = result.unwrap_err();
        assert!(err.is_invalid_argument());
        assert!(err.to_string().contains("site"));
        assert!(downloader.pool().is_empty());
    }

    #[tokio::test]
    async fn test_unparseable_url_yields_failed_page() {
        let downloader = HttpClientDownloader::default();
        let task = CrawlTask::for_site(Site::new("example.com"));
        let response = downloader
            .download(&Request::new("::not a url::"), Some(&task))
            .await
            .unwrap();
        assert!(!response.page().unwrap().is_download_success());
        assert_eq!(downloader.stats().failed(), 1);
    }

    #[test]
    fn test_set_thread_validates_and_updates_pool() {
        let downloader = HttpClientDownloader::default();
        downloader.set_thread(3).unwrap();
        assert_eq!(downloader.pool().pool_size(), 3);
        assert!(downloader.set_thread(0).is_err());
        assert_eq!(downloader.pool().pool_size(), 3);
    }

    #[tokio::test]
    async fn test_set_thread_resizes_already_pooled_host() {
        let downloader = HttpClientDownloader::default();
        let task = CrawlTask::for_site(Site::new("example.com"));
        downloader
            .download(&Request::new("::not a url::"), Some(&task))
            .await
            .unwrap();
        let host = downloader.pool().get(task.site()).unwrap();
        assert_eq!(host.max_connections(), DEFAULT_POOL_SIZE);

        downloader.set_thread(3).unwrap();
        assert_eq!(host.max_connections(), 3);
        assert_eq!(host.available_connections(), 3);
    }
}
