//! Content strategies: turning a raw transport response into a [`Response`].
//!
//! Each [`ResourceType`] maps to one [`ProcessStrategy`] in a
//! [`StrategyRegistry`] owned by the downloader:
//!
//! - [`BinaryStrategy`] keeps the body as bytes
//! - [`PageStrategy`] resolves a charset and decodes the body into a [`Page`]
//!
//! Both take the transport response by value, so the body is consumed exactly
//! once and the connection is released when the strategy returns.
//!
//! The two strategies report body-read failures differently. A page fetch
//! returns a fresh failure-marker page (the URL and status captured before the
//! failure are not kept); a binary fetch returns an empty payload and nothing
//! else. Callers check `Page::is_download_success` on the document path and
//! the payload on the binary path.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap};
use tracing::{debug, error, warn};

use crate::charset::{PLATFORM_DEFAULT_CHARSET, resolve_charset};
use crate::model::{Page, Request, ResourceType, Response, Site};

/// Per-attempt inputs shared by every strategy.
#[derive(Debug, Clone, Copy)]
pub struct ProcessContext<'a> {
    /// The request being downloaded.
    pub request: &'a Request,
    /// The site the request belongs to.
    pub site: &'a Site,
    /// Whether to snapshot response headers into the page.
    pub capture_headers: bool,
}

/// Converts a transport response into a [`Response`].
///
/// Implementations must never fail: read errors are logged and encoded in
/// the returned value.
///
/// # Object Safety
///
/// This trait uses `async_trait` to support dynamic dispatch via
/// `Arc<dyn ProcessStrategy>` in the registry.
#[async_trait]
pub trait ProcessStrategy: Send + Sync {
    /// Consumes `raw` and produces the response for `ctx.request`.
    async fn process(&self, ctx: ProcessContext<'_>, raw: reqwest::Response) -> Response;
}

/// Keeps the body as raw bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryStrategy;

#[async_trait]
impl ProcessStrategy for BinaryStrategy {
    async fn process(&self, ctx: ProcessContext<'_>, raw: reqwest::Response) -> Response {
        match raw.bytes().await {
            Ok(bytes) => Response::binary(ctx.request.clone(), bytes),
            Err(e) => {
                error!(url = ctx.request.url(), error = %e, "failed to read binary body");
                Response::new(ctx.request.clone())
            }
        }
    }
}

/// Decodes the body into a [`Page`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PageStrategy;

#[async_trait]
impl ProcessStrategy for PageStrategy {
    async fn process(&self, ctx: ProcessContext<'_>, raw: reqwest::Response) -> Response {
        let request = ctx.request;
        let mut page = Page::started(request, raw.status().as_u16());
        let content_type = raw
            .headers()
            .get(CONTENT_TYPE)
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
            .unwrap_or_default();
        // Taken before the body read consumes the response.
        let headers = ctx.capture_headers.then(|| snapshot_headers(raw.headers()));

        let bytes = match raw.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(url = request.url(), error = %e, "failed to build page from response");
                return Response::failed(request.clone());
            }
        };

        if !request.is_binary_content() {
            let encoding = resolve_charset(
                request.charset(),
                ctx.site.charset(),
                &content_type,
                &bytes,
            )
            .unwrap_or_else(|| {
                warn!(
                    url = request.url(),
                    charset = PLATFORM_DEFAULT_CHARSET.name(),
                    "charset autodetect failed, using platform default; set a charset on the site"
                );
                PLATFORM_DEFAULT_CHARSET
            });
            let (text, had_errors) = encoding.decode_with_bom_removal(&bytes);
            if had_errors {
                debug!(
                    url = request.url(),
                    charset = encoding.name(),
                    "malformed sequences replaced while decoding"
                );
            }
            page.set_charset(encoding.name());
            page.set_raw_text(text.into_owned());
        }
        // Shares the buffer with the response.
        page.set_bytes(bytes.clone());
        if let Some(headers) = headers {
            page.set_headers(headers);
        }
        page.mark_success();

        Response::with_page(request.clone(), page, bytes)
    }
}

/// Copies all response headers; repeated names keep every value in order.
fn snapshot_headers(headers: &HeaderMap) -> HashMap<String, Vec<String>> {
    let mut snapshot: HashMap<String, Vec<String>> = HashMap::with_capacity(headers.keys_len());
    for (name, value) in headers {
        snapshot
            .entry(name.as_str().to_string())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    snapshot
}

/// Dispatch table from [`ResourceType`] to strategy.
///
/// Built per downloader; both resource types always have a strategy, so
/// lookups cannot miss.
#[derive(Clone)]
pub struct StrategyRegistry {
    html: Arc<dyn ProcessStrategy>,
    binary: Arc<dyn ProcessStrategy>,
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self {
            html: Arc::new(PageStrategy),
            binary: Arc::new(BinaryStrategy),
        }
    }
}

impl StrategyRegistry {
    /// Creates a registry with the built-in strategies.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the strategy for `resource_type`.
    pub fn register(&mut self, resource_type: ResourceType, strategy: Arc<dyn ProcessStrategy>) {
        debug!(?resource_type, "registering content strategy");
        match resource_type {
            ResourceType::Html => self.html = strategy,
            ResourceType::Binary => self.binary = strategy,
        }
    }

    /// Returns the strategy for `resource_type`.
    #[must_use]
    pub fn get(&self, resource_type: ResourceType) -> &dyn ProcessStrategy {
        match resource_type {
            ResourceType::Html => self.html.as_ref(),
            ResourceType::Binary => self.binary.as_ref(),
        }
    }
}

impl std::fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyRegistry").finish_non_exhaustive()
    }
}
