//! Download outcomes: decoded pages and the responses wrapping them.

use std::collections::HashMap;

use bytes::Bytes;
use serde::Serialize;

use super::Request;

/// Decoded representation of a fetched document.
///
/// A page is built fresh for every attempt. `download_success` only becomes
/// `true` once the body has been read, decoded and (optionally) its headers
/// captured; [`Page::fail`] produces the bare failure marker.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Page {
    url: Option<String>,
    status_code: Option<u16>,
    charset: Option<String>,
    raw_text: Option<String>,
    #[serde(skip)]
    bytes: Bytes,
    headers: Option<HashMap<String, Vec<String>>>,
    download_success: bool,
    #[serde(skip)]
    request: Option<Request>,
}

impl Page {
    /// Creates the failure marker: no URL, no status, no body.
    #[must_use]
    pub fn fail() -> Self {
        Self::default()
    }

    /// Starts a page for `request`, recording its URL and the response status.
    #[must_use]
    pub(crate) fn started(request: &Request, status_code: u16) -> Self {
        Self {
            url: Some(request.url().to_string()),
            status_code: Some(status_code),
            request: Some(request.clone()),
            ..Self::default()
        }
    }

    pub(crate) fn set_bytes(&mut self, bytes: Bytes) {
        self.bytes = bytes;
    }

    pub(crate) fn set_charset(&mut self, charset: impl Into<String>) {
        self.charset = Some(charset.into());
    }

    pub(crate) fn set_raw_text(&mut self, raw_text: String) {
        self.raw_text = Some(raw_text);
    }

    pub(crate) fn set_headers(&mut self, headers: HashMap<String, Vec<String>>) {
        self.headers = Some(headers);
    }

    pub(crate) fn mark_success(&mut self) {
        self.download_success = true;
    }

    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        self.status_code
    }

    /// Charset the body was decoded with (canonical encoding name).
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.charset.as_deref()
    }

    /// Decoded text; `None` for binary-content pages and failures.
    #[must_use]
    pub fn raw_text(&self) -> Option<&str> {
        self.raw_text.as_deref()
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Response headers, present only when header capture is enabled.
    #[must_use]
    pub fn headers(&self) -> Option<&HashMap<String, Vec<String>>> {
        self.headers.as_ref()
    }

    #[must_use]
    pub fn is_download_success(&self) -> bool {
        self.download_success
    }

    /// The request this page was fetched for.
    #[must_use]
    pub fn request(&self) -> Option<&Request> {
        self.request.as_ref()
    }
}

/// Outcome of one download attempt.
///
/// Always produced, even on failure. Document fetches carry a [`Page`] whose
/// success flag tells callers whether the attempt worked; binary fetches carry
/// only the payload, which is empty if the body could not be read.
///
/// A document response and its page share one body buffer.
#[derive(Debug, Clone)]
pub struct Response {
    request: Request,
    bytes: Bytes,
    page: Option<Page>,
}

impl Response {
    /// Creates an empty response (no bytes, no page).
    #[must_use]
    pub fn new(request: Request) -> Self {
        Self {
            request,
            bytes: Bytes::new(),
            page: None,
        }
    }

    /// Creates a binary response.
    #[must_use]
    pub fn binary(request: Request, bytes: impl Into<Bytes>) -> Self {
        Self {
            request,
            bytes: bytes.into(),
            page: None,
        }
    }

    /// Creates a document response; `bytes` mirrors the page body.
    #[must_use]
    pub fn with_page(request: Request, page: Page, bytes: impl Into<Bytes>) -> Self {
        Self {
            request,
            bytes: bytes.into(),
            page: Some(page),
        }
    }

    /// Creates a response wrapping the failure marker page.
    #[must_use]
    pub fn failed(request: Request) -> Self {
        Self {
            request,
            bytes: Bytes::new(),
            page: Some(Page::fail()),
        }
    }

    #[must_use]
    pub fn request(&self) -> &Request {
        &self.request
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub fn page(&self) -> Option<&Page> {
        self.page.as_ref()
    }

    /// Consumes the response, returning the page if there is one.
    #[must_use]
    pub fn into_page(self) -> Option<Page> {
        self.page
    }
}
