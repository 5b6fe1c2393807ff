//! Charset resolution for downloaded documents.
//!
//! Resolution is a pure function of its inputs and follows a fixed priority:
//!
//! 1. the request's explicit charset override
//! 2. the site's default charset
//! 3. the `charset` parameter of the `Content-Type` header
//! 4. byte-level sniffing of the body: byte-order mark, `<meta>` prescan,
//!    then statistical detection
//!
//! When every step yields nothing, [`resolve_charset`] returns `None` and the
//! caller falls back to [`PLATFORM_DEFAULT_CHARSET`]. Labels that do not name
//! a known encoding are skipped and resolution continues down the chain.
//!
//! # Example
//!
//! ```
//! use crawl_downloader::resolve_charset;
//!
//! let encoding = resolve_charset(None, Some("GBK"), "text/html; charset=utf-8", b"");
//! assert_eq!(encoding.map(|e| e.name()), Some("GBK"));
//! ```

use std::sync::LazyLock;

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};
use regex::bytes::Regex;
use tracing::{debug, trace};

/// Encoding used when nothing else identifies the charset.
pub const PLATFORM_DEFAULT_CHARSET: &Encoding = UTF_8;

/// How many leading bytes the `<meta>` prescan inspects.
const META_PRESCAN_LIMIT: usize = 1024;

/// Matches `<meta charset="x">` and `<meta http-equiv=... content="...; charset=x">`.
#[allow(clippy::expect_used)]
static META_CHARSET_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i-u)<meta\s[^>]*?charset\s*=\s*["']?\s*([a-z0-9_\-:.]+)"#)
        .expect("meta charset regex is valid") // Static pattern, safe to panic
});

/// Resolves the charset for a document body.
///
/// `overrides` is the per-request charset, `site_default` the site-wide one,
/// `content_type` the raw `Content-Type` header value (empty when absent).
#[must_use]
pub fn resolve_charset(
    overrides: Option<&str>,
    site_default: Option<&str>,
    content_type: &str,
    bytes: &[u8],
) -> Option<&'static Encoding> {
    if let Some(encoding) = overrides.and_then(|label| lookup_label(label, "request")) {
        return Some(encoding);
    }
    if let Some(encoding) = site_default.and_then(|label| lookup_label(label, "site")) {
        return Some(encoding);
    }
    detect_charset(content_type, bytes)
}

/// Sniffs the charset from the `Content-Type` header, then from the body bytes.
#[must_use]
pub fn detect_charset(content_type: &str, bytes: &[u8]) -> Option<&'static Encoding> {
    charset_from_content_type(content_type).or_else(|| charset_from_bytes(bytes))
}

fn lookup_label(label: &str, source: &'static str) -> Option<&'static Encoding> {
    let encoding = Encoding::for_label(label.trim().as_bytes());
    if encoding.is_none() {
        debug!(label, source, "unknown charset label, continuing resolution");
    }
    encoding
}

/// Extracts the `charset` parameter from a `Content-Type` value.
fn charset_from_content_type(content_type: &str) -> Option<&'static Encoding> {
    content_type
        .split(';')
        .skip(1)
        .filter_map(|param| param.split_once('='))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("charset"))
        .map(|(_, value)| value.trim().trim_matches(|c| c == '"' || c == '\''))
        .filter(|value| !value.is_empty())
        .and_then(|value| lookup_label(value, "content-type"))
}

fn charset_from_bytes(bytes: &[u8]) -> Option<&'static Encoding> {
    if bytes.is_empty() {
        return None;
    }
    if let Some((encoding, _bom_len)) = Encoding::for_bom(bytes) {
        trace!(charset = encoding.name(), "charset from byte-order mark");
        return Some(encoding);
    }
    if let Some(encoding) = charset_from_meta(bytes) {
        trace!(charset = encoding.name(), "charset from meta tag");
        return Some(encoding);
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let encoding = detector.guess(None, true);
    trace!(charset = encoding.name(), "charset from statistical detection");
    Some(encoding)
}

fn charset_from_meta(bytes: &[u8]) -> Option<&'static Encoding> {
    let head = &bytes[..bytes.len().min(META_PRESCAN_LIMIT)];
    let captures = META_CHARSET_PATTERN.captures(head)?;
    let label = captures.get(1)?.as_bytes();
    Encoding::for_label(label)
}
