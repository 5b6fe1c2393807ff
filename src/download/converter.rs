//! Turning a crawl [`Request`] into a transport request.

use reqwest::header::{CONTENT_TYPE, COOKIE, HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use reqwest::{Client, Method, RequestBuilder};
use url::Url;

use super::error::DownloadError;
use crate::model::{Request, Site};

/// Builds the transport request for one download attempt.
///
/// The client passed in is already bound to the attempt's proxy, if any, so
/// implementations only shape the request itself. A proxy-bound client is
/// shared by every site using that proxy, so per-site settings belong on the
/// request rather than on the client. Replace the default
/// [`HttpRequestConverter`] to add signing, custom auth or extra headers.
pub trait RequestConverter: Send + Sync {
    /// Converts `request` for `site` into a request on `client`.
    ///
    /// # Errors
    ///
    /// Returns an error when the request cannot be expressed over HTTP; the
    /// downloader reports it as a failed attempt.
    fn convert(
        &self,
        client: &Client,
        request: &Request,
        site: &Site,
    ) -> Result<RequestBuilder, DownloadError>;
}

/// Default converter.
///
/// - method from the request (`GET` unless set), upper-cased
/// - site user agent and timeout
/// - site headers, overridden by request headers of the same name
/// - one `Cookie` header from site cookies, overridden by request cookies
/// - request body with its content type
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpRequestConverter;

impl RequestConverter for HttpRequestConverter {
    fn convert(
        &self,
        client: &Client,
        request: &Request,
        site: &Site,
    ) -> Result<RequestBuilder, DownloadError> {
        let url = Url::parse(request.url())
            .map_err(|e| DownloadError::invalid_request(request.url(), e.to_string()))?;
        let method = request.method().to_ascii_uppercase();
        let method = Method::from_bytes(method.as_bytes()).map_err(|_| {
            DownloadError::invalid_request(
                request.url(),
                format!("unsupported method '{}'", request.method()),
            )
        })?;

        let mut headers = merge_headers(request, site)?;
        if let Some(cookie) = cookie_header(request, site)? {
            headers.insert(COOKIE, cookie);
        }

        let mut builder = client.request(method, url).headers(headers);
        if let Some(timeout) = site.timeout() {
            builder = builder.timeout(timeout);
        }
        if let Some(body) = request.body() {
            builder = builder
                .header(CONTENT_TYPE, body.content_type.as_str())
                .body(body.content.clone());
        }
        Ok(builder)
    }
}

fn merge_headers(request: &Request, site: &Site) -> Result<HeaderMap, DownloadError> {
    let mut headers = HeaderMap::new();
    if let Some(agent) = site.user_agent() {
        let value = HeaderValue::from_str(agent)
            .map_err(|_| DownloadError::invalid_header(site.domain(), "User-Agent"))?;
        headers.insert(USER_AGENT, value);
    }
    // Request headers come second so they replace site defaults.
    for (name, value) in site.headers().iter().chain(request.headers()) {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| DownloadError::invalid_header(site.domain(), name))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|_| DownloadError::invalid_header(site.domain(), name))?;
        headers.insert(header_name, header_value);
    }
    Ok(headers)
}

fn cookie_header(request: &Request, site: &Site) -> Result<Option<HeaderValue>, DownloadError> {
    let mut cookies = site.cookies().clone();
    cookies.extend(
        request
            .cookies()
            .iter()
            .map(|(name, value)| (name.clone(), value.clone())),
    );
    if cookies.is_empty() {
        return Ok(None);
    }
    let joined = cookies
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("; ");
    HeaderValue::from_str(&joined)
        .map(Some)
        .map_err(|_| DownloadError::invalid_header(site.domain(), "Cookie"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::RequestBody;

    fn convert(request: &Request, site: &Site) -> reqwest::Request {
        HttpRequestConverter
            .convert(&Client::new(), request, site)
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn test_get_request_defaults() {
        let built = convert(&Request::new("https://example.com/a"), &Site::new("example.com"));
        assert_eq!(built.method(), Method::GET);
        assert_eq!(built.url().as_str(), "https://example.com/a");
        assert!(built.headers().get(COOKIE).is_none());
        assert!(built.body().is_none());
    }

    #[test]
    fn test_request_headers_override_site_headers() {
        let site = Site::new("example.com")
            .with_header("Accept", "text/html")
            .with_header("X-Site", "1");
        let request = Request::new("https://example.com/").with_header("accept", "application/json");
        let built = convert(&request, &site);
        assert_eq!(built.headers()["accept"], "application/json");
        assert_eq!(built.headers()["x-site"], "1");
    }

    #[test]
    fn test_cookies_are_merged_into_one_header() {
        let site = Site::new("example.com")
            .with_cookie("session", "site")
            .with_cookie("lang", "en");
        let request = Request::new("https://example.com/").with_cookie("session", "req");
        let built = convert(&request, &site);
        assert_eq!(built.headers()[COOKIE], "lang=en; session=req");
    }

    #[test]
    fn test_post_body_and_content_type() {
        let request = Request::new("https://example.com/search")
            .with_method("post")
            .with_body(RequestBody::json(r#"{"q":"rust"}"#));
        let built = convert(&request, &Site::new("example.com"));
        assert_eq!(built.method(), Method::POST);
        assert_eq!(built.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(
            built.body().and_then(reqwest::Body::as_bytes),
            Some(br#"{"q":"rust"}"#.as_slice())
        );
    }

    #[test]
    fn test_method_is_upper_cased_whatever_its_source() {
        let request: Request =
            serde_json::from_str(r#"{"url":"https://example.com/","method":"patch"}"#).unwrap();
        let built = convert(&request, &Site::new("example.com"));
        assert_eq!(built.method(), Method::PATCH);
        assert_eq!(built.method().as_str(), "PATCH");
    }

    #[test]
    fn test_site_agent_and_timeout_travel_on_the_request() {
        let site = Site::new("example.com")
            .with_user_agent("site-bot/1.0")
            .with_timeout(std::time::Duration::from_secs(7));
        let built = convert(&Request::new("https://example.com/"), &site);
        assert_eq!(built.headers()[USER_AGENT], "site-bot/1.0");
        assert_eq!(built.timeout(), Some(&std::time::Duration::from_secs(7)));
    }

    #[test]
    fn test_request_header_overrides_site_agent() {
        let site = Site::new("example.com").with_user_agent("site-bot/1.0");
        let request = Request::new("https://example.com/").with_header("User-Agent", "req-bot/2.0");
        let built = convert(&request, &site);
        assert_eq!(built.headers()[USER_AGENT], "req-bot/2.0");
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        let result = HttpRequestConverter.convert(
            &Client::new(),
            &Request::new("/relative/path"),
            &Site::new("example.com"),
        );
        assert!(matches!(result, Err(DownloadError::InvalidRequest { .. })));
    }

    #[test]
    fn test_invalid_header_is_rejected() {
        let site = Site::new("example.com").with_header("bad header", "x");
        let result =
            HttpRequestConverter.convert(&Client::new(), &Request::new("https://example.com/"), &site);
        assert!(matches!(result, Err(DownloadError::InvalidHeader { .. })));
    }

    #[test]
    fn test_invalid_method_is_rejected() {
        let request = Request::new("https://example.com/").with_method("GE T");
        let result = HttpRequestConverter.convert(&Client::new(), &request, &Site::new("example.com"));
        assert!(matches!(result, Err(DownloadError::InvalidRequest { .. })));
    }
}
