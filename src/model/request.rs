//! Work items submitted to the downloader.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Kind of resource a request fetches, selecting the content strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    /// Text document (HTML, XML, JSON...) decoded into a [`Page`](super::Page).
    #[default]
    Html,
    /// Raw payload (images, archives...) kept as bytes.
    Binary,
}

/// Body attached to a non-GET request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestBody {
    /// Raw body bytes.
    pub content: Vec<u8>,
    /// Value of the `Content-Type` header sent with the body.
    pub content_type: String,
}

impl RequestBody {
    /// Creates a body with an explicit content type.
    #[must_use]
    pub fn new(content: impl Into<Vec<u8>>, content_type: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            content_type: content_type.into(),
        }
    }

    /// Creates a JSON body.
    #[must_use]
    pub fn json(content: impl Into<Vec<u8>>) -> Self {
        Self::new(content, "application/json")
    }

    /// Creates a `application/x-www-form-urlencoded` body.
    #[must_use]
    pub fn form(content: impl Into<Vec<u8>>) -> Self {
        Self::new(content, "application/x-www-form-urlencoded")
    }
}

/// A single URL-plus-metadata unit submitted for download.
///
/// Requests are built once by the scheduler and never mutated after they are
/// handed to a [`Downloader`](crate::Downloader).
///
/// # Example
///
/// ```
/// use crawl_downloader::{Request, ResourceType};
///
/// let request = Request::new("https://example.com/logo.png")
///     .with_resource_type(ResourceType::Binary);
/// assert_eq!(request.method(), "GET");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    url: String,
    #[serde(default = "default_method", deserialize_with = "upper_case_method")]
    method: String,
    #[serde(default)]
    headers: BTreeMap<String, String>,
    #[serde(default)]
    cookies: BTreeMap<String, String>,
    #[serde(default)]
    body: Option<RequestBody>,
    #[serde(default)]
    resource_type: ResourceType,
    #[serde(default)]
    charset: Option<String>,
    #[serde(default)]
    binary_content: bool,
}

fn default_method() -> String {
    "GET".to_string()
}

fn upper_case_method<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(|method| method.to_ascii_uppercase())
}

impl Request {
    /// Creates a GET request for a document.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: default_method(),
            headers: BTreeMap::new(),
            cookies: BTreeMap::new(),
            body: None,
            resource_type: ResourceType::Html,
            charset: None,
            binary_content: false,
        }
    }

    /// Sets the HTTP method (case-insensitive, stored upper-case).
    #[must_use]
    pub fn with_method(mut self, method: impl AsRef<str>) -> Self {
        self.method = method.as_ref().to_ascii_uppercase();
        self
    }

    /// Adds a request header; overrides a site default header of the same name.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Adds a request cookie; overrides a site cookie of the same name.
    #[must_use]
    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    /// Attaches a request body.
    #[must_use]
    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }

    /// Sets the resource type.
    #[must_use]
    pub fn with_resource_type(mut self, resource_type: ResourceType) -> Self {
        self.resource_type = resource_type;
        self
    }

    /// Forces a charset for this request, taking priority over everything else.
    #[must_use]
    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Some(charset.into());
        self
    }

    /// Marks a document request whose body must not be decoded as text.
    #[must_use]
    pub fn with_binary_content(mut self, binary_content: bool) -> Self {
        self.binary_content = binary_content;
        self
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    #[must_use]
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    #[must_use]
    pub fn cookies(&self) -> &BTreeMap<String, String> {
        &self.cookies
    }

    #[must_use]
    pub fn body(&self) -> Option<&RequestBody> {
        self.body.as_ref()
    }

    #[must_use]
    pub fn resource_type(&self) -> ResourceType {
        self.resource_type
    }

    /// Per-request charset override.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.charset.as_deref()
    }

    #[must_use]
    pub fn is_binary_content(&self) -> bool {
        self.binary_content
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let request = Request::new("https://example.com/");
        assert_eq!(request.url(), "https://example.com/");
        assert_eq!(request.method(), "GET");
        assert_eq!(request.resource_type(), ResourceType::Html);
        assert!(request.charset().is_none());
        assert!(!request.is_binary_content());
        assert!(request.body().is_none());
    }

    #[test]
    fn test_request_method_is_uppercased() {
        let request = Request::new("https://example.com/").with_method("post");
        assert_eq!(request.method(), "POST");
    }

    #[test]
    fn test_request_deserializes_with_defaults() {
        let request: Request =
            serde_json::from_str(r#"{"url":"https://example.com/a.png","resource_type":"binary"}"#)
                .unwrap();
        assert_eq!(request.method(), "GET");
        assert_eq!(request.resource_type(), ResourceType::Binary);
        assert!(request.headers().is_empty());
    }

    #[test]
    fn test_deserialized_method_is_uppercased() {
        let request: Request =
            serde_json::from_str(r#"{"url":"https://example.com/search","method":"post"}"#)
                .unwrap();
        assert_eq!(request.method(), "POST");
    }

    #[test]
    fn test_request_body_helpers_set_content_type() {
        assert_eq!(RequestBody::json("{}").content_type, "application/json");
        assert_eq!(
            RequestBody::form("a=1").content_type,
            "application/x-www-form-urlencoded"
        );
    }
}
