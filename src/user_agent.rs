//! Default User-Agent string for crawler HTTP clients.
//!
//! Used whenever a [`Site`](crate::Site) does not configure its own agent.

/// Project URL for User-Agent identification (good citizenship; RFC 9308).
const PROJECT_UA_URL: &str = "https://github.com/fierce/crawl-downloader";

/// Default User-Agent for crawl requests (identifies the tool).
#[must_use]
pub(crate) fn default_crawl_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("crawl-downloader/{version} (web-crawler; +{PROJECT_UA_URL})")
}
