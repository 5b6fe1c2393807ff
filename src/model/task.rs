//! Crawl job context handed to the downloader alongside each request.

use super::Site;

/// A crawl job that owns the [`Site`] its requests belong to.
///
/// The scheduler owns tasks; the downloader only borrows one per call. The
/// site is optional at the type level so that a misconfigured task is caught
/// by the downloader's argument check instead of at construction time.
pub trait Task: Send + Sync {
    /// Stable identifier of the crawl job.
    fn uuid(&self) -> &str;

    /// Site configuration, if the task has one.
    fn site(&self) -> Option<&Site>;
}

/// Plain [`Task`] implementation for callers without their own job type.
#[derive(Debug, Clone)]
pub struct CrawlTask {
    uuid: String,
    site: Option<Site>,
}

impl CrawlTask {
    #[must_use]
    pub fn new(uuid: impl Into<String>, site: Site) -> Self {
        Self {
            uuid: uuid.into(),
            site: Some(site),
        }
    }

    /// Creates a task identified by its site's domain.
    #[must_use]
    pub fn for_site(site: Site) -> Self {
        let uuid = if site.domain().is_empty() {
            "default".to_string()
        } else {
            site.domain().to_string()
        };
        Self::new(uuid, site)
    }

    /// Creates a task whose site domain is the host of `url`.
    ///
    /// Unparseable URLs produce a site with an empty domain.
    #[must_use]
    pub fn for_url(url: &str) -> Self {
        let domain = url::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_lowercase))
            .unwrap_or_default();
        Self::for_site(Site::new(domain))
    }

    /// Creates a task with no site, which the downloader rejects.
    #[must_use]
    pub fn without_site(uuid: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            site: None,
        }
    }
}

impl Task for CrawlTask {
    fn uuid(&self) -> &str {
        &self.uuid
    }

    fn site(&self) -> Option<&Site> {
        self.site.as_ref()
    }
}
