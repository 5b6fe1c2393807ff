//! Data model shared between the crawler and the download stage.
//!
//! - [`Request`] - one URL plus the metadata needed to fetch it
//! - [`Site`] - per-host configuration (domain, default charset, client settings)
//! - [`Task`] - a crawl job that owns a [`Site`]
//! - [`Page`] - the decoded result of a document fetch
//! - [`Response`] - the always-present outcome of one download attempt

mod page;
mod request;
mod site;
mod task;

pub use page::{Page, Response};
pub use request::{Request, RequestBody, ResourceType};
pub use site::Site;
pub use task::{CrawlTask, Task};
