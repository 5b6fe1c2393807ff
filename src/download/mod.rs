//! Download stage: per-host client pooling, content strategies and the
//! downloader facade.
//!
//! # Features
//!
//! - One pooled HTTP client per target host, built at most once under contention
//! - Per-host connection bound (backpressure) from the pool-size hint
//! - Optional proxy rotation with guaranteed release
//! - Document and binary content strategies behind a registry
//! - Charset resolution for documents (request > site > headers > bytes > default)
//! - Failures returned as responses, never as errors
//!
//! # Example
//!
//! ```no_run
//! use crawl_downloader::download::{Downloader, DownloaderConfig, HttpClientDownloader};
//! use crawl_downloader::{CrawlTask, Request, ResourceType};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let downloader = HttpClientDownloader::new(DownloaderConfig::new(4)?);
//! let request = Request::new("https://example.com/logo.png")
//!     .with_resource_type(ResourceType::Binary);
//! let task = CrawlTask::for_url(request.url());
//! let response = downloader.download(&request, Some(&task)).await?;
//! println!("{} bytes", response.bytes().len());
//! # Ok(())
//! # }
//! ```

mod client_pool;
mod config;
mod constants;
mod converter;
mod downloader;
mod error;
mod stats;
pub mod strategy;

pub use client_pool::{ClientPool, HostClient};
pub use config::{ConfigError, DownloaderConfig, validate_pool_size};
pub use constants::{
    CONNECT_TIMEOUT_SECS, DEFAULT_POOL_SIZE, MAX_PROXIED_CLIENTS, READ_TIMEOUT_SECS,
};
pub use converter::{HttpRequestConverter, RequestConverter};
pub use downloader::{Downloader, HttpClientDownloader};
pub use error::DownloadError;
pub use stats::{DownloadListener, DownloadStats};
pub use strategy::{
    BinaryStrategy, PageStrategy, ProcessContext, ProcessStrategy, StrategyRegistry,
};

// Note: we do NOT define module-local Result aliases.
// Use `Result<T, DownloadError>` explicitly in function signatures.
