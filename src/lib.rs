//! Crawl Downloader Core Library
//!
//! This library provides the download stage of a web crawler: it turns a
//! [`Request`] into a [`Response`] carrying either a decoded [`Page`] or a raw
//! binary payload, while reusing one HTTP client per target host, rotating
//! proxies through a pluggable [`ProxyProvider`], and resolving page charsets.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`model`] - Requests, sites, tasks, pages and responses
//! - [`charset`] - Charset resolution and byte-level sniffing
//! - [`proxy`] - Proxy type, provider contract and scoped proxy leases
//! - [`download`] - Client pool, content strategies and the downloader facade

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod charset;
pub mod download;
pub mod model;
pub mod proxy;
mod user_agent;

// Re-export commonly used types
pub use charset::{PLATFORM_DEFAULT_CHARSET, detect_charset, resolve_charset};
pub use download::{
    ClientPool, ConfigError, DEFAULT_POOL_SIZE, DownloadError, DownloadListener, DownloadStats,
    Downloader, DownloaderConfig, HttpClientDownloader, HttpRequestConverter, ProcessStrategy,
    RequestConverter, StrategyRegistry,
};
pub use model::{CrawlTask, Page, Request, RequestBody, ResourceType, Response, Site, Task};
pub use proxy::{Proxy, ProxyOutcome, ProxyProvider, RoundRobinProxyProvider};
