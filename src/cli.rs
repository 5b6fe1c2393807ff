//! CLI argument definitions using clap derive macros.

use clap::Parser;

use crawl_downloader::DEFAULT_POOL_SIZE;
use crawl_downloader::proxy::Proxy;

/// Download pages and binary resources the way the crawler does.
///
/// Each URL is fetched once; failures are reported, never retried.
#[derive(Parser, Debug)]
#[command(name = "crawl-downloader")]
#[command(author, version, about)]
pub struct Args {
    /// URLs to download
    #[arg(required = true)]
    pub urls: Vec<String>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Fetch URLs as binary resources instead of documents
    #[arg(short, long)]
    pub binary: bool,

    /// Charset forced on every request (beats everything else)
    #[arg(long)]
    pub charset: Option<String>,

    /// Site-wide default charset
    #[arg(long)]
    pub site_charset: Option<String>,

    /// Maximum concurrent connections per host (1-1000)
    #[arg(short = 'p', long, default_value_t = DEFAULT_POOL_SIZE as u16, value_parser = clap::value_parser!(u16).range(1..=1000))]
    pub pool_size: u16,

    /// Do not copy response headers into pages
    #[arg(long)]
    pub no_headers: bool,

    /// Proxy to rotate through, as [user:password@]host:port (repeatable)
    #[arg(long = "proxy")]
    pub proxies: Vec<Proxy>,

    /// User-Agent sent to every site
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Print one JSON object per URL instead of a text summary
    #[arg(long)]
    pub json: bool,
}
