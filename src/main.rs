//! CLI entry point for the crawl downloader.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use crawl_downloader::{
    CrawlTask, DownloadError, Downloader, DownloaderConfig, HttpClientDownloader, Request,
    ResourceType, Response, RoundRobinProxyProvider, Site, Task,
};
use futures_util::future::join_all;
use serde::Serialize;
use tracing::{debug, error, info, warn};

mod cli;

use cli::Args;

/// One line of CLI output.
#[derive(Debug, Serialize)]
struct DownloadSummary<'a> {
    url: &'a str,
    success: bool,
    status_code: Option<u16>,
    charset: Option<&'a str>,
    bytes: usize,
    text_chars: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<'a> DownloadSummary<'a> {
    fn from_response(response: &'a Response) -> Self {
        let page = response.page();
        Self {
            url: response.request().url(),
            // Binary responses carry no page; an empty payload is their only failure signal.
            success: page.map_or(!response.bytes().is_empty(), |p| p.is_download_success()),
            status_code: page.and_then(|p| p.status_code()),
            charset: page.and_then(|p| p.charset()),
            bytes: response.bytes().len(),
            text_chars: page.and_then(|p| p.raw_text()).map(|t| t.chars().count()),
            error: None,
        }
    }

    fn from_error(url: &'a str, error: &DownloadError) -> Self {
        Self {
            url,
            success: false,
            status_code: None,
            charset: None,
            bytes: 0,
            text_chars: None,
            error: Some(error.to_string()),
        }
    }

    fn render(&self, json: bool) -> Result<String> {
        if json {
            return Ok(serde_json::to_string(self)?);
        }
        let mut line = format!(
            "{} {} status={} charset={} bytes={}",
            if self.success { "OK  " } else { "FAIL" },
            self.url,
            self.status_code
                .map_or_else(|| "-".to_string(), |s| s.to_string()),
            self.charset.unwrap_or("-"),
            self.bytes,
        );
        if let Some(error) = &self.error {
            line.push_str(&format!(" error={error}"));
        }
        Ok(line)
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(urls = args.urls.len(), binary = args.binary, "CLI arguments parsed");

    let config = DownloaderConfig::new(usize::from(args.pool_size))?
        .with_capture_headers(!args.no_headers);
    let mut downloader = HttpClientDownloader::new(config);
    if !args.proxies.is_empty() {
        info!(proxies = args.proxies.len(), "rotating through proxies");
        downloader = downloader.with_proxy_provider(Arc::new(RoundRobinProxyProvider::new(
            args.proxies.clone(),
        )));
    }

    let resource_type = if args.binary {
        ResourceType::Binary
    } else {
        ResourceType::Html
    };
    let jobs: Vec<(Request, CrawlTask)> = args
        .urls
        .iter()
        .map(|url| {
            let mut request = Request::new(url).with_resource_type(resource_type);
            if let Some(charset) = &args.charset {
                request = request.with_charset(charset);
            }
            (request, build_task(url, &args))
        })
        .collect();

    let responses = join_all(jobs.iter().map(|(request, task)| {
        let task: &dyn Task = task;
        downloader.download(request, Some(task))
    }))
    .await;

    let stats = downloader.stats();
    info!(
        succeeded = stats.succeeded(),
        failed = stats.failed(),
        "downloads finished"
    );
    downloader.close();

    let mut failures = 0usize;
    for ((request, _), response) in jobs.iter().zip(&responses) {
        let summary = match response {
            Ok(response) => DownloadSummary::from_response(response),
            Err(e) => {
                error!(url = request.url(), error = %e, "download rejected");
                DownloadSummary::from_error(request.url(), e)
            }
        };
        if !summary.success {
            failures += 1;
        }
        println!("{}", summary.render(args.json)?);
    }

    if failures > 0 {
        warn!(failures, "some downloads failed");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

fn build_task(url: &str, args: &Args) -> CrawlTask {
    let mut site = CrawlTask::for_url(url)
        .site()
        .cloned()
        .unwrap_or_else(|| Site::new(""));
    if let Some(charset) = &args.site_charset {
        site = site.with_charset(charset);
    }
    if let Some(user_agent) = &args.user_agent {
        site = site.with_user_agent(user_agent);
    }
    CrawlTask::for_site(site)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_download_renders_as_failure() {
        let error = DownloadError::invalid_argument("site can not be absent");
        let summary = DownloadSummary::from_error("http://example.com/", &error);
        assert!(!summary.success);

        let line = summary.render(false).unwrap();
        assert!(line.starts_with("FAIL http://example.com/ status=- charset=- bytes=0"));
        assert!(line.contains("site can not be absent"));

        let json: serde_json::Value = serde_json::from_str(&summary.render(true).unwrap()).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["url"], "http://example.com/");
        assert!(json["error"].as_str().unwrap().contains("site can not be absent"));
    }

    #[test]
    fn test_successful_summary_omits_error_field() {
        let response = Response::binary(Request::new("http://example.com/a.bin"), vec![1u8, 2]);
        let summary = DownloadSummary::from_response(&response);
        let json: serde_json::Value = serde_json::from_str(&summary.render(true).unwrap()).unwrap();
        assert_eq!(json["success"], true);
        assert!(json.get("error").is_none());
        assert_eq!(summary.render(false).unwrap(), "OK   http://example.com/a.bin status=- charset=- bytes=2");
    }
}
