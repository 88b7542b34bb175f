use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

use crate::error::CrawlError;

/// Configuration handed to a [`Fetcher`] for a single request.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub timeout: Duration,
    pub max_body_size: usize,
    pub follow_redirects: bool,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(20),
            max_body_size: 10 * 1024 * 1024,
            follow_redirects: true,
            user_agent: "crawler/0.1 (+https://www.ics.uci.edu/)".to_string(),
        }
    }
}

/// The response contract the worker pool and analyzer depend on. The
/// concrete fetcher (HTTP client, cache-server proxy, test double) is an
/// external collaborator — only this shape is specified.
#[derive(Debug, Clone)]
pub struct Response {
    /// The URL that was actually requested.
    pub requested_url: String,
    /// The final URL after following redirects — may differ from
    /// `requested_url`.
    pub url: String,
    pub status: u16,
    pub error: Option<String>,
    /// Case-insensitive header lookup; keys are stored lowercased.
    pub headers: HashMap<String, String>,
    pub content: Vec<u8>,
}

impl Response {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(|v| v.as_str())
    }
}

/// The external collaborator that turns a URL into a [`Response`]. The
/// worker pool depends only on this trait; `crawler`'s `HttpFetcher` is
/// one concrete implementation.
#[async_trait]
pub trait Fetcher: Send + Sync + 'static {
    async fn download(&self, url: &str, config: &FetchConfig) -> Result<Response, CrawlError>;
}
