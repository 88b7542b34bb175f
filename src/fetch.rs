//! Concrete [`Fetcher`] implementation backing the worker pool: a plain
//! `reqwest` HTTP client honoring the caller-supplied [`FetchConfig`] per
//! request.

use async_trait::async_trait;
use std::collections::HashMap;

use crawler_core::{CrawlError, FetchConfig, Fetcher, Response};

/// Redirects are followed up to this many hops; `reqwest`'s redirect policy
/// is fixed at client-construction time, so `FetchConfig::follow_redirects`
/// only gates whether the *caller* treats a redirected response as distinct
/// from its request (see `crawler-analyzer`'s account_url step).
const MAX_REDIRECTS: usize = 10;

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn download(&self, url: &str, config: &FetchConfig) -> Result<Response, CrawlError> {
        let resp = self
            .client
            .get(url)
            .timeout(config.timeout)
            .header(reqwest::header::USER_AGENT, &config.user_agent)
            .send()
            .await
            .map_err(|e| CrawlError::Network(e.to_string()))?;

        let final_url = resp.url().to_string();
        let status = resp.status().as_u16();

        let mut headers = HashMap::new();
        for (name, value) in resp.headers() {
            if let Ok(v) = value.to_str() {
                headers.insert(name.as_str().to_ascii_lowercase(), v.to_string());
            }
        }

        let content = resp
            .bytes()
            .await
            .map_err(|e| CrawlError::Network(e.to_string()))?
            .to_vec();

        if content.len() > config.max_body_size {
            return Err(CrawlError::Network(format!(
                "body of {} bytes exceeds max_body_size {}",
                content.len(),
                config.max_body_size
            )));
        }

        Ok(Response {
            requested_url: url.to_string(),
            url: final_url,
            status,
            error: None,
            headers,
            content,
        })
    }
}
