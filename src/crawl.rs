//! Worker pool: each worker loops pop -> wait -> fetch -> analyze -> enqueue
//! -> mark complete, sharing the Frontier, Rate Limiter, and Content
//! Analyzer across all spawned tasks via `Arc` handles obtained once here.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use url::Url;

use crawler_analyzer::{Analyzer, AnalyzerConfig};
use crawler_core::{AppConfig, FetchConfig, Fetcher};
use crawler_frontier::{Frontier, FrontierConfig};
use crawler_ratelimit::RateLimiter;

use crate::report;

pub async fn run(
    config: AppConfig,
    fetcher: Arc<dyn Fetcher>,
    restart: bool,
    seed_override: Option<String>,
) -> Result<()> {
    let seed_urls = match seed_override {
        Some(seed) => vec![seed],
        None => config.general.seed_urls.clone(),
    };

    let analyzer = Arc::new(Analyzer::new(AnalyzerConfig {
        max_html_size: config.limits.max_html_size,
        min_info_tokens: config.limits.min_info_tokens as u64,
        training_window: config.limits.training_window,
        trap_threshold: config.limits.trap_threshold,
    }));

    let frontier_config = FrontierConfig {
        seed_urls,
        save_file: config.general.save_file.clone(),
        pop_timeout: Duration::from_secs(config.limits.pop_timeout_secs),
        trap_threshold: config.limits.trap_threshold,
    };
    let frontier = Arc::new(Frontier::new(&frontier_config, restart, analyzer.as_ref())?);

    let rate_limiter = Arc::new(RateLimiter::new(Duration::from_millis(config.limits.min_interval_ms)));

    let fetch_config = FetchConfig {
        timeout: Duration::from_secs(config.fetch.timeout_secs),
        follow_redirects: true,
        user_agent: config.fetch.user_agent.clone(),
        ..FetchConfig::default()
    };

    let post_fetch_delay = Duration::from_millis(config.limits.post_fetch_delay_ms);
    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    // Set by whichever worker first notices the frontier has drained, so the
    // final report is emitted exactly once.
    let report_emitted = Arc::new(AtomicBool::new(false));

    info!(workers = config.general.worker_count, "spawning crawl workers");
    let mut worker_handles = Vec::with_capacity(config.general.worker_count);

    for worker_id in 0..config.general.worker_count {
        let frontier = Arc::clone(&frontier);
        let analyzer = Arc::clone(&analyzer);
        let rate_limiter = Arc::clone(&rate_limiter);
        let fetcher = Arc::clone(&fetcher);
        let fetch_config = fetch_config.clone();
        let shutdown_tx = shutdown_tx.clone();
        let mut shutdown = shutdown_tx.subscribe();
        let report_emitted = Arc::clone(&report_emitted);

        worker_handles.push(tokio::spawn(async move {
            loop {
                let popped = tokio::select! {
                    _ = shutdown.recv() => {
                        info!(worker_id, "worker shutting down");
                        break;
                    }
                    popped = frontier.pop() => popped,
                };

                let Some(url) = popped else {
                    if !report_emitted.swap(true, Ordering::SeqCst) {
                        info!(worker_id, "frontier drained");
                        report::log_report(&analyzer.report());
                        let _ = shutdown_tx.send(());
                    }
                    break;
                };

                let host = match Url::parse(&url) {
                    Ok(parsed) => parsed.host_str().unwrap_or("").to_string(),
                    Err(e) => {
                        warn!(worker_id, url = %url, "popped unparsable url: {}", e);
                        if let Err(e) = frontier.mark_complete(&url).await {
                            error!(worker_id, url = %url, "mark_complete failed: {}", e);
                        }
                        continue;
                    }
                };

                rate_limiter.wait_for(&host).await;

                let resp = match fetcher.download(&url, &fetch_config).await {
                    Ok(resp) => resp,
                    Err(e) => {
                        warn!(worker_id, url = %url, "fetch failed: {}", e);
                        if let Err(e) = frontier.mark_complete(&url).await {
                            error!(worker_id, url = %url, "mark_complete failed: {}", e);
                        }
                        continue;
                    }
                };

                let new_urls = analyzer.scrape(&url, &resp);
                for new_url in new_urls {
                    if let Err(e) = frontier.push(&new_url).await {
                        error!(worker_id, url = %new_url, "push failed: {}", e);
                    }
                }

                if let Err(e) = frontier.mark_complete(&url).await {
                    error!(worker_id, url = %url, "mark_complete failed: {}", e);
                }

                tokio::time::sleep(post_fetch_delay).await;
            }
        }));
    }

    let ctrl_c_shutdown = shutdown_tx.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            let _ = ctrl_c_shutdown.send(());
        }
    });

    for handle in worker_handles {
        let _ = handle.await;
    }

    info!("shutdown complete");
    Ok(())
}
