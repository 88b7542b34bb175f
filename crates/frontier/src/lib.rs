//! In-memory FIFO of pending URLs, backed by a durable [`crawler_storage::Store`]
//! so a restart can resume an interrupted crawl instead of starting over.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crawler_filter::TrapOracle;
use crawler_storage::{Store, UrlRecord};
use sha2::{Digest, Sha256};
use tokio::sync::{Mutex, Notify};
use tracing::{error, info, warn};
use url::Url;

#[derive(Debug, Clone)]
pub struct FrontierConfig {
    pub seed_urls: Vec<String>,
    pub save_file: String,
    pub pop_timeout: Duration,
    pub trap_threshold: u64,
}

pub struct Frontier {
    store: Store,
    queue: Mutex<VecDeque<String>>,
    notify: Notify,
    pop_timeout: Duration,
}

impl Frontier {
    /// Open (or create) the persistent store at `config.save_file`. If
    /// `restart`, the store is cleared and reseeded from `config.seed_urls`.
    /// Otherwise every incomplete URL that still passes the filter is
    /// reloaded into the FIFO; if the store turns out to be empty, the
    /// frontier seeds anyway.
    pub fn new(config: &FrontierConfig, restart: bool, trap_oracle: &dyn TrapOracle) -> anyhow::Result<Self> {
        let store = Store::open(&config.save_file)?;
        let mut initial = VecDeque::new();

        if restart {
            info!(save_file = %config.save_file, "restart requested, clearing persistent store");
            store.clear()?;
            for seed in &config.seed_urls {
                if let Some(normalized) = seed_into_store(&store, seed)? {
                    initial.push_back(normalized);
                }
            }
        } else {
            let mut total = 0;
            let mut reloaded = 0;
            for entry in store.iter() {
                let (_key, record) = entry?;
                total += 1;
                if !record.completed && crawler_filter::is_valid(&record.url, config.trap_threshold, trap_oracle) {
                    initial.push_back(record.url);
                    reloaded += 1;
                }
            }
            info!(reloaded, total, "loaded persistent store");
            if store.is_empty() {
                for seed in &config.seed_urls {
                    if let Some(normalized) = seed_into_store(&store, seed)? {
                        initial.push_back(normalized);
                    }
                }
            }
        }

        Ok(Self {
            store,
            queue: Mutex::new(initial),
            notify: Notify::new(),
            pop_timeout: config.pop_timeout,
        })
    }

    /// Block until a URL is available or `pop_timeout` elapses (the drain
    /// signal).
    pub async fn pop(&self) -> Option<String> {
        let deadline = Instant::now() + self.pop_timeout;
        loop {
            {
                let mut queue = self.queue.lock().await;
                if let Some(url) = queue.pop_front() {
                    return Some(url);
                }
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return None;
            }
            let _ = tokio::time::timeout(remaining, self.notify.notified()).await;
        }
    }

    /// Normalize, fingerprint, and enqueue `url` if it isn't already known.
    /// Redundant pushes are silently ignored.
    pub async fn push(&self, url: &str) -> anyhow::Result<()> {
        let Some(normalized) = normalize_url(url) else {
            return Ok(());
        };
        let key = fingerprint(&normalized);

        let mut queue = self.queue.lock().await;
        if self.store.contains_key(&key)? {
            return Ok(());
        }
        self.store.insert(
            &key,
            &UrlRecord {
                url: normalized.clone(),
                completed: false,
            },
        )?;
        queue.push_back(normalized);
        drop(queue);
        self.notify.notify_one();
        Ok(())
    }

    /// Mark `url` as completed. Logs an error but still writes if the
    /// fingerprint wasn't previously recorded — this shouldn't happen, and
    /// indicates a normalization mismatch somewhere upstream.
    pub async fn mark_complete(&self, url: &str) -> anyhow::Result<()> {
        let Some(normalized) = normalize_url(url) else {
            return Ok(());
        };
        let key = fingerprint(&normalized);

        if self.store.get(&key)?.is_none() {
            error!(url = %normalized, "completed url, but have not seen it before");
        }

        self.store.insert(
            &key,
            &UrlRecord {
                url: normalized,
                completed: true,
            },
        )
    }
}

/// Lowercase scheme and host, strip the fragment. Query strings arrive
/// already stripped to known-good parameters by the analyzer's link
/// extraction, so this step only canonicalizes identity, not traps.
fn normalize_url(url: &str) -> Option<String> {
    let mut parsed = Url::parse(url).ok()?;
    let _ = parsed.set_scheme(&parsed.scheme().to_ascii_lowercase());
    if let Some(host) = parsed.host_str() {
        let lower = host.to_ascii_lowercase();
        let _ = parsed.set_host(Some(&lower));
    }
    parsed.set_fragment(None);
    Some(parsed.to_string())
}

fn fingerprint(normalized_url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalized_url.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Insert a seed into the store if it isn't already there (seeds persist
/// across restarts once a `restart=false` run has recorded them), returning
/// its normalized form for immediate enqueuing.
fn seed_into_store(store: &Store, url: &str) -> anyhow::Result<Option<String>> {
    let Some(normalized) = normalize_url(url) else {
        warn!(url, "seed url failed to parse, skipping");
        return Ok(None);
    };
    let key = fingerprint(&normalized);
    if store.get(&key)?.is_none() {
        store.insert(
            &key,
            &UrlRecord {
                url: normalized.clone(),
                completed: false,
            },
        )?;
    }
    Ok(Some(normalized))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crawler_filter::NoTraps;

    fn config(dir: &tempfile::TempDir, seeds: &[&str]) -> FrontierConfig {
        FrontierConfig {
            seed_urls: seeds.iter().map(|s| s.to_string()).collect(),
            save_file: dir.path().join("frontier.sled").to_string_lossy().to_string(),
            pop_timeout: Duration::from_millis(200),
            trap_threshold: crawler_filter::TRAP_THRESHOLD,
        }
    }

    #[tokio::test]
    async fn seeds_are_enqueued_and_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(&dir, &["http://www.ics.uci.edu/"]);
        let frontier = Frontier::new(&cfg, true, &NoTraps).unwrap();
        let popped = frontier.pop().await;
        assert_eq!(popped, Some("http://www.ics.uci.edu/".to_string()));
    }

    #[tokio::test]
    async fn duplicate_push_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(&dir, &[]);
        let frontier = Frontier::new(&cfg, true, &NoTraps).unwrap();
        frontier.push("http://cs.uci.edu/a").await.unwrap();
        frontier.push("http://cs.uci.edu/a").await.unwrap();
        let first = frontier.pop().await;
        assert_eq!(first, Some("http://cs.uci.edu/a".to_string()));
        let second = frontier.pop().await;
        assert_eq!(second, None);
    }

    #[tokio::test]
    async fn pop_times_out_on_empty_queue() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(&dir, &[]);
        let frontier = Frontier::new(&cfg, true, &NoTraps).unwrap();
        let start = Instant::now();
        let result = frontier.pop().await;
        assert!(result.is_none());
        assert!(start.elapsed() >= Duration::from_millis(190));
    }

    #[tokio::test]
    async fn completed_url_is_not_reloaded_after_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frontier.sled").to_string_lossy().to_string();

        {
            let cfg = FrontierConfig {
                seed_urls: vec!["http://cs.uci.edu/a".to_string()],
                save_file: path.clone(),
                pop_timeout: Duration::from_millis(200),
                trap_threshold: crawler_filter::TRAP_THRESHOLD,
            };
            let frontier = Frontier::new(&cfg, true, &NoTraps).unwrap();
            let url = frontier.pop().await.unwrap();
            frontier.mark_complete(&url).await.unwrap();
        }

        let cfg = FrontierConfig {
            seed_urls: vec!["http://cs.uci.edu/a".to_string()],
            save_file: path,
            pop_timeout: Duration::from_millis(200),
            trap_threshold: crawler_filter::TRAP_THRESHOLD,
        };
        let frontier = Frontier::new(&cfg, false, &NoTraps).unwrap();
        let result = frontier.pop().await;
        assert_eq!(result, None);
    }
}
