use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub general: GeneralConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub fetch: FetchSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeneralConfig {
    pub seed_urls: Vec<String>,
    pub save_file: String,
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    #[serde(default)]
    pub restart: bool,
}

fn default_worker_count() -> usize {
    8
}

#[derive(Debug, Deserialize, Clone)]
pub struct LimitsConfig {
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,
    #[serde(default = "default_post_fetch_delay_ms")]
    pub post_fetch_delay_ms: u64,
    #[serde(default = "default_pop_timeout_secs")]
    pub pop_timeout_secs: u64,
    #[serde(default = "default_max_html_size")]
    pub max_html_size: usize,
    #[serde(default = "default_min_info_tokens")]
    pub min_info_tokens: usize,
    #[serde(default = "default_training_window")]
    pub training_window: usize,
    #[serde(default = "default_trap_threshold")]
    pub trap_threshold: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: default_min_interval_ms(),
            post_fetch_delay_ms: default_post_fetch_delay_ms(),
            pop_timeout_secs: default_pop_timeout_secs(),
            max_html_size: default_max_html_size(),
            min_info_tokens: default_min_info_tokens(),
            training_window: default_training_window(),
            trap_threshold: default_trap_threshold(),
        }
    }
}

fn default_min_interval_ms() -> u64 {
    500
}
fn default_post_fetch_delay_ms() -> u64 {
    100
}
fn default_pop_timeout_secs() -> u64 {
    3
}
fn default_max_html_size() -> usize {
    500_000
}
fn default_min_info_tokens() -> usize {
    50
}
fn default_training_window() -> usize {
    20
}
fn default_trap_threshold() -> u64 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct FetchSettings {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_user_agent() -> String {
    "crawler/0.1 (+https://www.ics.uci.edu/)".to_string()
}
fn default_timeout_secs() -> u64 {
    20
}
