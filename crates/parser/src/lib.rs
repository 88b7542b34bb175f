//! Content Analyzer: parses fetched pages, tokenizes them, fingerprints them
//! for near-duplicate detection, and accumulates the corpus statistics used
//! for the final report and for trap detection.

mod html;
mod simhash;
mod stopwords;

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crawler_core::Response;
use crawler_filter::TrapOracle;
use tracing::debug;
use url::Url;

/// Query parameters that encode page identity rather than presentation;
/// everything else is stripped during link normalization to avoid traps.
const KNOWN_GOOD_PARAMS: &[&str] = &[
    "p",
    "page",
    "paged",
    "baldiPage",
    "page_id",
    "id",
    "seminar_id",
    "attachment_id",
    "archive_year",
    "year",
    "limit",
    "people",
    "start",
    "offset",
    "idx",
    "s",
    "search",
    "q",
    "query",
    "eventDisplay",
    "tribe-bar-date",
    "redirect_to",
];

#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub max_html_size: usize,
    pub min_info_tokens: u64,
    pub training_window: usize,
    pub trap_threshold: u64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            max_html_size: 500_000,
            min_info_tokens: 50,
            training_window: 20,
            trap_threshold: crawler_filter::TRAP_THRESHOLD,
        }
    }
}

struct SimilarityRecord {
    n_docs: usize,
    document_frequencies: HashMap<String, u64>,
    fingerprints: Vec<u64>,
}

impl SimilarityRecord {
    fn new() -> Self {
        Self {
            n_docs: 0,
            document_frequencies: HashMap::new(),
            fingerprints: Vec::new(),
        }
    }
}

struct State {
    visited_urls: HashSet<String>,
    subdomain_counts: HashMap<String, u64>,
    site_counts: HashMap<String, u64>,
    token_counts: HashMap<String, u64>,
    max_page_len: u64,
    max_page_url: String,
    subdomain_similarity: HashMap<String, SimilarityRecord>,
}

impl State {
    fn new() -> Self {
        Self {
            visited_urls: HashSet::new(),
            subdomain_counts: HashMap::new(),
            site_counts: HashMap::new(),
            token_counts: HashMap::new(),
            max_page_len: 0,
            max_page_url: String::new(),
            subdomain_similarity: HashMap::new(),
        }
    }
}

/// The single complex component of the crawler: HTML parsing, tokenization,
/// tf-idf weighted SimHash similarity, and corpus bookkeeping.
///
/// `scrape` is synchronous and never panics or fails — every per-page
/// problem degrades to "no links found" rather than an error, matching the
/// worker pool's expectation that analysis can't abort a crawl.
pub struct Analyzer {
    config: AnalyzerConfig,
    state: Mutex<State>,
}

/// Final corpus report: unique page count, longest page, top tokens, and
/// per-subdomain page counts.
pub struct Report {
    pub unique_pages: usize,
    pub max_page_url: String,
    pub max_page_len: u64,
    pub top_tokens: Vec<(String, u64)>,
    pub subdomain_counts: Vec<(String, u64)>,
}

impl Analyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self {
            config,
            state: Mutex::new(State::new()),
        }
    }

    /// Parse and account for one fetched page, returning the list of
    /// candidate links discovered on it (already filtered and deduplicated).
    pub fn scrape(&self, requested_url: &str, resp: &Response) -> Vec<String> {
        let mut state = self.state.lock().unwrap();

        let Some(final_url) = account_url(&mut state, requested_url, resp, self, self.config.trap_threshold) else {
            return Vec::new();
        };

        if resp.status != 200 {
            return Vec::new();
        }

        if is_trap(&final_url, &state, self.config.trap_threshold) {
            return Vec::new();
        }

        let charset = resp
            .header("content-type")
            .and_then(extract_charset)
            .unwrap_or_else(|| "utf-8".to_string());
        let encoding =
            encoding_rs::Encoding::for_label(charset.as_bytes()).unwrap_or(encoding_rs::UTF_8);
        let (body_text, _, _) = encoding.decode(&resp.content);
        if body_text.is_empty() {
            debug!(url = %final_url, "decoded body is empty, skipping");
            return Vec::new();
        }

        let Some(parsed) = html::parse(&body_text) else {
            debug!(url = %final_url, "not recognizable as html, skipping");
            return Vec::new();
        };

        let html_size = resp.content.len();
        if !has_high_information_value(html_size, parsed.num_info_tokens, self.config.max_html_size, self.config.min_info_tokens)
        {
            debug!(url = %final_url, html_size, num_info_tokens = parsed.num_info_tokens, "low information value, skipping");
            return Vec::new();
        }

        let host = final_url.host_str().unwrap_or("").to_string();
        let similarity = state
            .subdomain_similarity
            .entry(host)
            .or_insert_with(SimilarityRecord::new);

        if similarity.n_docs < self.config.training_window {
            similarity.n_docs += 1;
            for token in parsed.term_frequencies.keys() {
                *similarity.document_frequencies.entry(token.clone()).or_insert(0) += 1;
            }
        } else {
            let fp = simhash::fingerprint(
                &parsed.term_frequencies,
                parsed.total_num_tokens,
                &similarity.document_frequencies,
                self.config.training_window as f64,
            );
            let is_duplicate = similarity
                .fingerprints
                .iter()
                .any(|prior| simhash::similarity(fp, *prior) >= simhash::SIMILARITY_THRESHOLD);
            if is_duplicate {
                debug!(url = %final_url, "near-duplicate of a prior page, skipping");
                return Vec::new();
            }
            similarity.fingerprints.push(fp);
        }

        if parsed.total_num_tokens > state.max_page_len {
            state.max_page_len = parsed.total_num_tokens;
            state.max_page_url = final_url.to_string();
        }
        for (token, count) in &parsed.term_frequencies {
            *state.token_counts.entry(token.clone()).or_insert(0) += count;
        }

        extract_links(&final_url, &parsed.anchors, &state, self, self.config.trap_threshold)
    }

    pub fn report(&self) -> Report {
        let state = self.state.lock().unwrap();
        let mut top_tokens: Vec<(String, u64)> = state
            .token_counts
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        top_tokens.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        top_tokens.truncate(50);

        let mut subdomain_counts: Vec<(String, u64)> = state
            .subdomain_counts
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        subdomain_counts.sort_by(|a, b| a.0.cmp(&b.0));

        Report {
            unique_pages: state.visited_urls.len(),
            max_page_url: state.max_page_url.clone(),
            max_page_len: state.max_page_len,
            top_tokens,
            subdomain_counts,
        }
    }
}

impl TrapOracle for Analyzer {
    fn site_visit_count(&self, host_and_path: &str) -> u64 {
        let state = self.state.lock().unwrap();
        *state.site_counts.get(host_and_path).unwrap_or(&0)
    }
}

fn site_key(url: &Url) -> String {
    format!("{}{}", url.host_str().unwrap_or(""), url.path())
}

fn is_trap(url: &Url, state: &State, trap_threshold: u64) -> bool {
    *state.site_counts.get(&site_key(url)).unwrap_or(&0) > trap_threshold
}

/// Record visit bookkeeping for `requested_url` and, on redirect, for the
/// response's final URL too. Returns the URL that should be treated as the
/// page's identity going forward, or `None` if the page shouldn't be
/// crawled at all.
fn account_url(
    state: &mut State,
    requested_url: &str,
    resp: &Response,
    traps: &dyn TrapOracle,
    trap_threshold: u64,
) -> Option<Url> {
    if resp.status == 404 {
        return None;
    }

    let parsed = Url::parse(requested_url).ok()?;
    state.visited_urls.insert(requested_url.to_string());
    *state
        .subdomain_counts
        .entry(parsed.host_str().unwrap_or("").to_string())
        .or_insert(0) += 1;
    *state.site_counts.entry(site_key(&parsed)).or_insert(0) += 1;

    if resp.url == requested_url {
        return Some(parsed);
    }

    if state.visited_urls.contains(&resp.url) {
        return None;
    }

    let mut final_url_str = resp.url.clone();
    if !crawler_filter::is_valid(&final_url_str, trap_threshold, traps) {
        let Some(redirect_url) = Url::parse(&final_url_str).ok().map(|u| strip_to_known_good(&u)) else {
            return None;
        };
        let redirect_str = redirect_url.to_string();
        if state.visited_urls.contains(&redirect_str)
            || !crawler_filter::is_valid(&redirect_str, trap_threshold, traps)
        {
            return None;
        }
        final_url_str = redirect_str;
    }

    let final_parsed = Url::parse(&final_url_str).ok()?;
    state.visited_urls.insert(final_url_str.clone());
    *state
        .subdomain_counts
        .entry(final_parsed.host_str().unwrap_or("").to_string())
        .or_insert(0) += 1;
    *state.site_counts.entry(site_key(&final_parsed)).or_insert(0) += 1;

    Some(final_parsed)
}

fn has_high_information_value(html_size: usize, num_info_tokens: u64, max_html_size: usize, min_info_tokens: u64) -> bool {
    if html_size > max_html_size {
        return false;
    }
    if num_info_tokens < min_info_tokens {
        return false;
    }
    if html_size > max_html_size.saturating_sub(200_000) && num_info_tokens < min_info_tokens * 2 {
        return false;
    }
    true
}

fn extract_charset(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .find_map(|part| part.trim().strip_prefix("charset="))
        .map(|s| s.trim_matches('"').to_string())
}

fn strip_to_known_good(url: &Url) -> Url {
    let mut stripped = url.clone();
    stripped.set_fragment(None);

    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    let mut any = false;
    for (k, v) in url.query_pairs() {
        let base = k.split('[').next().unwrap_or(&k);
        if KNOWN_GOOD_PARAMS.contains(&base) {
            serializer.append_pair(&k, &v);
            any = true;
        }
    }
    if any {
        stripped.set_query(Some(&serializer.finish()));
    } else {
        stripped.set_query(None);
    }
    stripped
}

fn extract_links(
    base: &Url,
    anchors: &[(String, Option<String>)],
    state: &State,
    traps: &dyn TrapOracle,
    trap_threshold: u64,
) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for (href, _anchor_text) in anchors {
        let Some(resolved) = html::resolve(base, href) else {
            continue;
        };
        let stripped = strip_to_known_good(&resolved);
        let link = stripped.to_string();

        if state.visited_urls.contains(&link) {
            continue;
        }
        if !crawler_filter::is_valid(&link, trap_threshold, traps) {
            continue;
        }
        if seen.insert(link.clone()) {
            links.push(link);
        }
    }

    links
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as Map;

    fn response(status: u16, url: &str, content_type: &str, body: &str) -> Response {
        let mut headers = Map::new();
        headers.insert("content-type".to_string(), content_type.to_string());
        Response {
            requested_url: url.to_string(),
            url: url.to_string(),
            status,
            error: None,
            headers,
            content: body.as_bytes().to_vec(),
        }
    }

    fn page_body(n: usize) -> String {
        let words: Vec<String> = (0..120).map(|i| format!("uniqueword{n}iteration{i}")).collect();
        format!(
            "<html><body><div>{}</div><a href=\"/next{n}\">next page link text</a></body></html>",
            words.join(" ")
        )
    }

    #[test]
    fn non_200_status_is_ignored_after_accounting() {
        let analyzer = Analyzer::new(AnalyzerConfig::default());
        let resp = response(404, "http://cs.uci.edu/missing", "text/html", "<html></html>");
        let links = analyzer.scrape("http://cs.uci.edu/missing", &resp);
        assert!(links.is_empty());
        assert_eq!(analyzer.report().unique_pages, 0);
    }

    #[test]
    fn low_information_page_yields_no_links() {
        let analyzer = Analyzer::new(AnalyzerConfig::default());
        let body = "<html><body><div>too short</div><a href=\"/x\">x</a></body></html>";
        let resp = response(200, "http://cs.uci.edu/thin", "text/html", body);
        let links = analyzer.scrape("http://cs.uci.edu/thin", &resp);
        assert!(links.is_empty());
    }

    #[test]
    fn rich_page_extracts_links_and_updates_stats() {
        let analyzer = Analyzer::new(AnalyzerConfig::default());
        let body = page_body(0);
        let url = "http://cs.uci.edu/page0";
        let resp = response(200, url, "text/html", &body);
        let links = analyzer.scrape(url, &resp);
        assert_eq!(links, vec!["http://cs.uci.edu/next0".to_string()]);
        let report = analyzer.report();
        assert_eq!(report.unique_pages, 1);
        assert!(report.max_page_len > 0);
    }

    #[test]
    fn near_duplicate_after_training_window_is_rejected() {
        let analyzer = Analyzer::new(AnalyzerConfig {
            training_window: 2,
            ..AnalyzerConfig::default()
        });
        for i in 0..2 {
            let url = format!("http://informatics.uci.edu/train{i}");
            let body = page_body(i);
            let resp = response(200, &url, "text/html", &body);
            analyzer.scrape(&url, &resp);
        }
        let url = "http://informatics.uci.edu/train1";
        let body = page_body(1);
        let resp = response(200, url, "text/html", &body);
        let links = analyzer.scrape(url, &resp);
        assert!(links.is_empty());
    }

    #[test]
    fn redirect_counts_both_urls_in_subdomain_stats() {
        let analyzer = Analyzer::new(AnalyzerConfig::default());
        let body = page_body(9);
        let mut resp = response(200, "http://ics.uci.edu/a/", "text/html", &body);
        resp.requested_url = "http://ics.uci.edu/a".to_string();
        analyzer.scrape("http://ics.uci.edu/a", &resp);
        let report = analyzer.report();
        let total: u64 = report
            .subdomain_counts
            .iter()
            .filter(|(host, _)| host == "ics.uci.edu")
            .map(|(_, c)| *c)
            .sum();
        assert!(total >= 2);
    }
}
