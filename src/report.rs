//! Formats and logs the final corpus report once the frontier drains.

use tracing::info;

use crawler_analyzer::Report;

pub fn log_report(report: &Report) {
    log_num_unique_urls(report);
    log_longest_page(report);
    log_top_words(report);
    log_subdomain_counts(report);
}

fn log_num_unique_urls(report: &Report) {
    info!(unique_pages = report.unique_pages, "crawl complete");
}

fn log_longest_page(report: &Report) {
    info!(url = %report.max_page_url, tokens = report.max_page_len, "longest page");
}

fn log_top_words(report: &Report) {
    for (rank, (token, count)) in report.top_tokens.iter().enumerate() {
        info!(rank = rank + 1, token = %token, count, "top token");
    }
}

fn log_subdomain_counts(report: &Report) {
    for (subdomain, count) in &report.subdomain_counts {
        info!(subdomain = %subdomain, count, "subdomain page count");
    }
}
