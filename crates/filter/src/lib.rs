//! URL Filter: scheme/extension/domain/trap-based validity checks.

use url::Url;

/// Subdomains of uci.edu the crawler is allowed to visit.
const ALLOWED_DOMAINS: &[&str] = &["ics.uci.edu", "cs.uci.edu", "informatics.uci.edu", "stat.uci.edu"];

/// The one host outside `ALLOWED_DOMAINS` that's allowed under a path prefix.
const WHITELIST_HOST: &str = "today.uci.edu";
const WHITELIST_PATH_PREFIX: &str = "/department/information_computer_sciences/";

/// Default per-site visit count above which a page is treated as a trap.
/// Callers can override via `is_valid`'s `trap_threshold` argument; this is
/// the value config falls back to when `limits.trap_threshold` is unset.
pub const TRAP_THRESHOLD: u64 = 5;

/// Lowercased path-suffix blacklist of non-HTML file extensions.
const EXTENSION_BLACKLIST: &[&str] = &[
    "css", "js", "bmp", "gif", "jpg", "jpeg", "ico", "png", "tif", "tiff", "mid", "mp2", "mp3",
    "mp4", "wav", "avi", "mov", "mpeg", "ram", "m4v", "mkv", "ogg", "ogv", "pdf", "ps", "eps",
    "tex", "ppt", "pptx", "doc", "docx", "xls", "xlsx", "names", "data", "dat", "exe", "bz2",
    "tar", "msi", "bin", "7z", "psd", "dmg", "iso", "epub", "dll", "cnf", "tgz", "sha1", "thmx",
    "mso", "arff", "rtf", "jar", "csv", "rm", "smil", "wmv", "swf", "wma", "zip", "rar", "gz",
    "ppsx", "pps", "txt", "bib", "sql", "xml", "pov", "tsv", "mat", "in", "out", "scm", "db",
    "mpg", "img", "svg", "webp", "heic", "lif", "hqx", "fig", "lsp", "java", "war", "c", "h",
    "cpp", "hpp", "cp", "sh", "ss", "pl", "rss", "ff", "rle", "z", "shar", "ova", "class", "prn",
    "conf", "cls", "can", "odp", "results", "sas", "odc", "ma", "pd", "mol", "grm", "nb",
];

/// Lets the filter consult the analyzer's `site_counts` without owning them.
pub trait TrapOracle {
    /// Number of times `host_and_path` has been recorded as visited.
    fn site_visit_count(&self, host_and_path: &str) -> u64;
}

/// Always reports zero visits — useful for tests and for checking a URL in
/// isolation from any live crawl state.
pub struct NoTraps;

impl TrapOracle for NoTraps {
    fn site_visit_count(&self, _host_and_path: &str) -> u64 {
        0
    }
}

/// Decide whether `url` should be crawled. Never panics; malformed input
/// returns `false`. `trap_threshold` is the per-site visit count above which
/// a page is treated as a trap — callers source it from config.
pub fn is_valid(url: &str, trap_threshold: u64, traps: &dyn TrapOracle) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return false;
    }

    if has_blacklisted_extension(parsed.path()) {
        return false;
    }

    if !is_valid_domain(&parsed) {
        return false;
    }

    if is_trap(&parsed, trap_threshold, traps) {
        return false;
    }

    true
}

fn has_blacklisted_extension(path: &str) -> bool {
    let path = path.to_ascii_lowercase();
    EXTENSION_BLACKLIST
        .iter()
        .any(|ext| path.ends_with(&format!(".{ext}")))
}

fn is_valid_domain(url: &Url) -> bool {
    let Some(host) = url.host_str() else {
        return false;
    };

    for allowed in ALLOWED_DOMAINS {
        if host == *allowed || host.ends_with(&format!(".{allowed}")) {
            return true;
        }
    }

    host == WHITELIST_HOST && url.path().starts_with(WHITELIST_PATH_PREFIX)
}

fn is_trap(url: &Url, trap_threshold: u64, traps: &dyn TrapOracle) -> bool {
    let Some(host) = url.host_str() else {
        return false;
    };
    let site = format!("{host}{}", url.path());
    traps.site_visit_count(&site) > trap_threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedTraps(u64);
    impl TrapOracle for FixedTraps {
        fn site_visit_count(&self, _: &str) -> u64 {
            self.0
        }
    }

    #[test]
    fn accepts_allowed_subdomain() {
        assert!(is_valid("http://www.ics.uci.edu/x", TRAP_THRESHOLD, &NoTraps));
    }

    #[test]
    fn rejects_lookalike_host() {
        assert!(!is_valid("http://ics.uci.edu.evil.com/", TRAP_THRESHOLD, &NoTraps));
    }

    #[test]
    fn rejects_whitelist_host_outside_path_prefix() {
        assert!(!is_valid("http://today.uci.edu/foo", TRAP_THRESHOLD, &NoTraps));
    }

    #[test]
    fn accepts_whitelist_host_under_path_prefix() {
        assert!(is_valid(
            "http://today.uci.edu/department/information_computer_sciences/x",
            TRAP_THRESHOLD,
            &NoTraps
        ));
    }

    #[test]
    fn rejects_blacklisted_extension() {
        assert!(!is_valid("http://ics.uci.edu/paper.pdf", TRAP_THRESHOLD, &NoTraps));
    }

    #[test]
    fn accepts_extensionless_path() {
        assert!(is_valid("http://ics.uci.edu/paper", TRAP_THRESHOLD, &NoTraps));
    }

    #[test]
    fn rejects_non_http_scheme() {
        assert!(!is_valid("ftp://ics.uci.edu/x", TRAP_THRESHOLD, &NoTraps));
    }

    #[test]
    fn malformed_url_returns_false() {
        assert!(!is_valid("not a url", TRAP_THRESHOLD, &NoTraps));
    }

    #[test]
    fn trap_rejects_past_threshold() {
        assert!(!is_valid("http://cs.uci.edu/p?x=7", TRAP_THRESHOLD, &FixedTraps(6)));
    }

    #[test]
    fn trap_allows_at_threshold() {
        assert!(is_valid("http://cs.uci.edu/p?x=5", TRAP_THRESHOLD, &FixedTraps(5)));
    }
}
