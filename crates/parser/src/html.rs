//! HTML parsing and tokenization. Anchor subtrees are excluded from the
//! informational text before tokenizing, since they're usually navigation
//! chrome rather than page content — but their own text still counts
//! towards the total token count and term frequencies, since layout
//! vocabulary is shared across a site's pages and should influence the
//! fingerprint.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use url::Url;

use crate::stopwords::STOPWORDS;

static TOKEN_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\W_]{2,}").unwrap());

pub struct ParsedPage {
    pub anchors: Vec<(String, Option<String>)>,
    pub term_frequencies: HashMap<String, u64>,
    pub num_info_tokens: u64,
    pub total_num_tokens: u64,
}

/// Returns `None` if the document doesn't look like HTML at all: no
/// `<html>` element, or no anchors and no divs.
pub fn parse(html_str: &str) -> Option<ParsedPage> {
    let document = Html::parse_document(html_str);

    let html_sel = Selector::parse("html").unwrap();
    if document.select(&html_sel).next().is_none() {
        return None;
    }

    let anchor_sel = Selector::parse("a[href]").unwrap();
    let anchor_refs: Vec<ElementRef> = document.select(&anchor_sel).collect();

    if anchor_refs.is_empty() {
        let div_sel = Selector::parse("div").unwrap();
        if document.select(&div_sel).next().is_none() {
            return None;
        }
    }

    let anchors: Vec<(String, Option<String>)> = anchor_refs
        .iter()
        .map(|a| {
            let href = a.value().attr("href").unwrap_or("").to_string();
            let text = a.text().collect::<String>().trim().to_string();
            let text = if text.is_empty() { None } else { Some(text) };
            (href, text)
        })
        .collect();

    let mut body_text = String::new();
    collect_non_anchor_text(document.tree.root(), &mut body_text);

    let mut term_frequencies: HashMap<String, u64> = HashMap::new();

    let informational_tokens: Vec<String> = TOKEN_PATTERN
        .find_iter(&body_text.to_lowercase())
        .map(|m| m.as_str().to_string())
        .collect();

    let mut num_info_tokens = 0u64;
    for token in &informational_tokens {
        if !STOPWORDS.contains(token.as_str()) {
            *term_frequencies.entry(token.clone()).or_insert(0) += 1;
            num_info_tokens += 1;
        }
    }

    let mut total_num_tokens = informational_tokens.len() as u64;
    for anchor in &anchor_refs {
        let anchor_text = anchor.text().collect::<String>().to_lowercase();
        let anchor_tokens: Vec<String> = TOKEN_PATTERN
            .find_iter(&anchor_text)
            .map(|m| m.as_str().to_string())
            .collect();
        total_num_tokens += anchor_tokens.len() as u64;
        for token in anchor_tokens {
            if !STOPWORDS.contains(token.as_str()) {
                *term_frequencies.entry(token).or_insert(0) += 1;
            }
        }
    }

    Some(ParsedPage {
        anchors,
        term_frequencies,
        num_info_tokens,
        total_num_tokens,
    })
}

/// Walk the tree, appending text node content to `out` but skipping entire
/// subtrees rooted at an `<a>` element.
fn collect_non_anchor_text(node: ego_tree::NodeRef<Node>, out: &mut String) {
    match node.value() {
        Node::Text(text) => {
            out.push_str(text);
            out.push(' ');
        }
        Node::Element(el) if el.name() == "a" => {}
        _ => {
            for child in node.children() {
                collect_non_anchor_text(child, out);
            }
        }
    }
}

/// Resolve `href` against `base`, returning `None` for unresolvable links.
pub fn resolve(base: &Url, href: &str) -> Option<Url> {
    base.join(href).ok()
}
