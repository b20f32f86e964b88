//! Link extraction from ranked-list pages.
//!
//! A ranked-list page lists one site per paragraph, each as an anchor whose
//! text is the bare site name (`<p><a href="/siteinfo/google.com">Google.com</a></p>`).
//! Extraction is a pure function of the page body: anchors inside paragraphs
//! that sit inside a `<div>`, in document order, each turned into a
//! `www.`-prefixed lower-case host. "Inside a div" means between the first
//! `<div>` opening tag and the last `</div>`.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref PARAGRAPH: Regex = Regex::new(r"(?is)<p\b[^>]*>(.*?)</p>").unwrap();
    static ref ANCHOR: Regex = Regex::new(r"(?is)<a\b[^>]*>(.*?)</a>").unwrap();
    static ref TAG: Regex = Regex::new(r"(?s)<[^>]*>").unwrap();
    static ref DIV_OPEN: Regex = Regex::new(r"(?i)<div\b[^>]*>").unwrap();
    static ref DIV_CLOSE: Regex = Regex::new(r"(?i)</div\s*>").unwrap();
}

/// Extract the ordered list of site hosts from a ranked-list page.
///
/// Anchors with no text are skipped; malformed markup simply yields fewer
/// entries.
pub fn extract_sites(html: &str) -> Vec<String> {
    let Some(body) = div_region(html) else {
        return Vec::new();
    };

    PARAGRAPH
        .captures_iter(body)
        .filter_map(|p| p.get(1))
        .flat_map(|body| ANCHOR.captures_iter(body.as_str()))
        .filter_map(|a| a.get(1))
        .filter_map(|text| site_host(text.as_str()))
        .collect()
}

/// The part of `html` enclosed by divs, if any.
fn div_region(html: &str) -> Option<&str> {
    let start = DIV_OPEN.find(html)?.end();
    let end = DIV_CLOSE.find_iter(html).last()?.start();
    html.get(start..end)
}

/// Turn anchor inner HTML into a host name, or `None` if it has no text.
fn site_host(inner_html: &str) -> Option<String> {
    let text = decode_entities(&TAG.replace_all(inner_html, ""));
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    Some(format!("www.{}", text).to_lowercase())
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}
