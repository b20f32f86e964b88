//! Small helpers shared by the fetch and resolve stages.

/// Build the URL of ranked-list page `page`.
///
/// Page 0 is the base URL itself; later pages append `suffix` with `{page}`
/// replaced by the page index (a suffix without the placeholder gets the index
/// appended).
pub fn page_url(base_url: &str, suffix: &str, page: usize) -> String {
    if page == 0 {
        return base_url.to_string();
    }

    let suffix = if suffix.contains("{page}") {
        suffix.replace("{page}", &page.to_string())
    } else {
        format!("{}{}", suffix, page)
    };
    format!("{}{}", base_url, suffix)
}

/// 1-based rank label of Domain List index `index`.
pub fn rank_of(index: usize) -> usize {
    index + 1
}
