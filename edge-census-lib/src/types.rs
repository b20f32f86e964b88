//! Core data types for a census run.
//!
//! This module defines the scan configuration, the match records emitted by the
//! resolution checker, and the per-task outcome records that make swallowed
//! failures observable without changing the scan's best-effort contract.

use crate::error::CensusError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// An address + prefix length pair, either family (e.g. `104.16.0.0/13`).
pub type NetworkPrefix = ipnet::IpNet;

/// Default ranked-list source.
pub const DEFAULT_BASE_URL: &str = "http://www.alexa.com/topsites";

/// Default pagination suffix; `{page}` is replaced by the zero-based page index.
pub const DEFAULT_PAGE_SUFFIX: &str = "/global;{page}";

/// Default provider label used in the report header.
pub const DEFAULT_PROVIDER: &str = "CloudFlare";

/// Default IPv4 range resource.
pub const DEFAULT_IPV4_URL: &str = "https://www.cloudflare.com/ips-v4";

/// Default IPv6 range resource.
pub const DEFAULT_IPV6_URL: &str = "https://www.cloudflare.com/ips-v6";

/// Largest Domain List a single run will allocate.
pub const MAX_DOMAIN_SLOTS: usize = 1_000_000;

/// `pages × page_size`, or `None` if that overflows or exceeds
/// [`MAX_DOMAIN_SLOTS`].
pub fn domain_slots(pages: usize, page_size: usize) -> Option<usize> {
    pages
        .checked_mul(page_size)
        .filter(|&slots| slots <= MAX_DOMAIN_SLOTS)
}

/// Configuration options for a census run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Maximum number of network operations in flight at once
    /// Default: 4, Range: 1-100
    pub concurrency: usize,

    /// Number of ranked-list pages to fetch
    /// Default: 20
    pub pages: usize,

    /// Number of domains each page contributes
    /// Default: 25
    pub page_size: usize,

    /// URL of the first page
    pub base_url: String,

    /// Suffix appended to `base_url` for pages after the first
    pub page_suffix: String,

    /// Provider label (display only)
    pub provider: String,

    /// Resource listing the provider's IPv4 prefixes, one per line
    pub ipv4_url: String,

    /// Resource listing the provider's IPv6 prefixes, one per line
    pub ipv6_url: String,

    /// Upper bound for each HTTP request and each DNS lookup
    /// Default: 10 seconds
    #[serde(skip)]
    pub timeout: Duration,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            pages: 20,
            page_size: 25,
            base_url: DEFAULT_BASE_URL.to_string(),
            page_suffix: DEFAULT_PAGE_SUFFIX.to_string(),
            provider: DEFAULT_PROVIDER.to_string(),
            ipv4_url: DEFAULT_IPV4_URL.to_string(),
            ipv6_url: DEFAULT_IPV6_URL.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl ScanConfig {
    /// Set the admission cap.
    ///
    /// Clamped to 1-100 so a zero cap can never deadlock the scan.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.clamp(1, 100);
        self
    }

    /// Set the number of pages to fetch.
    pub fn with_pages(mut self, pages: usize) -> Self {
        self.pages = pages;
        self
    }

    /// Set the number of domains per page (at least 1).
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Set the ranked-list base URL.
    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the pagination suffix template.
    pub fn with_page_suffix<S: Into<String>>(mut self, page_suffix: S) -> Self {
        self.page_suffix = page_suffix.into();
        self
    }

    /// Set the provider label.
    pub fn with_provider<S: Into<String>>(mut self, provider: S) -> Self {
        self.provider = provider.into();
        self
    }

    /// Set both range resources.
    pub fn with_range_urls<A: Into<String>, B: Into<String>>(mut self, ipv4: A, ipv6: B) -> Self {
        self.ipv4_url = ipv4.into();
        self.ipv6_url = ipv6.into();
        self
    }

    /// Set the per-operation timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Total number of Domain List slots (`pages × page_size`, saturating).
    pub fn capacity(&self) -> usize {
        self.pages.saturating_mul(self.page_size)
    }

    /// Check that the Domain List this config describes can be allocated.
    pub fn validate(&self) -> Result<(), CensusError> {
        match domain_slots(self.pages, self.page_size) {
            Some(_) => Ok(()),
            None => Err(CensusError::config(format!(
                "{} pages of {} domains exceeds the limit of {} domains",
                self.pages, self.page_size, MAX_DOMAIN_SLOTS
            ))),
        }
    }
}

/// A domain found inside the provider's ranges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    /// 1-based position in the assembled Domain List
    pub rank: usize,
    /// The domain as it appears in the list
    pub domain: String,
}

impl fmt::Display for Match {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>3}. {}", self.rank, self.domain)
    }
}

/// How a single page fetch ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PageStatus {
    /// Exactly `page_size` links were written
    Complete { links: usize },
    /// Fewer links than slots, or surplus links dropped at the slice boundary
    Partial { links: usize },
    /// Nothing written; the page's slots stay empty
    Failed { error: String },
}

/// Outcome record for one page task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageOutcome {
    /// Zero-based page index
    pub page: usize,
    /// URL that was requested
    pub url: String,
    /// How the fetch ended
    #[serde(flatten)]
    pub status: PageStatus,
}

impl PageOutcome {
    /// Number of Domain List slots this page filled.
    pub fn links(&self) -> usize {
        match &self.status {
            PageStatus::Complete { links } | PageStatus::Partial { links } => *links,
            PageStatus::Failed { .. } => 0,
        }
    }

    /// Whether the page fetch failed outright.
    pub fn is_failed(&self) -> bool {
        matches!(self.status, PageStatus::Failed { .. })
    }
}

/// Outcome record for one range resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceOutcome {
    /// URL that was requested
    pub url: String,
    /// Bytes of content received (0 on failure)
    pub bytes: usize,
    /// Why the fetch failed, if it did
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Everything a finished census run knows about itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanReport {
    /// Provider label the run was configured with
    pub provider: String,
    /// Per-page outcomes, ordered by page index
    pub pages: Vec<PageOutcome>,
    /// Per-resource outcomes of the range loader
    pub sources: Vec<SourceOutcome>,
    /// Number of network prefixes loaded
    pub prefix_count: usize,
    /// Domain List length (`pages × page_size`)
    pub domain_slots: usize,
    /// Domains whose lookup produced at least one address
    pub resolved: usize,
    /// Domains whose lookup failed
    pub unresolved: usize,
    /// Empty slots skipped without a lookup
    pub skipped: usize,
    /// Matches in completion order
    pub matches: Vec<Match>,
    /// Wall-clock duration of the whole run
    pub elapsed_ms: u64,
}

impl ScanReport {
    /// Number of page fetches that failed outright.
    pub fn failed_pages(&self) -> usize {
        self.pages.iter().filter(|p| p.is_failed()).count()
    }

    /// Number of range resources that failed to load.
    pub fn failed_sources(&self) -> usize {
        self.sources.iter().filter(|s| s.error.is_some()).count()
    }

    /// Matches sorted by rank, for stable presentation.
    pub fn matches_by_rank(&self) -> Vec<Match> {
        let mut matches = self.matches.clone();
        matches.sort_by_key(|m| m.rank);
        matches
    }
}
