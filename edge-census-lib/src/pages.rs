//! Paginated ranked-list fetching.
//!
//! The ranked list is spread over `pages` pages of `page_size` entries. Every
//! page is fetched concurrently (under the shared admission limiter) and writes
//! its sites into its own contiguous slice of a pre-sized [`DomainList`].

use crate::concurrent::AdmissionLimiter;
use crate::extract::extract_sites;
use crate::protocols::Fetch;
use crate::types::{PageOutcome, PageStatus, ScanConfig, MAX_DOMAIN_SLOTS};
use crate::utils::page_url;
use futures::stream::{FuturesUnordered, StreamExt};

/// Fixed-length, rank-ordered list of domains.
///
/// Slots start as empty strings. The length is set at creation and never
/// changes; a slot that no page filled stays empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainList {
    slots: Vec<String>,
    page_size: usize,
}

impl DomainList {
    /// Allocate `pages × page_size` empty slots (page size at least 1).
    ///
    /// Whole pages past [`MAX_DOMAIN_SLOTS`] are not allocated.
    pub fn new(pages: usize, page_size: usize) -> Self {
        let page_size = page_size.max(1);
        let pages = pages.min(MAX_DOMAIN_SLOTS / page_size);
        Self {
            slots: vec![String::new(); pages * page_size],
            page_size,
        }
    }

    /// Total number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the list has no slots at all.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Slots per page.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Number of slots holding a domain.
    pub fn filled(&self) -> usize {
        self.slots.iter().filter(|s| !s.is_empty()).count()
    }

    /// All slots in rank order.
    pub fn as_slice(&self) -> &[String] {
        &self.slots
    }

    /// One mutable slice per page, in page order.
    ///
    /// The slices are `chunks_mut` of the backing buffer, so page `p` owns
    /// exactly `p*S .. p*S+S` and no two pages can alias a slot.
    fn pages_mut(&mut self) -> std::slice::ChunksMut<'_, String> {
        self.slots.chunks_mut(self.page_size)
    }
}

impl From<Vec<String>> for DomainList {
    /// Wrap an already-assembled list as a single page.
    fn from(slots: Vec<String>) -> Self {
        let page_size = slots.len().max(1);
        Self { slots, page_size }
    }
}

/// The assembled list plus one outcome per page, ordered by page index.
#[derive(Debug, Clone)]
pub struct PageSet {
    pub domains: DomainList,
    pub outcomes: Vec<PageOutcome>,
}

/// Fetch every page of the ranked list and assemble the Domain List.
///
/// All page futures are started together and admitted by `limiter`; this
/// returns only once every one of them has finished. A page that fails leaves
/// its slots empty.
pub async fn fetch_pages(
    fetcher: &dyn Fetch,
    limiter: &AdmissionLimiter,
    config: &ScanConfig,
) -> PageSet {
    let mut domains = DomainList::new(config.pages, config.page_size);
    let mut outcomes = Vec::with_capacity(config.pages);

    // Not spawned: each future borrows its own `&mut` chunk of `domains`
    {
        let mut tasks: FuturesUnordered<_> = domains
            .pages_mut()
            .enumerate()
            .map(|(page, slots)| {
                let url = page_url(&config.base_url, &config.page_suffix, page);
                fetch_page(fetcher, limiter, page, url, slots)
            })
            .collect();

        while let Some(outcome) = tasks.next().await {
            outcomes.push(outcome);
        }
    }

    outcomes.sort_by_key(|o| o.page);

    let failed = outcomes.iter().filter(|o| o.is_failed()).count();
    tracing::debug!(
        pages = outcomes.len(),
        failed,
        filled = domains.filled(),
        slots = domains.len(),
        "ranked list assembled"
    );

    PageSet { domains, outcomes }
}

/// Fetch one page into `slots`, holding one admission token throughout.
async fn fetch_page(
    fetcher: &dyn Fetch,
    limiter: &AdmissionLimiter,
    page: usize,
    url: String,
    slots: &mut [String],
) -> PageOutcome {
    let token = limiter.acquire().await;

    let status = match fetcher.fetch(&url).await {
        Ok(body) => {
            let sites = extract_sites(&body);
            let found = sites.len();
            let written = fill_slots(slots, sites);

            if found > written {
                tracing::debug!(page, found, kept = written, "dropping links beyond page size");
            }

            if found == slots.len() {
                PageStatus::Complete { links: written }
            } else {
                PageStatus::Partial { links: written }
            }
        }
        Err(e) => {
            tracing::warn!(page, url = %url, error = %e, "page fetch failed, its slots stay empty");
            PageStatus::Failed {
                error: e.to_string(),
            }
        }
    };

    token.release();
    PageOutcome { page, url, status }
}

/// Write `sites` (lower-cased) into `slots` in order; returns how many were written.
fn fill_slots(slots: &mut [String], sites: Vec<String>) -> usize {
    let mut written = 0;
    for (slot, site) in slots.iter_mut().zip(sites) {
        *slot = site.to_lowercase();
        written += 1;
    }
    written
}
