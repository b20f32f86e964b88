//! Census orchestration.
//!
//! A run has two stages. `prepare` assembles the ranked Domain List and the
//! provider's prefix list concurrently (neither depends on the other).
//! `check` then resolves every listed domain against those prefixes.

use crate::checker::ResolutionChecker;
use crate::concurrent::AdmissionLimiter;
use crate::error::CensusError;
use crate::pages::{fetch_pages, DomainList};
use crate::protocols::{Fetch, HttpFetcher, Resolve, SystemResolver, TimeoutResolver};
use crate::ranges::{load_ranges, RangeSet};
use crate::types::{Match, PageOutcome, ScanConfig, ScanReport};
use std::sync::Arc;
use std::time::Instant;

/// Main entry point: one configured census over one pair of transports.
///
/// # Example
///
/// ```rust,no_run
/// use edge_census_lib::{Census, ScanConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let census = Census::new(ScanConfig::default())?;
///     println!("{}", census.header());
///     let report = census.run(|m| println!("{}", m)).await;
///     eprintln!("{} matches", report.matches.len());
///     Ok(())
/// }
/// ```
pub struct Census {
    /// Configuration settings for this run
    config: ScanConfig,
    /// HTTP backend for pages and range resources
    fetcher: Arc<dyn Fetch>,
    /// Resolution stage, sharing `limiter`
    checker: ResolutionChecker,
    /// Admission shared by page fetches and lookups
    limiter: AdmissionLimiter,
}

/// Inputs for the resolution stage, produced by [`Census::prepare`].
#[derive(Debug, Clone)]
pub struct Prepared {
    /// Assembled ranked list
    pub domains: DomainList,
    /// Per-page outcomes, by page index
    pub pages: Vec<PageOutcome>,
    /// Provider prefixes and per-resource outcomes
    pub ranges: RangeSet,
    started: Instant,
}

impl Census {
    /// Create a census that talks to the real network.
    ///
    /// Fails with a configuration error if the Domain List would exceed
    /// [`MAX_DOMAIN_SLOTS`](crate::types::MAX_DOMAIN_SLOTS).
    pub fn new(config: ScanConfig) -> Result<Self, CensusError> {
        config.validate()?;
        let fetcher = HttpFetcher::with_timeout(config.timeout)?;
        let resolver = TimeoutResolver::new(SystemResolver, config.timeout);
        Ok(Self::with_transports(
            config,
            Arc::new(fetcher),
            Arc::new(resolver),
        ))
    }

    /// Create a census over caller-supplied transports.
    ///
    /// The config is not validated here; an oversized list is cut to whole
    /// pages within the slot limit.
    pub fn with_transports(
        config: ScanConfig,
        fetcher: Arc<dyn Fetch>,
        resolver: Arc<dyn Resolve>,
    ) -> Self {
        let limiter = AdmissionLimiter::new(config.concurrency);
        let checker = ResolutionChecker::new(resolver, limiter.clone());
        Self {
            config,
            fetcher,
            checker,
            limiter,
        }
    }

    /// Get the configuration for this census.
    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// The admission limiter shared by both stages.
    pub fn limiter(&self) -> &AdmissionLimiter {
        &self.limiter
    }

    /// Report header line, e.g. `CloudFlare domains within first Top500:`.
    pub fn header(&self) -> String {
        format!(
            "{} domains within first Top{}:",
            self.config.provider,
            self.config.capacity()
        )
    }

    /// Fetch the ranked list and the provider ranges.
    ///
    /// Both run concurrently and this waits for both. Nothing here fails: lost
    /// pages leave empty slots and lost range resources contribute no prefixes.
    pub async fn prepare(&self) -> Prepared {
        let started = Instant::now();
        let range_urls = [self.config.ipv4_url.as_str(), self.config.ipv6_url.as_str()];

        let (page_set, ranges) = tokio::join!(
            fetch_pages(self.fetcher.as_ref(), &self.limiter, &self.config),
            load_ranges(self.fetcher.as_ref(), &range_urls),
        );

        tracing::info!(
            domains = page_set.domains.filled(),
            slots = page_set.domains.len(),
            prefixes = ranges.prefixes.len(),
            "census prepared"
        );

        Prepared {
            domains: page_set.domains,
            pages: page_set.outcomes,
            ranges,
            started,
        }
    }

    /// Resolve every prepared domain, calling `on_match` for each match as it
    /// is determined.
    pub async fn check<F>(&self, prepared: Prepared, on_match: F) -> ScanReport
    where
        F: FnMut(&Match),
    {
        let Prepared {
            domains,
            pages,
            ranges,
            started,
        } = prepared;

        let prefix_count = ranges.prefixes.len();
        let summary = self
            .checker
            .check(domains.as_slice(), ranges.prefixes.into(), on_match)
            .await;

        ScanReport {
            provider: self.config.provider.clone(),
            pages,
            sources: ranges.sources,
            prefix_count,
            domain_slots: domains.len(),
            resolved: summary.resolved,
            unresolved: summary.unresolved,
            skipped: summary.skipped,
            matches: summary.matches,
            elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Prepare and check in one go.
    pub async fn run<F>(&self, on_match: F) -> ScanReport
    where
        F: FnMut(&Match),
    {
        let prepared = self.prepare().await;
        self.check(prepared, on_match).await
    }
}
