//! Resolution checking.
//!
//! Every domain of the assembled list is resolved in its own task and its
//! addresses are tested against the provider's prefixes. Tasks are admitted
//! by the shared limiter, finish in any order, and each match carries the rank
//! of its original list position.

use crate::concurrent::AdmissionLimiter;
use crate::protocols::Resolve;
use crate::ranges::ips_in_ranges;
use crate::types::{Match, NetworkPrefix};
use crate::utils::rank_of;
use std::sync::Arc;
use tokio::task::JoinSet;

/// Resolves domains and reports the ones inside a prefix set.
///
/// Cloning is cheap; clones share the resolver and the limiter.
#[derive(Clone)]
pub struct ResolutionChecker {
    /// DNS backend
    resolver: Arc<dyn Resolve>,
    /// Admission shared with the page fetcher
    limiter: AdmissionLimiter,
}

/// Tallies of one checking pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckSummary {
    /// Matches in completion order
    pub matches: Vec<Match>,
    /// Domains that resolved to at least one address
    pub resolved: usize,
    /// Domains whose lookup failed
    pub unresolved: usize,
    /// Empty slots, never looked up
    pub skipped: usize,
}

/// What a single domain task found.
enum Verdict {
    Inside(Match),
    Outside,
    Unresolved,
}

impl ResolutionChecker {
    /// Create a checker resolving through `resolver`, admitted by `limiter`.
    pub fn new(resolver: Arc<dyn Resolve>, limiter: AdmissionLimiter) -> Self {
        Self { resolver, limiter }
    }

    /// The limiter gating lookups.
    pub fn limiter(&self) -> &AdmissionLimiter {
        &self.limiter
    }

    /// Check every domain of `domains` against `prefixes`.
    ///
    /// `on_match` is called as soon as each match is determined, so calls
    /// arrive in completion order rather than rank order. Lookup failures
    /// count as "not inside" and are never returned as errors. Returns once
    /// every task has finished.
    pub async fn check<F>(
        &self,
        domains: &[String],
        prefixes: Arc<[NetworkPrefix]>,
        mut on_match: F,
    ) -> CheckSummary
    where
        F: FnMut(&Match),
    {
        let mut summary = CheckSummary::default();
        let mut tasks = JoinSet::new();

        for (index, domain) in domains.iter().enumerate() {
            if domain.is_empty() {
                summary.skipped += 1;
                continue;
            }

            let resolver = Arc::clone(&self.resolver);
            let limiter = self.limiter.clone();
            let prefixes = Arc::clone(&prefixes);
            let domain = domain.clone();

            tasks.spawn(async move {
                let token = limiter.acquire().await;
                let verdict = check_domain(resolver.as_ref(), index, domain, &prefixes).await;
                token.release();
                verdict
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Verdict::Inside(found)) => {
                    summary.resolved += 1;
                    on_match(&found);
                    summary.matches.push(found);
                }
                Ok(Verdict::Outside) => summary.resolved += 1,
                Ok(Verdict::Unresolved) => summary.unresolved += 1,
                Err(e) => {
                    tracing::error!(error = %e, "resolution task did not complete");
                    summary.unresolved += 1;
                }
            }
        }

        tracing::debug!(
            resolved = summary.resolved,
            unresolved = summary.unresolved,
            skipped = summary.skipped,
            matches = summary.matches.len(),
            "resolution pass finished"
        );

        summary
    }
}

async fn check_domain(
    resolver: &dyn Resolve,
    index: usize,
    domain: String,
    prefixes: &[NetworkPrefix],
) -> Verdict {
    match resolver.resolve(&domain).await {
        Ok(ips) if ips_in_ranges(&ips, prefixes) => Verdict::Inside(Match {
            rank: rank_of(index),
            domain,
        }),
        Ok(_) => Verdict::Outside,
        Err(e) => {
            tracing::debug!(domain = %domain, error = %e, "lookup failed, treating as outside");
            Verdict::Unresolved
        }
    }
}
