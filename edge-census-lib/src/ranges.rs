//! Provider IP range loading and membership tests.
//!
//! A provider publishes its address space as two plain-text resources, one
//! CIDR prefix per line (IPv4 and IPv6). The loader fetches both in order,
//! tolerates a missing resource, and skips lines that are not valid prefixes.

use crate::error::CensusError;
use crate::protocols::Fetch;
use crate::types::{NetworkPrefix, SourceOutcome};
use std::net::IpAddr;

/// Prefixes loaded from the provider's resources, plus what happened per resource.
#[derive(Debug, Clone, Default)]
pub struct RangeSet {
    /// Parsed prefixes, IPv4 resource first, file order preserved
    pub prefixes: Vec<NetworkPrefix>,
    /// One outcome per resource, in fetch order
    pub sources: Vec<SourceOutcome>,
}

/// Fetch `urls` one after another and parse their combined content.
///
/// A failed fetch contributes no content; the error is logged and recorded in
/// that resource's outcome but never returned.
pub async fn load_ranges(fetcher: &dyn Fetch, urls: &[&str]) -> RangeSet {
    let mut contents = Vec::with_capacity(urls.len());
    let mut sources = Vec::with_capacity(urls.len());

    for &url in urls {
        match fetcher.fetch(url).await {
            Ok(body) => {
                tracing::debug!(url, bytes = body.len(), "fetched range resource");
                sources.push(SourceOutcome {
                    url: url.to_string(),
                    bytes: body.len(),
                    error: None,
                });
                contents.push(body);
            }
            Err(e) => {
                tracing::warn!(url, error = %e, "range resource unavailable, continuing without it");
                sources.push(SourceOutcome {
                    url: url.to_string(),
                    bytes: 0,
                    error: Some(e.to_string()),
                });
                contents.push(String::new());
            }
        }
    }

    let prefixes = parse_prefixes(&contents.join("\n"));
    tracing::debug!(count = prefixes.len(), "parsed network prefixes");

    RangeSet { prefixes, sources }
}

/// Parse newline-separated CIDR notation, skipping blank and malformed lines.
pub fn parse_prefixes(content: &str) -> Vec<NetworkPrefix> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| match line.parse::<NetworkPrefix>() {
            Ok(net) => Some(net),
            Err(e) => {
                let err = CensusError::parse(format!("invalid CIDR prefix: {}", e), line);
                tracing::debug!(error = %err, "skipping malformed prefix");
                None
            }
        })
        .collect()
}

/// Whether any of `ips` falls inside any of `nets`.
///
/// Networks are the outer loop: each network is tried against every address
/// before moving on, stopping at the first hit.
pub fn ips_in_ranges(ips: &[IpAddr], nets: &[NetworkPrefix]) -> bool {
    nets.iter()
        .any(|net| ips.iter().any(|ip| net.contains(ip)))
}
