//! # Edge Census Library
//!
//! Finds which domains of a ranked top-sites list resolve into the published IP
//! ranges of one network provider.
//!
//! A run scrapes the ranked list page by page, loads the provider's IPv4 and
//! IPv6 prefixes, then resolves every listed domain and reports the ones whose
//! addresses fall inside those prefixes. All page fetches and DNS lookups share
//! one [`AdmissionLimiter`], so at most `concurrency` of them are in flight.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edge_census_lib::{Census, ScanConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let census = Census::new(ScanConfig::default().with_concurrency(8))?;
//!     let prepared = census.prepare().await;
//!     println!("{}", census.header());
//!     census.check(prepared, |m| println!("{}", m)).await;
//!     Ok(())
//! }
//! ```
//!
//! Fetch and lookup failures never abort a run. They show up in the
//! [`ScanReport`] outcome records and as `tracing` events.

// Re-export main public API types and functions
pub use census::{Census, Prepared};
pub use checker::{CheckSummary, ResolutionChecker};
pub use concurrent::{AdmissionLimiter, AdmissionToken};
pub use config::{
    load_env_config, load_env_config_from, parse_timeout_string, ConfigManager, EnvConfig,
    FileConfig,
};
pub use error::CensusError;
pub use extract::extract_sites;
pub use pages::{fetch_pages, DomainList, PageSet};
pub use protocols::{
    Fetch, HttpFetcher, Resolve, StaticFetcher, StaticResolver, SystemResolver, TimeoutResolver,
};
pub use ranges::{ips_in_ranges, load_ranges, parse_prefixes, RangeSet};
pub use types::{
    domain_slots, Match, NetworkPrefix, PageOutcome, PageStatus, ScanConfig, ScanReport,
    SourceOutcome, MAX_DOMAIN_SLOTS,
};
pub use utils::page_url;

// Public modules
pub mod config;
pub mod types;

// Internal modules - re-exported above where part of the API
mod census;
mod checker;
mod concurrent;
mod error;
mod extract;
mod pages;
mod protocols;
mod ranges;
mod utils;

// Type alias for convenience
pub type Result<T> = std::result::Result<T, CensusError>;

// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
