//! Transport implementations used by the census.
//!
//! The pipeline talks to the network through two seams: [`Fetch`] for HTTP
//! bodies and [`Resolve`] for DNS answers.

/// HTTP fetching
pub mod http;

/// DNS resolution
pub mod dns;

pub use dns::{Resolve, StaticResolver, SystemResolver, TimeoutResolver};
pub use http::{Fetch, HttpFetcher, StaticFetcher};
