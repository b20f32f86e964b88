//! DNS resolution.
//!
//! [`SystemResolver`] asks the operating system's resolver (the same path
//! `getaddrinfo` takes); [`StaticResolver`] answers from a fixed table.
//! [`TimeoutResolver`] puts a deadline on either.

use crate::error::CensusError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::net::IpAddr;
use std::time::Duration;

/// Hostname to address resolution.
#[async_trait]
pub trait Resolve: Send + Sync {
    /// Resolve `host` to every address it has, without duplicates.
    ///
    /// An empty answer is an error.
    async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, CensusError>;
}

/// The operating system's resolver. Lookups are not bounded; wrap it in a
/// [`TimeoutResolver`] to give up on hung lookups.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemResolver;

#[async_trait]
impl Resolve for SystemResolver {
    async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, CensusError> {
        // Literal addresses need no lookup
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(vec![ip]);
        }

        let lookup = tokio::net::lookup_host((host, 0u16))
            .await
            .map_err(|e| CensusError::resolve(host, e.to_string()))?;

        let mut ips: Vec<IpAddr> = Vec::new();
        for addr in lookup {
            if !ips.contains(&addr.ip()) {
                ips.push(addr.ip());
            }
        }

        if ips.is_empty() {
            return Err(CensusError::resolve(host, "No addresses found"));
        }
        Ok(ips)
    }
}

/// Bounds every lookup of an inner resolver.
///
/// A lookup still running after `timeout` is dropped and reported as
/// [`CensusError::Timeout`].
#[derive(Clone, Debug)]
pub struct TimeoutResolver<R> {
    inner: R,
    timeout: Duration,
}

impl<R: Resolve> TimeoutResolver<R> {
    pub fn new(inner: R, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

#[async_trait]
impl<R: Resolve> Resolve for TimeoutResolver<R> {
    async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, CensusError> {
        tokio::time::timeout(self.timeout, self.inner.resolve(host))
            .await
            .map_err(|_| CensusError::timeout(format!("DNS lookup of {}", host), self.timeout))?
    }
}

/// Resolver answering from a fixed host table (case-insensitive).
#[derive(Clone, Debug, Default)]
pub struct StaticResolver {
    hosts: HashMap<String, Vec<IpAddr>>,
    latency: Option<Duration>,
}

impl StaticResolver {
    /// Create an empty resolver; every lookup fails.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `ips` for `host`.
    pub fn with_host<H: AsRef<str>>(mut self, host: H, ips: &[IpAddr]) -> Self {
        self.hosts
            .insert(host.as_ref().to_lowercase(), ips.to_vec());
        self
    }

    /// Delay every answer, successful or not.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }
}

#[async_trait]
impl Resolve for StaticResolver {
    async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, CensusError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        match self.hosts.get(&host.to_lowercase()) {
            Some(ips) if !ips.is_empty() => Ok(ips.clone()),
            _ => Err(CensusError::resolve(host, "NXDOMAIN")),
        }
    }
}
