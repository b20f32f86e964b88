//! Configuration file parsing and management.
//!
//! Settings come from (lowest to highest precedence) built-in defaults, TOML
//! config files, `EC_*` environment variables and finally the command line.
//! This module covers the first three; the CLI layers its flags on top.

use crate::error::CensusError;
use crate::types::{domain_slots, ScanConfig, MAX_DOMAIN_SLOTS};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration loaded from TOML files.
///
/// ```toml
/// [defaults]
/// concurrency = 8
/// timeout = "15s"
///
/// [source]
/// base_url = "http://www.alexa.com/topsites"
/// page_suffix = "/global;{page}"
/// pages = 20
/// page_size = 25
///
/// [provider]
/// name = "CloudFlare"
/// ipv4_url = "https://www.cloudflare.com/ips-v4"
/// ipv6_url = "https://www.cloudflare.com/ips-v6"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct FileConfig {
    /// Runtime defaults
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,

    /// Ranked-list source
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceConfig>,

    /// Network provider whose ranges are checked
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderConfig>,
}

/// Default values that map to CLI options.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DefaultsConfig {
    /// Admission cap
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,

    /// Per-operation timeout (as string, e.g., "5s", "30s")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
}

/// Where the ranked list comes from.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct SourceConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_suffix: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<usize>,
}

/// Which provider's ranges to check against.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ProviderConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipv4_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipv6_url: Option<String>,
}

impl FileConfig {
    /// Overlay the values present in this file onto `config`.
    ///
    /// The file is assumed to have passed validation.
    pub fn apply(&self, mut config: ScanConfig) -> ScanConfig {
        if let Some(defaults) = &self.defaults {
            if let Some(concurrency) = defaults.concurrency {
                config = config.with_concurrency(concurrency);
            }
            if let Some(secs) = defaults.timeout.as_deref().and_then(parse_timeout_string) {
                config = config.with_timeout(Duration::from_secs(secs));
            }
        }

        if let Some(source) = &self.source {
            if let Some(base_url) = &source.base_url {
                config = config.with_base_url(base_url.clone());
            }
            if let Some(page_suffix) = &source.page_suffix {
                config = config.with_page_suffix(page_suffix.clone());
            }
            if let Some(pages) = source.pages {
                config = config.with_pages(pages);
            }
            if let Some(page_size) = source.page_size {
                config = config.with_page_size(page_size);
            }
        }

        if let Some(provider) = &self.provider {
            if let Some(name) = &provider.name {
                config = config.with_provider(name.clone());
            }
            if let Some(ipv4_url) = &provider.ipv4_url {
                config.ipv4_url = ipv4_url.clone();
            }
            if let Some(ipv6_url) = &provider.ipv6_url {
                config.ipv6_url = ipv6_url.clone();
            }
        }

        config
    }
}

/// Configuration discovery and loading functionality.
#[derive(Debug, Default)]
pub struct ConfigManager;

impl ConfigManager {
    /// Create a new configuration manager.
    pub fn new() -> Self {
        Self
    }

    /// Load configuration from a specific file.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<FileConfig, CensusError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(CensusError::file_error(
                path.to_string_lossy(),
                "Configuration file not found",
            ));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            CensusError::file_error(
                path.to_string_lossy(),
                format!("Failed to read configuration file: {}", e),
            )
        })?;

        let config: FileConfig = toml::from_str(&content).map_err(|e| {
            CensusError::config(format!("Failed to parse TOML configuration: {}", e))
        })?;

        self.validate_config(&config)?;

        Ok(config)
    }

    /// Discover and load configuration files in precedence order.
    ///
    /// Files that fail to load are skipped with a warning; discovery is
    /// best-effort, unlike an explicitly named file.
    pub fn discover_and_load(&self) -> FileConfig {
        let candidates = [
            self.get_xdg_config_path(),
            self.get_global_config_path(),
            self.get_local_config_path(),
        ];

        let mut merged_config = FileConfig::default();
        for path in candidates.into_iter().flatten() {
            match self.load_file(&path) {
                Ok(config) => {
                    tracing::debug!(path = %path.display(), "loaded config file");
                    merged_config = self.merge_configs(merged_config, config);
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "ignoring config file");
                }
            }
        }

        merged_config
    }

    /// Get the local configuration file path.
    fn get_local_config_path(&self) -> Option<PathBuf> {
        let candidates = ["./edge-census.toml", "./.edge-census.toml"];

        candidates
            .iter()
            .map(Path::new)
            .find(|path| path.exists())
            .map(Path::to_path_buf)
    }

    /// Get the global configuration file path.
    fn get_global_config_path(&self) -> Option<PathBuf> {
        let home = env::var_os("HOME")?;
        [".edge-census.toml", "edge-census.toml"]
            .iter()
            .map(|candidate| Path::new(&home).join(candidate))
            .find(|path| path.exists())
    }

    /// Get the XDG configuration file path.
    fn get_xdg_config_path(&self) -> Option<PathBuf> {
        let config_dir = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| Path::new(&home).join(".config")))?;

        let path = config_dir.join("edge-census").join("config.toml");
        if path.exists() {
            Some(path)
        } else {
            None
        }
    }

    /// Merge two configurations with proper precedence.
    ///
    /// Values from `higher` take precedence over values from `lower`.
    pub fn merge_configs(&self, lower: FileConfig, higher: FileConfig) -> FileConfig {
        FileConfig {
            defaults: match (lower.defaults, higher.defaults) {
                (Some(mut lower_defaults), Some(higher_defaults)) => {
                    if higher_defaults.concurrency.is_some() {
                        lower_defaults.concurrency = higher_defaults.concurrency;
                    }
                    if higher_defaults.timeout.is_some() {
                        lower_defaults.timeout = higher_defaults.timeout;
                    }
                    Some(lower_defaults)
                }
                (lower_defaults, higher_defaults) => higher_defaults.or(lower_defaults),
            },
            source: match (lower.source, higher.source) {
                (Some(mut lower_source), Some(higher_source)) => {
                    if higher_source.base_url.is_some() {
                        lower_source.base_url = higher_source.base_url;
                    }
                    if higher_source.page_suffix.is_some() {
                        lower_source.page_suffix = higher_source.page_suffix;
                    }
                    if higher_source.pages.is_some() {
                        lower_source.pages = higher_source.pages;
                    }
                    if higher_source.page_size.is_some() {
                        lower_source.page_size = higher_source.page_size;
                    }
                    Some(lower_source)
                }
                (lower_source, higher_source) => higher_source.or(lower_source),
            },
            provider: match (lower.provider, higher.provider) {
                (Some(mut lower_provider), Some(higher_provider)) => {
                    if higher_provider.name.is_some() {
                        lower_provider.name = higher_provider.name;
                    }
                    if higher_provider.ipv4_url.is_some() {
                        lower_provider.ipv4_url = higher_provider.ipv4_url;
                    }
                    if higher_provider.ipv6_url.is_some() {
                        lower_provider.ipv6_url = higher_provider.ipv6_url;
                    }
                    Some(lower_provider)
                }
                (lower_provider, higher_provider) => higher_provider.or(lower_provider),
            },
        }
    }

    /// Validate a configuration for common issues.
    fn validate_config(&self, config: &FileConfig) -> Result<(), CensusError> {
        if let Some(defaults) = &config.defaults {
            if let Some(concurrency) = defaults.concurrency {
                if concurrency == 0 || concurrency > 100 {
                    return Err(CensusError::config(
                        "Concurrency must be between 1 and 100",
                    ));
                }
            }

            if let Some(timeout_str) = &defaults.timeout {
                if parse_timeout_string(timeout_str).is_none() {
                    return Err(CensusError::config(format!(
                        "Invalid timeout format '{}'. Use format like '5s', '30s', '2m'",
                        timeout_str
                    )));
                }
            }
        }

        if let Some(source) = &config.source {
            if source.pages == Some(0) {
                return Err(CensusError::config("Page count must be at least 1"));
            }
            if source.page_size == Some(0) {
                return Err(CensusError::config("Page size must be at least 1"));
            }
            let pages = source.pages.unwrap_or(1);
            let page_size = source.page_size.unwrap_or(1);
            if domain_slots(pages, page_size).is_none() {
                return Err(CensusError::config(format!(
                    "pages × page_size must not exceed {} domains",
                    MAX_DOMAIN_SLOTS
                )));
            }
            if let Some(base_url) = &source.base_url {
                validate_url("source.base_url", base_url)?;
            }
        }

        if let Some(provider) = &config.provider {
            for (field, url) in [
                ("provider.ipv4_url", &provider.ipv4_url),
                ("provider.ipv6_url", &provider.ipv6_url),
            ] {
                if let Some(url) = url {
                    validate_url(field, url)?;
                }
            }
        }

        Ok(())
    }
}

fn validate_url(field: &str, url: &str) -> Result<(), CensusError> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(CensusError::config(format!(
            "'{}' must be an http(s) URL, got '{}'",
            field, url
        )))
    }
}

/// Environment variable configuration that mirrors CLI options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvConfig {
    pub concurrency: Option<usize>,
    pub pages: Option<usize>,
    pub page_size: Option<usize>,
    pub base_url: Option<String>,
    pub provider: Option<String>,
    pub timeout: Option<Duration>,
    pub config: Option<String>,
}

impl EnvConfig {
    /// Overlay the values present in the environment onto `config`.
    pub fn apply(&self, mut config: ScanConfig) -> ScanConfig {
        if let Some(concurrency) = self.concurrency {
            config = config.with_concurrency(concurrency);
        }
        if let Some(pages) = self.pages {
            config = config.with_pages(pages);
        }
        if let Some(page_size) = self.page_size {
            config = config.with_page_size(page_size);
        }
        if let Some(base_url) = &self.base_url {
            config = config.with_base_url(base_url.clone());
        }
        if let Some(provider) = &self.provider {
            config = config.with_provider(provider.clone());
        }
        if let Some(timeout) = self.timeout {
            config = config.with_timeout(timeout);
        }
        config
    }
}

/// Load configuration from `EC_*` environment variables.
///
/// Invalid values are logged as warnings and ignored.
pub fn load_env_config() -> EnvConfig {
    load_env_config_from(|key| env::var(key).ok())
}

/// Same as [`load_env_config`], reading variables through `lookup`.
pub fn load_env_config_from<F>(lookup: F) -> EnvConfig
where
    F: Fn(&str) -> Option<String>,
{
    let mut env_config = EnvConfig::default();

    if let Some(val) = lookup("EC_CONCURRENCY") {
        match val.trim().parse::<usize>() {
            Ok(concurrency) if (1..=100).contains(&concurrency) => {
                env_config.concurrency = Some(concurrency);
            }
            _ => tracing::warn!("Invalid EC_CONCURRENCY='{}', must be 1-100", val),
        }
    }

    if let Some(val) = lookup("EC_PAGES") {
        match val.trim().parse::<usize>() {
            Ok(pages) if pages > 0 && domain_slots(pages, 1).is_some() => {
                env_config.pages = Some(pages)
            }
            _ => tracing::warn!(
                "Invalid EC_PAGES='{}', must be between 1 and {}",
                val,
                MAX_DOMAIN_SLOTS
            ),
        }
    }

    if let Some(val) = lookup("EC_PAGE_SIZE") {
        match val.trim().parse::<usize>() {
            Ok(page_size) if page_size > 0 && domain_slots(page_size, 1).is_some() => {
                env_config.page_size = Some(page_size)
            }
            _ => tracing::warn!(
                "Invalid EC_PAGE_SIZE='{}', must be between 1 and {}",
                val,
                MAX_DOMAIN_SLOTS
            ),
        }
    }

    if let Some(val) = lookup("EC_BASE_URL") {
        match validate_url("EC_BASE_URL", val.trim()) {
            Ok(()) => env_config.base_url = Some(val.trim().to_string()),
            Err(e) => tracing::warn!("{}", e),
        }
    }

    if let Some(val) = lookup("EC_PROVIDER") {
        if !val.trim().is_empty() {
            env_config.provider = Some(val.trim().to_string());
        }
    }

    if let Some(val) = lookup("EC_TIMEOUT") {
        match parse_timeout_string(&val) {
            Some(secs) => env_config.timeout = Some(Duration::from_secs(secs)),
            None => tracing::warn!(
                "Invalid EC_TIMEOUT='{}', use format like '5s', '30s', '2m'",
                val
            ),
        }
    }

    if let Some(val) = lookup("EC_CONFIG") {
        if !val.trim().is_empty() {
            env_config.config = Some(val.trim().to_string());
        }
    }

    env_config
}

/// Parse a timeout string like `5s`, `30s`, `2m` or a bare number of seconds.
///
/// Returns the timeout in seconds; zero is rejected.
pub fn parse_timeout_string(timeout_str: &str) -> Option<u64> {
    let timeout_str = timeout_str.trim().to_lowercase();

    let secs = if let Some(s) = timeout_str.strip_suffix('s') {
        s.parse::<u64>().ok()
    } else if let Some(m) = timeout_str.strip_suffix('m') {
        m.parse::<u64>().ok().map(|m| m * 60)
    } else {
        // Assume seconds if no unit
        timeout_str.parse::<u64>().ok()
    };

    secs.filter(|&s| s > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn test_parse_timeout_string() {
        assert_eq!(parse_timeout_string("5s"), Some(5));
        assert_eq!(parse_timeout_string("30s"), Some(30));
        assert_eq!(parse_timeout_string("2m"), Some(120));
        assert_eq!(parse_timeout_string("5"), Some(5));
        assert_eq!(parse_timeout_string(" 10S "), Some(10));
        assert_eq!(parse_timeout_string("0s"), None);
        assert_eq!(parse_timeout_string("invalid"), None);
        assert_eq!(parse_timeout_string(""), None);
    }

    #[test]
    fn test_load_valid_config() {
        let file = write_config(
            r#"
[defaults]
concurrency = 8
timeout = "15s"

[source]
pages = 2
page_size = 10

[provider]
name = "Fastly"
ipv4_url = "https://example.test/v4"
"#,
        );

        let config = ConfigManager::new().load_file(file.path()).unwrap();
        let defaults = config.defaults.as_ref().unwrap();
        assert_eq!(defaults.concurrency, Some(8));
        assert_eq!(defaults.timeout.as_deref(), Some("15s"));

        let scan = config.apply(ScanConfig::default());
        assert_eq!(scan.concurrency, 8);
        assert_eq!(scan.timeout, Duration::from_secs(15));
        assert_eq!(scan.capacity(), 20);
        assert_eq!(scan.provider, "Fastly");
        assert_eq!(scan.ipv4_url, "https://example.test/v4");
        // Untouched fields keep their defaults
        assert_eq!(scan.ipv6_url, crate::types::DEFAULT_IPV6_URL);
        assert_eq!(scan.base_url, crate::types::DEFAULT_BASE_URL);
    }

    #[test]
    fn test_invalid_concurrency() {
        let file = write_config("[defaults]\nconcurrency = 0\n");
        let err = ConfigManager::new().load_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("between 1 and 100"));
    }

    #[test]
    fn test_invalid_page_size_and_url() {
        let file = write_config("[source]\npage_size = 0\n");
        assert!(ConfigManager::new().load_file(file.path()).is_err());

        let file = write_config("[provider]\nipv6_url = \"ftp://example.test/v6\"\n");
        let err = ConfigManager::new().load_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("provider.ipv6_url"));
    }

    #[test]
    fn test_oversized_source_is_rejected() {
        let file = write_config("[source]\npages = 1000000\npage_size = 2\n");
        let err = ConfigManager::new().load_file(file.path()).unwrap_err();
        assert!(matches!(err, CensusError::ConfigError { .. }));
        assert!(err.to_string().contains("must not exceed"));

        let file = write_config("[source]\npages = 2000000\n");
        assert!(ConfigManager::new().load_file(file.path()).is_err());
    }

    #[test]
    fn test_missing_and_malformed_files() {
        let manager = ConfigManager::new();
        let err = manager.load_file("/nonexistent/edge-census.toml").unwrap_err();
        assert!(matches!(err, CensusError::FileError { .. }));

        let file = write_config("[defaults\nconcurrency = ");
        let err = manager.load_file(file.path()).unwrap_err();
        assert!(matches!(err, CensusError::ConfigError { .. }));
    }

    #[test]
    fn test_merge_configs() {
        let manager = ConfigManager::new();
        let lower = FileConfig {
            defaults: Some(DefaultsConfig {
                concurrency: Some(4),
                timeout: Some("5s".to_string()),
            }),
            source: Some(SourceConfig {
                pages: Some(20),
                ..Default::default()
            }),
            provider: None,
        };
        let higher = FileConfig {
            defaults: Some(DefaultsConfig {
                concurrency: Some(16),
                timeout: None,
            }),
            source: None,
            provider: Some(ProviderConfig {
                name: Some("Akamai".to_string()),
                ..Default::default()
            }),
        };

        let merged = manager.merge_configs(lower, higher);
        let defaults = merged.defaults.unwrap();
        assert_eq!(defaults.concurrency, Some(16));
        assert_eq!(defaults.timeout.as_deref(), Some("5s"));
        assert_eq!(merged.source.unwrap().pages, Some(20));
        assert_eq!(merged.provider.unwrap().name.as_deref(), Some("Akamai"));
    }

    #[test]
    fn test_env_config_parsing() {
        let vars: HashMap<&str, &str> = [
            ("EC_CONCURRENCY", "12"),
            ("EC_PAGES", "3"),
            ("EC_PAGE_SIZE", "abc"),
            ("EC_BASE_URL", "not-a-url"),
            ("EC_PROVIDER", "Fastly"),
            ("EC_TIMEOUT", "1m"),
        ]
        .into_iter()
        .collect();

        let env_config = load_env_config_from(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(env_config.concurrency, Some(12));
        assert_eq!(env_config.pages, Some(3));
        assert_eq!(env_config.page_size, None);
        assert_eq!(env_config.base_url, None);
        assert_eq!(env_config.provider.as_deref(), Some("Fastly"));
        assert_eq!(env_config.timeout, Some(Duration::from_secs(60)));

        let scan = env_config.apply(ScanConfig::default());
        assert_eq!(scan.concurrency, 12);
        assert_eq!(scan.capacity(), 75);
    }

    #[test]
    fn test_env_config_rejects_out_of_range_concurrency() {
        let env_config =
            load_env_config_from(|key| (key == "EC_CONCURRENCY").then(|| "500".to_string()));
        assert_eq!(env_config, EnvConfig::default());
    }

    #[test]
    fn test_env_config_ignores_oversized_page_counts() {
        let vars: HashMap<&str, &str> = [
            ("EC_PAGES", "9223372036854775808"),
            ("EC_PAGE_SIZE", "1000001"),
        ]
        .into_iter()
        .collect();
        let env_config = load_env_config_from(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(env_config.pages, None);
        assert_eq!(env_config.page_size, None);
    }
}
