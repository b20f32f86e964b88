//! Edge Census CLI Application
//!
//! Lists the domains of a ranked top-sites list that resolve into a network
//! provider's published IP ranges. This is a thin command-line front end over
//! the edge-census-lib library.

mod ui;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::Parser;
use edge_census_lib::{
    domain_slots, load_env_config, parse_timeout_string, Census, ConfigManager, FileConfig,
    ScanConfig, MAX_DOMAIN_SLOTS,
};
use std::process;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// CLI arguments for edge-census
#[derive(Parser, Debug)]
#[command(name = "edge-census")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Find top-ranked domains served from a provider's IP ranges")]
#[command(
    long_about = "Scrape a paginated top-sites ranking, load a provider's published IPv4/IPv6 ranges and report every ranked domain that resolves inside them.\n\nAll page fetches and DNS lookups share one concurrency cap."
)]
#[command(styles = STYLES)]
pub struct Args {
    /// Number of ranking pages to fetch [default: 20]
    #[arg(long = "pages", value_name = "N", help_heading = "Source")]
    pub pages: Option<usize>,

    /// Domains listed per page [default: 25]
    #[arg(long = "page-size", value_name = "N", help_heading = "Source")]
    pub page_size: Option<usize>,

    /// URL of the first ranking page
    #[arg(long = "base-url", value_name = "URL", help_heading = "Source")]
    pub base_url: Option<String>,

    /// Suffix appended for pages after the first ({page} is the page index)
    #[arg(long = "page-suffix", value_name = "TEMPLATE", help_heading = "Source")]
    pub page_suffix: Option<String>,

    /// Provider name used in the report header [default: CloudFlare]
    #[arg(long = "provider", value_name = "NAME", help_heading = "Provider")]
    pub provider: Option<String>,

    /// URL of the provider's IPv4 range list
    #[arg(long = "ipv4-url", value_name = "URL", help_heading = "Provider")]
    pub ipv4_url: Option<String>,

    /// URL of the provider's IPv6 range list
    #[arg(long = "ipv6-url", value_name = "URL", help_heading = "Provider")]
    pub ipv6_url: Option<String>,

    /// Max page fetches and lookups in flight at once [default: 4, max: 100]
    #[arg(
        short = 'c',
        long = "concurrency",
        value_name = "N",
        help_heading = "Performance"
    )]
    pub concurrency: Option<usize>,

    /// Per-request timeout, e.g. 5s, 30s, 2m [default: 10s]
    #[arg(long = "timeout", value_name = "DURATION", help_heading = "Performance")]
    pub timeout: Option<String>,

    /// Use a specific config file instead of discovered ones
    #[arg(long = "config", value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<String>,

    /// Print the full report as JSON instead of match lines
    #[arg(
        short = 'j',
        long = "json",
        conflicts_with = "pretty",
        help_heading = "Output"
    )]
    pub json: bool,

    /// Colored match lines and a summary on stderr
    #[arg(short = 'p', long = "pretty", help_heading = "Output")]
    pub pretty: bool,

    /// Debug logging and a summary on stderr
    #[arg(short = 'v', long = "verbose", help_heading = "Output")]
    pub verbose: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(args.verbose);

    if let Err(e) = validate_args(&args) {
        eprintln!("Error: {}", e);
        process::exit(2);
    }

    let config = match build_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(2);
        }
    };

    if let Err(e) = run_census(config, &args).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Filter used when `RUST_LOG` is unset.
fn default_log_filter(verbose: bool) -> &'static str {
    if verbose {
        "warn,edge_census=debug,edge_census_lib=debug"
    } else {
        "warn"
    }
}

/// Send log events to stderr so stdout carries only the report.
fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_log_filter(verbose)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Validate command line arguments
fn validate_args(args: &Args) -> Result<(), String> {
    if let Some(concurrency) = args.concurrency {
        if concurrency == 0 || concurrency > 100 {
            return Err("Concurrency must be between 1 and 100".to_string());
        }
    }

    if args.pages == Some(0) {
        return Err("Pages must be at least 1".to_string());
    }

    if args.page_size == Some(0) {
        return Err("Page size must be at least 1".to_string());
    }

    if domain_slots(args.pages.unwrap_or(1), args.page_size.unwrap_or(1)).is_none() {
        return Err(format!(
            "Pages × page size must not exceed {} domains",
            MAX_DOMAIN_SLOTS
        ));
    }

    if let Some(timeout) = &args.timeout {
        if parse_timeout_string(timeout).is_none() {
            return Err(format!(
                "Invalid timeout '{}'. Use formats like '5s', '30s', '2m'",
                timeout
            ));
        }
    }

    for url in [&args.base_url, &args.ipv4_url, &args.ipv6_url]
        .into_iter()
        .flatten()
    {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(format!("URL must start with http:// or https://: {}", url));
        }
    }

    Ok(())
}

/// Build the scan configuration: defaults, then config files, then
/// environment, then command line flags.
fn build_config(args: &Args) -> Result<ScanConfig, Box<dyn std::error::Error>> {
    let env_config = load_env_config();
    let config_manager = ConfigManager::new();

    let explicit_file = args.config.as_ref().or(env_config.config.as_ref());
    let file_config: FileConfig = match explicit_file {
        Some(path) => config_manager.load_file(path)?,
        None => config_manager.discover_and_load(),
    };

    let mut config = file_config.apply(ScanConfig::default());
    config = env_config.apply(config);
    let config = apply_args(config, args);
    config.validate()?;
    Ok(config)
}

/// Overlay the flags the user actually passed.
fn apply_args(mut config: ScanConfig, args: &Args) -> ScanConfig {
    if let Some(pages) = args.pages {
        config = config.with_pages(pages);
    }
    if let Some(page_size) = args.page_size {
        config = config.with_page_size(page_size);
    }
    if let Some(base_url) = &args.base_url {
        config = config.with_base_url(base_url.clone());
    }
    if let Some(page_suffix) = &args.page_suffix {
        config = config.with_page_suffix(page_suffix.clone());
    }
    if let Some(provider) = &args.provider {
        config = config.with_provider(provider.clone());
    }
    if let Some(ipv4_url) = &args.ipv4_url {
        config.ipv4_url = ipv4_url.clone();
    }
    if let Some(ipv6_url) = &args.ipv6_url {
        config.ipv6_url = ipv6_url.clone();
    }
    if let Some(concurrency) = args.concurrency {
        config = config.with_concurrency(concurrency);
    }
    if let Some(secs) = args.timeout.as_deref().and_then(parse_timeout_string) {
        config = config.with_timeout(Duration::from_secs(secs));
    }
    config
}

/// Run one census and print its output.
///
/// Fetch and lookup failures are part of the report, not errors: once the
/// census is built this always succeeds.
async fn run_census(config: ScanConfig, args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    tracing::debug!(
        pages = config.pages,
        page_size = config.page_size,
        concurrency = config.concurrency,
        provider = %config.provider,
        "starting census"
    );

    let census = Census::new(config)?;

    let spinner = if args.pretty {
        ui::Spinner::start(format!(
            "Fetching {} ranking pages and {} ranges...",
            census.config().pages,
            census.config().provider
        ))
    } else {
        None
    };
    let prepared = census.prepare().await;
    if let Some(spinner) = spinner {
        spinner.stop().await;
    }

    if !args.json {
        ui::print_header(&census.header(), args.pretty);
    }

    let report = census
        .check(prepared, |found| {
            if !args.json {
                ui::print_match(found, args.pretty);
            }
        })
        .await;

    if args.json {
        ui::print_json(&report)?;
    } else if args.pretty || args.verbose {
        ui::print_summary(&report);
    }

    Ok(())
}
