//! Terminal output for edge-census.
//!
//! Match lines and the header go to stdout. Everything decorative (spinner,
//! summary) goes to stderr so piped output stays the plain report.

use console::{style, Term};
use edge_census_lib::{Match, ScanReport};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

// ── Spinner ──────────────────────────────────────────────────────────────────

const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// An async braille-dot spinner that writes to stderr so stdout stays clean.
pub struct Spinner {
    running: Arc<AtomicBool>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl Spinner {
    /// Start a spinner with the given message.
    ///
    /// Returns `None` when stderr is not a terminal.
    pub fn start(message: String) -> Option<Self> {
        let term = Term::stderr();
        if !term.is_term() {
            return None;
        }

        let running = Arc::new(AtomicBool::new(true));
        let running_clone = running.clone();

        let handle = tokio::spawn(async move {
            let mut idx = 0usize;
            while running_clone.load(Ordering::Relaxed) {
                let frame = SPINNER_FRAMES[idx % SPINNER_FRAMES.len()];
                let _ = term.clear_line();
                let _ = term.write_str(&format!("{} {}", style(frame).cyan(), message));
                idx += 1;
                tokio::time::sleep(Duration::from_millis(80)).await;
            }
            let _ = term.clear_line();
        });

        Some(Self {
            running,
            handle: Some(handle),
        })
    }

    /// Stop the spinner and clear the line.
    pub async fn stop(mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(h) = self.handle.take() {
            let _ = h.await;
        }
    }
}

// ── Report lines ─────────────────────────────────────────────────────────────

/// Print the report header.
pub fn print_header(header: &str, pretty: bool) {
    if pretty {
        println!("{}", style(header).bold());
    } else {
        println!("{}", header);
    }
}

/// Print one match line, `"{rank:>3}. {domain}"`.
pub fn print_match(found: &Match, pretty: bool) {
    if pretty {
        println!("{}", format_pretty_match(found));
    } else {
        println!("{}", found);
    }
}

fn format_pretty_match(found: &Match) -> String {
    format!(
        "{} {}",
        style(format!("{:>3}.", found.rank)).dim(),
        style(&found.domain).bold()
    )
}

/// Print the whole report as pretty JSON.
pub fn print_json(report: &ScanReport) -> Result<(), serde_json::Error> {
    let json = serde_json::to_string_pretty(report)?;
    println!("{}", json);
    Ok(())
}

// ── Summary ──────────────────────────────────────────────────────────────────

/// Print run totals to stderr.
pub fn print_summary(report: &ScanReport) {
    let elapsed = Duration::from_millis(report.elapsed_ms);

    eprintln!(
        "  {}",
        style("────────────────────────────────────────────────────").dim()
    );
    eprintln!(
        "  {} match{} in {:.1}s  {}  {} resolved  {}  {} unresolved  {}  {} empty",
        style(report.matches.len()).bold(),
        if report.matches.len() == 1 { "" } else { "es" },
        elapsed.as_secs_f64(),
        style("|").dim(),
        style(report.resolved).green(),
        style("|").dim(),
        style(report.unresolved).yellow(),
        style("|").dim(),
        style(report.skipped).dim(),
    );

    let pages_ok = report.pages.len() - report.failed_pages();
    let sources_ok = report.sources.len() - report.failed_sources();
    let listed: usize = report.pages.iter().map(|p| p.links()).sum();
    eprintln!(
        "  {} pages fetched ({} domains)  {}  {} range sources loaded ({} prefixes)",
        colored_ratio(pages_ok, report.pages.len()),
        listed,
        style("|").dim(),
        colored_ratio(sources_ok, report.sources.len()),
        report.prefix_count,
    );

    for page in report.pages.iter().filter(|p| p.is_failed()) {
        eprintln!("  {} page {} ({})", style("✗").red(), page.page, page.url);
    }
    for source in &report.sources {
        if let Some(error) = &source.error {
            eprintln!("  {} {}: {}", style("✗").red(), source.url, error);
        }
    }
}

/// `ok/total`, green when complete and yellow otherwise.
fn colored_ratio(ok: usize, total: usize) -> String {
    let text = format!("{}/{}", ok, total);
    if ok == total {
        style(text).green().to_string()
    } else {
        style(text).yellow().to_string()
    }
}
