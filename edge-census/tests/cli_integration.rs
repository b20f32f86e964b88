// edge-census/tests/cli_integration.rs

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Nothing listens on the discard port, so every fetch is refused at once.
const CLOSED: &str = "http://127.0.0.1:9";

/// A command isolated from the user's config files and `EC_*` variables,
/// pointed at a closed local port for every network resource.
fn census_cmd(sandbox: &TempDir) -> Command {
    let base_url = format!("{}/topsites", CLOSED);
    let ipv4_url = format!("{}/ips-v4", CLOSED);
    let ipv6_url = format!("{}/ips-v6", CLOSED);

    let mut cmd = Command::cargo_bin("edge-census").unwrap();
    cmd.current_dir(sandbox.path())
        .env("HOME", sandbox.path())
        .env_remove("XDG_CONFIG_HOME")
        .env_remove("RUST_LOG")
        .env_remove("EC_CONCURRENCY")
        .env_remove("EC_PAGES")
        .env_remove("EC_PAGE_SIZE")
        .env_remove("EC_BASE_URL")
        .env_remove("EC_PROVIDER")
        .env_remove("EC_TIMEOUT")
        .env_remove("EC_CONFIG")
        .args([
            "--base-url",
            base_url.as_str(),
            "--ipv4-url",
            ipv4_url.as_str(),
            "--ipv6-url",
            ipv6_url.as_str(),
        ]);
    cmd
}

#[test]
fn test_help_lists_flags() {
    let mut cmd = Command::cargo_bin("edge-census").unwrap();
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("--pages"))
        .stdout(predicate::str::contains("--page-size"))
        .stdout(predicate::str::contains("--concurrency"))
        .stdout(predicate::str::contains("--provider"))
        .stdout(predicate::str::contains("--json"));
}

#[test]
fn test_version_flag() {
    let mut cmd = Command::cargo_bin("edge-census").unwrap();
    cmd.arg("--version");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_unreachable_sources_still_exit_zero() {
    let sandbox = TempDir::new().unwrap();
    let mut cmd = census_cmd(&sandbox);
    cmd.args(["--pages", "2", "--page-size", "3"]);

    cmd.assert()
        .success()
        .stdout("CloudFlare domains within first Top6:\n");
}

#[test]
fn test_provider_flag_changes_header() {
    let sandbox = TempDir::new().unwrap();
    let mut cmd = census_cmd(&sandbox);
    cmd.args(["--pages", "1", "--page-size", "5", "--provider", "Fastly"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::starts_with(
            "Fastly domains within first Top5:",
        ));
}

#[test]
fn test_json_output_reports_failures() {
    let sandbox = TempDir::new().unwrap();
    let mut cmd = census_cmd(&sandbox);
    cmd.args(["--pages", "2", "--page-size", "4", "--json"]);

    let output = cmd.assert().success().get_output().stdout.clone();
    let stdout = String::from_utf8(output).unwrap();
    assert!(!stdout.contains("domains within first"));

    let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(report["provider"], "CloudFlare");
    assert_eq!(report["domain_slots"], 8);
    assert_eq!(report["skipped"], 8);
    assert_eq!(report["prefix_count"], 0);
    assert_eq!(report["pages"].as_array().unwrap().len(), 2);
    assert_eq!(report["pages"][0]["status"], "failed");
    assert_eq!(report["sources"].as_array().unwrap().len(), 2);
    assert!(report["matches"].as_array().unwrap().is_empty());
}

#[test]
fn test_pretty_prints_summary_on_stderr() {
    let sandbox = TempDir::new().unwrap();
    let mut cmd = census_cmd(&sandbox);
    cmd.args(["--pages", "1", "--page-size", "2", "--pretty"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("domains within first Top2:"))
        .stderr(predicate::str::contains("0/1 pages fetched (0 domains)"));
}

#[test]
fn test_env_provider_is_used() {
    let sandbox = TempDir::new().unwrap();
    let mut cmd = census_cmd(&sandbox);
    cmd.env("EC_PROVIDER", "Akamai")
        .args(["--pages", "1", "--page-size", "1"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::starts_with("Akamai domains within first Top1:"));
}

#[test]
fn test_flag_beats_env() {
    let sandbox = TempDir::new().unwrap();
    let mut cmd = census_cmd(&sandbox);
    cmd.env("EC_PROVIDER", "Akamai")
        .args(["--pages", "1", "--page-size", "1", "--provider", "Fastly"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::starts_with("Fastly domains"));
}

#[test]
fn test_local_config_file_is_discovered() {
    let sandbox = TempDir::new().unwrap();
    fs::write(
        sandbox.path().join(".edge-census.toml"),
        "[source]\npages = 3\npage_size = 2\n\n[provider]\nname = \"Bunny\"\n",
    )
    .unwrap();

    let mut cmd = census_cmd(&sandbox);
    cmd.assert()
        .success()
        .stdout("Bunny domains within first Top6:\n");
}

#[test]
fn test_explicit_config_file() {
    let sandbox = TempDir::new().unwrap();
    let path = sandbox.path().join("scan.toml");
    fs::write(
        &path,
        "[defaults]\nconcurrency = 2\n\n[source]\npages = 1\npage_size = 7\n",
    )
    .unwrap();

    let mut cmd = census_cmd(&sandbox);
    cmd.arg("--config").arg(&path);

    cmd.assert()
        .success()
        .stdout("CloudFlare domains within first Top7:\n");
}

#[test]
fn test_missing_explicit_config_is_an_error() {
    let sandbox = TempDir::new().unwrap();
    let mut cmd = census_cmd(&sandbox);
    cmd.args(["--config", "does-not-exist.toml"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_invalid_explicit_config_is_an_error() {
    let sandbox = TempDir::new().unwrap();
    let path = sandbox.path().join("bad.toml");
    fs::write(&path, "[defaults]\nconcurrency = 0\n").unwrap();

    let mut cmd = census_cmd(&sandbox);
    cmd.arg("--config").arg(&path);

    cmd.assert()
        .failure()
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_invalid_concurrency_is_rejected() {
    let sandbox = TempDir::new().unwrap();
    let mut cmd = census_cmd(&sandbox);
    cmd.args(["-c", "0"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Concurrency must be between 1 and 100"));
}

#[test]
fn test_invalid_timeout_is_rejected() {
    let sandbox = TempDir::new().unwrap();
    let mut cmd = census_cmd(&sandbox);
    cmd.args(["--timeout", "forever"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Invalid timeout"));
}

#[test]
fn test_oversized_page_count_is_rejected() {
    let sandbox = TempDir::new().unwrap();
    let mut cmd = census_cmd(&sandbox);
    cmd.args(["--pages", "9223372036854775808", "--page-size", "2"]);

    cmd.assert()
        .code(2)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("must not exceed"));
}

#[test]
fn test_oversized_total_across_sources_is_rejected() {
    let sandbox = TempDir::new().unwrap();
    let mut cmd = census_cmd(&sandbox);
    cmd.env("EC_PAGE_SIZE", "1000").args(["--pages", "5000"]);

    cmd.assert()
        .code(2)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("exceeds the limit"));
}

#[test]
fn test_oversized_env_page_count_is_ignored() {
    let sandbox = TempDir::new().unwrap();
    let mut cmd = census_cmd(&sandbox);
    cmd.env("EC_PAGES", "9223372036854775808")
        .args(["--page-size", "2"]);

    cmd.assert()
        .success()
        .stdout("CloudFlare domains within first Top40:\n");
}
