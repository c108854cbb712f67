//! CLI integration tests
//!
//! These tests run the postsearch binary through cargo and check argument
//! handling plus the failures that happen before any network call.

use std::process::Command;

const CLI_BINARY: &str = "postsearch";

/// Run the CLI with the given arguments, minus any credential variables
fn run_cli_command(args: &[&str]) -> (String, String, bool) {
    let output = Command::new("cargo")
        .args(["run", "--quiet", "--bin", CLI_BINARY, "--"])
        .args(args)
        .env_remove("APP_KEY")
        .env_remove("APP_SECRET")
        .env_remove("POSTSEARCH_API_BASE_URL")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();

    (stdout, stderr, success)
}

#[test]
fn test_cli_help() {
    let (stdout, _stderr, success) = run_cli_command(&["--help"]);

    assert!(success, "Help command should succeed");
    assert!(stdout.contains("Search social-media posts"));
    assert!(stdout.contains("token"));
    assert!(stdout.contains("standard"));
    assert!(stdout.contains("premium"));
    assert!(stdout.contains("scrape"));
}

#[test]
fn test_cli_version() {
    let (stdout, _stderr, success) = run_cli_command(&["--version"]);

    assert!(success, "Version command should succeed");
    assert!(stdout.contains("postsearch"));
}

#[test]
fn test_standard_search_help() {
    let (stdout, _stderr, success) = run_cli_command(&["standard", "--help"]);

    assert!(success);
    assert!(stdout.contains("--result-type"));
    assert!(stdout.contains("--count"));
    assert!(stdout.contains("--since"));
    assert!(stdout.contains("--until"));
    assert!(stdout.contains("--language"));
    assert!(stdout.contains("--output-dir"));
    assert!(stdout.contains("--aggregate"));
    assert!(stdout.contains("--key-file"));
}

#[test]
fn test_premium_search_help() {
    let (stdout, _stderr, success) = run_cli_command(&["premium", "--help"]);

    assert!(success);
    assert!(stdout.contains("--from-date"));
    assert!(stdout.contains("--to-date"));
    assert!(stdout.contains("--max-results"));
    assert!(stdout.contains("--max-requests"));
    assert!(stdout.contains("--env-overwrite"));
    assert!(stdout.contains("tweets_premium.json"));
}

#[test]
fn test_scrape_help() {
    let (stdout, _stderr, success) = run_cli_command(&["scrape", "--help"]);

    assert!(success);
    assert!(stdout.contains("--program"));
    assert!(stdout.contains("--limit"));
    assert!(stdout.contains("--show-output"));
}

#[test]
fn test_invalid_result_type() {
    let (_stdout, stderr, success) =
        run_cli_command(&["standard", "barcelona", "--result-type", "trending"]);

    assert!(!success, "Unknown result type should be rejected");
    assert!(stderr.contains("invalid value"));
}

#[test]
fn test_invalid_date() {
    let (_stdout, stderr, success) =
        run_cli_command(&["standard", "barcelona", "--since", "01/02/2019"]);

    assert!(!success);
    assert!(stderr.contains("--since"));
}

#[test]
fn test_missing_query() {
    let (_stdout, stderr, success) = run_cli_command(&["standard"]);

    assert!(!success);
    assert!(stderr.contains("<QUERY>"));
}

#[test]
fn test_missing_credentials() {
    let (_stdout, stderr, success) = run_cli_command(&["token"]);

    assert!(!success, "Token exchange without credentials should fail");
    assert!(stderr.contains("APP_KEY"));
}

#[test]
fn test_standard_missing_credentials() {
    let (_stdout, stderr, success) =
        run_cli_command(&["standard", "barcelona", "--no-save", "--key-var", "POSTSEARCH_TEST_KEY"]);

    assert!(!success);
    assert!(stderr.contains("POSTSEARCH_TEST_KEY"));
}

#[test]
fn test_premium_missing_key_file() {
    let dir = tempfile::tempdir().unwrap();
    let key_file = dir.path().join("absent.yml");

    let (_stdout, stderr, success) = run_cli_command(&[
        "premium",
        "barcelona",
        "--no-save",
        "--key-file",
        key_file.to_str().unwrap(),
    ]);

    assert!(!success);
    assert!(stderr.contains("absent.yml"));
}

#[test]
fn test_scrape_missing_program() {
    let dir = tempfile::tempdir().unwrap();
    let output_dir = dir.path().join("data");

    let (_stdout, stderr, success) = run_cli_command(&[
        "scrape",
        "barcelona",
        "--program",
        "postsearch-no-such-scraper",
        "--output-dir",
        output_dir.to_str().unwrap(),
    ]);

    assert!(!success);
    assert!(stderr.contains("scraper search failed"));
}
