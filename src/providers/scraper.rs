//! Scraper fallback: run an external scraping program that writes CSV
//!
//! Nothing here knows how the program scrapes. It is handed a search term,
//! an output location and optional limits on the command line, and is
//! expected to leave a CSV file behind.

use crate::error::{SearchError, SearchResult};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Program run when none is configured
pub const DEFAULT_PROGRAM: &str = "twint";

/// File the program is told to write inside the output directory
pub const CSV_FILE_NAME: &str = "tweets.csv";

/// Immutable settings for one scraper run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScraperConfig {
    program: PathBuf,
    search: String,
    output_dir: PathBuf,
    since: Option<NaiveDate>,
    limit: Option<u32>,
    hide_output: bool,
}

impl ScraperConfig {
    pub fn builder(search: &str) -> ScraperConfigBuilder {
        ScraperConfigBuilder {
            program: PathBuf::from(DEFAULT_PROGRAM),
            search: search.to_string(),
            output_dir: PathBuf::from("data"),
            since: None,
            limit: None,
            hide_output: true,
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn since(&self) -> Option<NaiveDate> {
        self.since
    }

    pub fn limit(&self) -> Option<u32> {
        self.limit
    }

    pub fn hide_output(&self) -> bool {
        self.hide_output
    }

    /// Where the program is told to write its CSV
    pub fn csv_path(&self) -> PathBuf {
        self.output_dir.join(CSV_FILE_NAME)
    }

    /// Command-line arguments passed to the program
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            "-s".to_string(),
            self.search.clone(),
            "--csv".to_string(),
            "-o".to_string(),
            self.csv_path().to_string_lossy().into_owned(),
        ];

        if let Some(since) = self.since {
            args.push("--since".to_string());
            args.push(since.format("%Y-%m-%d").to_string());
        }

        if let Some(limit) = self.limit {
            args.push("--limit".to_string());
            args.push(limit.to_string());
        }

        args
    }
}

/// Collects scraper settings before they are frozen into a [`ScraperConfig`]
#[derive(Debug, Clone)]
pub struct ScraperConfigBuilder {
    program: PathBuf,
    search: String,
    output_dir: PathBuf,
    since: Option<NaiveDate>,
    limit: Option<u32>,
    hide_output: bool,
}

impl ScraperConfigBuilder {
    pub fn program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    pub fn output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    pub fn since(mut self, since: NaiveDate) -> Self {
        self.since = Some(since);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn hide_output(mut self, hide_output: bool) -> Self {
        self.hide_output = hide_output;
        self
    }

    pub fn build(self) -> SearchResult<ScraperConfig> {
        if self.search.trim().is_empty() {
            return Err(SearchError::InvalidInput(
                "Scraper search term cannot be empty".to_string(),
            ));
        }
        if self.program.as_os_str().is_empty() {
            return Err(SearchError::ConfigError(
                "Scraper program is required".to_string(),
            ));
        }
        if self.limit == Some(0) {
            return Err(SearchError::InvalidInput(
                "Scraper limit must be at least 1".to_string(),
            ));
        }

        Ok(ScraperConfig {
            program: self.program,
            search: self.search,
            output_dir: self.output_dir,
            since: self.since,
            limit: self.limit,
            hide_output: self.hide_output,
        })
    }
}

/// Run the scraper to completion and return the CSV path it was given
pub async fn run_scraper(config: &ScraperConfig) -> SearchResult<PathBuf> {
    tokio::fs::create_dir_all(config.output_dir())
        .await
        .map_err(|e| {
            SearchError::IoError(format!(
                "Cannot create output directory {}: {e}",
                config.output_dir().display()
            ))
        })?;

    let args = config.args();
    log::debug!("Running scraper {} {:?}", config.program().display(), args);

    let stdout = if config.hide_output() {
        Stdio::null()
    } else {
        Stdio::inherit()
    };

    let output = Command::new(config.program())
        .args(&args)
        .stdin(Stdio::null())
        .stdout(stdout)
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| {
            SearchError::IoError(format!(
                "Cannot start scraper {}: {e}",
                config.program().display()
            ))
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(SearchError::ProviderError(format!(
            "Scraper {} exited with {}: {}",
            config.program().display(),
            output.status,
            stderr.trim()
        )));
    }

    let csv_path = config.csv_path();
    log::info!(
        "Scraper finished for '{}', output at {}",
        config.search(),
        csv_path.display()
    );
    Ok(csv_path)
}
