//! # postsearch
//!
//! Search social-media posts by keyword and keep the results as JSON files.
//!
//! Three retrieval paths share one [`SearchProvider`] trait:
//!
//! - [`providers::StandardSearchProvider`]: OAuth2 client-credentials token
//!   exchange, then one GET against the standard search endpoint
//! - [`providers::PremiumSearchProvider`]: rule payloads against a premium
//!   endpoint, paged through a bounded [`providers::ResultStream`]
//! - [`providers::scraper`]: an external scraping program, as a fallback
//!
//! Results are written by a [`sink::ResultSink`], either one file per record
//! or one aggregate file.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use postsearch::{
//!     config::ClientConfig,
//!     credentials::{CredentialProvider, EnvCredentials},
//!     providers::StandardSearchProvider,
//!     search_and_persist,
//!     sink::ResultSink,
//!     types::{Query, ResultType},
//!     SearchOptions,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::default();
//!     let credentials = EnvCredentials::default().get_credentials()?;
//!     let provider = StandardSearchProvider::connect(&credentials, &config).await?;
//!
//!     let written = search_and_persist(
//!         SearchOptions {
//!             query: Query::new("barcelona")
//!                 .with_result_type(ResultType::Recent)
//!                 .with_count(5),
//!             provider: Box::new(provider),
//!             ..Default::default()
//!         },
//!         &ResultSink::per_record("data"),
//!     )
//!     .await?;
//!
//!     println!("wrote {} files", written.len());
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod config;
pub mod credentials;
pub mod error;
pub mod providers;
pub mod sink;
pub mod types;
pub mod utils;

use std::path::PathBuf;

// Re-export common types
pub use error::{SearchError, SearchResult as Result};
pub use types::{DebugOptions, Query, ResultRecord, ResultSet, SearchOptions, SearchProvider};

/// Run one search with the configured provider
///
/// Errors are returned unchanged; a troubleshooting hint is logged alongside.
pub async fn search_posts(options: SearchOptions) -> Result<ResultSet> {
    use utils::debug::{trace, Channel};

    options.query.validate()?;

    let debug = options.debug.as_ref();
    let provider_name = options.provider.name();
    trace(
        debug,
        Channel::General,
        &format!("searching '{}' with {provider_name}", options.query.term()),
    );
    trace(
        debug,
        Channel::Request,
        &format!("provider configuration {:?}", options.provider.config()),
    );

    match options.provider.search(&options.query).await {
        Ok(results) => {
            trace(
                debug,
                Channel::Response,
                &format!("received {} results", results.len()),
            );
            Ok(results)
        }
        Err(error) => {
            let hint = troubleshooting_hint(provider_name, &error);
            trace(debug, Channel::General, &format!("search failed: {error}"));
            log::warn!("Search with provider '{provider_name}' failed: {error}. {hint}");
            Err(error)
        }
    }
}

/// Search, then hand the result set to the sink
///
/// Returns the paths written. Nothing is written if the search fails.
pub async fn search_and_persist(
    options: SearchOptions,
    sink: &sink::ResultSink,
) -> Result<Vec<PathBuf>> {
    let results = search_posts(options).await?;
    sink.persist(&results).await
}

/// Suggest what to check after a failed search
pub fn troubleshooting_hint(provider_name: &str, error: &SearchError) -> String {
    let by_status = match error.status_code() {
        Some(401 | 403) => Some("This is likely an authentication issue. Check your application key and secret, or the bearer token, and make sure the app has search access."),
        Some(400) => Some("This is likely due to invalid request parameters. Check your query and its filters."),
        Some(429) => Some("You've exceeded the rate limit for this API. Try again later or reduce your request frequency."),
        Some(500..=599) => Some("The search endpoint is experiencing server issues. Try again later."),
        _ => None,
    };
    if let Some(hint) = by_status {
        return hint.to_string();
    }

    match error {
        SearchError::ConfigError(_) => {
            "Check that the credentials are present in the environment or the key file section you selected.".to_string()
        }
        SearchError::ParseError(_) => {
            "The endpoint answered with an unexpected body. Check that the configured URL points at the right API.".to_string()
        }
        SearchError::IoError(_) => {
            "Check that the destination directory is writable.".to_string()
        }
        SearchError::Timeout { .. } => {
            "The request timed out. Raise the timeout or check your network connection.".to_string()
        }
        _ => match provider_name {
            "premium" => "Check that the premium endpoint and account type in your key file match your subscription.".to_string(),
            "scraper" => "Check that the scraper program is installed and on your PATH.".to_string(),
            _ => format!("Check your {provider_name} credentials and make sure your search request is valid."),
        },
    }
}
