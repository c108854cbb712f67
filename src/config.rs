//! Client configuration passed explicitly into the authenticator and providers

use crate::error::{SearchError, SearchResult};
use url::Url;

/// Default API host for the token and standard search endpoints
pub const DEFAULT_API_BASE_URL: &str = "https://api.twitter.com/";

/// Default per-request timeout
pub const DEFAULT_TIMEOUT_MS: u64 = 15000;

const TOKEN_PATH: &str = "oauth2/token";
const SEARCH_PATH: &str = "1.1/search/tweets.json";

/// Token exchange and standard search URLs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub token_url: String,
    pub search_url: String,
}

impl Endpoints {
    /// Derive both endpoints from an API base URL
    pub fn with_base_url(base_url: &str) -> SearchResult<Self> {
        if base_url.trim().is_empty() {
            return Err(SearchError::ConfigError(
                "API base URL is required".to_string(),
            ));
        }

        // Url::join drops the last path segment unless the base ends with '/'
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let base = Url::parse(&normalized)?;

        Ok(Self {
            token_url: base.join(TOKEN_PATH)?.to_string(),
            search_url: base.join(SEARCH_PATH)?.to_string(),
        })
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            token_url: format!("{DEFAULT_API_BASE_URL}{TOKEN_PATH}"),
            search_url: format!("{DEFAULT_API_BASE_URL}{SEARCH_PATH}"),
        }
    }
}

/// Settings shared by every network call of a run
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub endpoints: Endpoints,
    /// Per-request timeout; `None` leaves the transport default in place
    pub timeout_ms: Option<u64>,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoints: Endpoints::default(),
            timeout_ms: Some(DEFAULT_TIMEOUT_MS),
            user_agent: concat!("postsearch/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ClientConfig {
    /// Config pointing at a different API host (mock servers, proxies)
    pub fn with_base_url(base_url: &str) -> SearchResult<Self> {
        Ok(Self {
            endpoints: Endpoints::with_base_url(base_url)?,
            ..Default::default()
        })
    }

    pub fn with_timeout(mut self, timeout_ms: Option<u64>) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}
