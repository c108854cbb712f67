//! Standard-tier search: one bearer-authenticated GET against the recent-posts endpoint
//!
//! Only the first page is fetched. Callers wanting older posts must issue
//! further requests with provider-specific continuation parameters.

use crate::{
    auth::{Auth, Authenticator, BearerToken},
    config::ClientConfig,
    credentials::Credentials,
    error::{SearchError, SearchResult},
    types::{Query, ResultRecord, ResultSet, SearchProvider},
    utils::http::{body_excerpt, HttpClient},
};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

/// Largest page the standard endpoint returns
pub const MAX_COUNT: u32 = 100;

/// Standard endpoint response envelope
#[derive(Debug, Deserialize)]
struct StandardSearchResponse {
    statuses: Option<Vec<Value>>,
    #[serde(default)]
    search_metadata: Option<Value>,
}

/// Standard-tier search provider
#[derive(Debug)]
pub struct StandardSearchProvider {
    search_url: String,
    auth: Auth,
    authenticator: Authenticator,
    http_client: HttpClient,
}

impl StandardSearchProvider {
    /// Search with a token obtained beforehand
    pub fn with_token(token: BearerToken, config: &ClientConfig) -> SearchResult<Self> {
        Self::with_auth(Auth::Bearer(token), config)
    }

    /// Search with credentials, exchanging them for a token on every search
    pub fn with_credentials(credentials: Credentials, config: &ClientConfig) -> SearchResult<Self> {
        Self::with_auth(Auth::Credentials(credentials), config)
    }

    /// Exchange the credentials now and keep the token for later searches
    pub async fn connect(credentials: &Credentials, config: &ClientConfig) -> SearchResult<Self> {
        let authenticator = Authenticator::new(config)?;
        let token = authenticator.authenticate(credentials).await?;

        Ok(Self {
            search_url: config.endpoints.search_url.clone(),
            auth: Auth::Bearer(token),
            authenticator,
            http_client: HttpClient::new(config)?,
        })
    }

    pub fn with_auth(auth: Auth, config: &ClientConfig) -> SearchResult<Self> {
        Ok(Self {
            search_url: config.endpoints.search_url.clone(),
            auth,
            authenticator: Authenticator::new(config)?,
            http_client: HttpClient::new(config)?,
        })
    }

    /// Build the query parameters for a search request
    pub fn build_params(query: &Query) -> Vec<(String, String)> {
        let mut params = Vec::new();

        // The endpoint has no lower-bound parameter; it is a query operator instead
        let q = match query.since() {
            Some(since) => format!("{} since:{}", query.term(), since.format("%Y-%m-%d")),
            None => query.term().to_string(),
        };
        params.push(("q".to_string(), q));

        if let Some(result_type) = query.result_type() {
            params.push(("result_type".to_string(), result_type.to_string()));
        }

        if let Some(count) = query.count() {
            params.push(("count".to_string(), count.min(MAX_COUNT).to_string()));
        }

        if let Some(until) = query.until() {
            params.push(("until".to_string(), until.format("%Y-%m-%d").to_string()));
        }

        if let Some(language) = query.language() {
            params.push(("lang".to_string(), language.to_string()));
        }

        params
    }
}

#[async_trait::async_trait]
impl SearchProvider for StandardSearchProvider {
    fn name(&self) -> &str {
        "standard"
    }

    async fn search(&self, query: &Query) -> SearchResult<ResultSet> {
        query.validate()?;

        let token = self.auth.resolve(&self.authenticator).await?;

        let mut headers = HashMap::new();
        headers.insert("Authorization".to_string(), token.authorization());

        let params = Self::build_params(query);
        log::debug!("Standard search {} with {:?}", self.search_url, params);

        let response = self
            .http_client
            .get_with_headers(&self.search_url, &params, headers)
            .await?;

        if !response.is_success() {
            let error_msg = match response.status.as_u16() {
                400 => "Bad request - check your query parameters",
                401 => "Unauthorized - the bearer token was rejected",
                403 => "Forbidden - the application may not have search access",
                429 => "Rate limit exceeded - too many requests",
                500..=599 => "Search endpoint server error",
                _ => "Search request rejected",
            };

            return Err(SearchError::QueryError {
                message: format!(
                    "{error_msg} ({}): {}",
                    response.status,
                    body_excerpt(&response.body)
                ),
                status_code: Some(response.status.as_u16()),
                response_body: Some(response.body),
            });
        }

        let envelope: StandardSearchResponse = response.json()?;
        let statuses = envelope.statuses.ok_or_else(|| {
            SearchError::ParseError("Search response has no statuses array".to_string())
        })?;

        let mut records = statuses
            .into_iter()
            .map(ResultRecord::from_value)
            .collect::<SearchResult<Vec<_>>>()?;

        if let Some(count) = query.count() {
            records.truncate(count as usize);
        }

        log::info!(
            "Standard search for '{}' returned {} records",
            query.term(),
            records.len()
        );

        Ok(ResultSet::new(records).with_metadata(envelope.search_metadata))
    }

    fn config(&self) -> HashMap<String, String> {
        let mut config = HashMap::new();
        config.insert("search_url".to_string(), self.search_url.clone());
        config.insert(
            "token_url".to_string(),
            self.authenticator.token_url().to_string(),
        );
        let auth = match self.auth {
            Auth::Bearer(_) => "bearer",
            Auth::Credentials(_) => "credentials",
        };
        config.insert("auth".to_string(), auth.to_string());
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResultType;
    use chrono::NaiveDate;

    fn param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
        params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_build_params_basic() {
        let query = Query::new("barcelona")
            .with_result_type(ResultType::Recent)
            .with_count(5);
        let params = StandardSearchProvider::build_params(&query);

        assert_eq!(param(&params, "q"), Some("barcelona"));
        assert_eq!(param(&params, "result_type"), Some("recent"));
        assert_eq!(param(&params, "count"), Some("5"));
        assert_eq!(param(&params, "until"), None);
    }

    #[test]
    fn test_build_params_dates_and_cap() {
        let query = Query::new("barcelona")
            .with_count(500)
            .with_since(NaiveDate::from_ymd_opt(2019, 1, 1).unwrap())
            .with_until(NaiveDate::from_ymd_opt(2019, 2, 1).unwrap())
            .with_language("ca");
        let params = StandardSearchProvider::build_params(&query);

        assert_eq!(param(&params, "q"), Some("barcelona since:2019-01-01"));
        assert_eq!(param(&params, "count"), Some("100"));
        assert_eq!(param(&params, "until"), Some("2019-02-01"));
        assert_eq!(param(&params, "lang"), Some("ca"));
    }

    #[test]
    fn test_provider_config_hides_token() {
        let config = ClientConfig::default();
        let token = BearerToken::new("secret-token").unwrap();
        let provider = StandardSearchProvider::with_token(token, &config).unwrap();

        assert_eq!(provider.name(), "standard");
        let described = provider.config();
        assert_eq!(described.get("auth"), Some(&"bearer".to_string()));
        assert!(described.values().all(|v| !v.contains("secret-token")));
    }

    #[tokio::test]
    async fn test_search_rejects_invalid_query() {
        let config = ClientConfig::with_base_url("http://127.0.0.1:9").unwrap();
        let token = BearerToken::new("t").unwrap();
        let provider = StandardSearchProvider::with_token(token, &config).unwrap();

        let result = provider.search(&Query::new("")).await;
        assert!(matches!(result, Err(SearchError::InvalidInput(_))));
    }
}
