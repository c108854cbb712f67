//! HTTP utilities for talking to the token and search endpoints

use crate::config::ClientConfig;
use crate::error::{SearchError, SearchResult};
use reqwest::header::{HeaderName, HeaderValue};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;

/// Status and body of a completed request
///
/// Non-success statuses are returned as-is so each caller can map them to
/// its own error kind.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Deserialize the body, reporting malformed JSON as a parse error
    pub fn json<T>(&self) -> SearchResult<T>
    where
        T: DeserializeOwned,
    {
        serde_json::from_str(&self.body).map_err(|e| {
            SearchError::ParseError(format!("Failed to parse response body: {e}"))
        })
    }
}

/// HTTP client wrapper with search-specific functionality
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    timeout_ms: Option<u64>,
}

impl HttpClient {
    /// Create a client from the run's configuration
    pub fn new(config: &ClientConfig) -> SearchResult<Self> {
        let mut builder = Client::builder().user_agent(config.user_agent.clone());
        if let Some(timeout_ms) = config.timeout_ms {
            builder = builder.timeout(Duration::from_millis(timeout_ms));
        }

        let client = builder.build().map_err(|e| {
            SearchError::ConfigError(format!("Failed to create HTTP client: {e}"))
        })?;

        Ok(Self {
            client,
            timeout_ms: config.timeout_ms,
        })
    }

    /// Make a GET request with query parameters and headers
    pub async fn get_with_headers(
        &self,
        url: &str,
        params: &[(String, String)],
        headers: HashMap<String, String>,
    ) -> SearchResult<HttpResponse> {
        let request = self.client.get(url).query(params);
        self.send(request, headers).await
    }

    /// Make a POST request with form data and headers
    pub async fn post_form_with_headers(
        &self,
        url: &str,
        form_data: HashMap<String, String>,
        headers: HashMap<String, String>,
    ) -> SearchResult<HttpResponse> {
        let request = self.client.post(url).form(&form_data);
        self.send(request, headers).await
    }

    /// Make a POST request with a JSON body and headers
    pub async fn post_json_with_headers<B>(
        &self,
        url: &str,
        body: &B,
        headers: HashMap<String, String>,
    ) -> SearchResult<HttpResponse>
    where
        B: Serialize + ?Sized,
    {
        let request = self.client.post(url).json(body);
        self.send(request, headers).await
    }

    /// Send the request; explicit headers replace any the body builder set
    async fn send(
        &self,
        request: RequestBuilder,
        headers: HashMap<String, String>,
    ) -> SearchResult<HttpResponse> {
        let mut request = request.build().map_err(|e| self.transport_error(e))?;
        for (key, value) in headers {
            let name = HeaderName::from_bytes(key.as_bytes()).map_err(|e| {
                SearchError::InvalidInput(format!("Invalid header name '{key}': {e}"))
            })?;
            let value = HeaderValue::from_str(&value).map_err(|e| {
                SearchError::InvalidInput(format!("Invalid value for header '{key}': {e}"))
            })?;
            request.headers_mut().insert(name, value);
        }

        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| self.transport_error(e))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;

        Ok(HttpResponse { status, body })
    }

    fn transport_error(&self, error: reqwest::Error) -> SearchError {
        match (error.is_timeout(), self.timeout_ms) {
            (true, Some(timeout_ms)) => SearchError::Timeout { timeout_ms },
            _ => SearchError::from(error),
        }
    }
}

/// Extract a short, single-line excerpt of a response body for error messages
pub fn body_excerpt(body: &str) -> String {
    const MAX_CHARS: usize = 200;
    let normalized = body.split_whitespace().collect::<Vec<_>>().join(" ");
    if normalized.chars().count() > MAX_CHARS {
        let truncated: String = normalized.chars().take(MAX_CHARS).collect();
        format!("{truncated}...")
    } else {
        normalized
    }
}
