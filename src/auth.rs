//! OAuth2 client-credentials exchange for application bearer tokens

use crate::{
    config::ClientConfig,
    credentials::Credentials,
    error::{SearchError, SearchResult},
    utils::http::{body_excerpt, HttpClient},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;

/// Application-only bearer token
///
/// Expiry is not tracked; a token lives for the run that obtained it.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn new(token: &str) -> SearchResult<Self> {
        if token.trim().is_empty() {
            return Err(SearchError::ConfigError(
                "Bearer token cannot be empty".to_string(),
            ));
        }
        Ok(Self(token.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Value for the `Authorization` header
    pub fn authorization(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken(***)")
    }
}

/// How a request gets its bearer token
#[derive(Debug, Clone)]
pub enum Auth {
    /// Token obtained earlier
    Bearer(BearerToken),
    /// Credentials exchanged for a token on demand
    Credentials(Credentials),
}

impl Auth {
    /// Return the held token, or exchange the credentials for one
    pub async fn resolve(&self, authenticator: &Authenticator) -> SearchResult<BearerToken> {
        match self {
            Auth::Bearer(token) => Ok(token.clone()),
            Auth::Credentials(credentials) => authenticator.authenticate(credentials).await,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token_type: Option<String>,
    access_token: Option<String>,
}

/// `Authorization: Basic` value for a key/secret pair
pub fn basic_authorization(credentials: &Credentials) -> String {
    let pair = format!("{}:{}", credentials.key(), credentials.secret());
    format!("Basic {}", STANDARD.encode(pair))
}

/// Exchanges credentials at the token endpoint
#[derive(Debug, Clone)]
pub struct Authenticator {
    token_url: String,
    http_client: HttpClient,
}

impl Authenticator {
    pub fn new(config: &ClientConfig) -> SearchResult<Self> {
        Ok(Self {
            token_url: config.endpoints.token_url.clone(),
            http_client: HttpClient::new(config)?,
        })
    }

    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    /// Issue one token request; no retry on failure
    pub async fn authenticate(&self, credentials: &Credentials) -> SearchResult<BearerToken> {
        let mut headers = HashMap::new();
        headers.insert("Authorization".to_string(), basic_authorization(credentials));
        headers.insert(
            "Content-Type".to_string(),
            "application/x-www-form-urlencoded;charset=UTF-8".to_string(),
        );

        let mut form = HashMap::new();
        form.insert("grant_type".to_string(), "client_credentials".to_string());

        log::debug!("Requesting bearer token from {}", self.token_url);
        let response = self
            .http_client
            .post_form_with_headers(&self.token_url, form, headers)
            .await?;

        if !response.is_success() {
            let error_msg = match response.status.as_u16() {
                400 => "Bad request - the token exchange was malformed",
                401 | 403 => "Unauthorized - check your application key and secret",
                429 => "Rate limit exceeded - too many token requests",
                500..=599 => "Token endpoint server error",
                _ => "Token exchange rejected",
            };

            return Err(SearchError::AuthenticationError {
                message: format!(
                    "{error_msg} ({}): {}",
                    response.status,
                    body_excerpt(&response.body)
                ),
                status_code: Some(response.status.as_u16()),
            });
        }

        let token_response: TokenResponse = response.json()?;
        if let Some(token_type) = &token_response.token_type {
            if !token_type.eq_ignore_ascii_case("bearer") {
                log::warn!("Token endpoint returned unexpected token_type '{token_type}'");
            }
        }

        match token_response.access_token {
            Some(token) if !token.is_empty() => Ok(BearerToken(token)),
            _ => Err(SearchError::ParseError(
                "Token response has no access_token field".to_string(),
            )),
        }
    }
}
