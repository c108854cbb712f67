//! Premium / historical search
//!
//! A [`RulePayload`] is POSTed to the premium endpoint. Results come back in
//! pages linked by a `next` cursor; [`ResultStream`] walks those pages as a
//! finite stream of batches, stopping once the caller's cap is reached or the
//! endpoint stops handing out cursors.

use crate::{
    auth::{Auth, Authenticator, BearerToken},
    config::ClientConfig,
    credentials::{KeyFile, KeyFileEntry},
    error::{SearchError, SearchResult},
    types::{Query, ResultRecord, ResultSet, SearchProvider},
    utils::http::{body_excerpt, HttpClient},
};
use chrono::NaiveDate;
use futures::{Stream, TryStreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Results per call when the caller does not say otherwise
pub const DEFAULT_RESULTS_PER_CALL: u32 = 100;

/// Smallest page the premium endpoints accept
pub const MIN_RESULTS_PER_CALL: u32 = 10;

/// Premium product tier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountType {
    Premium,
    Enterprise,
    Sandbox,
}

impl AccountType {
    /// Largest `maxResults` the tier accepts per request
    pub fn max_results_per_call(self) -> u32 {
        match self {
            AccountType::Sandbox => 100,
            AccountType::Premium | AccountType::Enterprise => 500,
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountType::Premium => write!(f, "premium"),
            AccountType::Enterprise => write!(f, "enterprise"),
            AccountType::Sandbox => write!(f, "sandbox"),
        }
    }
}

impl FromStr for AccountType {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "premium" => Ok(AccountType::Premium),
            "enterprise" => Ok(AccountType::Enterprise),
            "sandbox" => Ok(AccountType::Sandbox),
            other => Err(SearchError::ConfigError(format!(
                "Unknown account type '{other}' (expected premium, enterprise or sandbox)"
            ))),
        }
    }
}

/// Body of a premium search request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RulePayload {
    query: String,
    #[serde(rename = "maxResults")]
    max_results: u32,
    #[serde(rename = "fromDate", skip_serializing_if = "Option::is_none")]
    from_date: Option<String>,
    #[serde(rename = "toDate", skip_serializing_if = "Option::is_none")]
    to_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    next: Option<String>,
}

impl RulePayload {
    pub fn new(query: &str) -> Self {
        Self {
            query: query.to_string(),
            max_results: DEFAULT_RESULTS_PER_CALL,
            from_date: None,
            to_date: None,
            next: None,
        }
    }

    /// Rule for a [`Query`]; the count is not applied here, it caps the stream
    pub fn from_query(query: &Query) -> Self {
        let mut rule = Self::new(query.term());
        if let Some(since) = query.since() {
            rule = rule.with_from_date(since);
        }
        if let Some(until) = query.until() {
            rule = rule.with_to_date(until);
        }
        rule
    }

    pub fn with_from_date(mut self, date: NaiveDate) -> Self {
        self.from_date = Some(format_rule_date(date));
        self
    }

    pub fn with_to_date(mut self, date: NaiveDate) -> Self {
        self.to_date = Some(format_rule_date(date));
        self
    }

    pub fn with_results_per_call(mut self, results_per_call: u32) -> Self {
        self.max_results = results_per_call;
        self
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn results_per_call(&self) -> u32 {
        self.max_results
    }

    pub fn from_date(&self) -> Option<&str> {
        self.from_date.as_deref()
    }

    pub fn to_date(&self) -> Option<&str> {
        self.to_date.as_deref()
    }

    pub fn validate(&self, account_type: AccountType) -> SearchResult<()> {
        if self.query.trim().is_empty() {
            return Err(SearchError::InvalidInput(
                "Rule query cannot be empty".to_string(),
            ));
        }

        let max = account_type.max_results_per_call();
        if !(MIN_RESULTS_PER_CALL..=max).contains(&self.max_results) {
            return Err(SearchError::InvalidInput(format!(
                "results_per_call must be between {MIN_RESULTS_PER_CALL} and {max} for {account_type} accounts, got {}",
                self.max_results
            )));
        }

        if let (Some(from), Some(to)) = (&self.from_date, &self.to_date) {
            // Same fixed-width format, so string order is date order
            if from > to {
                return Err(SearchError::InvalidInput(format!(
                    "fromDate {from} is after toDate {to}"
                )));
            }
        }

        Ok(())
    }

    fn with_next(&self, next: Option<&str>) -> Self {
        Self {
            next: next.map(str::to_string),
            ..self.clone()
        }
    }
}

fn format_rule_date(date: NaiveDate) -> String {
    format!("{}0000", date.format("%Y%m%d"))
}

/// Where and how to reach a premium endpoint
#[derive(Debug, Clone)]
pub struct PremiumSearchArgs {
    pub endpoint: String,
    pub account_type: AccountType,
    pub auth: Auth,
}

impl PremiumSearchArgs {
    pub fn new(endpoint: &str, account_type: AccountType, auth: Auth) -> SearchResult<Self> {
        if endpoint.trim().is_empty() {
            return Err(SearchError::ConfigError(
                "Premium endpoint is required".to_string(),
            ));
        }
        url::Url::parse(endpoint)?;

        Ok(Self {
            endpoint: endpoint.to_string(),
            account_type,
            auth,
        })
    }

    /// Build from a key file section, preferring a stored bearer token
    pub fn from_key_file_entry(entry: &KeyFileEntry) -> SearchResult<Self> {
        let endpoint = entry.endpoint.as_deref().ok_or_else(|| {
            SearchError::ConfigError("Key file section has no endpoint".to_string())
        })?;

        let account_type = match entry.account_type.as_deref() {
            Some(account_type) => account_type.parse()?,
            None => AccountType::Premium,
        };

        let auth = match entry.bearer_token.as_deref() {
            Some(token) if !token.is_empty() => Auth::Bearer(BearerToken::new(token)?),
            _ => Auth::Credentials(entry.credentials().map_err(|_| {
                SearchError::ConfigError(
                    "Key file section needs a bearer_token or consumer_key and consumer_secret"
                        .to_string(),
                )
            })?),
        };

        Self::new(endpoint, account_type, auth)
    }

    pub fn load(key_file: &KeyFile) -> SearchResult<Self> {
        Self::from_key_file_entry(&key_file.load()?)
    }
}

/// One page of a premium search
#[derive(Debug, Deserialize)]
struct PremiumResponse {
    results: Option<Vec<Value>>,
    next: Option<String>,
}

#[derive(Debug, Default)]
struct Cursor {
    token: Option<BearerToken>,
    next: Option<String>,
    fetched: usize,
    requests: usize,
    exhausted: bool,
}

/// Bounded producer of result batches for one rule
///
/// Each call to [`ResultStream::stream`] starts again from the first page.
#[derive(Debug)]
pub struct ResultStream {
    rule: RulePayload,
    max_results: usize,
    max_requests: Option<usize>,
    args: PremiumSearchArgs,
    authenticator: Authenticator,
    http_client: HttpClient,
}

impl ResultStream {
    pub fn new(
        rule: RulePayload,
        max_results: usize,
        args: PremiumSearchArgs,
        config: &ClientConfig,
    ) -> SearchResult<Self> {
        rule.validate(args.account_type)?;
        if max_results == 0 {
            return Err(SearchError::InvalidInput(
                "max_results must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            rule,
            max_results,
            max_requests: None,
            args,
            authenticator: Authenticator::new(config)?,
            http_client: HttpClient::new(config)?,
        })
    }

    /// Stop after this many requests even if more pages exist
    pub fn with_max_requests(mut self, max_requests: usize) -> Self {
        self.max_requests = Some(max_requests);
        self
    }

    pub fn max_results(&self) -> usize {
        self.max_results
    }

    /// Pages of results, in order, ending at the cap or the last page
    pub fn stream(&self) -> impl Stream<Item = SearchResult<Vec<ResultRecord>>> + '_ {
        futures::stream::try_unfold(Cursor::default(), move |cursor| self.next_batch(cursor))
    }

    /// Drain the stream into one result set
    pub async fn collect(&self) -> SearchResult<ResultSet> {
        let batches: Vec<Vec<ResultRecord>> = self.stream().try_collect().await?;
        let records: Vec<ResultRecord> = batches.into_iter().flatten().collect();

        log::info!(
            "Premium search for '{}' collected {} records",
            self.rule.query,
            records.len()
        );

        Ok(ResultSet::new(records))
    }

    async fn next_batch(
        &self,
        mut cursor: Cursor,
    ) -> SearchResult<Option<(Vec<ResultRecord>, Cursor)>> {
        if cursor.exhausted || cursor.fetched >= self.max_results {
            return Ok(None);
        }
        if let Some(max_requests) = self.max_requests {
            if cursor.requests >= max_requests {
                return Ok(None);
            }
        }

        let token = match cursor.token.take() {
            Some(token) => token,
            None => self.args.auth.resolve(&self.authenticator).await?,
        };

        let page = self.fetch_page(&token, cursor.next.as_deref()).await?;
        cursor.requests += 1;

        let mut records = page
            .results
            .unwrap_or_default()
            .into_iter()
            .map(ResultRecord::from_value)
            .collect::<SearchResult<Vec<_>>>()?;
        records.truncate(self.max_results - cursor.fetched);

        cursor.fetched += records.len();
        cursor.exhausted = page.next.is_none();
        cursor.next = page.next;
        cursor.token = Some(token);

        log::debug!(
            "Premium page {} yielded {} records ({} total)",
            cursor.requests,
            records.len(),
            cursor.fetched
        );

        Ok(Some((records, cursor)))
    }

    async fn fetch_page(
        &self,
        token: &BearerToken,
        next: Option<&str>,
    ) -> SearchResult<PremiumResponse> {
        let mut headers = HashMap::new();
        headers.insert("Authorization".to_string(), token.authorization());

        let payload = self.rule.with_next(next);
        let response = self
            .http_client
            .post_json_with_headers(&self.args.endpoint, &payload, headers)
            .await?;

        if !response.is_success() {
            return Err(SearchError::QueryError {
                message: format!(
                    "Premium search rejected ({}): {}",
                    response.status,
                    body_excerpt(&response.body)
                ),
                status_code: Some(response.status.as_u16()),
                response_body: Some(response.body),
            });
        }

        let page: PremiumResponse = response.json()?;
        if page.results.is_none() {
            return Err(SearchError::ParseError(
                "Premium response has no results array".to_string(),
            ));
        }
        Ok(page)
    }
}

/// Collect up to `max_results` records for a rule
pub async fn collect_results(
    rule: RulePayload,
    max_results: usize,
    args: PremiumSearchArgs,
    config: &ClientConfig,
) -> SearchResult<ResultSet> {
    ResultStream::new(rule, max_results, args, config)?
        .collect()
        .await
}

/// Premium search behind the common provider trait
#[derive(Debug)]
pub struct PremiumSearchProvider {
    args: PremiumSearchArgs,
    config: ClientConfig,
    max_requests: Option<usize>,
}

impl PremiumSearchProvider {
    pub fn new(args: PremiumSearchArgs, config: &ClientConfig) -> Self {
        Self {
            args,
            config: config.clone(),
            max_requests: None,
        }
    }

    pub fn with_max_requests(mut self, max_requests: usize) -> Self {
        self.max_requests = Some(max_requests);
        self
    }

    /// Stream for a query: the count caps the total, pages are as large as the tier allows
    pub fn result_stream(&self, query: &Query) -> SearchResult<ResultStream> {
        query.validate()?;

        let max_results = query.count().unwrap_or(DEFAULT_RESULTS_PER_CALL);
        let per_call = max_results.clamp(
            MIN_RESULTS_PER_CALL,
            self.args.account_type.max_results_per_call(),
        );
        let rule = RulePayload::from_query(query).with_results_per_call(per_call);

        let stream = ResultStream::new(rule, max_results as usize, self.args.clone(), &self.config)?;
        Ok(match self.max_requests {
            Some(max_requests) => stream.with_max_requests(max_requests),
            None => stream,
        })
    }
}

#[async_trait::async_trait]
impl SearchProvider for PremiumSearchProvider {
    fn name(&self) -> &str {
        "premium"
    }

    async fn search(&self, query: &Query) -> SearchResult<ResultSet> {
        self.result_stream(query)?.collect().await
    }

    fn config(&self) -> HashMap<String, String> {
        let mut config = HashMap::new();
        config.insert("endpoint".to_string(), self.args.endpoint.clone());
        config.insert("account_type".to_string(), self.args.account_type.to_string());
        config
    }
}
