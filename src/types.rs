//! Core types and traits for post search

use crate::error::SearchError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

/// One matched post, kept as the provider returned it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultRecord(Map<String, Value>);

impl ResultRecord {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Convert a JSON value, rejecting anything that is not an object
    pub fn from_value(value: Value) -> Result<Self, SearchError> {
        match value {
            Value::Object(fields) => Ok(Self(fields)),
            other => Err(SearchError::ParseError(format!(
                "Expected a JSON object for a result record, got: {other}"
            ))),
        }
    }

    /// Unique identifier: `id_str`, falling back to `id`
    pub fn id(&self) -> Option<String> {
        if let Some(Value::String(id)) = self.0.get("id_str") {
            return Some(id.clone());
        }
        match self.0.get("id") {
            Some(Value::String(id)) => Some(id.clone()),
            Some(Value::Number(id)) => Some(id.to_string()),
            _ => None,
        }
    }

    /// Post text: `full_text` for extended posts, otherwise `text`
    pub fn text(&self) -> Option<&str> {
        self.0
            .get("full_text")
            .or_else(|| self.0.get("text"))
            .and_then(Value::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

/// Ordered records from one search, plus whatever envelope metadata came with them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub records: Vec<ResultRecord>,
    pub metadata: Option<Value>,
}

impl ResultSet {
    pub fn new(records: Vec<ResultRecord>) -> Self {
        Self {
            records,
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Option<Value>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ResultRecord> {
        self.records.iter()
    }
}

impl IntoIterator for ResultSet {
    type Item = ResultRecord;
    type IntoIter = std::vec::IntoIter<ResultRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a ResultRecord;
    type IntoIter = std::slice::Iter<'a, ResultRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Debug options for post search
#[derive(Debug, Clone, Default)]
pub struct DebugOptions {
    /// Enable verbose logging
    pub enabled: bool,
    /// Log request details (URLs, parameters)
    pub log_requests: bool,
    /// Log response summaries
    pub log_responses: bool,
}

/// Which ranking the standard search should apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultType {
    Mixed,
    Recent,
    Popular,
}

impl fmt::Display for ResultType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultType::Mixed => write!(f, "mixed"),
            ResultType::Recent => write!(f, "recent"),
            ResultType::Popular => write!(f, "popular"),
        }
    }
}

/// A search term with its optional filters
///
/// Built by value; once constructed the fields can only be read.
///
/// ```rust
/// use postsearch::types::{Query, ResultType};
///
/// let query = Query::new("barcelona")
///     .with_result_type(ResultType::Recent)
///     .with_count(5);
/// assert_eq!(query.count(), Some(5));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    term: String,
    result_type: Option<ResultType>,
    count: Option<u32>,
    since: Option<NaiveDate>,
    until: Option<NaiveDate>,
    language: Option<String>,
}

impl Query {
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            result_type: None,
            count: None,
            since: None,
            until: None,
            language: None,
        }
    }

    pub fn with_result_type(mut self, result_type: ResultType) -> Self {
        self.result_type = Some(result_type);
        self
    }

    pub fn with_count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self
    }

    /// Lower date bound (inclusive)
    pub fn with_since(mut self, since: NaiveDate) -> Self {
        self.since = Some(since);
        self
    }

    /// Upper date bound (exclusive, as the endpoints treat it)
    pub fn with_until(mut self, until: NaiveDate) -> Self {
        self.until = Some(until);
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn result_type(&self) -> Option<ResultType> {
        self.result_type
    }

    pub fn count(&self) -> Option<u32> {
        self.count
    }

    pub fn since(&self) -> Option<NaiveDate> {
        self.since
    }

    pub fn until(&self) -> Option<NaiveDate> {
        self.until
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    pub fn validate(&self) -> Result<(), SearchError> {
        if self.term.trim().is_empty() {
            return Err(SearchError::InvalidInput(
                "A search term is required".to_string(),
            ));
        }
        if self.count == Some(0) {
            return Err(SearchError::InvalidInput(
                "Result count must be at least 1".to_string(),
            ));
        }
        if let (Some(since), Some(until)) = (self.since, self.until) {
            if since > until {
                return Err(SearchError::InvalidInput(format!(
                    "Lower date bound {since} is after upper bound {until}"
                )));
            }
        }
        Ok(())
    }
}

/// Options for a single search call
#[derive(Debug)]
pub struct SearchOptions {
    /// The query to run
    pub query: Query,
    /// Debug options
    pub debug: Option<DebugOptions>,
    /// The search provider to use
    pub provider: Box<dyn SearchProvider>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            query: Query::new(""),
            debug: None,
            provider: Box::new(DummyProvider), // Will be replaced
        }
    }
}

/// Trait that every search backend implements
#[async_trait::async_trait]
pub trait SearchProvider: Send + Sync + std::fmt::Debug {
    /// Name of the search provider
    fn name(&self) -> &str;

    /// Run one query and return the first batch the backend yields
    async fn search(&self, query: &Query) -> Result<ResultSet, SearchError>;

    /// Get provider configuration (for debugging/logging)
    fn config(&self) -> HashMap<String, String> {
        HashMap::new()
    }
}

/// Dummy provider for default implementation (should not be used)
#[derive(Debug)]
struct DummyProvider;

#[async_trait::async_trait]
impl SearchProvider for DummyProvider {
    fn name(&self) -> &str {
        "dummy"
    }

    async fn search(&self, _query: &Query) -> Result<ResultSet, SearchError> {
        Err(SearchError::InvalidInput(
            "No provider configured".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> ResultRecord {
        ResultRecord::from_value(value).unwrap()
    }

    #[test]
    fn test_record_id_prefers_id_str() {
        let r = record(json!({"id": 1100000000000000001u64, "id_str": "1100000000000000001"}));
        assert_eq!(r.id(), Some("1100000000000000001".to_string()));

        let numeric = record(json!({"id": 42}));
        assert_eq!(numeric.id(), Some("42".to_string()));

        let string_id = record(json!({"id": "abc"}));
        assert_eq!(string_id.id(), Some("abc".to_string()));

        assert_eq!(record(json!({"text": "no id"})).id(), None);
    }

    #[test]
    fn test_record_text() {
        assert_eq!(record(json!({"text": "hola"})).text(), Some("hola"));
        assert_eq!(
            record(json!({"text": "short", "full_text": "long version"})).text(),
            Some("long version")
        );
        assert_eq!(record(json!({"id": 1})).text(), None);
    }

    #[test]
    fn test_record_rejects_non_objects() {
        assert!(matches!(
            ResultRecord::from_value(json!([1, 2])),
            Err(SearchError::ParseError(_))
        ));
        assert!(ResultRecord::from_value(json!("text")).is_err());
    }

    #[test]
    fn test_record_serializes_transparently() {
        let value = json!({"id_str": "7", "text": "hi", "user": {"screen_name": "fcb"}});
        let r = record(value.clone());
        assert_eq!(serde_json::to_value(&r).unwrap(), value);
    }

    #[test]
    fn test_query_builder_and_validation() {
        let query = Query::new("barcelona")
            .with_result_type(ResultType::Recent)
            .with_count(5)
            .with_language("es");
        assert_eq!(query.term(), "barcelona");
        assert_eq!(query.result_type(), Some(ResultType::Recent));
        assert_eq!(query.language(), Some("es"));
        assert!(query.validate().is_ok());

        assert!(Query::new("  ").validate().is_err());
        assert!(Query::new("x").with_count(0).validate().is_err());

        let since = NaiveDate::from_ymd_opt(2019, 2, 1).unwrap();
        let until = NaiveDate::from_ymd_opt(2019, 1, 1).unwrap();
        let inverted = Query::new("x").with_since(since).with_until(until);
        match inverted.validate() {
            Err(SearchError::InvalidInput(msg)) => assert!(msg.contains("after")),
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_result_type_display() {
        assert_eq!(ResultType::Mixed.to_string(), "mixed");
        assert_eq!(ResultType::Recent.to_string(), "recent");
        assert_eq!(ResultType::Popular.to_string(), "popular");
    }

    #[tokio::test]
    async fn test_dummy_provider_errors() {
        let options = SearchOptions::default();
        let result = options.provider.search(&options.query).await;
        assert!(matches!(result, Err(SearchError::InvalidInput(_))));
    }
}
