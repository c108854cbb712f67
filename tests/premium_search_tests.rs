//! Integration tests for premium search: key files, rule payloads and the
//! paged result stream, against a mock premium endpoint.

use futures::TryStreamExt;
use postsearch::{
    auth::{Auth, BearerToken},
    config::ClientConfig,
    credentials::{Credentials, KeyFile},
    error::SearchError,
    providers::premium::{
        collect_results, AccountType, PremiumSearchArgs, PremiumSearchProvider, ResultStream,
        RulePayload,
    },
    search_and_persist,
    sink::{load_aggregate, ResultSink, DEFAULT_AGGREGATE_FILE},
    types::{Query, SearchOptions},
};
use serde_json::json;
use wiremock::{
    matchers::{body_partial_json, header, method, path},
    Match, Mock, MockServer, Request, ResponseTemplate,
};

const ENDPOINT_PATH: &str = "/1.1/tweets/search/fullarchive/dev.json";

fn page(start: u64, count: u64, next: Option<&str>) -> serde_json::Value {
    let results: Vec<_> = (start..start + count)
        .map(|id| json!({"id": id, "id_str": id.to_string(), "text": format!("post {id}")}))
        .collect();
    let mut body = json!({
        "results": results,
        "requestParameters": {"maxResults": 100, "fromDate": "201902010000"}
    });
    if let Some(next) = next {
        body["next"] = json!(next);
    }
    body
}

fn bearer_args(server: &MockServer) -> PremiumSearchArgs {
    PremiumSearchArgs::new(
        &format!("{}{ENDPOINT_PATH}", server.uri()),
        AccountType::Premium,
        Auth::Bearer(BearerToken::new("premium-token").unwrap()),
    )
    .unwrap()
}

/// Matches rule payloads that carry no `next` cursor
struct FirstPage;

impl Match for FirstPage {
    fn matches(&self, request: &Request) -> bool {
        serde_json::from_slice::<serde_json::Value>(&request.body)
            .map(|body| body.get("next").is_none())
            .unwrap_or(false)
    }
}

async fn mount_three_pages(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(ENDPOINT_PATH))
        .and(body_partial_json(json!({"next": "page-3"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(21, 10, None)))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT_PATH))
        .and(body_partial_json(json!({"next": "page-2"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(11, 10, Some("page-3"))))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT_PATH))
        .and(header("authorization", "Bearer premium-token"))
        .and(body_partial_json(json!({"query": "barcelona", "maxResults": 10})))
        .and(FirstPage)
        .respond_with(ResponseTemplate::new(200).set_body_json(page(1, 10, Some("page-2"))))
        .mount(server)
        .await;
}

fn rule() -> RulePayload {
    RulePayload::new("barcelona").with_results_per_call(10)
}

#[tokio::test]
async fn test_collect_until_provider_exhausted() {
    let server = MockServer::start().await;
    mount_three_pages(&server).await;

    let results = collect_results(rule(), 500, bearer_args(&server), &ClientConfig::default())
        .await
        .unwrap();

    assert_eq!(results.len(), 30);
    let ids: Vec<String> = results.iter().filter_map(|r| r.id()).collect();
    assert_eq!(ids.first().map(String::as_str), Some("1"));
    assert_eq!(ids.last().map(String::as_str), Some("30"));
}

#[tokio::test]
async fn test_collect_stops_at_cap() {
    let server = MockServer::start().await;
    mount_three_pages(&server).await;

    let stream = ResultStream::new(rule(), 15, bearer_args(&server), &ClientConfig::default())
        .unwrap();
    let batches: Vec<_> = stream.stream().try_collect().await.unwrap();

    // Two requests: 10 records, then 5 of the next 10
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0].len(), 10);
    assert_eq!(batches[1].len(), 5);
}

#[tokio::test]
async fn test_stream_is_restartable() {
    let server = MockServer::start().await;
    mount_three_pages(&server).await;

    let stream = ResultStream::new(rule(), 25, bearer_args(&server), &ClientConfig::default())
        .unwrap();

    let first = stream.collect().await.unwrap();
    let second = stream.collect().await.unwrap();
    assert_eq!(first.len(), 25);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_max_requests_bounds_stream() {
    let server = MockServer::start().await;
    mount_three_pages(&server).await;

    let stream = ResultStream::new(rule(), 500, bearer_args(&server), &ClientConfig::default())
        .unwrap()
        .with_max_requests(1);

    assert_eq!(stream.collect().await.unwrap().len(), 10);
}

async fn mount_empty_first_page(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(ENDPOINT_PATH))
        .and(body_partial_json(json!({"next": "after-empty"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(1, 10, None)))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT_PATH))
        .and(FirstPage)
        .respond_with(ResponseTemplate::new(200).set_body_json(page(1, 0, Some("after-empty"))))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_empty_page_with_cursor_continues() {
    let server = MockServer::start().await;
    mount_empty_first_page(&server).await;

    let stream = ResultStream::new(rule(), 500, bearer_args(&server), &ClientConfig::default())
        .unwrap();
    let batches: Vec<_> = stream.stream().try_collect().await.unwrap();

    assert_eq!(batches.len(), 2);
    assert!(batches[0].is_empty());
    assert_eq!(batches[1].len(), 10);
}

#[tokio::test]
async fn test_max_requests_stops_after_empty_page() {
    let server = MockServer::start().await;
    mount_empty_first_page(&server).await;

    let stream = ResultStream::new(rule(), 500, bearer_args(&server), &ClientConfig::default())
        .unwrap()
        .with_max_requests(1);

    let results = stream.collect().await.unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn test_credentials_exchanged_once_per_stream() {
    let server = MockServer::start().await;
    mount_three_pages(&server).await;
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"access_token": "premium-token"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let args = PremiumSearchArgs::new(
        &format!("{}{ENDPOINT_PATH}", server.uri()),
        AccountType::Premium,
        Auth::Credentials(Credentials::new("k", "s").unwrap()),
    )
    .unwrap();
    let config = ClientConfig::with_base_url(&server.uri()).unwrap();

    let results = collect_results(rule(), 30, args, &config).await.unwrap();
    assert_eq!(results.len(), 30);
}

#[tokio::test]
async fn test_rejected_rule_is_query_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT_PATH))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "error": {"message": "There were errors processing your request: Reference to invalid field"}
        })))
        .mount(&server)
        .await;

    let result = collect_results(rule(), 10, bearer_args(&server), &ClientConfig::default()).await;
    match result {
        Err(SearchError::QueryError { status_code, .. }) => assert_eq!(status_code, Some(422)),
        other => panic!("Expected QueryError, got {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_page_is_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"next": "x"})))
        .mount(&server)
        .await;

    let result = collect_results(rule(), 10, bearer_args(&server), &ClientConfig::default()).await;
    assert!(matches!(result, Err(SearchError::ParseError(_))));
}

#[tokio::test]
async fn test_premium_from_key_file_to_aggregate_file() {
    let server = MockServer::start().await;
    mount_three_pages(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let key_path = dir.path().join("twitter_keys.yml");
    std::fs::write(
        &key_path,
        format!(
            "search_tweets_premium:\n  account_type: premium\n  endpoint: {}{ENDPOINT_PATH}\n  bearer_token: premium-token\n",
            server.uri()
        ),
    )
    .unwrap();

    let args = PremiumSearchArgs::load(&KeyFile::new(&key_path)).unwrap();
    let provider = PremiumSearchProvider::new(args, &ClientConfig::default());

    let out = dir.path().join("data");
    let options = SearchOptions {
        // count 10 keeps pages at the 10-result minimum the mocks expect
        query: Query::new("barcelona").with_count(10),
        provider: Box::new(provider),
        ..Default::default()
    };
    let written = search_and_persist(options, &ResultSink::aggregate(&out, DEFAULT_AGGREGATE_FILE))
        .await
        .unwrap();

    assert_eq!(written, vec![out.join(DEFAULT_AGGREGATE_FILE)]);
    assert_eq!(std::fs::read_dir(&out).unwrap().count(), 1);

    let records = load_aggregate(&written[0]).await.unwrap();
    assert_eq!(records.len(), 10);
    assert_eq!(records[0].text(), Some("post 1"));
}
