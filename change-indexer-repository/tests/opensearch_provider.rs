//! Integration tests for the OpenSearch provider.
//!
//! These tests run the real provider against a mock HTTP server that imitates the
//! OpenSearch REST API responses the provider depends on.

use change_indexer_repository::{
    ConnectionSettings, IndexBootstrap, OpenSearchProvider, SearchIndexError, SearchIndexProvider,
    UpsertDocumentRequest, UpsertOutcome,
};
use serde_json::json;
use wiremock::matchers::{body_json, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const INDEX: &str = "wikimedia";

fn provider_for(server: &MockServer) -> OpenSearchProvider {
    let settings: ConnectionSettings = server.uri().parse().unwrap();
    OpenSearchProvider::new(&settings).unwrap()
}

#[tokio::test]
async fn test_index_exists_true() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/wikimedia"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let provider = provider_for(&server);

    assert!(provider.index_exists(INDEX).await.unwrap());
}

#[tokio::test]
async fn test_index_exists_false() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/wikimedia"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let provider = provider_for(&server);

    assert!(!provider.index_exists(INDEX).await.unwrap());
}

#[tokio::test]
async fn test_index_exists_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/wikimedia"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let provider = provider_for(&server);

    let result = provider.index_exists(INDEX).await;
    assert!(matches!(result, Err(SearchIndexError::IndexLookupError(_))));
}

#[tokio::test]
async fn test_ensure_index_creates_missing_index() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/wikimedia"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/wikimedia"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "acknowledged": true,
            "shards_acknowledged": true,
            "index": "wikimedia"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = provider_for(&server);

    let bootstrap = provider.ensure_index_exists(INDEX).await.unwrap();
    assert_eq!(bootstrap, IndexBootstrap::Created);
}

#[tokio::test]
async fn test_ensure_index_leaves_existing_index_untouched() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/wikimedia"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/wikimedia"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let provider = provider_for(&server);

    // Running the bootstrap twice must not fail and must never issue a create.
    for _ in 0..2 {
        let bootstrap = provider.ensure_index_exists(INDEX).await.unwrap();
        assert_eq!(bootstrap, IndexBootstrap::AlreadyExists);
    }
}

#[tokio::test]
async fn test_ensure_index_tolerates_concurrent_creation() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/wikimedia"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/wikimedia"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {
                "type": "resource_already_exists_exception",
                "reason": "index [wikimedia/abc] already exists"
            },
            "status": 400
        })))
        .mount(&server)
        .await;

    let provider = provider_for(&server);

    let bootstrap = provider.ensure_index_exists(INDEX).await.unwrap();
    assert_eq!(bootstrap, IndexBootstrap::AlreadyExists);
}

#[tokio::test]
async fn test_create_index_failure() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/wikimedia"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": { "type": "security_exception", "reason": "no permissions" },
            "status": 403
        })))
        .mount(&server)
        .await;

    let provider = provider_for(&server);

    let result = provider.create_index(INDEX).await;
    assert!(matches!(result, Err(SearchIndexError::IndexCreationError(_))));
}

#[tokio::test]
async fn test_upsert_document_sends_raw_payload() {
    let server = MockServer::start().await;
    let payload = r#"{"meta":{"id":"abc"},"title":"Main Page","length":{"new":10}}"#;
    Mock::given(path("/wikimedia/_doc/abc"))
        .and(body_json(json!({
            "meta": { "id": "abc" },
            "title": "Main Page",
            "length": { "new": 10 }
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "_index": "wikimedia",
            "_id": "abc",
            "_version": 1,
            "result": "created"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let request = UpsertDocumentRequest::new(INDEX, "abc", payload);

    let result = provider.upsert_document(&request).await.unwrap();
    assert_eq!(result.document_id, "abc");
    assert_eq!(result.outcome, UpsertOutcome::Created);
    assert_eq!(result.version, Some(1));
}

#[tokio::test]
async fn test_upsert_document_overwrite_reports_updated() {
    let server = MockServer::start().await;
    Mock::given(path("/wikimedia/_doc/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_index": "wikimedia",
            "_id": "abc",
            "_version": 2,
            "result": "updated"
        })))
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let request = UpsertDocumentRequest::new(INDEX, "abc", r#"{"meta":{"id":"abc"}}"#);

    let result = provider.upsert_document(&request).await.unwrap();
    assert_eq!(result.outcome, UpsertOutcome::Updated);
    assert_eq!(result.version, Some(2));
}

#[tokio::test]
async fn test_upsert_document_rejected() {
    let server = MockServer::start().await;
    Mock::given(path("/wikimedia/_doc/abc"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {
                "type": "illegal_argument_exception",
                "reason": "Limit of mapping depth [20] has been exceeded"
            },
            "status": 400
        })))
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let request = UpsertDocumentRequest::new(INDEX, "abc", r#"{"meta":{"id":"abc"}}"#);

    let result = provider.upsert_document(&request).await;
    assert!(matches!(result, Err(SearchIndexError::IndexError(_))));
}

#[tokio::test]
async fn test_upsert_document_invalid_body_is_not_sent() {
    let server = MockServer::start().await;
    Mock::given(path("/wikimedia/_doc/abc"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let request = UpsertDocumentRequest::new(INDEX, "abc", "{not json");

    let result = provider.upsert_document(&request).await;
    assert!(matches!(result, Err(SearchIndexError::SerializationError(_))));
}

#[tokio::test]
async fn test_upsert_document_empty_id_rejected() {
    let server = MockServer::start().await;
    let provider = provider_for(&server);
    let request = UpsertDocumentRequest::new(INDEX, "", "{}");

    let result = provider.upsert_document(&request).await;
    assert!(matches!(result, Err(SearchIndexError::ValidationError(_))));
}

#[tokio::test]
async fn test_basic_auth_from_connection_string() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/wikimedia"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let address = server.address();
    let settings: ConnectionSettings = format!("http://user:pass@{}", address).parse().unwrap();
    let provider = OpenSearchProvider::new(&settings).unwrap();

    assert!(provider.index_exists(INDEX).await.unwrap());
}
