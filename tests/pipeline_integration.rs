use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode},
};
use base64::{Engine, engine::general_purpose::STANDARD};
use httpmock::{
    Method::{GET, POST},
    MockServer,
    prelude::HttpMockRequest,
};
use lease_pipeline::{
    api,
    app::AppState,
    config::{Config, Endpoints},
    refresher::document_id,
};
use serde_json::{Value, json};
use std::sync::Mutex;
use tower::ServiceExt;

const DOCS: &str = "/v1/projects/demo-project/databases/lease-metadata/documents";
const PARENT: &str = "projects/424242/locations/global/collections/default_collection/dataStores/leases-ds/branches/0";
const PDF_URI: &str = "gs://lease-uploads/lease-sample/Ontario_Standard_Lease.pdf";

fn config(server: &MockServer, overwrite: bool) -> Config {
    let base = server.base_url();
    Config {
        project_id: "demo-project".into(),
        project_number: "424242".into(),
        vertex_ai_location: "us-central1".into(),
        gemini_model: "gemini-2.5-flash".into(),
        firestore_database: "lease-metadata".into(),
        firestore_collection: "leases".into(),
        update_topic: "update-datastore-topic".into(),
        target_path_prefix: "lease-sample".into(),
        overwrite_existing_metadata: overwrite,
        metadata_bucket: "lease-metadata-staging".into(),
        data_store_id: "leases-ds".into(),
        server_port: 0,
        access_token: Some("integration-token".into()),
        import_poll_attempts: 2,
        import_poll_interval_ms: 1,
        endpoints: Endpoints {
            firestore: base.clone(),
            pubsub: base.clone(),
            storage: base.clone(),
            discovery_engine: base.clone(),
            vertex_ai: base.clone(),
            metadata_server: base,
        },
    }
}

fn router(server: &MockServer, overwrite: bool) -> Router {
    let state = AppState::from_config(&config(server, overwrite)).expect("state");
    api::create_router(state)
}

fn push(payload: &[u8]) -> Value {
    json!({
        "message": { "data": STANDARD.encode(payload), "messageId": "7" },
        "subscription": "projects/demo-project/subscriptions/push"
    })
}

async fn post(app: Router, uri: &str, body: Value) -> Value {
    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .expect("request"),
        )
        .await
        .expect("router response");
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    serde_json::from_slice(&bytes).expect("json body")
}

/// Last body received by the update topic's publish mock.
static PUBLISHED: Mutex<Option<Vec<u8>>> = Mutex::new(None);

fn capture_publish(request: &HttpMockRequest) -> bool {
    if request.path.ends_with(":publish") {
        *PUBLISHED.lock().unwrap() = request.body.clone();
    }
    true
}

/// Decode the record carried by the captured publish request.
fn published_record() -> Vec<u8> {
    let body = PUBLISHED
        .lock()
        .unwrap()
        .clone()
        .expect("publish request body");
    let request: Value = serde_json::from_slice(&body).expect("publish json");
    let data = request["messages"][0]["data"]
        .as_str()
        .expect("message data");
    STANDARD.decode(data).expect("base64 data")
}

fn storage_notification() -> Vec<u8> {
    json!({
        "bucket": "lease-uploads",
        "name": "lease-sample/Ontario_Standard_Lease.pdf",
        "contentType": "application/pdf"
    })
    .to_string()
    .into_bytes()
}

#[tokio::test]
async fn upload_flows_from_extraction_to_search_import() {
    let server = MockServer::start_async().await;

    let generate = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/projects/demo-project/locations/us-central1/publishers/google/models/gemini-2.5-flash:generateContent")
                .header("authorization", "Bearer integration-token")
                .body_contains(PDF_URI);
            then.status(200).json_body(json!({
                "candidates": [{
                    "content": {
                        "parts": [{
                            "text": "{\"city\":\"Toronto\",\"street\":\"1 King St W\",\"province\":\"ON\",\"postalcode\":\"M5H 1A1\",\"lease_start_date\":\"2024/05/01\",\"lease_end_date\":\"Not Available\",\"rent\":2100,\"document_language\":\"English\"}"
                        }]
                    }
                }]
            }));
        })
        .await;
    let query = server
        .mock_async(|when, then| {
            when.method(POST).path(format!("{DOCS}:runQuery"));
            then.status(200)
                .json_body(json!([{ "readTime": "2025-01-01T00:00:00Z" }]));
        })
        .await;
    let create = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(format!("{DOCS}/leases"))
                .body_contains(PDF_URI);
            then.status(200).json_body(json!({
                "name": "projects/demo-project/databases/lease-metadata/documents/leases/generated-1"
            }));
        })
        .await;
    let publish = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/projects/demo-project/topics/update-datastore-topic:publish")
                .matches(capture_publish);
            then.status(200).json_body(json!({ "messageIds": ["pub-1"] }));
        })
        .await;

    let body = post(
        router(&server, false),
        "/extract",
        push(&storage_notification()),
    )
    .await;

    assert_eq!(body["status"], "processed");
    generate.assert();
    query.assert();
    create.assert();
    publish.assert();

    assert_eq!(body["detail"], "PDF processed successfully.");

    // Replay exactly what the extractor forwarded to the update topic.
    let forwarded = published_record();
    let record: Value = serde_json::from_slice(&forwarded).expect("forwarded record");
    assert_eq!(record["file_path"], PDF_URI);
    assert_eq!(record["city"], "Toronto");
    assert_eq!(record["rent"], 2100);
    assert_eq!(record["lease_start_date"], "2024/05/01");
    assert_eq!(record["create_datetime"], record["update_datetime"]);

    let id = document_id(PDF_URI);
    let object = format!("jsonl-metadata/{id}.jsonl");
    let staged_uri = format!("gs://lease-metadata-staging/{object}");

    let upload = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/upload/storage/v1/b/lease-metadata-staging/o")
                .query_param("name", object.as_str())
                .body_contains("\"lease_start_date\":\"2024-05-01\"")
                .body_contains("\"lease_end_date\":\"1900-01-01\"")
                .body_contains("https://storage.cloud.google.com/lease-uploads/lease-sample/Ontario_Standard_Lease.pdf");
            then.status(200).json_body(json!({
                "bucket": "lease-metadata-staging",
                "name": object
            }));
        })
        .await;
    let import = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(format!("/v1beta/{PARENT}/documents:import"))
                .body_contains(staged_uri.as_str())
                .body_contains("INCREMENTAL");
            then.status(200).json_body(json!({
                "name": format!("{PARENT}/operations/import-9"),
                "done": true,
                "response": {}
            }));
        })
        .await;

    let refreshed = post(
        router(&server, false),
        "/refresh",
        push(&forwarded),
    )
    .await;

    upload.assert();
    import.assert();
    assert_eq!(refreshed["status"], "refreshed");
    assert_eq!(
        refreshed["detail"],
        format!("{staged_uri}: Imported successfully!")
    );
}

#[tokio::test]
async fn existing_record_is_not_rewritten_or_forwarded() {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(POST).path_contains(":generateContent");
            then.status(200).json_body(json!({
                "candidates": [{ "content": { "parts": [{ "text": "{\"city\":\"Toronto\",\"rent\":2100}" }] } }]
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(format!("{DOCS}:runQuery"));
            then.status(200).json_body(json!([{
                "document": {
                    "name": "projects/demo-project/databases/lease-metadata/documents/leases/existing-7",
                    "fields": { "file_path": { "stringValue": PDF_URI } }
                }
            }]));
        })
        .await;
    let create = server
        .mock_async(|when, then| {
            when.method(POST).path(format!("{DOCS}/leases"));
            then.status(200).json_body(json!({ "name": "x/leases/never" }));
        })
        .await;
    let publish = server
        .mock_async(|when, then| {
            when.method(POST).path_contains(":publish");
            then.status(200).json_body(json!({ "messageIds": ["never"] }));
        })
        .await;

    let body = post(
        router(&server, false),
        "/extract",
        push(&storage_notification()),
    )
    .await;

    assert_eq!(body["status"], "skipped");
    assert_eq!(body["detail"], "Skipping existing document: existing-7");
    create.assert_hits(0);
    publish.assert_hits(0);
}

#[tokio::test]
async fn downstream_outage_is_reported_as_failure() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path_contains(":generateContent");
            then.status(503).body("backend unavailable");
        })
        .await;
    let query = server
        .mock_async(|when, then| {
            when.method(POST).path_contains(":runQuery");
            then.status(200).json_body(json!([]));
        })
        .await;

    let body = post(
        router(&server, false),
        "/extract",
        push(&storage_notification()),
    )
    .await;

    assert_eq!(body["status"], "failed");
    assert!(
        body["detail"]
            .as_str()
            .is_some_and(|detail| detail.contains("backend unavailable"))
    );
    query.assert_hits(0);
}

#[tokio::test]
async fn metadata_server_tokens_are_used_without_a_static_token() {
    let server = MockServer::start_async().await;
    let token = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/computeMetadata/v1/instance/service-accounts/default/token");
            then.status(200).json_body(json!({
                "access_token": "from-metadata",
                "expires_in": 3600,
                "token_type": "Bearer"
            }));
        })
        .await;
    let list = server
        .mock_async(|when, then| {
            when.method(GET)
                .path(format!("{DOCS}/leases"))
                .header("authorization", "Bearer from-metadata");
            then.status(200).json_body(json!({}));
        })
        .await;

    let mut config = config(&server, false);
    config.access_token = None;
    let app = api::create_router(AppState::from_config(&config).expect("state"));

    let body = post(app, "/admin/clear", json!({ "confirm": true })).await;

    token.assert();
    list.assert();
    assert_eq!(body["status"], "cleared");
    assert_eq!(body["detail"], "Firestore Collection Cleared");
}
