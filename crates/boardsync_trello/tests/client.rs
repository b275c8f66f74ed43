//! TrelloClient against a local mock of the REST API.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use boardsync_core::{RecordAttributes, RecordKind};
use boardsync_engine::SourceClient;
use boardsync_trello::{TrelloClient, TrelloConfig};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

const KEY: &str = "app-key";
const TOKEN: &str = "member-token";

#[derive(Clone, Default)]
struct MockTrello {
    download_auth: Arc<Mutex<Vec<String>>>,
    fail_cards: bool,
}

fn authorized(query: &HashMap<String, String>) -> bool {
    query.get("key").map(String::as_str) == Some(KEY)
        && query.get("token").map(String::as_str) == Some(TOKEN)
}

async fn custom_fields(
    Path(board): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&query) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    assert_eq!(board, "board-1");
    Json(json!([
        {"id": "f-loc", "name": "Location EN", "type": "text"},
        {"id": "f-area", "name": "Area", "type": "number"},
        {"id": "f-org", "name": "Organized", "type": "checkbox"},
        {"id": "f-status", "name": "Status", "type": "list",
         "options": [{"id": "o-1", "value": {"text": "Registered"}}]}
    ]))
    .into_response()
}

async fn cards(State(state): State<MockTrello>, Path(_board): Path<String>) -> Response {
    if state.fail_cards {
        return (StatusCode::INTERNAL_SERVER_ERROR, "x".repeat(500)).into_response();
    }
    Json(json!([
        {"id": "c1", "name": "Card one", "dateLastActivity": "2024-03-01T10:00:00.000Z",
         "labels": [{"id": "l1", "name": "urgent"}]},
        {"id": "c2", "name": "No fields"}
    ]))
    .into_response()
}

async fn field_items(Path(card): Path<String>) -> Json<Value> {
    match card.as_str() {
        "c1" => Json(json!([
            {"idCustomField": "f-loc", "value": {"text": "Old Town"}},
            {"idCustomField": "f-area", "value": {"number": "250.5"}},
            {"idCustomField": "f-org", "value": {"checked": "true"}},
            {"idCustomField": "f-status", "idValue": "o-1"}
        ])),
        _ => Json(json!([])),
    }
}

async fn attachments(Path(card): Path<String>) -> Json<Value> {
    Json(json!([
        {"id": "a1", "name": "deed.pdf",
         "url": format!("https://trello.com/1/cards/{card}/attachments/abc123/download/deed.pdf")}
    ]))
}

async fn actions(Query(query): Query<HashMap<String, String>>) -> Json<Value> {
    assert_eq!(query.get("filter").map(String::as_str), Some("commentCard"));
    Json(json!([{"data": {"text": "checked at registry"}}]))
}

async fn download(
    State(state): State<MockTrello>,
    Path((_card, attachment)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    state.download_auth.lock().unwrap().push(auth);
    if attachment == "dead00" {
        return StatusCode::NOT_FOUND.into_response();
    }
    b"%PDF-1.4".to_vec().into_response()
}

async fn spawn(state: MockTrello) -> String {
    let app = Router::new()
        .route("/1/boards/{board}/customFields", get(custom_fields))
        .route("/1/boards/{board}/cards", get(cards))
        .route("/1/cards/{card}/customFieldItems", get(field_items))
        .route("/1/cards/{card}/attachments", get(attachments))
        .route("/1/cards/{card}/actions", get(actions))
        .route("/1/cards/{card}/attachments/{attachment}/download", get(download))
        .with_state(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/1")
}

fn client(base: &str, dir: &std::path::Path) -> TrelloClient {
    let config = TrelloConfig::new(KEY, TOKEN, dir.join("downloads"))
        .with_base_url(base)
        .with_download_token("read-token");
    TrelloClient::new(config).unwrap()
}

#[tokio::test]
async fn fetches_cards_with_resolved_fields() {
    let base = spawn(MockTrello::default()).await;
    let dir = tempfile::tempdir().unwrap();
    let client = client(&base, dir.path());

    let entities = client
        .fetch_entities(RecordKind::Property, "board-1")
        .await
        .unwrap();

    // c2 has no custom field values and is skipped
    assert_eq!(entities.len(), 1);
    let entity = &entities[0];
    assert_eq!(entity.id, "c1");
    assert_eq!(entity.name, "Card one");
    assert!(entity.last_activity.is_some());
    assert_eq!(entity.labels[0].name, "urgent");
    assert_eq!(entity.comments[0].text, "checked at registry");
    assert_eq!(entity.attachments.len(), 1);

    let RecordAttributes::Property(property) = &entity.fields else {
        panic!("expected property attributes");
    };
    assert_eq!(property.location_en, "Old Town");
    assert_eq!(property.area, 250.5);
    assert_eq!(property.shares, 0.0);
    assert!(property.organized);
    assert!(!property.effects);
    assert_eq!(property.status, "Registered");
}

#[tokio::test]
async fn http_error_fails_the_fetch() {
    let base = spawn(MockTrello {
        fail_cards: true,
        ..MockTrello::default()
    })
    .await;
    let dir = tempfile::tempdir().unwrap();

    let err = client(&base, dir.path())
        .fetch_entities(RecordKind::Property, "board-1")
        .await
        .unwrap_err();
    let message = err.to_string();
    assert!(message.contains("500"), "{message}");
    assert!(message.len() < 400, "error body should be truncated");
}

#[tokio::test]
async fn bad_credentials_fail_the_fetch() {
    let base = spawn(MockTrello::default()).await;
    let dir = tempfile::tempdir().unwrap();
    let config = TrelloConfig::new("wrong", TOKEN, dir.path()).with_base_url(base);

    let err = TrelloClient::new(config)
        .unwrap()
        .fetch_entities(RecordKind::Property, "board-1")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("401"));
}

#[tokio::test]
async fn downloads_with_oauth_header() {
    let state = MockTrello::default();
    let base = spawn(state.clone()).await;
    let dir = tempfile::tempdir().unwrap();

    let downloaded = client(&base, dir.path())
        .download_attachment("https://trello.com/1/cards/c0ffee/attachments/abc123/download/deed.pdf")
        .await
        .unwrap();

    assert_eq!(downloaded.identifier, "abc123");
    assert_eq!(downloaded.extension, ".pdf");
    assert!(downloaded.local_path.starts_with(dir.path().join("downloads")));
    assert_eq!(std::fs::read(&downloaded.local_path).unwrap(), b"%PDF-1.4");

    let auth = state.download_auth.lock().unwrap().clone();
    assert_eq!(
        auth,
        vec![format!(
            "OAuth oauth_consumer_key=\"{KEY}\", oauth_token=\"read-token\""
        )]
    );
}

#[tokio::test]
async fn download_failures() {
    let base = spawn(MockTrello::default()).await;
    let dir = tempfile::tempdir().unwrap();
    let client = client(&base, dir.path());

    let err = client
        .download_attachment("https://trello.com/1/cards/c0ffee/attachments/dead00/download/x.pdf")
        .await
        .unwrap_err();
    assert!(err.is_per_item());
    assert!(err.to_string().contains("404"));

    let err = client
        .download_attachment("https://example.com/files/report.pdf")
        .await
        .unwrap_err();
    assert!(err.is_per_item());
}
