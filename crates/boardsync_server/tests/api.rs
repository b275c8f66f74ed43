//! HTTP API against an engine wired to in-memory collaborators.

use boardsync_core::{JobId, JobKind, JobState, RecordKind, RecordStore};
use boardsync_server::{BoardsyncServer, ServerConfig, API_KEY_HEADER};
use boardsync_testkit::{EntityBuilder, TestEngine};
use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

const KEY: &str = "integration-key";

struct Api {
    env: TestEngine,
    base: String,
    http: reqwest::Client,
    shutdown: CancellationToken,
}

impl Api {
    async fn start() -> Self {
        let env = TestEngine::new();
        env.store
            .add_api_key(KEY, Utc::now() + ChronoDuration::days(1))
            .unwrap();

        let config = ServerConfig::default().with_environment("test");
        let server = BoardsyncServer::new(config, env.engine.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = CancellationToken::new();
        let token = shutdown.clone();
        tokio::spawn(async move {
            server.serve(listener, token).await.unwrap();
        });

        Self {
            env,
            base: format!("http://{addr}"),
            http: reqwest::Client::new(),
            shutdown,
        }
    }

    async fn get(&self, path: &str) -> (u16, Value) {
        let response = self
            .http
            .get(format!("{}{path}", self.base))
            .header(API_KEY_HEADER, KEY)
            .send()
            .await
            .unwrap();
        let status = response.status().as_u16();
        (status, response.json().await.unwrap())
    }

    async fn post(&self, path: &str, body: Value) -> (u16, Value) {
        let response = self
            .http
            .post(format!("{}{path}", self.base))
            .header(API_KEY_HEADER, KEY)
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = response.status().as_u16();
        (status, response.json().await.unwrap())
    }
}

impl Drop for Api {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[tokio::test]
async fn ping_needs_no_key() {
    let api = Api::start().await;
    let response = api
        .http
        .get(format!("{}/ping", api.base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    let message = body["message"].as_str().unwrap();
    assert!(message.starts_with("version: "));
    assert!(message.ends_with("env: test"));
}

#[tokio::test]
async fn missing_or_wrong_key_is_forbidden() {
    let api = Api::start().await;

    let response = api
        .http
        .get(format!("{}/jobs/1", api.base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);

    let response = api
        .http
        .post(format!("{}/jobs", api.base))
        .header(API_KEY_HEADER, "wrong")
        .json(&json!({"type": "properties"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);
    let body: Value = response.json().await.unwrap();
    assert!(body["message"].is_string());
    assert!(!api.env.store.has_pending_job(JobKind::Properties).unwrap());
}

#[tokio::test]
async fn submit_then_poll_job() {
    let api = Api::start().await;
    api.env.source.set_entities(
        RecordKind::Property,
        vec![
            EntityBuilder::property("c1", "Old Town").build(),
            EntityBuilder::property("c2", "New Town").build(),
        ],
    );

    let (status, body) = api.post("/jobs", json!({"type": "properties"})).await;
    assert_eq!(status, 200);
    let id = body["data"].as_u64().unwrap();

    let job = api
        .env
        .wait_for_terminal(JobId::new(id), Duration::from_secs(5))
        .await;
    assert_eq!(job.state, JobState::Completed);

    let (status, body) = api.get(&format!("/jobs/{id}")).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["state"], "completed");
    assert_eq!(body["data"]["processed"], 2);
    assert_eq!(body["data"]["errors"], 0);
}

#[tokio::test]
async fn second_submit_of_pending_kind_conflicts() {
    let api = Api::start().await;
    api.env
        .store
        .new_job(JobKind::SupportiveDocs, Utc::now())
        .unwrap();

    let (status, body) = api.post("/jobs", json!({"type": "supportive_docs"})).await;
    assert_eq!(status, 409);
    assert_eq!(
        body["message"],
        "job type supportive_docs is already pending"
    );
}

#[tokio::test]
async fn bad_submissions_are_rejected() {
    let api = Api::start().await;

    let (status, _) = api.post("/jobs", json!({"type": "bogus"})).await;
    assert_eq!(status, 400);

    let (status, body) = api.post("/jobs", json!({})).await;
    assert_eq!(status, 400);
    assert_eq!(body["message"], "invalid request: job type is required");
}

#[tokio::test]
async fn unknown_or_malformed_job_ids() {
    let api = Api::start().await;

    let (status, _) = api.get("/jobs/999").await;
    assert_eq!(status, 404);

    let (status, body) = api.get("/jobs/abc").await;
    assert_eq!(status, 400);
    assert_eq!(body["message"], "job ID could not be parsed");
}

#[tokio::test]
async fn reported_errors_are_stored() {
    let api = Api::start().await;

    let (status, body) = api
        .post("/errors", json!({"source": "frontend", "body": "render failed"}))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["source"], "frontend");

    let recent = api.env.store.recent_errors(10).unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].body, "render failed");
}

#[tokio::test]
async fn lists_records_with_paging_and_order() {
    let api = Api::start().await;
    let at = |minute| Utc.with_ymd_and_hms(2024, 5, 1, 12, minute, 0).unwrap();
    api.env.source.set_entities(
        RecordKind::Property,
        vec![
            EntityBuilder::property("c1", "Alpha").last_activity(at(1)).build(),
            EntityBuilder::property("c2", "Bravo").last_activity(at(3)).build(),
            EntityBuilder::property("c3", "Charlie").last_activity(at(2)).build(),
        ],
    );
    api.env.engine.run_job(JobKind::Properties).await.unwrap();

    let (status, body) = api.get("/records/properties?s=2").await;
    assert_eq!(status, 200);
    let page = &body["data"];
    assert_eq!(page["total"], 3);
    assert_eq!(page["page_size"], 2);
    let names: Vec<&str> = page["records"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["record"]["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Bravo", "Charlie"]);

    let (_, body) = api.get("/records/properties?p=2&s=2&o=name&d=asc").await;
    let records = body["data"]["records"].as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["record"]["name"], "Charlie");

    let (status, _) = api.get("/records/properties?o=price").await;
    assert_eq!(status, 400);

    let (status, _) = api.get("/records/attachments").await;
    assert_eq!(status, 404);
}
