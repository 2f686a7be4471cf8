use std::sync::Arc;

use axum::http::header::AUTHORIZATION;
use axum::http::StatusCode;
use axum::Router;
use axum_test::multipart::MultipartForm;
use axum_test::TestServer;
use tempfile::TempDir;

use scribe_api::config::Config;
use scribe_api::db::kv::{KeyValueStore, MemoryStore};
use scribe_api::db::repo::{MemoryRepository, Repository};
use scribe_api::models::group::{Group, NewGroup};
use scribe_api::AppState;
use scribe_common::SnowflakeGenerator;

/// Build a test app backed by the in-memory repository and KV store.
///
/// The returned `TempDir` is the media root; dropping it deletes any
/// uploaded images, so keep it alive for the duration of the test.
pub async fn test_app() -> (Router, AppState, TempDir) {
    let media = tempfile::tempdir().expect("create media dir");

    let config = Config {
        database_url: "postgres://unused".to_string(),
        database_pool_size: 1,
        media_root: media.path().to_str().expect("utf-8 path").to_string(),
        port: 0,
    };

    let repo: Arc<dyn Repository> = Arc::new(MemoryRepository::new());
    let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());

    let state = AppState {
        repo,
        kv,
        config: Arc::new(config),
        snowflake: Arc::new(SnowflakeGenerator::new(0)),
    };

    let app = Router::new()
        .merge(scribe_api::routes::router())
        .with_state(state.clone());

    (app, state, media)
}

/// Log a user in, provisioning them on first use, and return a bearer token.
#[allow(dead_code)]
pub async fn login(server: &TestServer, username: &str) -> String {
    let resp = server
        .post("/auth/login/")
        .json(&serde_json::json!({ "username": username }))
        .await;
    resp.assert_status_ok();
    let body: serde_json::Value = resp.json();
    body["access_token"]
        .as_str()
        .expect("access_token in login response")
        .to_string()
}

/// Create a group directly through the repository.
#[allow(dead_code)]
pub async fn create_group(state: &AppState, title: &str, slug: &str) -> Group {
    state
        .repo
        .create_group(NewGroup {
            id: state.snowflake.generate(),
            title: title.to_string(),
            slug: slug.to_string(),
            description: format!("{title} description"),
        })
        .await
        .expect("create group")
}

/// Publish a text-only post and return the created post body.
#[allow(dead_code)]
pub async fn create_post(server: &TestServer, token: &str, text: &str) -> serde_json::Value {
    let form = MultipartForm::new().add_text("text", text);
    let resp = server
        .post("/new/")
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .multipart(form)
        .await;
    resp.assert_status(StatusCode::CREATED);
    resp.json()
}
