mod common;

use axum::http::header::AUTHORIZATION;
use axum::http::StatusCode;
use axum_test::TestServer;

// ---------------------------------------------------------------------------
// POST /auth/login/
// ---------------------------------------------------------------------------

#[tokio::test]
async fn login_mints_a_usable_session() {
    let (app, _state, _media) = common::test_app().await;
    let server = TestServer::new(app).unwrap();

    let resp = server
        .post("/auth/login/")
        .json(&serde_json::json!({ "username": "newcomer" }))
        .await;
    resp.assert_status_ok();
    let body: serde_json::Value = resp.json();
    assert!(body["access_token"].as_str().unwrap().starts_with("ses_"));
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["user"]["username"], "newcomer");
    assert_eq!(body["user"]["display_name"], "newcomer");

    // The token opens a protected page.
    let token = body["access_token"].as_str().unwrap();
    server
        .get("/new/")
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn logging_in_twice_keeps_one_account() {
    let (app, _state, _media) = common::test_app().await;
    let server = TestServer::new(app).unwrap();

    let first: serde_json::Value = server
        .post("/auth/login/")
        .json(&serde_json::json!({ "username": "regular" }))
        .await
        .json();
    let second: serde_json::Value = server
        .post("/auth/login/")
        .json(&serde_json::json!({ "username": "regular", "display_name": "Reg U. Lar" }))
        .await
        .json();

    assert_eq!(first["user"]["id"], second["user"]["id"]);
    assert_eq!(second["user"]["display_name"], "Reg U. Lar");
    assert_ne!(first["access_token"], second["access_token"]);
}

#[tokio::test]
async fn bad_usernames_are_rejected() {
    let (app, _state, _media) = common::test_app().await;
    let server = TestServer::new(app).unwrap();

    for username in ["x", "has space", "way-too-long-for-a-username-over-32-chars"] {
        let resp = server
            .post("/auth/login/")
            .json(&serde_json::json!({ "username": username }))
            .await;
        resp.assert_status(StatusCode::BAD_REQUEST);
        let body: serde_json::Value = resp.json();
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"]["details"][0]["field"], "username");
    }
}

// ---------------------------------------------------------------------------
// GET /auth/login/
// ---------------------------------------------------------------------------

#[tokio::test]
async fn login_form_echoes_the_return_path() {
    let (app, _state, _media) = common::test_app().await;
    let server = TestServer::new(app).unwrap();

    let resp = server
        .get("/auth/login/")
        .add_query_param("next", "/new/")
        .await;
    resp.assert_status_ok();
    let body: serde_json::Value = resp.json();
    assert_eq!(body["next"], "/new/");
}

// ---------------------------------------------------------------------------
// Misc
// ---------------------------------------------------------------------------

#[tokio::test]
async fn garbage_tokens_do_not_authenticate() {
    let (app, _state, _media) = common::test_app().await;
    let server = TestServer::new(app).unwrap();

    let resp = server
        .get("/new/")
        .add_header(AUTHORIZATION, "Bearer ses_garbage")
        .await;
    resp.assert_status(StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn unknown_routes_return_structured_404() {
    let (app, _state, _media) = common::test_app().await;
    let server = TestServer::new(app).unwrap();

    let resp = server.get("/no/such/route/anywhere").await;
    resp.assert_status(StatusCode::NOT_FOUND);
    let body: serde_json::Value = resp.json();
    assert_eq!(body["error"]["code"], "NOT_FOUND");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("/no/such/route/anywhere"));
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let (app, _state, _media) = common::test_app().await;
    let server = TestServer::new(app).unwrap();

    let resp = server.get("/health").await;
    resp.assert_status_ok();
    let body: serde_json::Value = resp.json();
    assert_eq!(body["status"], "ok");
}
