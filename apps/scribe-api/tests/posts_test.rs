mod common;

use axum::http::header::AUTHORIZATION;
use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;

const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0, 0, 0, 0];

// ---------------------------------------------------------------------------
// GET /
// ---------------------------------------------------------------------------

#[tokio::test]
async fn index_starts_empty() {
    let (app, _state, _media) = common::test_app().await;
    let server = TestServer::new(app).unwrap();

    let resp = server.get("/").await;
    resp.assert_status_ok();
    let body: serde_json::Value = resp.json();
    assert_eq!(body["posts"].as_array().unwrap().len(), 0);
    assert_eq!(body["page"]["number"], 1);
}

#[tokio::test]
async fn new_posts_appear_on_home_despite_the_fragment_cache() {
    let (app, _state, _media) = common::test_app().await;
    let server = TestServer::new(app).unwrap();
    let token = common::login(&server, "writer").await;

    // Prime the cached fragment with the empty listing.
    server.get("/").await.assert_status_ok();

    common::create_post(&server, &token, "fresh off the press").await;

    // The write invalidated the fragment, so the new post is visible at once.
    let resp = server.get("/").await;
    resp.assert_status_ok();
    let body: serde_json::Value = resp.json();
    assert_eq!(body["posts"][0]["text"], "fresh off the press");
}

#[tokio::test]
async fn out_of_range_page_clamps_to_last_page() {
    let (app, _state, _media) = common::test_app().await;
    let server = TestServer::new(app).unwrap();
    let token = common::login(&server, "prolific").await;

    for i in 0..11 {
        common::create_post(&server, &token, &format!("post {i}")).await;
    }

    let resp = server.get("/").add_query_param("page", 99).await;
    resp.assert_status_ok();
    let body: serde_json::Value = resp.json();
    assert_eq!(body["page"]["number"], 2);
    assert_eq!(body["page"]["total_pages"], 2);
    assert_eq!(body["posts"].as_array().unwrap().len(), 1);
}

// ---------------------------------------------------------------------------
// POST /new/
// ---------------------------------------------------------------------------

#[tokio::test]
async fn creating_a_post_requires_login() {
    let (app, _state, _media) = common::test_app().await;
    let server = TestServer::new(app).unwrap();

    let form = MultipartForm::new().add_text("text", "anonymous words");
    let resp = server.post("/new/").multipart(form).await;
    resp.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(
        resp.header("location").to_str().unwrap(),
        "/auth/login/?next=/new/"
    );
}

#[tokio::test]
async fn created_post_shows_up_in_every_listing() {
    let (app, state, _media) = common::test_app().await;
    let server = TestServer::new(app).unwrap();
    let token = common::login(&server, "author1").await;
    let group = common::create_group(&state, "Test Group 1", "test-group-1").await;
    common::create_group(&state, "Test Group 2", "test-group-2").await;

    let form = MultipartForm::new()
        .add_text("text", "Тестовый пост 1")
        .add_text("group", group.id.to_string());
    let resp = server
        .post("/new/")
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .multipart(form)
        .await;
    resp.assert_status(StatusCode::CREATED);
    let created: serde_json::Value = resp.json();
    assert_eq!(created["text"], "Тестовый пост 1");
    assert_eq!(created["author"]["username"], "author1");
    assert_eq!(created["group"]["slug"], "test-group-1");

    // Home.
    let home: serde_json::Value = server.get("/").await.json();
    assert_eq!(home["posts"][0]["text"], "Тестовый пост 1");

    // Group listing.
    let grouped: serde_json::Value = server.get("/group/test-group-1/").await.json();
    assert_eq!(grouped["group"]["title"], "Test Group 1");
    assert_eq!(grouped["posts"][0]["text"], "Тестовый пост 1");

    // The other group stays empty.
    let other: serde_json::Value = server.get("/group/test-group-2/").await.json();
    assert_eq!(other["posts"].as_array().unwrap().len(), 0);

    // Author profile.
    let profile: serde_json::Value = server.get("/author1/").await.json();
    assert_eq!(profile["summary"]["post_count"], 1);
    assert_eq!(profile["posts"][0]["text"], "Тестовый пост 1");
}

#[tokio::test]
async fn blank_text_is_rejected() {
    let (app, _state, _media) = common::test_app().await;
    let server = TestServer::new(app).unwrap();
    let token = common::login(&server, "author").await;

    let form = MultipartForm::new().add_text("text", "   ");
    let resp = server
        .post("/new/")
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .multipart(form)
        .await;
    resp.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = resp.json();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["details"][0]["field"], "text");
}

#[tokio::test]
async fn unknown_group_choice_is_rejected() {
    let (app, _state, _media) = common::test_app().await;
    let server = TestServer::new(app).unwrap();
    let token = common::login(&server, "author").await;

    let form = MultipartForm::new()
        .add_text("text", "orphaned")
        .add_text("group", "123456");
    let resp = server
        .post("/new/")
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .multipart(form)
        .await;
    resp.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = resp.json();
    assert_eq!(body["error"]["details"][0]["field"], "group");
}

#[tokio::test]
async fn image_upload_is_sniffed_and_stored() {
    let (app, _state, media) = common::test_app().await;
    let server = TestServer::new(app).unwrap();
    let token = common::login(&server, "photographer").await;

    let form = MultipartForm::new().add_text("text", "look at this").add_part(
        "image",
        Part::bytes(PNG.to_vec())
            .file_name("shot.png")
            .mime_type("image/png"),
    );
    let resp = server
        .post("/new/")
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .multipart(form)
        .await;
    resp.assert_status(StatusCode::CREATED);
    let body: serde_json::Value = resp.json();
    let key = body["image"].as_str().unwrap();
    assert!(key.starts_with("posts/att_"));
    assert!(key.ends_with(".png"));
    assert!(media.path().join(key).exists());
}

#[tokio::test]
async fn non_image_upload_is_rejected() {
    let (app, _state, media) = common::test_app().await;
    let server = TestServer::new(app).unwrap();
    let token = common::login(&server, "trickster").await;

    let form = MultipartForm::new().add_text("text", "totally a picture").add_part(
        "image",
        Part::bytes(b"#!/bin/sh\necho gotcha\n".to_vec())
            .file_name("script.png")
            .mime_type("image/png"),
    );
    let resp = server
        .post("/new/")
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .multipart(form)
        .await;
    resp.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = resp.json();
    assert_eq!(body["error"]["details"][0]["field"], "image");
    // Nothing was written and no post was created.
    assert!(!media.path().join("posts").exists());
    let home: serde_json::Value = server.get("/").await.json();
    assert_eq!(home["posts"].as_array().unwrap().len(), 0);
}

// ---------------------------------------------------------------------------
// GET + POST /{username}/{post_id}/edit/
// ---------------------------------------------------------------------------

#[tokio::test]
async fn editing_keeps_the_publish_date() {
    let (app, _state, _media) = common::test_app().await;
    let server = TestServer::new(app).unwrap();
    let token = common::login(&server, "editor").await;

    let created = common::create_post(&server, &token, "first draft").await;
    let post_id = created["id"].as_i64().unwrap();
    let pub_date = created["pub_date"].as_str().unwrap().to_string();

    let form = MultipartForm::new().add_text("text", "second draft");
    let resp = server
        .post(&format!("/editor/{post_id}/edit/"))
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .multipart(form)
        .await;
    resp.assert_status_ok();
    let updated: serde_json::Value = resp.json();
    assert_eq!(updated["text"], "second draft");
    assert_eq!(updated["pub_date"].as_str().unwrap(), pub_date);
}

#[tokio::test]
async fn non_owner_gets_a_read_only_view_instead_of_the_edit_form() {
    let (app, _state, _media) = common::test_app().await;
    let server = TestServer::new(app).unwrap();
    let owner = common::login(&server, "owner").await;
    let intruder = common::login(&server, "intruder").await;

    let created = common::create_post(&server, &owner, "hands off").await;
    let post_id = created["id"].as_i64().unwrap();

    // The form renders the post itself, without an edit handle.
    let resp = server
        .get(&format!("/owner/{post_id}/edit/"))
        .add_header(AUTHORIZATION, format!("Bearer {intruder}"))
        .await;
    resp.assert_status_ok();
    let body: serde_json::Value = resp.json();
    assert_eq!(body["post"]["text"], "hands off");
    assert!(body.get("groups").is_none());

    // A direct edit attempt changes nothing either.
    let form = MultipartForm::new().add_text("text", "defaced");
    let resp = server
        .post(&format!("/owner/{post_id}/edit/"))
        .add_header(AUTHORIZATION, format!("Bearer {intruder}"))
        .multipart(form)
        .await;
    resp.assert_status_ok();

    let detail: serde_json::Value = server.get(&format!("/owner/{post_id}/")).await.json();
    assert_eq!(detail["post"]["text"], "hands off");
}

#[tokio::test]
async fn anonymous_edit_redirects_to_login() {
    let (app, _state, _media) = common::test_app().await;
    let server = TestServer::new(app).unwrap();
    let token = common::login(&server, "owner").await;
    let created = common::create_post(&server, &token, "mine").await;
    let post_id = created["id"].as_i64().unwrap();

    let resp = server.get(&format!("/owner/{post_id}/edit/")).await;
    resp.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(
        resp.header("location").to_str().unwrap(),
        format!("/auth/login/?next=/owner/{post_id}/edit/")
    );
}

// ---------------------------------------------------------------------------
// GET /{username}/{post_id}/
// ---------------------------------------------------------------------------

#[tokio::test]
async fn post_detail_requires_a_matching_author() {
    let (app, _state, _media) = common::test_app().await;
    let server = TestServer::new(app).unwrap();
    let token = common::login(&server, "owner").await;
    common::login(&server, "somebody").await;
    let created = common::create_post(&server, &token, "mine").await;
    let post_id = created["id"].as_i64().unwrap();

    server
        .get(&format!("/owner/{post_id}/"))
        .await
        .assert_status_ok();
    server
        .get(&format!("/somebody/{post_id}/"))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_group_listing_is_404() {
    let (app, _state, _media) = common::test_app().await;
    let server = TestServer::new(app).unwrap();

    let resp = server.get("/group/no-such-group/").await;
    resp.assert_status(StatusCode::NOT_FOUND);
    let body: serde_json::Value = resp.json();
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}
