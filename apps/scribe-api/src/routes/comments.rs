//! Comment routes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiErrorBody, FieldError};
use crate::models::comment::{CommentEntry, CommentResponse, NewComment};
use crate::routes::posts::entry_for_path;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{username}/{post_id}/comment", post(add_comment))
        .route(
            "/{username}/{post_id}/comment/{comment_id}/edit",
            post(edit_comment),
        )
        .route(
            "/{username}/{post_id}/comment/{comment_id}/delete",
            post(delete_comment),
        )
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CommentForm {
    pub text: String,
}

fn validate_comment_text(text: &str) -> Result<(), ApiError> {
    if text.trim().is_empty() {
        return Err(ApiError::validation(vec![FieldError {
            field: "text".to_string(),
            message: "This field is required".to_string(),
        }]));
    }
    Ok(())
}

fn post_page(username: &str, post_id: i64) -> Redirect {
    Redirect::to(&format!("/{}/{}/", username, post_id))
}

// ---------------------------------------------------------------------------
// POST /{username}/{post_id}/comment
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/{username}/{post_id}/comment",
    tag = "Comments",
    params(
        ("username" = String, Path, description = "Post author username"),
        ("post_id" = i64, Path, description = "Post id"),
    ),
    request_body = CommentForm,
    responses(
        (status = 201, description = "Comment created", body = CommentResponse),
        (status = 400, description = "Validation failed", body = ApiErrorBody),
        (status = 303, description = "Anonymous viewer is sent to the login form"),
        (status = 404, description = "Unknown post", body = ApiErrorBody),
    ),
)]
pub async fn add_comment(
    State(state): State<AppState>,
    Path((username, post_id)): Path<(String, i64)>,
    viewer: AuthUser,
    Json(body): Json<CommentForm>,
) -> Result<(StatusCode, Json<CommentResponse>), ApiError> {
    let entry = entry_for_path(&state, &username, post_id).await?;
    validate_comment_text(&body.text)?;

    let comment = state
        .repo
        .create_comment(NewComment {
            id: state.snowflake.generate(),
            post_id: entry.post.id,
            author_id: viewer.user_id,
            text: body.text,
        })
        .await?;

    let author = state
        .repo
        .user_by_id(viewer.user_id)
        .await?
        .ok_or_else(|| ApiError::internal("Comment author missing"))?;
    Ok((
        StatusCode::CREATED,
        Json(CommentEntry { comment, author }.into()),
    ))
}

// ---------------------------------------------------------------------------
// POST /{username}/{post_id}/comment/{comment_id}/edit
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/{username}/{post_id}/comment/{comment_id}/edit",
    tag = "Comments",
    params(
        ("username" = String, Path, description = "Post author username"),
        ("post_id" = i64, Path, description = "Post id"),
        ("comment_id" = i64, Path, description = "Comment id"),
    ),
    request_body = CommentForm,
    responses(
        (status = 200, description = "Comment updated", body = CommentResponse),
        (status = 303, description = "Non-authors are sent back to the post page"),
        (status = 404, description = "Unknown comment", body = ApiErrorBody),
    ),
)]
pub async fn edit_comment(
    State(state): State<AppState>,
    Path((username, post_id, comment_id)): Path<(String, i64, i64)>,
    viewer: AuthUser,
    Json(body): Json<CommentForm>,
) -> Result<Response, ApiError> {
    entry_for_path(&state, &username, post_id).await?;
    let comment = state
        .repo
        .comment_by_id(comment_id)
        .await?
        .filter(|c| c.post_id == post_id)
        .ok_or_else(|| ApiError::not_found("Comment not found"))?;

    // Non-authors are bounced to the post page rather than shown an error.
    if comment.author_id != viewer.user_id {
        return Ok(post_page(&username, post_id).into_response());
    }

    validate_comment_text(&body.text)?;
    let comment = state.repo.update_comment(comment_id, &body.text).await?;
    let author = state
        .repo
        .user_by_id(comment.author_id)
        .await?
        .ok_or_else(|| ApiError::internal("Comment author missing"))?;
    Ok(Json(CommentResponse::from(CommentEntry { comment, author })).into_response())
}

// ---------------------------------------------------------------------------
// POST /{username}/{post_id}/comment/{comment_id}/delete
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/{username}/{post_id}/comment/{comment_id}/delete",
    tag = "Comments",
    params(
        ("username" = String, Path, description = "Post author username"),
        ("post_id" = i64, Path, description = "Post id"),
        ("comment_id" = i64, Path, description = "Comment id"),
    ),
    responses(
        (status = 303, description = "Back to the post page; non-authors delete nothing"),
        (status = 404, description = "Unknown comment", body = ApiErrorBody),
    ),
)]
pub async fn delete_comment(
    State(state): State<AppState>,
    Path((username, post_id, comment_id)): Path<(String, i64, i64)>,
    viewer: AuthUser,
) -> Result<Response, ApiError> {
    entry_for_path(&state, &username, post_id).await?;
    let comment = state
        .repo
        .comment_by_id(comment_id)
        .await?
        .filter(|c| c.post_id == post_id)
        .ok_or_else(|| ApiError::not_found("Comment not found"))?;

    if comment.author_id == viewer.user_id {
        state.repo.delete_comment(comment_id).await?;
    }
    Ok(post_page(&username, post_id).into_response())
}
