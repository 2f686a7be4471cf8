//! Profile, follow and feed routes.

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiErrorBody};
use crate::models::follow::NewFollow;
use crate::models::post::PostResponse;
use crate::models::user::UserResponse;
use crate::pagination::PageMeta;
use crate::routes::posts::{PageQuery, PostListResponse};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/follow/", get(feed))
        .route("/{username}/", get(profile))
        .route("/{username}/follow/", get(follow))
        .route("/{username}/unfollow/", get(unfollow))
}

/// Aggregated counters shown on a profile.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileSummary {
    pub post_count: i64,
    pub follower_count: i64,
    pub following_count: i64,
    /// Whether the current viewer follows this author. Always `false` for
    /// anonymous viewers and for the author themselves.
    pub following: bool,
}

pub async fn profile_summary(
    state: &AppState,
    author_id: i64,
    viewer: Option<i64>,
) -> Result<ProfileSummary, ApiError> {
    let repo = state.repo.as_ref();
    let following = match viewer {
        Some(viewer_id) if viewer_id != author_id => {
            repo.is_following(viewer_id, author_id).await?
        }
        _ => false,
    };
    Ok(ProfileSummary {
        post_count: repo.count_posts_by_author(author_id).await?,
        follower_count: repo.follower_count(author_id).await?,
        following_count: repo.following_count(author_id).await?,
        following,
    })
}

// ---------------------------------------------------------------------------
// GET /{username}/
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileResponse {
    pub user: UserResponse,
    pub summary: ProfileSummary,
    pub posts: Vec<PostResponse>,
    pub page: PageMeta,
}

#[utoipa::path(
    get,
    path = "/{username}/",
    tag = "Profiles",
    params(
        ("username" = String, Path, description = "Author username"),
        PageQuery,
    ),
    responses(
        (status = 200, description = "Author profile with their posts, newest first", body = ProfileResponse),
        (status = 404, description = "Unknown user", body = ApiErrorBody),
    ),
)]
pub async fn profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
    viewer: Option<AuthUser>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let user = state
        .repo
        .user_by_username(&username)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let summary = profile_summary(&state, user.id, viewer.map(|v| v.user_id)).await?;
    let paged = state.repo.list_posts_by_author(user.id, query.page).await?;
    Ok(Json(ProfileResponse {
        user: user.into(),
        summary,
        posts: paged.items.into_iter().map(Into::into).collect(),
        page: paged.meta,
    }))
}

// ---------------------------------------------------------------------------
// GET /{username}/follow/ and /{username}/unfollow/
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, ToSchema)]
pub struct FollowResponse {
    /// Whether a follow edge exists after the operation.
    pub following: bool,
}

#[utoipa::path(
    get,
    path = "/{username}/follow/",
    tag = "Profiles",
    params(("username" = String, Path, description = "Author username")),
    responses(
        (status = 200, description = "Edge state after the request; self-follows are a no-op", body = FollowResponse),
        (status = 303, description = "Anonymous viewer is sent to the login form"),
        (status = 404, description = "Unknown user", body = ApiErrorBody),
    ),
)]
pub async fn follow(
    State(state): State<AppState>,
    Path(username): Path<String>,
    viewer: AuthUser,
) -> Result<Json<FollowResponse>, ApiError> {
    let author = state
        .repo
        .user_by_username(&username)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    // Self-follow is silently ignored; a duplicate is absorbed by the
    // storage-level uniqueness constraint.
    if author.id != viewer.user_id {
        state
            .repo
            .follow(NewFollow {
                id: state.snowflake.generate(),
                user_id: viewer.user_id,
                author_id: author.id,
            })
            .await?;
    }
    let following = state.repo.is_following(viewer.user_id, author.id).await?;
    Ok(Json(FollowResponse { following }))
}

#[utoipa::path(
    get,
    path = "/{username}/unfollow/",
    tag = "Profiles",
    params(("username" = String, Path, description = "Author username")),
    responses(
        (status = 200, description = "Edge state after the request; a missing edge is a no-op", body = FollowResponse),
        (status = 303, description = "Anonymous viewer is sent to the login form"),
        (status = 404, description = "Unknown user", body = ApiErrorBody),
    ),
)]
pub async fn unfollow(
    State(state): State<AppState>,
    Path(username): Path<String>,
    viewer: AuthUser,
) -> Result<Json<FollowResponse>, ApiError> {
    let author = state
        .repo
        .user_by_username(&username)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    state.repo.unfollow(viewer.user_id, author.id).await?;
    Ok(Json(FollowResponse { following: false }))
}

// ---------------------------------------------------------------------------
// GET /follow/
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/follow/",
    tag = "Profiles",
    params(PageQuery),
    responses(
        (status = 200, description = "Posts from followed authors, newest first", body = PostListResponse),
        (status = 303, description = "Anonymous viewer is sent to the login form"),
    ),
)]
pub async fn feed(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
    viewer: AuthUser,
) -> Result<Json<PostListResponse>, ApiError> {
    let paged = state.repo.list_feed(viewer.user_id, query.page).await?;
    Ok(Json(paged.into()))
}
