//! Post routes: the home listing, group listings, creation and editing.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::auth::guard::{self, AccessDecision};
use crate::auth::middleware::LoginRedirect;
use crate::auth::AuthUser;
use crate::cache;
use crate::error::{ApiError, ApiErrorBody, FieldError};
use crate::media;
use crate::models::comment::CommentResponse;
use crate::models::group::GroupResponse;
use crate::models::post::{NewPost, PostChanges, PostEntry, PostResponse};
use crate::pagination::{PageMeta, Paged};
use crate::routes::profiles::{self, ProfileSummary};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/group/{slug}/", get(group_posts))
        .route("/new/", get(new_post_form).post(create_post))
        .route("/{username}/{post_id}/", get(post_detail))
        .route("/{username}/{post_id}/edit/", get(edit_post_form).post(edit_post))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct PageQuery {
    /// 1-based page number; out-of-range values clamp to the nearest page.
    pub page: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PostListResponse {
    pub posts: Vec<PostResponse>,
    pub page: PageMeta,
}

impl From<Paged<PostEntry>> for PostListResponse {
    fn from(paged: Paged<PostEntry>) -> Self {
        Self {
            posts: paged.items.into_iter().map(PostResponse::from).collect(),
            page: paged.meta,
        }
    }
}

// ---------------------------------------------------------------------------
// GET /
// ---------------------------------------------------------------------------

fn json_fragment(body: String) -> Response {
    ([(CONTENT_TYPE, "application/json")], body).into_response()
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Posts",
    params(PageQuery),
    responses(
        (status = 200, description = "Global post listing, newest first", body = PostListResponse),
    ),
)]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Response, ApiError> {
    // Only the first page is fragment-cached; it is identical for every
    // viewer.
    let cacheable = query.page.unwrap_or(1) <= 1;
    if cacheable {
        if let Some(body) = cache::read_home(state.kv.as_ref()).await? {
            return Ok(json_fragment(body));
        }
    }

    let listing = PostListResponse::from(state.repo.list_posts(query.page).await?);
    if cacheable {
        let body =
            serde_json::to_string(&listing).map_err(|_| ApiError::internal("serialization"))?;
        cache::store_home(state.kv.as_ref(), &body).await?;
        return Ok(json_fragment(body));
    }
    Ok(Json(listing).into_response())
}

// ---------------------------------------------------------------------------
// GET /group/{slug}/
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, ToSchema)]
pub struct GroupPostsResponse {
    pub group: GroupResponse,
    pub posts: Vec<PostResponse>,
    pub page: PageMeta,
}

#[utoipa::path(
    get,
    path = "/group/{slug}/",
    tag = "Posts",
    params(
        ("slug" = String, Path, description = "Group slug"),
        PageQuery,
    ),
    responses(
        (status = 200, description = "Posts in the group, newest first", body = GroupPostsResponse),
        (status = 404, description = "Unknown group", body = ApiErrorBody),
    ),
)]
pub async fn group_posts(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<GroupPostsResponse>, ApiError> {
    let group = state
        .repo
        .group_by_slug(&slug)
        .await?
        .ok_or_else(|| ApiError::not_found("Group not found"))?;

    let paged = state.repo.list_posts_by_group(group.id, query.page).await?;
    Ok(Json(GroupPostsResponse {
        group: group.into(),
        posts: paged.items.into_iter().map(PostResponse::from).collect(),
        page: paged.meta,
    }))
}

// ---------------------------------------------------------------------------
// Post form handling (shared by create and edit)
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, ToSchema)]
pub struct PostFormResponse {
    /// Groups offered by the group selector.
    pub groups: Vec<GroupResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<PostResponse>,
}

struct PostForm {
    text: String,
    group_id: Option<i64>,
    image: Option<Vec<u8>>,
}

async fn parse_post_form(mut multipart: Multipart) -> Result<PostForm, ApiError> {
    let mut text = String::new();
    let mut group_id = None;
    let mut image = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::bad_request("Malformed multipart body"))?
    {
        match field.name().unwrap_or_default() {
            "text" => {
                text = field
                    .text()
                    .await
                    .map_err(|_| ApiError::bad_request("Malformed multipart body"))?;
            }
            "group" => {
                let raw = field
                    .text()
                    .await
                    .map_err(|_| ApiError::bad_request("Malformed multipart body"))?;
                if !raw.is_empty() {
                    group_id = Some(raw.parse::<i64>().map_err(|_| {
                        ApiError::validation(vec![FieldError {
                            field: "group".to_string(),
                            message: "Select a valid choice".to_string(),
                        }])
                    })?);
                }
            }
            "image" => {
                let data = field
                    .bytes()
                    .await
                    .map_err(|_| ApiError::bad_request("Malformed multipart body"))?;
                if !data.is_empty() {
                    image = Some(data.to_vec());
                }
            }
            _ => {}
        }
    }

    Ok(PostForm {
        text,
        group_id,
        image,
    })
}

/// Validate the shared form fields and resolve the group, if any.
async fn validate_post_form(state: &AppState, form: &PostForm) -> Result<(), ApiError> {
    if form.text.trim().is_empty() {
        return Err(ApiError::validation(vec![FieldError {
            field: "text".to_string(),
            message: "This field is required".to_string(),
        }]));
    }
    if let Some(group_id) = form.group_id {
        if state.repo.group_by_id(group_id).await?.is_none() {
            return Err(ApiError::validation(vec![FieldError {
                field: "group".to_string(),
                message: "Select a valid choice".to_string(),
            }]));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// GET /new/
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/new/",
    tag = "Posts",
    responses(
        (status = 200, description = "Post creation form", body = PostFormResponse),
        (status = 303, description = "Anonymous viewer is sent to the login form"),
    ),
)]
pub async fn new_post_form(
    State(state): State<AppState>,
    _viewer: AuthUser,
) -> Result<Json<PostFormResponse>, ApiError> {
    let groups = state.repo.list_groups().await?;
    Ok(Json(PostFormResponse {
        groups: groups.into_iter().map(GroupResponse::from).collect(),
        post: None,
    }))
}

// ---------------------------------------------------------------------------
// POST /new/
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/new/",
    tag = "Posts",
    responses(
        (status = 201, description = "Post created", body = PostResponse),
        (status = 400, description = "Validation failed", body = ApiErrorBody),
        (status = 303, description = "Anonymous viewer is sent to the login form"),
    ),
)]
pub async fn create_post(
    State(state): State<AppState>,
    viewer: AuthUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<PostResponse>), ApiError> {
    let form = parse_post_form(multipart).await?;
    validate_post_form(&state, &form).await?;

    // Image validation happens before the row exists, so a bad upload
    // leaves nothing behind.
    let image = match &form.image {
        Some(data) => Some(media::store_post_image(&state.config.media_root, data).await?),
        None => None,
    };

    let post = state
        .repo
        .create_post(NewPost {
            id: state.snowflake.generate(),
            text: form.text,
            author_id: viewer.user_id,
            group_id: form.group_id,
            image,
        })
        .await?;

    cache::invalidate_home(state.kv.as_ref()).await?;

    let entry = state
        .repo
        .post_entry(post.id)
        .await?
        .ok_or_else(|| ApiError::internal("Post vanished after insert"))?;
    Ok((StatusCode::CREATED, Json(entry.into())))
}

// ---------------------------------------------------------------------------
// GET /{username}/{post_id}/
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, ToSchema)]
pub struct PostDetailResponse {
    pub post: PostResponse,
    pub comments: Vec<CommentResponse>,
    pub author_summary: ProfileSummary,
}

/// Load the post and check that it belongs to the author in the path.
pub async fn entry_for_path(
    state: &AppState,
    username: &str,
    post_id: i64,
) -> Result<PostEntry, ApiError> {
    let entry = state
        .repo
        .post_entry(post_id)
        .await?
        .filter(|e| e.author.username == username)
        .ok_or_else(|| ApiError::not_found("Post not found"))?;
    Ok(entry)
}

async fn detail_response(
    state: &AppState,
    entry: PostEntry,
    viewer: Option<i64>,
) -> Result<PostDetailResponse, ApiError> {
    let comments = state.repo.comments_for_post(entry.post.id).await?;
    let author_summary = profiles::profile_summary(state, entry.author.id, viewer).await?;
    Ok(PostDetailResponse {
        post: entry.into(),
        comments: comments.into_iter().map(CommentResponse::from).collect(),
        author_summary,
    })
}

#[utoipa::path(
    get,
    path = "/{username}/{post_id}/",
    tag = "Posts",
    params(
        ("username" = String, Path, description = "Author username"),
        ("post_id" = i64, Path, description = "Post id"),
    ),
    responses(
        (status = 200, description = "Post with its comments", body = PostDetailResponse),
        (status = 404, description = "Unknown post or author mismatch", body = ApiErrorBody),
    ),
)]
pub async fn post_detail(
    State(state): State<AppState>,
    Path((username, post_id)): Path<(String, i64)>,
    viewer: Option<AuthUser>,
) -> Result<Json<PostDetailResponse>, ApiError> {
    let entry = entry_for_path(&state, &username, post_id).await?;
    let detail = detail_response(&state, entry, viewer.map(|v| v.user_id)).await?;
    Ok(Json(detail))
}

// ---------------------------------------------------------------------------
// GET /{username}/{post_id}/edit/
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/{username}/{post_id}/edit/",
    tag = "Posts",
    params(
        ("username" = String, Path, description = "Author username"),
        ("post_id" = i64, Path, description = "Post id"),
    ),
    responses(
        (status = 200, description = "Edit form for the owner, read-only post view otherwise", body = PostFormResponse),
        (status = 303, description = "Anonymous viewer is sent to the login form"),
        (status = 404, description = "Unknown post", body = ApiErrorBody),
    ),
)]
pub async fn edit_post_form(
    State(state): State<AppState>,
    Path((username, post_id)): Path<(String, i64)>,
    viewer: Option<AuthUser>,
    uri: Uri,
) -> Result<Response, ApiError> {
    let entry = entry_for_path(&state, &username, post_id).await?;
    let viewer_id = viewer.map(|v| v.user_id);

    match guard::author_only(viewer_id, entry.author.id) {
        AccessDecision::RequiresLogin => Ok(LoginRedirect::to(uri.path()).into_response()),
        // Non-owners see the post itself, not an error page.
        AccessDecision::Forbidden => {
            let detail = detail_response(&state, entry, viewer_id).await?;
            Ok(Json(detail).into_response())
        }
        AccessDecision::Allowed => {
            let groups = state.repo.list_groups().await?;
            Ok(Json(PostFormResponse {
                groups: groups.into_iter().map(GroupResponse::from).collect(),
                post: Some(entry.into()),
            })
            .into_response())
        }
    }
}

// ---------------------------------------------------------------------------
// POST /{username}/{post_id}/edit/
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/{username}/{post_id}/edit/",
    tag = "Posts",
    params(
        ("username" = String, Path, description = "Author username"),
        ("post_id" = i64, Path, description = "Post id"),
    ),
    responses(
        (status = 200, description = "Post updated; non-owners get the unchanged post", body = PostResponse),
        (status = 400, description = "Validation failed", body = ApiErrorBody),
        (status = 303, description = "Anonymous viewer is sent to the login form"),
        (status = 404, description = "Unknown post", body = ApiErrorBody),
    ),
)]
pub async fn edit_post(
    State(state): State<AppState>,
    Path((username, post_id)): Path<(String, i64)>,
    viewer: Option<AuthUser>,
    uri: Uri,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let entry = entry_for_path(&state, &username, post_id).await?;
    let viewer_id = viewer.map(|v| v.user_id);

    match guard::author_only(viewer_id, entry.author.id) {
        AccessDecision::RequiresLogin => Ok(LoginRedirect::to(uri.path()).into_response()),
        AccessDecision::Forbidden => {
            let detail = detail_response(&state, entry, viewer_id).await?;
            Ok(Json(detail).into_response())
        }
        AccessDecision::Allowed => {
            let form = parse_post_form(multipart).await?;
            validate_post_form(&state, &form).await?;

            let image = match &form.image {
                Some(data) => {
                    Some(media::store_post_image(&state.config.media_root, data).await?)
                }
                None => None,
            };

            state
                .repo
                .update_post(
                    post_id,
                    PostChanges {
                        text: form.text,
                        group_id: form.group_id,
                        image,
                    },
                )
                .await?;
            cache::invalidate_home(state.kv.as_ref()).await?;

            let entry = state
                .repo
                .post_entry(post_id)
                .await?
                .ok_or_else(|| ApiError::internal("Post vanished after update"))?;
            Ok(Json(PostResponse::from(entry)).into_response())
        }
    }
}
