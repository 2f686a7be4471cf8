pub mod auth;
pub mod comments;
pub mod health;
pub mod posts;
pub mod profiles;

use axum::http::Uri;
use axum::Router;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::error::ApiError;
use crate::AppState;

pub fn router() -> Router<AppState> {
    // Static routes take priority over the `{username}` captures, so
    // `/new/`, `/group/...` and `/follow/` never shadow a profile.
    Router::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(posts::router())
        .merge(comments::router())
        .merge(profiles::router())
        .fallback(not_found)
}

async fn not_found(uri: Uri) -> ApiError {
    ApiError::not_found(format!("No route for {}", uri.path()))
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        // Health
        health::health,
        // Auth
        auth::login_form,
        auth::login,
        // Posts
        posts::index,
        posts::group_posts,
        posts::new_post_form,
        posts::create_post,
        posts::post_detail,
        posts::edit_post_form,
        posts::edit_post,
        // Comments
        comments::add_comment,
        comments::edit_comment,
        comments::delete_comment,
        // Profiles
        profiles::profile,
        profiles::follow,
        profiles::unfollow,
        profiles::feed,
    ),
    components(
        schemas(
            // Error types
            crate::error::ApiErrorBody,
            crate::error::ApiErrorDetail,
            crate::error::FieldError,
            // Models
            crate::models::user::UserResponse,
            crate::models::group::GroupResponse,
            crate::models::post::PostResponse,
            crate::models::comment::CommentResponse,
            crate::pagination::PageMeta,
            // Route request/response types
            health::HealthResponse,
            auth::LoginFormResponse,
            auth::LoginRequest,
            auth::LoginResponse,
            posts::PostListResponse,
            posts::GroupPostsResponse,
            posts::PostFormResponse,
            posts::PostDetailResponse,
            comments::CommentForm,
            profiles::ProfileSummary,
            profiles::ProfileResponse,
            profiles::FollowResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check"),
        (name = "Auth", description = "Authentication"),
        (name = "Posts", description = "Post listings and publishing"),
        (name = "Comments", description = "Comments on posts"),
        (name = "Profiles", description = "Author profiles, follows and the feed"),
    )
)]
pub struct ApiDoc;
