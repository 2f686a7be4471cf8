//! Auth routes: login form and session issuance.

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::auth::sessions;
use crate::error::{ApiError, ApiErrorBody, FieldError};
use crate::models::user::{NewUser, UserResponse};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/auth/login/", get(login_form).post(login))
}

// ---------------------------------------------------------------------------
// GET /auth/login/
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, IntoParams)]
pub struct LoginFormQuery {
    /// Path to return to after a successful login.
    pub next: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginFormResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

#[utoipa::path(
    get,
    path = "/auth/login/",
    tag = "Auth",
    params(LoginFormQuery),
    responses(
        (status = 200, description = "Login form", body = LoginFormResponse),
    ),
)]
pub async fn login_form(Query(query): Query<LoginFormQuery>) -> Json<LoginFormResponse> {
    Json(LoginFormResponse { next: query.next })
}

// ---------------------------------------------------------------------------
// POST /auth/login/
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub user: UserResponse,
}

fn validate_username(username: &str) -> Result<(), ApiError> {
    let ok = (2..=32).contains(&username.len())
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));
    if ok {
        Ok(())
    } else {
        Err(ApiError::validation(vec![FieldError {
            field: "username".to_string(),
            message: "Username must be 2-32 characters of letters, digits, '_', '.' or '-'"
                .to_string(),
        }]))
    }
}

#[utoipa::path(
    post,
    path = "/auth/login/",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Invalid username", body = ApiErrorBody),
    ),
)]
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    validate_username(&body.username)?;

    let display_name = body
        .display_name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| body.username.clone());

    // Provision the local row on first login; later logins keep it.
    let user = state
        .repo
        .upsert_user(NewUser {
            id: state.snowflake.generate(),
            username: body.username,
            display_name,
        })
        .await?;

    let token = sessions::generate_session_token();
    sessions::store_session(
        state.kv.as_ref(),
        &token,
        &sessions::SessionData { user_id: user.id },
    )
    .await?;

    Ok(Json(LoginResponse {
        access_token: token,
        token_type: "Bearer".to_string(),
        expires_in: sessions::SESSION_TTL_SECS,
        user: user.into(),
    }))
}
