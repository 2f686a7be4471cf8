//! Session token extraction.
//!
//! `AuthUser` as a required extractor redirects anonymous requests to the
//! login form, carrying the original path in the `next` query parameter.
//! As an `Option<AuthUser>` extractor it never rejects, which lets public
//! pages render differently for signed-in viewers.

use std::convert::Infallible;

use axum::extract::{FromRequestParts, OptionalFromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Redirect, Response};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

use crate::auth::sessions;
use crate::AppState;

/// Characters that would break the path out of the `next` query value.
const NEXT_VALUE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'+')
    .add(b'<')
    .add(b'>')
    .add(b'=')
    .add(b'?');

/// Authenticated user extracted from the `Authorization: Bearer <token>`
/// header.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: i64,
}

/// Rejection that sends the client to the login form with a return path.
pub struct LoginRedirect {
    next: String,
}

impl LoginRedirect {
    pub fn to(next: &str) -> Self {
        Self {
            next: next.to_string(),
        }
    }
}

impl IntoResponse for LoginRedirect {
    fn into_response(self) -> Response {
        let next = utf8_percent_encode(&self.next, NEXT_VALUE);
        Redirect::to(&format!("/auth/login/?next={next}")).into_response()
    }
}

async fn authenticate(parts: &Parts, state: &AppState) -> Option<AuthUser> {
    let header = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?;
    let data = sessions::lookup_session(state.kv.as_ref(), token)
        .await
        .ok()??;
    Some(AuthUser {
        user_id: data.user_id,
    })
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = LoginRedirect;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        authenticate(parts, state)
            .await
            .ok_or_else(|| LoginRedirect::to(parts.uri.path()))
    }
}

impl OptionalFromRequestParts<AppState> for AuthUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(authenticate(parts, state).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_paths_pass_through_unchanged() {
        let resp = LoginRedirect::to("/new/").into_response();
        assert_eq!(resp.headers()["location"], "/auth/login/?next=/new/");
    }

    #[test]
    fn login_redirect_escapes_the_return_path() {
        let resp = LoginRedirect::to("/writer/follow/?from=a&b").into_response();
        assert_eq!(
            resp.headers()["location"],
            "/auth/login/?next=/writer/follow/%3Ffrom%3Da%26b"
        );
    }
}
