use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use utoipa::ToSchema;

use crate::db::schema::comments;
use crate::models::user::{User, UserResponse};

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = comments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub author_id: i64,
    pub text: String,
    pub created: DateTime<Utc>,
}

/// Record for creating a comment. `created` is assigned by the repository
/// at first persistence and is never updated afterwards.
#[derive(Debug, Clone)]
pub struct NewComment {
    pub id: i64,
    pub post_id: i64,
    pub author_id: i64,
    pub text: String,
}

/// A comment hydrated with its author.
#[derive(Debug, Clone)]
pub struct CommentEntry {
    pub comment: Comment,
    pub author: User,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CommentResponse {
    pub id: i64,
    pub post_id: i64,
    pub text: String,
    pub created: DateTime<Utc>,
    pub author: UserResponse,
}

impl From<CommentEntry> for CommentResponse {
    fn from(entry: CommentEntry) -> Self {
        Self {
            id: entry.comment.id,
            post_id: entry.comment.post_id,
            text: entry.comment.text,
            created: entry.comment.created,
            author: entry.author.into(),
        }
    }
}
