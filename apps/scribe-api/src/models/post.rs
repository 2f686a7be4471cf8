use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use utoipa::ToSchema;

use crate::db::schema::posts;
use crate::models::group::{Group, GroupResponse};
use crate::models::user::{User, UserResponse};

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = posts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Post {
    pub id: i64,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub author_id: i64,
    pub group_id: Option<i64>,
    pub image: Option<String>,
}

/// Record for creating a post. `pub_date` is assigned by the repository at
/// first persistence and is never updated afterwards.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub id: i64,
    pub text: String,
    pub author_id: i64,
    pub group_id: Option<i64>,
    pub image: Option<String>,
}

/// Fields an author may change on an existing post. `image: None` keeps the
/// current image; `group_id: None` detaches the post from its group.
#[derive(Debug, Clone)]
pub struct PostChanges {
    pub text: String,
    pub group_id: Option<i64>,
    pub image: Option<String>,
}

/// A post hydrated with its author and optional group.
#[derive(Debug, Clone)]
pub struct PostEntry {
    pub post: Post,
    pub author: User,
    pub group: Option<Group>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PostResponse {
    pub id: i64,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub author: UserResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<GroupResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl From<PostEntry> for PostResponse {
    fn from(entry: PostEntry) -> Self {
        Self {
            id: entry.post.id,
            text: entry.post.text,
            pub_date: entry.post.pub_date,
            author: entry.author.into(),
            group: entry.group.map(GroupResponse::from),
            image: entry.post.image,
        }
    }
}
