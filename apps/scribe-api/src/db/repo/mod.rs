//! Explicit per-entity storage interface.
//!
//! Every cascade rule lives in repository code rather than being inherited
//! from backend configuration: deleting a user removes their posts, comments
//! and follow edges; deleting a group detaches its posts; deleting a post
//! removes its comments. Backed by PostgreSQL in production and an in-memory
//! implementation in tests.

pub mod memory;
pub mod pg;

pub use memory::MemoryRepository;
pub use pg::PgRepository;

use async_trait::async_trait;

use crate::error::ApiError;
use crate::models::comment::{Comment, CommentEntry, NewComment};
use crate::models::follow::NewFollow;
use crate::models::group::{Group, NewGroup};
use crate::models::post::{NewPost, Post, PostChanges, PostEntry};
use crate::models::user::{NewUser, User};
use crate::pagination::Paged;

#[async_trait]
pub trait Repository: Send + Sync {
    // -- users --------------------------------------------------------------

    /// Insert the user, or return the existing row for the username with its
    /// display name refreshed.
    async fn upsert_user(&self, new: NewUser) -> Result<User, ApiError>;
    async fn user_by_id(&self, id: i64) -> Result<Option<User>, ApiError>;
    async fn user_by_username(&self, username: &str) -> Result<Option<User>, ApiError>;
    /// Delete the user and cascade to their posts (with those posts'
    /// comments), their comments elsewhere, and follow edges in both
    /// directions.
    async fn delete_user(&self, id: i64) -> Result<(), ApiError>;

    // -- groups -------------------------------------------------------------

    async fn create_group(&self, new: NewGroup) -> Result<Group, ApiError>;
    async fn group_by_id(&self, id: i64) -> Result<Option<Group>, ApiError>;
    async fn group_by_slug(&self, slug: &str) -> Result<Option<Group>, ApiError>;
    async fn list_groups(&self) -> Result<Vec<Group>, ApiError>;
    /// Delete the group; its posts survive with their group reference nulled.
    async fn delete_group(&self, id: i64) -> Result<(), ApiError>;

    // -- posts --------------------------------------------------------------

    async fn create_post(&self, new: NewPost) -> Result<Post, ApiError>;
    async fn post_entry(&self, id: i64) -> Result<Option<PostEntry>, ApiError>;
    /// Apply author edits. The publish timestamp is never touched.
    async fn update_post(&self, id: i64, changes: PostChanges) -> Result<Post, ApiError>;
    /// Delete the post and cascade to its comments.
    async fn delete_post(&self, id: i64) -> Result<(), ApiError>;
    async fn list_posts(&self, page: Option<i64>) -> Result<Paged<PostEntry>, ApiError>;
    async fn list_posts_by_group(
        &self,
        group_id: i64,
        page: Option<i64>,
    ) -> Result<Paged<PostEntry>, ApiError>;
    async fn list_posts_by_author(
        &self,
        author_id: i64,
        page: Option<i64>,
    ) -> Result<Paged<PostEntry>, ApiError>;
    /// Posts authored by anyone the viewer follows, newest first.
    async fn list_feed(
        &self,
        viewer_id: i64,
        page: Option<i64>,
    ) -> Result<Paged<PostEntry>, ApiError>;
    async fn count_posts_by_author(&self, author_id: i64) -> Result<i64, ApiError>;

    // -- comments -----------------------------------------------------------

    async fn create_comment(&self, new: NewComment) -> Result<Comment, ApiError>;
    async fn comment_by_id(&self, id: i64) -> Result<Option<Comment>, ApiError>;
    async fn update_comment(&self, id: i64, text: &str) -> Result<Comment, ApiError>;
    async fn delete_comment(&self, id: i64) -> Result<(), ApiError>;
    /// All comments on a post, newest first.
    async fn comments_for_post(&self, post_id: i64) -> Result<Vec<CommentEntry>, ApiError>;

    // -- follows ------------------------------------------------------------

    /// Insert a follow edge. Returns `false` when the pair already exists;
    /// the uniqueness constraint makes concurrent double-submits benign.
    async fn follow(&self, new: NewFollow) -> Result<bool, ApiError>;
    /// Delete a follow edge. Returns `false` when no edge existed.
    async fn unfollow(&self, user_id: i64, author_id: i64) -> Result<bool, ApiError>;
    async fn is_following(&self, user_id: i64, author_id: i64) -> Result<bool, ApiError>;
    /// Number of users following the author.
    async fn follower_count(&self, author_id: i64) -> Result<i64, ApiError>;
    /// Number of authors the user follows.
    async fn following_count(&self, user_id: i64) -> Result<i64, ApiError>;
}
