//! PostgreSQL-backed repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::upsert::excluded;
use diesel_async::{AsyncConnection, RunQueryDsl};
use scoped_futures::ScopedFutureExt;

use crate::db::pool::DbPool;
use crate::db::schema::{comments, follows, groups, posts, users};
use crate::error::ApiError;
use crate::models::comment::{Comment, CommentEntry, NewComment};
use crate::models::follow::NewFollow;
use crate::models::group::{Group, NewGroup};
use crate::models::post::{NewPost, Post, PostChanges, PostEntry};
use crate::models::user::{NewUser, User};
use crate::pagination::{paginate, Paged, PAGE_SIZE};

use super::Repository;

pub struct PgRepository {
    pool: DbPool,
}

impl PgRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn entry_from_row((post, author, group): (Post, User, Option<Group>)) -> PostEntry {
    PostEntry {
        post,
        author,
        group,
    }
}

fn map_unique_violation(err: diesel::result::Error, message: &str) -> ApiError {
    match err {
        diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            _,
        ) => ApiError::conflict(message),
        other => ApiError::from(other),
    }
}

#[async_trait]
impl Repository for PgRepository {
    // -- users --------------------------------------------------------------

    async fn upsert_user(&self, new: NewUser) -> Result<User, ApiError> {
        let mut conn = self.pool.get().await?;

        let user = diesel::insert_into(users::table)
            .values(UserRow {
                id: new.id,
                username: new.username,
                display_name: new.display_name,
                created_at: Utc::now(),
            })
            .on_conflict(users::username)
            .do_update()
            .set(users::display_name.eq(excluded(users::display_name)))
            .returning(User::as_returning())
            .get_result(&mut conn)
            .await?;

        Ok(user)
    }

    async fn user_by_id(&self, id: i64) -> Result<Option<User>, ApiError> {
        let mut conn = self.pool.get().await?;
        Ok(users::table
            .find(id)
            .select(User::as_select())
            .first(&mut conn)
            .await
            .optional()?)
    }

    async fn user_by_username(&self, username: &str) -> Result<Option<User>, ApiError> {
        let mut conn = self.pool.get().await?;
        Ok(users::table
            .filter(users::username.eq(username))
            .select(User::as_select())
            .first(&mut conn)
            .await
            .optional()?)
    }

    async fn delete_user(&self, id: i64) -> Result<(), ApiError> {
        let mut conn = self.pool.get().await?;

        conn.transaction::<_, ApiError, _>(|conn| {
            async move {
                // Comments on the user's posts, then the user's own comments.
                diesel::delete(
                    comments::table.filter(
                        comments::post_id.eq_any(
                            posts::table
                                .filter(posts::author_id.eq(id))
                                .select(posts::id),
                        ),
                    ),
                )
                .execute(conn)
                .await?;
                diesel::delete(comments::table.filter(comments::author_id.eq(id)))
                    .execute(conn)
                    .await?;

                // Follow edges in both directions.
                diesel::delete(
                    follows::table
                        .filter(follows::user_id.eq(id).or(follows::author_id.eq(id))),
                )
                .execute(conn)
                .await?;

                diesel::delete(posts::table.filter(posts::author_id.eq(id)))
                    .execute(conn)
                    .await?;
                diesel::delete(users::table.find(id)).execute(conn).await?;
                Ok(())
            }
            .scope_boxed()
        })
        .await
    }

    // -- groups -------------------------------------------------------------

    async fn create_group(&self, new: NewGroup) -> Result<Group, ApiError> {
        let mut conn = self.pool.get().await?;

        diesel::insert_into(groups::table)
            .values(GroupRow {
                id: new.id,
                title: new.title,
                slug: new.slug,
                description: new.description,
            })
            .returning(Group::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(|e| map_unique_violation(e, "Slug is already taken"))
    }

    async fn group_by_id(&self, id: i64) -> Result<Option<Group>, ApiError> {
        let mut conn = self.pool.get().await?;
        Ok(groups::table
            .find(id)
            .select(Group::as_select())
            .first(&mut conn)
            .await
            .optional()?)
    }

    async fn group_by_slug(&self, slug: &str) -> Result<Option<Group>, ApiError> {
        let mut conn = self.pool.get().await?;
        Ok(groups::table
            .filter(groups::slug.eq(slug))
            .select(Group::as_select())
            .first(&mut conn)
            .await
            .optional()?)
    }

    async fn list_groups(&self) -> Result<Vec<Group>, ApiError> {
        let mut conn = self.pool.get().await?;
        Ok(groups::table
            .order(groups::title.asc())
            .select(Group::as_select())
            .load(&mut conn)
            .await?)
    }

    async fn delete_group(&self, id: i64) -> Result<(), ApiError> {
        let mut conn = self.pool.get().await?;

        conn.transaction::<_, ApiError, _>(|conn| {
            async move {
                // Posts survive with their group reference detached.
                diesel::update(posts::table.filter(posts::group_id.eq(id)))
                    .set(posts::group_id.eq(None::<i64>))
                    .execute(conn)
                    .await?;
                diesel::delete(groups::table.find(id)).execute(conn).await?;
                Ok(())
            }
            .scope_boxed()
        })
        .await
    }

    // -- posts --------------------------------------------------------------

    async fn create_post(&self, new: NewPost) -> Result<Post, ApiError> {
        let mut conn = self.pool.get().await?;

        let post = diesel::insert_into(posts::table)
            .values(PostRow {
                id: new.id,
                text: new.text,
                pub_date: Utc::now(),
                author_id: new.author_id,
                group_id: new.group_id,
                image: new.image,
            })
            .returning(Post::as_returning())
            .get_result(&mut conn)
            .await?;

        Ok(post)
    }

    async fn post_entry(&self, id: i64) -> Result<Option<PostEntry>, ApiError> {
        let mut conn = self.pool.get().await?;

        let row: Option<(Post, User, Option<Group>)> = posts::table
            .inner_join(users::table)
            .left_join(groups::table)
            .filter(posts::id.eq(id))
            .select((
                Post::as_select(),
                User::as_select(),
                Option::<Group>::as_select(),
            ))
            .first(&mut conn)
            .await
            .optional()?;

        Ok(row.map(entry_from_row))
    }

    async fn update_post(&self, id: i64, changes: PostChanges) -> Result<Post, ApiError> {
        let mut conn = self.pool.get().await?;

        // pub_date is deliberately absent from both changesets.
        let updated: Option<Post> = if let Some(image) = changes.image {
            diesel::update(posts::table.find(id))
                .set((
                    posts::text.eq(changes.text),
                    posts::group_id.eq(changes.group_id),
                    posts::image.eq(image),
                ))
                .returning(Post::as_returning())
                .get_result(&mut conn)
                .await
                .optional()?
        } else {
            diesel::update(posts::table.find(id))
                .set((
                    posts::text.eq(changes.text),
                    posts::group_id.eq(changes.group_id),
                ))
                .returning(Post::as_returning())
                .get_result(&mut conn)
                .await
                .optional()?
        };

        updated.ok_or_else(|| ApiError::not_found("Post not found"))
    }

    async fn delete_post(&self, id: i64) -> Result<(), ApiError> {
        let mut conn = self.pool.get().await?;

        conn.transaction::<_, ApiError, _>(|conn| {
            async move {
                diesel::delete(comments::table.filter(comments::post_id.eq(id)))
                    .execute(conn)
                    .await?;
                diesel::delete(posts::table.find(id)).execute(conn).await?;
                Ok(())
            }
            .scope_boxed()
        })
        .await
    }

    async fn list_posts(&self, page: Option<i64>) -> Result<Paged<PostEntry>, ApiError> {
        let mut conn = self.pool.get().await?;

        let count: i64 = posts::table.count().get_result(&mut conn).await?;
        let (meta, offset) = paginate(count, page);

        let rows: Vec<(Post, User, Option<Group>)> = posts::table
            .inner_join(users::table)
            .left_join(groups::table)
            .order((posts::pub_date.desc(), posts::id.desc()))
            .offset(offset)
            .limit(PAGE_SIZE)
            .select((
                Post::as_select(),
                User::as_select(),
                Option::<Group>::as_select(),
            ))
            .load(&mut conn)
            .await?;

        Ok(Paged {
            items: rows.into_iter().map(entry_from_row).collect(),
            meta,
        })
    }

    async fn list_posts_by_group(
        &self,
        group_id: i64,
        page: Option<i64>,
    ) -> Result<Paged<PostEntry>, ApiError> {
        let mut conn = self.pool.get().await?;

        let count: i64 = posts::table
            .filter(posts::group_id.eq(group_id))
            .count()
            .get_result(&mut conn)
            .await?;
        let (meta, offset) = paginate(count, page);

        let rows: Vec<(Post, User, Option<Group>)> = posts::table
            .inner_join(users::table)
            .left_join(groups::table)
            .filter(posts::group_id.eq(group_id))
            .order((posts::pub_date.desc(), posts::id.desc()))
            .offset(offset)
            .limit(PAGE_SIZE)
            .select((
                Post::as_select(),
                User::as_select(),
                Option::<Group>::as_select(),
            ))
            .load(&mut conn)
            .await?;

        Ok(Paged {
            items: rows.into_iter().map(entry_from_row).collect(),
            meta,
        })
    }

    async fn list_posts_by_author(
        &self,
        author_id: i64,
        page: Option<i64>,
    ) -> Result<Paged<PostEntry>, ApiError> {
        let mut conn = self.pool.get().await?;

        let count: i64 = posts::table
            .filter(posts::author_id.eq(author_id))
            .count()
            .get_result(&mut conn)
            .await?;
        let (meta, offset) = paginate(count, page);

        let rows: Vec<(Post, User, Option<Group>)> = posts::table
            .inner_join(users::table)
            .left_join(groups::table)
            .filter(posts::author_id.eq(author_id))
            .order((posts::pub_date.desc(), posts::id.desc()))
            .offset(offset)
            .limit(PAGE_SIZE)
            .select((
                Post::as_select(),
                User::as_select(),
                Option::<Group>::as_select(),
            ))
            .load(&mut conn)
            .await?;

        Ok(Paged {
            items: rows.into_iter().map(entry_from_row).collect(),
            meta,
        })
    }

    async fn list_feed(
        &self,
        viewer_id: i64,
        page: Option<i64>,
    ) -> Result<Paged<PostEntry>, ApiError> {
        let mut conn = self.pool.get().await?;

        let count: i64 = posts::table
            .filter(
                posts::author_id.eq_any(
                    follows::table
                        .filter(follows::user_id.eq(viewer_id))
                        .select(follows::author_id),
                ),
            )
            .count()
            .get_result(&mut conn)
            .await?;
        let (meta, offset) = paginate(count, page);

        let rows: Vec<(Post, User, Option<Group>)> = posts::table
            .inner_join(users::table)
            .left_join(groups::table)
            .filter(
                posts::author_id.eq_any(
                    follows::table
                        .filter(follows::user_id.eq(viewer_id))
                        .select(follows::author_id),
                ),
            )
            .order((posts::pub_date.desc(), posts::id.desc()))
            .offset(offset)
            .limit(PAGE_SIZE)
            .select((
                Post::as_select(),
                User::as_select(),
                Option::<Group>::as_select(),
            ))
            .load(&mut conn)
            .await?;

        Ok(Paged {
            items: rows.into_iter().map(entry_from_row).collect(),
            meta,
        })
    }

    async fn count_posts_by_author(&self, author_id: i64) -> Result<i64, ApiError> {
        let mut conn = self.pool.get().await?;
        Ok(posts::table
            .filter(posts::author_id.eq(author_id))
            .count()
            .get_result(&mut conn)
            .await?)
    }

    // -- comments -----------------------------------------------------------

    async fn create_comment(&self, new: NewComment) -> Result<Comment, ApiError> {
        let mut conn = self.pool.get().await?;

        let comment = diesel::insert_into(comments::table)
            .values(CommentRow {
                id: new.id,
                post_id: new.post_id,
                author_id: new.author_id,
                text: new.text,
                created: Utc::now(),
            })
            .returning(Comment::as_returning())
            .get_result(&mut conn)
            .await?;

        Ok(comment)
    }

    async fn comment_by_id(&self, id: i64) -> Result<Option<Comment>, ApiError> {
        let mut conn = self.pool.get().await?;
        Ok(comments::table
            .find(id)
            .select(Comment::as_select())
            .first(&mut conn)
            .await
            .optional()?)
    }

    async fn update_comment(&self, id: i64, text: &str) -> Result<Comment, ApiError> {
        let mut conn = self.pool.get().await?;

        diesel::update(comments::table.find(id))
            .set(comments::text.eq(text))
            .returning(Comment::as_returning())
            .get_result(&mut conn)
            .await
            .optional()?
            .ok_or_else(|| ApiError::not_found("Comment not found"))
    }

    async fn delete_comment(&self, id: i64) -> Result<(), ApiError> {
        let mut conn = self.pool.get().await?;
        diesel::delete(comments::table.find(id))
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    async fn comments_for_post(&self, post_id: i64) -> Result<Vec<CommentEntry>, ApiError> {
        let mut conn = self.pool.get().await?;

        let rows: Vec<(Comment, User)> = comments::table
            .inner_join(users::table)
            .filter(comments::post_id.eq(post_id))
            .order((comments::created.desc(), comments::id.desc()))
            .select((Comment::as_select(), User::as_select()))
            .load(&mut conn)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(comment, author)| CommentEntry { comment, author })
            .collect())
    }

    // -- follows ------------------------------------------------------------

    async fn follow(&self, new: NewFollow) -> Result<bool, ApiError> {
        let mut conn = self.pool.get().await?;

        let inserted = diesel::insert_into(follows::table)
            .values(FollowRow {
                id: new.id,
                user_id: new.user_id,
                author_id: new.author_id,
            })
            .on_conflict((follows::user_id, follows::author_id))
            .do_nothing()
            .execute(&mut conn)
            .await?;

        Ok(inserted > 0)
    }

    async fn unfollow(&self, user_id: i64, author_id: i64) -> Result<bool, ApiError> {
        let mut conn = self.pool.get().await?;

        let deleted = diesel::delete(
            follows::table
                .filter(follows::user_id.eq(user_id))
                .filter(follows::author_id.eq(author_id)),
        )
        .execute(&mut conn)
        .await?;

        Ok(deleted > 0)
    }

    async fn is_following(&self, user_id: i64, author_id: i64) -> Result<bool, ApiError> {
        let mut conn = self.pool.get().await?;
        Ok(diesel::select(diesel::dsl::exists(
            follows::table
                .filter(follows::user_id.eq(user_id))
                .filter(follows::author_id.eq(author_id)),
        ))
        .get_result(&mut conn)
        .await?)
    }

    async fn follower_count(&self, author_id: i64) -> Result<i64, ApiError> {
        let mut conn = self.pool.get().await?;
        Ok(follows::table
            .filter(follows::author_id.eq(author_id))
            .count()
            .get_result(&mut conn)
            .await?)
    }

    async fn following_count(&self, user_id: i64) -> Result<i64, ApiError> {
        let mut conn = self.pool.get().await?;
        Ok(follows::table
            .filter(follows::user_id.eq(user_id))
            .count()
            .get_result(&mut conn)
            .await?)
    }
}

// ---------------------------------------------------------------------------
// Insertable rows
// ---------------------------------------------------------------------------

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
struct UserRow {
    id: i64,
    username: String,
    display_name: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = groups)]
struct GroupRow {
    id: i64,
    title: String,
    slug: String,
    description: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = posts)]
struct PostRow {
    id: i64,
    text: String,
    pub_date: DateTime<Utc>,
    author_id: i64,
    group_id: Option<i64>,
    image: Option<String>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = comments)]
struct CommentRow {
    id: i64,
    post_id: i64,
    author_id: i64,
    text: String,
    created: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = follows)]
struct FollowRow {
    id: i64,
    user_id: i64,
    author_id: i64,
}
