//! In-memory repository used by the integration test suite.
//!
//! Implements the same cascade and ordering semantics as the PostgreSQL
//! implementation, guarded by a single mutex.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::ApiError;
use crate::models::comment::{Comment, CommentEntry, NewComment};
use crate::models::follow::{Follow, NewFollow};
use crate::models::group::{Group, NewGroup};
use crate::models::post::{NewPost, Post, PostChanges, PostEntry};
use crate::models::user::{NewUser, User};
use crate::pagination::{paginate, Paged, PAGE_SIZE};

use super::Repository;

#[derive(Default)]
struct Inner {
    users: HashMap<i64, User>,
    groups: HashMap<i64, Group>,
    posts: HashMap<i64, Post>,
    comments: HashMap<i64, Comment>,
    follows: Vec<Follow>,
}

pub struct MemoryRepository {
    inner: Mutex<Inner>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

fn hydrate(inner: &Inner, post: &Post) -> Result<PostEntry, ApiError> {
    let author = inner
        .users
        .get(&post.author_id)
        .cloned()
        .ok_or_else(|| ApiError::internal("post author missing"))?;
    let group = post.group_id.and_then(|id| inner.groups.get(&id).cloned());
    Ok(PostEntry {
        post: post.clone(),
        author,
        group,
    })
}

fn page_posts(
    inner: &Inner,
    mut posts: Vec<&Post>,
    page: Option<i64>,
) -> Result<Paged<PostEntry>, ApiError> {
    posts.sort_by(|a, b| b.pub_date.cmp(&a.pub_date).then(b.id.cmp(&a.id)));
    let (meta, offset) = paginate(posts.len() as i64, page);
    let items = posts
        .into_iter()
        .skip(offset as usize)
        .take(PAGE_SIZE as usize)
        .map(|p| hydrate(inner, p))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Paged { items, meta })
}

#[async_trait]
impl Repository for MemoryRepository {
    // -- users --------------------------------------------------------------

    async fn upsert_user(&self, new: NewUser) -> Result<User, ApiError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(user) = inner
            .users
            .values_mut()
            .find(|u| u.username == new.username)
        {
            user.display_name = new.display_name;
            return Ok(user.clone());
        }
        let user = User {
            id: new.id,
            username: new.username,
            display_name: new.display_name,
            created_at: Utc::now(),
        };
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn user_by_id(&self, id: i64) -> Result<Option<User>, ApiError> {
        Ok(self.inner.lock().unwrap().users.get(&id).cloned())
    }

    async fn user_by_username(&self, username: &str) -> Result<Option<User>, ApiError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn delete_user(&self, id: i64) -> Result<(), ApiError> {
        let mut inner = self.inner.lock().unwrap();

        let removed_posts: Vec<i64> = inner
            .posts
            .values()
            .filter(|p| p.author_id == id)
            .map(|p| p.id)
            .collect();
        inner.posts.retain(|_, p| p.author_id != id);
        inner
            .comments
            .retain(|_, c| c.author_id != id && !removed_posts.contains(&c.post_id));
        inner
            .follows
            .retain(|f| f.user_id != id && f.author_id != id);
        inner.users.remove(&id);
        Ok(())
    }

    // -- groups -------------------------------------------------------------

    async fn create_group(&self, new: NewGroup) -> Result<Group, ApiError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.groups.values().any(|g| g.slug == new.slug) {
            return Err(ApiError::conflict("Slug is already taken"));
        }
        let group = Group {
            id: new.id,
            title: new.title,
            slug: new.slug,
            description: new.description,
        };
        inner.groups.insert(group.id, group.clone());
        Ok(group)
    }

    async fn group_by_id(&self, id: i64) -> Result<Option<Group>, ApiError> {
        Ok(self.inner.lock().unwrap().groups.get(&id).cloned())
    }

    async fn group_by_slug(&self, slug: &str) -> Result<Option<Group>, ApiError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .groups
            .values()
            .find(|g| g.slug == slug)
            .cloned())
    }

    async fn list_groups(&self) -> Result<Vec<Group>, ApiError> {
        let inner = self.inner.lock().unwrap();
        let mut groups: Vec<Group> = inner.groups.values().cloned().collect();
        groups.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(groups)
    }

    async fn delete_group(&self, id: i64) -> Result<(), ApiError> {
        let mut inner = self.inner.lock().unwrap();
        for post in inner.posts.values_mut() {
            if post.group_id == Some(id) {
                post.group_id = None;
            }
        }
        inner.groups.remove(&id);
        Ok(())
    }

    // -- posts --------------------------------------------------------------

    async fn create_post(&self, new: NewPost) -> Result<Post, ApiError> {
        let mut inner = self.inner.lock().unwrap();
        let post = Post {
            id: new.id,
            text: new.text,
            pub_date: Utc::now(),
            author_id: new.author_id,
            group_id: new.group_id,
            image: new.image,
        };
        inner.posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn post_entry(&self, id: i64) -> Result<Option<PostEntry>, ApiError> {
        let inner = self.inner.lock().unwrap();
        match inner.posts.get(&id) {
            Some(post) => Ok(Some(hydrate(&inner, post)?)),
            None => Ok(None),
        }
    }

    async fn update_post(&self, id: i64, changes: PostChanges) -> Result<Post, ApiError> {
        let mut inner = self.inner.lock().unwrap();
        let post = inner
            .posts
            .get_mut(&id)
            .ok_or_else(|| ApiError::not_found("Post not found"))?;
        post.text = changes.text;
        post.group_id = changes.group_id;
        if let Some(image) = changes.image {
            post.image = Some(image);
        }
        // pub_date is never touched.
        Ok(post.clone())
    }

    async fn delete_post(&self, id: i64) -> Result<(), ApiError> {
        let mut inner = self.inner.lock().unwrap();
        inner.comments.retain(|_, c| c.post_id != id);
        inner.posts.remove(&id);
        Ok(())
    }

    async fn list_posts(&self, page: Option<i64>) -> Result<Paged<PostEntry>, ApiError> {
        let inner = self.inner.lock().unwrap();
        let posts: Vec<&Post> = inner.posts.values().collect();
        page_posts(&inner, posts, page)
    }

    async fn list_posts_by_group(
        &self,
        group_id: i64,
        page: Option<i64>,
    ) -> Result<Paged<PostEntry>, ApiError> {
        let inner = self.inner.lock().unwrap();
        let posts: Vec<&Post> = inner
            .posts
            .values()
            .filter(|p| p.group_id == Some(group_id))
            .collect();
        page_posts(&inner, posts, page)
    }

    async fn list_posts_by_author(
        &self,
        author_id: i64,
        page: Option<i64>,
    ) -> Result<Paged<PostEntry>, ApiError> {
        let inner = self.inner.lock().unwrap();
        let posts: Vec<&Post> = inner
            .posts
            .values()
            .filter(|p| p.author_id == author_id)
            .collect();
        page_posts(&inner, posts, page)
    }

    async fn list_feed(
        &self,
        viewer_id: i64,
        page: Option<i64>,
    ) -> Result<Paged<PostEntry>, ApiError> {
        let inner = self.inner.lock().unwrap();
        let followed: Vec<i64> = inner
            .follows
            .iter()
            .filter(|f| f.user_id == viewer_id)
            .map(|f| f.author_id)
            .collect();
        let posts: Vec<&Post> = inner
            .posts
            .values()
            .filter(|p| followed.contains(&p.author_id))
            .collect();
        page_posts(&inner, posts, page)
    }

    async fn count_posts_by_author(&self, author_id: i64) -> Result<i64, ApiError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .posts
            .values()
            .filter(|p| p.author_id == author_id)
            .count() as i64)
    }

    // -- comments -----------------------------------------------------------

    async fn create_comment(&self, new: NewComment) -> Result<Comment, ApiError> {
        let mut inner = self.inner.lock().unwrap();
        let comment = Comment {
            id: new.id,
            post_id: new.post_id,
            author_id: new.author_id,
            text: new.text,
            created: Utc::now(),
        };
        inner.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn comment_by_id(&self, id: i64) -> Result<Option<Comment>, ApiError> {
        Ok(self.inner.lock().unwrap().comments.get(&id).cloned())
    }

    async fn update_comment(&self, id: i64, text: &str) -> Result<Comment, ApiError> {
        let mut inner = self.inner.lock().unwrap();
        let comment = inner
            .comments
            .get_mut(&id)
            .ok_or_else(|| ApiError::not_found("Comment not found"))?;
        comment.text = text.to_string();
        Ok(comment.clone())
    }

    async fn delete_comment(&self, id: i64) -> Result<(), ApiError> {
        self.inner.lock().unwrap().comments.remove(&id);
        Ok(())
    }

    async fn comments_for_post(&self, post_id: i64) -> Result<Vec<CommentEntry>, ApiError> {
        let inner = self.inner.lock().unwrap();
        let mut comments: Vec<&Comment> = inner
            .comments
            .values()
            .filter(|c| c.post_id == post_id)
            .collect();
        comments.sort_by(|a, b| b.created.cmp(&a.created).then(b.id.cmp(&a.id)));
        comments
            .into_iter()
            .map(|c| {
                let author = inner
                    .users
                    .get(&c.author_id)
                    .cloned()
                    .ok_or_else(|| ApiError::internal("comment author missing"))?;
                Ok(CommentEntry {
                    comment: c.clone(),
                    author,
                })
            })
            .collect()
    }

    // -- follows ------------------------------------------------------------

    async fn follow(&self, new: NewFollow) -> Result<bool, ApiError> {
        let mut inner = self.inner.lock().unwrap();
        // Uniqueness check under the same lock that performs the insert.
        if inner
            .follows
            .iter()
            .any(|f| f.user_id == new.user_id && f.author_id == new.author_id)
        {
            return Ok(false);
        }
        inner.follows.push(Follow {
            id: new.id,
            user_id: new.user_id,
            author_id: new.author_id,
        });
        Ok(true)
    }

    async fn unfollow(&self, user_id: i64, author_id: i64) -> Result<bool, ApiError> {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.follows.len();
        inner
            .follows
            .retain(|f| !(f.user_id == user_id && f.author_id == author_id));
        Ok(inner.follows.len() < before)
    }

    async fn is_following(&self, user_id: i64, author_id: i64) -> Result<bool, ApiError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .follows
            .iter()
            .any(|f| f.user_id == user_id && f.author_id == author_id))
    }

    async fn follower_count(&self, author_id: i64) -> Result<i64, ApiError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .follows
            .iter()
            .filter(|f| f.author_id == author_id)
            .count() as i64)
    }

    async fn following_count(&self, user_id: i64) -> Result<i64, ApiError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .follows
            .iter()
            .filter(|f| f.user_id == user_id)
            .count() as i64)
    }
}
