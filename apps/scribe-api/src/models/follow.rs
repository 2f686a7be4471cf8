use diesel::prelude::*;
use serde::Serialize;

use crate::db::schema::follows;

/// A directed subscription edge from a viewer to an author.
///
/// `(user_id, author_id)` is unique at the storage layer, so a concurrent
/// double-submit cannot create duplicate edges.
#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = follows)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Follow {
    pub id: i64,
    pub user_id: i64,
    pub author_id: i64,
}

#[derive(Debug, Clone)]
pub struct NewFollow {
    pub id: i64,
    pub user_id: i64,
    pub author_id: i64,
}
