pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod media;
pub mod models;
pub mod pagination;
pub mod routes;

use std::sync::Arc;

use config::Config;
use db::kv::KeyValueStore;
use db::repo::Repository;
use scribe_common::SnowflakeGenerator;

/// Shared application state available to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn Repository>,
    pub kv: Arc<dyn KeyValueStore>,
    pub config: Arc<Config>,
    pub snowflake: Arc<SnowflakeGenerator>,
}
