//! Fragment cache for the home listing.
//!
//! The first page of the global post listing is cached under a constant key.
//! Policy: the fragment is invalidated explicitly on every post write
//! (create or edit); the TTL is the declared upper bound on staleness.

use crate::db::kv::KeyValueStore;
use crate::error::ApiError;

/// Cache key for the serialized first page of the global listing.
pub const HOME_FRAGMENT_KEY: &str = "scribe:fragment:home";

/// Upper bound on fragment staleness, in seconds.
pub const HOME_FRAGMENT_TTL_SECS: u64 = 20;

pub async fn read_home(kv: &dyn KeyValueStore) -> Result<Option<String>, ApiError> {
    kv.get(HOME_FRAGMENT_KEY).await
}

pub async fn store_home(kv: &dyn KeyValueStore, body: &str) -> Result<(), ApiError> {
    kv.set_ex(HOME_FRAGMENT_KEY, body, HOME_FRAGMENT_TTL_SECS).await
}

pub async fn invalidate_home(kv: &dyn KeyValueStore) -> Result<(), ApiError> {
    kv.del(HOME_FRAGMENT_KEY).await
}
