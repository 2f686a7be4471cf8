//! Session token management.
//!
//! Sessions are opaque random tokens stored in the key-value store with a
//! TTL, so expiry needs no sweeper.

use serde::{Deserialize, Serialize};

use scribe_common::id::prefix;

use crate::db::kv::KeyValueStore;
use crate::error::ApiError;

/// Session TTL in seconds (14 days).
pub const SESSION_TTL_SECS: u64 = 14 * 24 * 3600;

/// Data stored alongside a session token.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionData {
    pub user_id: i64,
}

/// Generate an opaque random token with the given prefix.
pub fn generate_opaque_token(prefix: &str, bytes: usize) -> String {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use rand::Rng;
    let mut buf = vec![0u8; bytes];
    rand::thread_rng().fill(&mut buf[..]);
    format!("{}_{}", prefix, URL_SAFE_NO_PAD.encode(&buf))
}

pub fn generate_session_token() -> String {
    generate_opaque_token(prefix::SESSION, 32)
}

fn session_key(token: &str) -> String {
    format!("scribe:session:{}", token)
}

pub async fn store_session(
    kv: &dyn KeyValueStore,
    token: &str,
    data: &SessionData,
) -> Result<(), ApiError> {
    let value = serde_json::to_string(data).map_err(|_| ApiError::internal("serialization"))?;
    kv.set_ex(&session_key(token), &value, SESSION_TTL_SECS).await
}

pub async fn lookup_session(
    kv: &dyn KeyValueStore,
    token: &str,
) -> Result<Option<SessionData>, ApiError> {
    match kv.get(&session_key(token)).await? {
        Some(v) => {
            let data: SessionData =
                serde_json::from_str(&v).map_err(|_| ApiError::internal("corrupt session data"))?;
            Ok(Some(data))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::kv::MemoryStore;

    #[test]
    fn tokens_are_prefixed_and_distinct() {
        let a = generate_session_token();
        let b = generate_session_token();
        assert!(a.starts_with("ses_"));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn stored_session_round_trips() {
        let kv = MemoryStore::new();
        let token = generate_session_token();
        store_session(&kv, &token, &SessionData { user_id: 42 })
            .await
            .unwrap();

        let data = lookup_session(&kv, &token).await.unwrap().unwrap();
        assert_eq!(data.user_id, 42);
        assert!(lookup_session(&kv, "ses_bogus").await.unwrap().is_none());
    }
}
