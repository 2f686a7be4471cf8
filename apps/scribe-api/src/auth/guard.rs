//! Access decisions for author-owned content.

/// Outcome of checking a viewer against a protected resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allowed,
    RequiresLogin,
    Forbidden,
}

/// Only the owner may proceed; anonymous viewers are asked to log in first.
pub fn author_only(viewer: Option<i64>, owner_id: i64) -> AccessDecision {
    match viewer {
        None => AccessDecision::RequiresLogin,
        Some(id) if id == owner_id => AccessDecision::Allowed,
        Some(_) => AccessDecision::Forbidden,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_viewers_must_log_in() {
        assert_eq!(author_only(None, 7), AccessDecision::RequiresLogin);
    }

    #[test]
    fn owner_is_allowed() {
        assert_eq!(author_only(Some(7), 7), AccessDecision::Allowed);
    }

    #[test]
    fn other_users_are_forbidden() {
        assert_eq!(author_only(Some(8), 7), AccessDecision::Forbidden);
    }
}
