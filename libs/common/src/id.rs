use ulid::Ulid;

/// Generate an opaque ULID-based identifier with the given prefix, e.g.
/// `att_01J9Z6K9QW3F4R8T2C5H7M1N0P`.
pub fn prefixed_ulid(prefix: &str) -> String {
    format!("{}_{}", prefix, Ulid::new())
}

/// Well-known ID prefixes.
pub mod prefix {
    /// Session tokens minted at login.
    pub const SESSION: &str = "ses";
    /// Stored image attachments.
    pub const ATTACHMENT: &str = "att";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixed_ulid_has_prefix_and_length() {
        let id = prefixed_ulid(prefix::ATTACHMENT);
        assert!(id.starts_with("att_"));
        // 26-char ULID plus prefix and separator.
        assert_eq!(id.len(), 4 + 26);
    }

    #[test]
    fn prefixed_ulid_is_unique() {
        assert_ne!(prefixed_ulid("ses"), prefixed_ulid("ses"));
    }
}
