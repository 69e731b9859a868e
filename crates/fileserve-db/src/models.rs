//! Rows of the `share` and `share_file` tables.

use fileserve_common::sha256_hex;

use crate::password::verify_password;

/// A named, optionally password protected collection of files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Share {
    pub id: i64,
    pub name: String,
    /// Public identifier, a UUID v4.
    pub reference: String,
    /// Stored password hash; `None` for open shares.
    pub password_hash: Option<String>,
}

impl Share {
    pub fn is_protected(&self) -> bool {
        self.password_hash.is_some()
    }

    /// The cookie token granting access to this share.
    ///
    /// Derived as the SHA-256 hex digest of the reference followed by the
    /// stored password hash. Open shares have no token.
    pub fn auth_token(&self) -> Option<String> {
        self.password_hash
            .as_deref()
            .map(|hash| sha256_hex(&format!("{}{}", self.reference, hash)))
    }

    /// Whether `plaintext` matches the stored password. Always false for open
    /// shares.
    pub fn validate_password(&self, plaintext: &str) -> bool {
        self.password_hash
            .as_deref()
            .map(|stored| verify_password(plaintext, stored))
            .unwrap_or(false)
    }
}

/// A file registered in a share.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareFile {
    pub id: i64,
    pub share_id: i64,
    /// Absolute, normalized forward-slash path on the server. Never shown to
    /// clients.
    pub file_path: String,
    /// Display name, independent of the on-disk basename.
    pub file_name: String,
    pub reference: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn share(password_hash: Option<&str>) -> Share {
        Share {
            id: 1,
            name: "Holiday".into(),
            reference: "ref".into(),
            password_hash: password_hash.map(String::from),
        }
    }

    #[test]
    fn open_share_has_no_token() {
        let share = share(None);
        assert!(!share.is_protected());
        assert_eq!(share.auth_token(), None);
        assert!(!share.validate_password(""));
    }

    #[test]
    fn token_is_digest_of_reference_and_hash() {
        let share = share(Some("stored"));
        assert_eq!(share.auth_token(), Some(sha256_hex("refstored")));
    }

    #[test]
    fn validate_against_legacy_hash() {
        let stored = sha256_hex("secret");
        let share = share(Some(&stored));
        assert!(share.validate_password("secret"));
        assert!(!share.validate_password("Secret"));
    }
}
