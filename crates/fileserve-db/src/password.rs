//! Share password hashing.
//!
//! New passwords are bcrypt hashes. Stored values without the bcrypt `$2`
//! prefix are legacy lowercase SHA-256 hex digests of the plaintext.

use fileserve_common::{sha256_hex, Error, Result};

pub fn hash_password(plaintext: &str) -> Result<String> {
    bcrypt::hash(plaintext, bcrypt::DEFAULT_COST)
        .map_err(|e| Error::Internal(format!("Failed to hash password: {}", e)))
}

/// Check a plaintext password against a stored hash of either scheme.
pub fn verify_password(plaintext: &str, stored: &str) -> bool {
    if is_bcrypt_hash(stored) {
        bcrypt::verify(plaintext, stored).unwrap_or(false)
    } else {
        sha256_hex(plaintext) == stored.to_ascii_lowercase()
    }
}

fn is_bcrypt_hash(stored: &str) -> bool {
    stored.starts_with("$2")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bcrypt_roundtrip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$2"));
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
    }

    #[test]
    fn legacy_sha256_hash() {
        let stored = sha256_hex("hunter2");
        assert!(verify_password("hunter2", &stored));
        assert!(verify_password("hunter2", &stored.to_uppercase()));
        assert!(!verify_password("hunter3", &stored));
    }

    #[test]
    fn garbage_hash_never_verifies() {
        assert!(!verify_password("anything", "$2b$not-a-real-hash"));
        assert!(!verify_password("", "nope"));
    }
}
