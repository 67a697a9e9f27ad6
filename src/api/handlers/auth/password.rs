//! Password hashing and verification using argon2id.
//!
//! Only salted argon2id strings are ever persisted; plaintext stays inside
//! the request scope and is never logged.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use anyhow::{anyhow, Result};

/// Hash a password with a fresh random salt.
///
/// # Errors
///
/// Returns an error if hashing fails (effectively only on invalid
/// parameters, which the defaults rule out).
pub(super) fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| anyhow!("failed to hash password: {err}"))
}

/// Verify a password against a stored argon2id hash string.
///
/// An unparsable stored hash counts as a mismatch rather than an error;
/// there is no caller that could do anything smarter with it.
pub(super) fn verify_password(password: &str, stored_hash: &str) -> bool {
    PasswordHash::new(stored_hash)
        .map(|hash| {
            Argon2::default()
                .verify_password(password.as_bytes(), &hash)
                .is_ok()
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify() -> Result<()> {
        let hash = hash_password("correct horse battery staple")?;
        assert!(verify_password("correct horse battery staple", &hash));
        assert!(!verify_password("incorrect horse", &hash));
        Ok(())
    }

    #[test]
    fn hash_is_salted() -> Result<()> {
        let first = hash_password("same-password")?;
        let second = hash_password("same-password")?;
        assert_ne!(first, second);
        Ok(())
    }

    #[test]
    fn hash_is_not_plaintext() -> Result<()> {
        let hash = hash_password("scout123")?;
        assert!(!hash.contains("scout123"));
        assert!(hash.starts_with("$argon2"));
        Ok(())
    }

    #[test]
    fn unparsable_hash_is_a_mismatch() {
        assert!(!verify_password("anything", "not-a-phc-string"));
        assert!(!verify_password("anything", ""));
    }
}
