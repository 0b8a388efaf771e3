//! Directory and secret-verification collaborators.

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use async_trait::async_trait;
use jiff::Timestamp;
use mockall::automock;
use thiserror::Error;

use crate::principals::models::{Principal, PrincipalUuid};

/// Opaque failure from the external principal directory.
#[derive(Debug, Error)]
#[error("principal directory error: {message}")]
pub struct DirectoryError {
    pub message: String,
}

/// Lookup interface over the principal directory. CRUD on principals lives
/// with the directory itself, not here.
#[automock]
#[async_trait]
pub trait PrincipalDirectory: Send + Sync {
    async fn find_by_uuid(&self, uuid: PrincipalUuid)
    -> Result<Option<Principal>, DirectoryError>;

    async fn find_by_login_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<Principal>, DirectoryError>;

    async fn update_last_login(
        &self,
        uuid: PrincipalUuid,
        at: Timestamp,
    ) -> Result<(), DirectoryError>;
}

/// Constant-time comparison of a plaintext secret against a stored hash.
#[automock]
pub trait SecretVerifier: Send + Sync {
    fn verify(&self, plain: &str, hash: &str) -> bool;
}

/// Argon2id-backed secret verifier. `verify_password` compares in constant
/// time; an unparseable stored hash verifies as false rather than erroring.
#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2SecretVerifier;

impl SecretVerifier for Argon2SecretVerifier {
    fn verify(&self, plain: &str, hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(hash) else {
            return false;
        };

        Argon2::default()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use argon2::{PasswordHasher, password_hash::SaltString};
    use rand::rngs::OsRng;

    use super::*;

    #[test]
    fn argon2_verifier_accepts_matching_secret() {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(b"correct horse", &salt)
            .expect("hashing should succeed")
            .to_string();

        let verifier = Argon2SecretVerifier;
        assert!(verifier.verify("correct horse", &hash));
        assert!(!verifier.verify("battery staple", &hash));
    }

    #[test]
    fn argon2_verifier_rejects_garbage_hash() {
        let verifier = Argon2SecretVerifier;
        assert!(!verifier.verify("anything", "not-a-phc-string"));
    }
}
