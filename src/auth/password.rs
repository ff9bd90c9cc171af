//! Password hashing boundary. The trait keeps the concrete hashing scheme
//! out of the handler and store layers, so it can be swapped (or mocked in
//! tests) without touching either.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString};
use argon2::Argon2;

use super::error::AuthError;

pub trait PasswordHasher: Send + Sync {
    fn hash(&self, plaintext: &str) -> Result<String, AuthError>;
    fn verify(&self, plaintext: &str, stored_hash: &str) -> bool;
}

/// Argon2id with the crate's recommended defaults.
#[derive(Default)]
pub struct Argon2PasswordHasher;

impl PasswordHasher for Argon2PasswordHasher {
    fn hash(&self, plaintext: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::HashingFailed(e.to_string()))
    }

    fn verify(&self, plaintext: &str, stored_hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(stored_hash) else {
            return false;
        };
        Argon2::default().verify_password(plaintext.as_bytes(), &parsed).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_round_trips() {
        let hasher = Argon2PasswordHasher;
        let hash = hasher.hash("hunter2pass").unwrap();
        assert!(hasher.verify("hunter2pass", &hash));
    }

    #[test]
    fn wrong_password_fails_verification() {
        let hasher = Argon2PasswordHasher;
        let hash = hasher.hash("hunter2pass").unwrap();
        assert!(!hasher.verify("wrong-password", &hash));
    }

    #[test]
    fn malformed_hash_fails_verification_without_panicking() {
        let hasher = Argon2PasswordHasher;
        assert!(!hasher.verify("anything", "not-a-real-hash"));
    }
}
