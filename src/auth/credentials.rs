//! Salted one-way secret hashing (Argon2id).
//!
//! Hashes are stored as PHC strings (`$argon2id$v=19$m=...,t=...,p=...$salt$hash`)
//! so each one carries its own salt and cost parameters.

use super::AuthError;
use crate::config::KdfConfig;
use anyhow::Result;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};

/// Hashes and verifies account secrets.
pub struct SecretHasher {
    argon2: Argon2<'static>,
    /// Verified against when the email is unknown, so a miss costs the same
    /// as a wrong secret.
    dummy_hash: String,
}

impl SecretHasher {
    pub fn new(config: &KdfConfig) -> Result<Self> {
        let params = Params::new(
            config.memory_kib,
            config.iterations,
            config.parallelism,
            None,
        )
        .map_err(|e| anyhow::anyhow!("Invalid Argon2 parameters: {e}"))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let salt = SaltString::generate(&mut OsRng);
        let dummy_hash = argon2
            .hash_password(b"impactdesk-dummy-secret", &salt)
            .map_err(|e| anyhow::anyhow!("Argon2 self-test failed: {e}"))?
            .to_string();

        Ok(Self { argon2, dummy_hash })
    }

    /// Hash a secret with a fresh random salt.
    pub fn hash(&self, secret: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(secret.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| AuthError::Hashing(e.to_string()))
    }

    /// Check a secret against a stored PHC string. Unparseable hashes never
    /// match.
    pub fn verify(&self, secret: &str, stored_hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(stored_hash) else {
            tracing::warn!("Stored secret hash is not a valid PHC string");
            return false;
        };
        self.argon2
            .verify_password(secret.as_bytes(), &parsed)
            .is_ok()
    }

    /// Spend one verification on the dummy hash. Always returns `false`.
    pub fn verify_dummy(&self, secret: &str) -> bool {
        let _ = self.verify(secret, &self.dummy_hash);
        false
    }
}

#[cfg(test)]
pub(crate) fn fast_kdf() -> KdfConfig {
    KdfConfig {
        memory_kib: 64,
        iterations: 1,
        parallelism: 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hasher = SecretHasher::new(&fast_kdf()).unwrap();
        let hash = hasher.hash("p1").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify("p1", &hash));
        assert!(!hasher.verify("p2", &hash));
    }

    #[test]
    fn same_secret_gets_different_salts() {
        let hasher = SecretHasher::new(&fast_kdf()).unwrap();
        let h1 = hasher.hash("same").unwrap();
        let h2 = hasher.hash("same").unwrap();
        assert_ne!(h1, h2);
        assert!(hasher.verify("same", &h1));
        assert!(hasher.verify("same", &h2));
    }

    #[test]
    fn hash_never_contains_plaintext() {
        let hasher = SecretHasher::new(&fast_kdf()).unwrap();
        let hash = hasher.hash("hunter2-plaintext").unwrap();
        assert!(!hash.contains("hunter2-plaintext"));
    }

    #[test]
    fn malformed_hash_never_matches() {
        let hasher = SecretHasher::new(&fast_kdf()).unwrap();
        assert!(!hasher.verify("p1", "p1"));
        assert!(!hasher.verify("", ""));
    }

    #[test]
    fn hash_from_other_params_still_verifies() {
        let weak = SecretHasher::new(&fast_kdf()).unwrap();
        let hash = weak.hash("p1").unwrap();

        let stronger = SecretHasher::new(&KdfConfig {
            memory_kib: 128,
            iterations: 2,
            parallelism: 1,
        })
        .unwrap();
        assert!(stronger.verify("p1", &hash));
    }

    #[test]
    fn dummy_verify_is_always_false() {
        let hasher = SecretHasher::new(&fast_kdf()).unwrap();
        assert!(!hasher.verify_dummy("impactdesk-dummy-secret"));
    }

    #[test]
    fn invalid_params_are_rejected() {
        let result = SecretHasher::new(&KdfConfig {
            memory_kib: 64,
            iterations: 0,
            parallelism: 1,
        });
        assert!(result.is_err());
    }
}
