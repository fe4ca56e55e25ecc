use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use super::AuthError;

/// One-way credential storage.
pub trait CredentialHasher: Send + Sync {
    fn hash(&self, password: &str) -> Result<String, AuthError>;

    /// `Ok(false)` for a wrong password; errors only for an unreadable stored hash.
    fn verify(&self, password: &str, stored: &str) -> Result<bool, AuthError>;
}

/// Argon2id with default parameters, stored as a PHC string.
#[derive(Debug, Default, Clone, Copy)]
pub struct Argon2Hasher;

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::Hashing(e.to_string()))
    }

    fn verify(&self, password: &str, stored: &str) -> Result<bool, AuthError> {
        let parsed = PasswordHash::new(stored).map_err(|_| AuthError::InvalidCredentials)?;
        Ok(Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_are_salted_and_verifiable() {
        let hasher = Argon2Hasher;
        let a = hasher.hash("123456").unwrap();
        let b = hasher.hash("123456").unwrap();
        assert_ne!(a, b);
        assert!(a.starts_with("$argon2id$"));
        assert!(hasher.verify("123456", &a).unwrap());
        assert!(!hasher.verify("1234567", &a).unwrap());
    }

    #[test]
    fn unreadable_stored_hash_is_rejected() {
        assert!(matches!(
            Argon2Hasher.verify("123456", "plain"),
            Err(AuthError::InvalidCredentials)
        ));
    }
}
