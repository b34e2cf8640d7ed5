//! Argon2id password hashing.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use super::AuthError;
use crate::config::PasswordHashingConfig;

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Hashes and verifies passwords with a fixed set of Argon2id parameters.
///
/// Verification reads the parameters embedded in the stored PHC string, so
/// changing the configured cost does not invalidate existing hashes.
#[derive(Clone)]
pub struct Passwords {
    argon2: Argon2<'static>,
}

impl std::fmt::Debug for Passwords {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Passwords").finish_non_exhaustive()
    }
}

impl Passwords {
    /// # Errors
    ///
    /// Returns `argon2::Error` if the configured cost parameters are out of range.
    pub fn new(config: &PasswordHashingConfig) -> Result<Self, argon2::Error> {
        let params = Params::new(
            config.memory_kib,
            config.iterations,
            config.parallelism,
            None,
        )?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Hash a password into a PHC string.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::PasswordHash` if hashing fails.
    pub fn hash(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|_| AuthError::PasswordHash)
    }

    /// Verify a password against a stored PHC string.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` on mismatch or an unparseable hash.
    pub fn verify(&self, password: &str, hash: &str) -> Result<(), AuthError> {
        let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
        self.argon2
            .verify_password(password.as_bytes(), &parsed_hash)
            .map_err(|_| AuthError::InvalidCredentials)
    }
}

/// Check password strength.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` if the password is too short.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn passwords() -> Passwords {
        Passwords::new(&PasswordHashingConfig {
            memory_kib: 64,
            iterations: 1,
            parallelism: 1,
        })
        .unwrap()
    }

    #[test]
    fn hash_is_salted_phc_string() {
        let passwords = passwords();
        let a = passwords.hash("correct horse").unwrap();
        let b = passwords.hash("correct horse").unwrap();

        assert!(a.starts_with("$argon2id$"));
        assert_ne!(a, b);
    }

    #[test]
    fn verify_accepts_right_password_only() {
        let passwords = passwords();
        let hash = passwords.hash("correct horse").unwrap();

        assert!(passwords.verify("correct horse", &hash).is_ok());
        assert!(matches!(
            passwords.verify("wrong horse", &hash),
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            passwords.verify("correct horse", "not-a-hash"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn short_passwords_are_rejected() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("long enough").is_ok());
    }

    #[test]
    fn out_of_range_params_fail() {
        assert!(
            Passwords::new(&PasswordHashingConfig {
                memory_kib: 1,
                iterations: 1,
                parallelism: 1,
            })
            .is_err()
        );
    }
}
