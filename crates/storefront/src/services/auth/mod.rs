//! Authentication service.
//!
//! Password signup/signin issuing signed tokens. Passwords are stored only as
//! salted Argon2id hashes.

mod error;
pub mod password;
pub mod token;

pub use error::AuthError;
pub use password::Passwords;
pub use token::{Claims, TokenError, TokenIssuer};

use std::sync::Arc;

use tracing::instrument;

use wardrobe_core::{Email, Phone};

use crate::db::{RepositoryError, UserStore};
use crate::models::{NewUser, User};

/// A signup as submitted by the client, before validation.
#[derive(Debug, Clone)]
pub struct Signup {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub gender: Option<String>,
    pub password: String,
}

/// Authentication service.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    passwords: Passwords,
    tokens: TokenIssuer,
}

impl AuthService {
    #[must_use]
    pub fn new(users: Arc<dyn UserStore>, passwords: Passwords, tokens: TokenIssuer) -> Self {
        Self {
            users,
            passwords,
            tokens,
        }
    }

    /// Register a new account and return a token for it.
    ///
    /// Email is checked before phone. The store's unique constraints back up
    /// both checks, so overlapping signups cannot both succeed.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail`/`InvalidPhone`/`InvalidInput`/
    /// `WeakPassword` for bad input, `AuthError::DuplicateField` if the email
    /// or phone is taken.
    #[instrument(skip(self, signup), fields(email = %signup.email))]
    pub async fn signup(&self, signup: Signup) -> Result<(User, String), AuthError> {
        let name = signup.name.trim();
        if name.is_empty() {
            return Err(AuthError::InvalidInput("Name is required".to_owned()));
        }
        let email = Email::parse(&signup.email)?;
        let phone = Phone::parse(&signup.phone)?;
        password::validate_password(&signup.password)?;

        if self.users.email_exists(&email).await? {
            return Err(AuthError::DuplicateField("email"));
        }
        if self.users.phone_exists(&phone).await? {
            return Err(AuthError::DuplicateField("phone"));
        }

        let password_hash = self.hash_off_thread(signup.password).await?;

        let user = self
            .users
            .create_user(NewUser {
                name: name.to_owned(),
                email,
                phone,
                gender: signup
                    .gender
                    .map(|g| g.trim().to_owned())
                    .filter(|g| !g.is_empty()),
                password_hash,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(field) if field == "phone" => {
                    AuthError::DuplicateField("phone")
                }
                RepositoryError::Conflict(_) => AuthError::DuplicateField("email"),
                other => AuthError::Repository(other),
            })?;

        let token = self.tokens.issue(user.id)?;
        tracing::info!(user_id = %user.id, "account created");
        Ok((user, token))
    }

    /// Check credentials and return a token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` for an unknown email or a wrong
    /// password.
    #[instrument(skip(self, password))]
    pub async fn signin(&self, email: &str, password: &str) -> Result<(User, String), AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, hash) = self
            .users
            .find_credentials(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let passwords = self.passwords.clone();
        let password = password.to_owned();
        tokio::task::spawn_blocking(move || passwords.verify(&password, &hash))
            .await
            .map_err(|_| AuthError::PasswordHash)??;

        let token = self.tokens.issue(user.id)?;
        Ok((user, token))
    }

    async fn hash_off_thread(&self, password: String) -> Result<String, AuthError> {
        let passwords = self.passwords.clone();
        tokio::task::spawn_blocking(move || passwords.hash(&password))
            .await
            .map_err(|_| AuthError::PasswordHash)?
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use secrecy::SecretString;
    use wardrobe_core::{Cart, UserId};

    use super::*;
    use crate::config::PasswordHashingConfig;
    use crate::db::MemoryStore;
    use crate::models::StoredCart;

    fn service_over(users: Arc<dyn UserStore>) -> AuthService {
        let passwords = Passwords::new(&PasswordHashingConfig {
            memory_kib: 64,
            iterations: 1,
            parallelism: 1,
        })
        .unwrap();
        let tokens = TokenIssuer::new(
            &SecretString::from("k3Jx9Qw2Lm7Vb4Nz8Rt6Yp1Hs5Dg0Fc!".to_owned()),
            Duration::from_secs(60),
        );
        AuthService::new(users, passwords, tokens)
    }

    fn service() -> (AuthService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (service_over(store.clone()), store)
    }

    /// Reports every email and phone as free, as seen by a signup that races
    /// another one between the existence checks and the insert.
    struct StaleChecks(MemoryStore);

    #[async_trait]
    impl UserStore for StaleChecks {
        async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError> {
            self.0.create_user(user).await
        }

        async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
            self.0.get_user(id).await
        }

        async fn find_credentials(
            &self,
            email: &Email,
        ) -> Result<Option<(User, String)>, RepositoryError> {
            self.0.find_credentials(email).await
        }

        async fn email_exists(&self, _: &Email) -> Result<bool, RepositoryError> {
            Ok(false)
        }

        async fn phone_exists(&self, _: &Phone) -> Result<bool, RepositoryError> {
            Ok(false)
        }

        async fn load_cart(&self, id: UserId) -> Result<Option<StoredCart>, RepositoryError> {
            self.0.load_cart(id).await
        }

        async fn save_cart(
            &self,
            id: UserId,
            expected_version: i64,
            cart: &Cart,
        ) -> Result<i64, RepositoryError> {
            self.0.save_cart(id, expected_version, cart).await
        }
    }

    fn signup(email: &str, phone: &str) -> Signup {
        Signup {
            name: "Ada".to_owned(),
            email: email.to_owned(),
            phone: phone.to_owned(),
            gender: Some("female".to_owned()),
            password: "correct horse".to_owned(),
        }
    }

    #[tokio::test]
    async fn signup_then_signin() {
        let (auth, _) = service();
        let (user, _) = auth.signup(signup("a@x.com", "555")).await.unwrap();
        let (again, token) = auth.signin("A@X.com", "correct horse").await.unwrap();

        assert_eq!(user.id, again.id);
        assert!(!token.is_empty());
    }

    #[tokio::test]
    async fn duplicate_email_creates_no_account() {
        let (auth, store) = service();
        auth.signup(signup("a@x.com", "555")).await.unwrap();

        let err = auth.signup(signup("a@x.com", "556")).await.unwrap_err();
        assert!(matches!(err, AuthError::DuplicateField("email")));
        assert!(!store.phone_exists(&Phone::parse("556").unwrap()).await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_phone_with_new_email_fails() {
        let (auth, _) = service();
        auth.signup(signup("a@x.com", "555")).await.unwrap();

        let err = auth.signup(signup("b@x.com", "555")).await.unwrap_err();
        assert!(matches!(err, AuthError::DuplicateField("phone")));
    }

    #[tokio::test]
    async fn store_conflicts_become_duplicate_fields() {
        let auth = service_over(Arc::new(StaleChecks(MemoryStore::new())));
        auth.signup(signup("a@x.com", "555")).await.unwrap();

        let err = auth.signup(signup("b@x.com", "555")).await.unwrap_err();
        assert!(matches!(err, AuthError::DuplicateField("phone")));

        let err = auth.signup(signup("a@x.com", "556")).await.unwrap_err();
        assert!(matches!(err, AuthError::DuplicateField("email")));

        assert!(matches!(
            auth.signin("b@x.com", "correct horse").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_look_the_same() {
        let (auth, _) = service();
        auth.signup(signup("a@x.com", "555")).await.unwrap();

        assert!(matches!(
            auth.signin("a@x.com", "wrong password").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.signin("nobody@x.com", "correct horse").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn invalid_input_is_rejected_before_store() {
        let (auth, _) = service();
        assert!(matches!(
            auth.signup(signup("not-an-email", "555")).await,
            Err(AuthError::InvalidEmail(_))
        ));
        let mut weak = signup("a@x.com", "555");
        weak.password = "short".to_owned();
        assert!(matches!(
            auth.signup(weak).await,
            Err(AuthError::WeakPassword(_))
        ));
    }
}
