//! Account flows: registration, login and password recovery.
//!
//! Handlers stay thin; every rule that decides whether a request succeeds
//! lives here, written against the [`UserStore`] and [`OtpMailer`] traits
//! so tests can swap in fakes. Passwords are Argon2id-hashed before they
//! reach the store and verified against the stored PHC string on login.

use crate::error::AppError;
use crate::mail::OtpMailer;
use crate::store::{UserRecord, UserStore};
use anyhow::anyhow;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use rand::rngs::OsRng;
use regex::Regex;
use tracing::{info, warn};

pub const MAX_USERNAME_LENGTH: usize = 64;

/// Shape check for usernames; the store enforces the same limits on write,
/// this catches bad input before any hashing work.
fn valid_username(username: &str) -> bool {
    !username.is_empty()
        && username.len() <= MAX_USERNAME_LENGTH
        && username.trim() == username
        && !username.contains([',', '\n', '\r'])
}

/// Basic email format check. Commas are excluded on top of the usual
/// shape because the credential file is comma-delimited.
fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s,]+@[^@\s,]+\.[^@\s,]+$").is_ok_and(|regex| regex.is_match(email))
}

/// Argon2id-hash a password for storage.
///
/// # Errors
/// Hashing failures surface as [`AppError::Internal`].
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|_| anyhow!("failed to hash password"))?
        .to_string();
    Ok(hash)
}

fn verify_password(password: &str, stored_hash: &str) -> bool {
    PasswordHash::new(stored_hash).is_ok_and(|parsed| {
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    })
}

/// Create a new account with a hashed password.
///
/// # Errors
/// [`AppError::InvalidUsername`] or [`AppError::InvalidEmail`] on bad
/// input, [`AppError::DuplicateUsername`] when the name is taken.
pub async fn register(
    store: &dyn UserStore,
    username: &str,
    password: &str,
    email: &str,
) -> Result<(), AppError> {
    if !valid_username(username) {
        return Err(AppError::InvalidUsername);
    }

    if !valid_email(email) {
        return Err(AppError::InvalidEmail);
    }

    let record = UserRecord {
        username: username.to_string(),
        password: hash_password(password)?,
        email: email.to_string(),
    };

    store.insert(record).await?;

    info!(username, "new user registered");

    Ok(())
}

/// Check a username/password pair against the store.
///
/// # Errors
/// [`AppError::InvalidCredentials`] for an unknown user or a wrong
/// password; the two cases are not distinguished to the caller.
pub async fn login(store: &dyn UserStore, username: &str, password: &str) -> Result<(), AppError> {
    let Some(record) = store.find(username).await? else {
        warn!(username, "failed login attempt");
        return Err(AppError::InvalidCredentials);
    };

    if !verify_password(password, &record.password) {
        warn!(username, "failed login attempt");
        return Err(AppError::InvalidCredentials);
    }

    info!(username, "user logged in");

    Ok(())
}

/// Dispatch a reset code to an account's email and return the code so the
/// caller can stash it in the session for later comparison.
///
/// # Errors
/// [`AppError::EmailNotFound`] when no account matches,
/// [`AppError::Dispatch`] when the mailer fails.
pub async fn request_reset(
    store: &dyn UserStore,
    mailer: &dyn OtpMailer,
    email: &str,
) -> Result<String, AppError> {
    if store.find_by_email(email).await?.is_none() {
        warn!(email, "reset requested for unknown email");
        return Err(AppError::EmailNotFound);
    }

    let code = mailer.send_otp(email).await?;

    info!(email, "reset code dispatched");

    Ok(code)
}

/// Set a new password on every record carrying `email`.
///
/// # Errors
/// [`AppError::PasswordMismatch`] when the confirmation differs.
pub async fn reset_password(
    store: &dyn UserStore,
    email: &str,
    new_password: &str,
    confirm_password: &str,
) -> Result<(), AppError> {
    if new_password != confirm_password {
        return Err(AppError::PasswordMismatch);
    }

    let hash = hash_password(new_password)?;
    let updated = store.update_password(email, &hash).await?;

    info!(email, records = updated, "password reset");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use async_trait::async_trait;

    struct FixedMailer(&'static str);

    #[async_trait]
    impl OtpMailer for FixedMailer {
        async fn send_otp(&self, _email: &str) -> Result<String, AppError> {
            Ok(self.0.to_string())
        }
    }

    struct FailingMailer;

    #[async_trait]
    impl OtpMailer for FailingMailer {
        async fn send_otp(&self, _email: &str) -> Result<String, AppError> {
            Err(AppError::Dispatch)
        }
    }

    struct PanicMailer;

    #[async_trait]
    impl OtpMailer for PanicMailer {
        async fn send_otp(&self, _email: &str) -> Result<String, AppError> {
            panic!("mailer must not run for unknown emails");
        }
    }

    async fn seeded_store() -> MemoryStore {
        let store = MemoryStore::new();
        register(&store, "alice", "hunter2", "alice@example.com")
            .await
            .expect("register");
        store
    }

    #[tokio::test]
    async fn register_stores_a_hash_not_the_password() {
        let store = seeded_store().await;
        let records = store.records().await;
        assert_eq!(records.len(), 1);
        assert_ne!(records[0].password, "hunter2");
        assert!(records[0].password.starts_with("$argon2"));
    }

    #[tokio::test]
    async fn register_rejects_duplicate_username() {
        let store = seeded_store().await;
        let result = register(&store, "alice", "other", "other@example.com").await;
        assert!(matches!(result, Err(AppError::DuplicateUsername)));
        assert_eq!(store.records().await.len(), 1);
    }

    #[tokio::test]
    async fn register_rejects_bad_usernames() {
        let store = MemoryStore::new();
        let too_long = "x".repeat(MAX_USERNAME_LENGTH + 1);
        for username in ["", " padded ", "with,comma", "line\nbreak", too_long.as_str()] {
            let result = register(&store, username, "pw", "a@example.com").await;
            assert!(
                matches!(result, Err(AppError::InvalidUsername)),
                "{username:?}"
            );
        }
        assert!(store.records().await.is_empty());
    }

    #[tokio::test]
    async fn register_rejects_bad_emails() {
        let store = MemoryStore::new();
        for email in ["not-an-email", "missing-domain@", "a@b,c.com", "gap @example.com"] {
            let result = register(&store, "bob", "pw", email).await;
            assert!(matches!(result, Err(AppError::InvalidEmail)), "{email:?}");
        }
        assert!(store.records().await.is_empty());
    }

    #[tokio::test]
    async fn login_accepts_the_registered_password_only() {
        let store = seeded_store().await;
        assert!(login(&store, "alice", "hunter2").await.is_ok());
        assert!(matches!(
            login(&store, "alice", "wrong").await,
            Err(AppError::InvalidCredentials)
        ));
        assert!(matches!(
            login(&store, "nobody", "hunter2").await,
            Err(AppError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn request_reset_requires_a_known_email() {
        let store = seeded_store().await;
        let result = request_reset(&store, &PanicMailer, "ghost@example.com").await;
        assert!(matches!(result, Err(AppError::EmailNotFound)));
    }

    #[tokio::test]
    async fn request_reset_returns_the_dispatched_code() {
        let store = seeded_store().await;
        let code = request_reset(&store, &FixedMailer("042137"), "alice@example.com")
            .await
            .expect("request reset");
        assert_eq!(code, "042137");
    }

    #[tokio::test]
    async fn request_reset_surfaces_dispatch_failures() {
        let store = seeded_store().await;
        let result = request_reset(&store, &FailingMailer, "alice@example.com").await;
        assert!(matches!(result, Err(AppError::Dispatch)));
    }

    #[tokio::test]
    async fn reset_password_requires_matching_confirmation() {
        let store = seeded_store().await;
        let result = reset_password(&store, "alice@example.com", "new", "other").await;
        assert!(matches!(result, Err(AppError::PasswordMismatch)));
        assert!(login(&store, "alice", "hunter2").await.is_ok());
    }

    #[tokio::test]
    async fn reset_password_invalidates_the_old_password() {
        let store = seeded_store().await;
        reset_password(&store, "alice@example.com", "n3w-pass", "n3w-pass")
            .await
            .expect("reset");
        assert!(matches!(
            login(&store, "alice", "hunter2").await,
            Err(AppError::InvalidCredentials)
        ));
        assert!(login(&store, "alice", "n3w-pass").await.is_ok());
    }

    #[test]
    fn verify_password_rejects_malformed_hashes() {
        assert!(!verify_password("pw", "not-a-phc-hash"));
    }

    #[test]
    fn valid_email_matches_basic_format() {
        assert!(valid_email("a@example.com"));
        assert!(valid_email("name.surname@example.co"));
        assert!(!valid_email("not-an-email"));
        assert!(!valid_email("a,b@example.com"));
    }

    #[test]
    fn valid_username_limits() {
        assert!(valid_username("alice"));
        assert!(valid_username(&"x".repeat(MAX_USERNAME_LENGTH)));
        assert!(!valid_username(""));
        assert!(!valid_username("a,b"));
        assert!(!valid_username(" alice"));
    }
}
