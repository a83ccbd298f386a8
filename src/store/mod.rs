//! Credential repository.
//!
//! The flow layer only sees [`UserStore`]; production wires [`FileStore`],
//! tests and local hacking use [`MemoryStore`]. Lookups are linear scans with
//! first-match-wins, which is fine at the scale this portal targets.

use crate::error::AppError;
use async_trait::async_trait;
use tokio::sync::RwLock;

pub mod file;

pub use file::FileStore;

/// One stored credential entry. The password field carries an Argon2id PHC
/// string, never the plaintext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub username: String,
    pub password: String,
    pub email: String,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// First record whose username matches, if any.
    async fn find(&self, username: &str) -> Result<Option<UserRecord>, AppError>;

    /// First record whose email matches, if any.
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, AppError>;

    /// Append a record. Fails with [`AppError::DuplicateUsername`] when the
    /// username is already taken.
    async fn insert(&self, record: UserRecord) -> Result<(), AppError>;

    /// Replace the password field on every record whose email matches and
    /// report how many records were rewritten.
    async fn update_password(&self, email: &str, new_password: &str) -> Result<usize, AppError>;
}

/// In-memory store with the same observable semantics as [`FileStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<Vec<UserRecord>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the stored records, in insertion order.
    pub async fn records(&self) -> Vec<UserRecord> {
        self.records.read().await.clone()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find(&self, username: &str) -> Result<Option<UserRecord>, AppError> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .find(|record| record.username == username)
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, AppError> {
        let records = self.records.read().await;
        Ok(records.iter().find(|record| record.email == email).cloned())
    }

    async fn insert(&self, record: UserRecord) -> Result<(), AppError> {
        let mut records = self.records.write().await;
        if records.iter().any(|stored| stored.username == record.username) {
            return Err(AppError::DuplicateUsername);
        }
        records.push(record);
        Ok(())
    }

    async fn update_password(&self, email: &str, new_password: &str) -> Result<usize, AppError> {
        let mut records = self.records.write().await;
        let mut updated = 0;
        for record in records.iter_mut().filter(|record| record.email == email) {
            record.password = new_password.to_string();
            updated += 1;
        }
        Ok(updated)
    }
}
