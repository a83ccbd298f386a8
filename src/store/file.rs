//! Line-oriented credential file, one `username,password,email` record per
//! line. The file is read in full for lookups and rewritten in full on
//! password updates; inserts append.

use super::{UserRecord, UserStore};
use crate::error::AppError;
use anyhow::{Context, anyhow};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::{fs, io::AsyncWriteExt, sync::Mutex};
use tracing::warn;

pub struct FileStore {
    path: PathBuf,
    // One lock for readers and writers both: a rewrite must never be observed
    // half-written, and whole-file reads are cheap at this scale.
    io_lock: Mutex<()>,
}

impl FileStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            io_lock: Mutex::new(()),
        }
    }

    /// Read every record. A missing file is an empty store.
    async fn load(&self) -> Result<Vec<UserRecord>, AppError> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(anyhow::Error::new(err)
                    .context(format!("Failed to read {}", self.path.display()))
                    .into());
            }
        };
        Ok(parse_records(&contents))
    }

    async fn save(&self, records: &[UserRecord]) -> Result<(), AppError> {
        let mut contents = String::new();
        for record in records {
            contents.push_str(&encode_record(record)?);
            contents.push('\n');
        }
        fs::write(&self.path, contents)
            .await
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for FileStore {
    async fn find(&self, username: &str) -> Result<Option<UserRecord>, AppError> {
        let _guard = self.io_lock.lock().await;
        let records = self.load().await?;
        Ok(records
            .into_iter()
            .find(|record| record.username == username))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, AppError> {
        let _guard = self.io_lock.lock().await;
        let records = self.load().await?;
        Ok(records.into_iter().find(|record| record.email == email))
    }

    async fn insert(&self, record: UserRecord) -> Result<(), AppError> {
        let line = encode_record(&record)?;

        let _guard = self.io_lock.lock().await;
        let records = self.load().await?;
        if records
            .iter()
            .any(|stored| stored.username == record.username)
        {
            return Err(AppError::DuplicateUsername);
        }

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("Failed to open {}", self.path.display()))?;
        file.write_all(format!("{line}\n").as_bytes())
            .await
            .with_context(|| format!("Failed to append to {}", self.path.display()))?;
        file.flush()
            .await
            .with_context(|| format!("Failed to flush {}", self.path.display()))?;
        Ok(())
    }

    async fn update_password(&self, email: &str, new_password: &str) -> Result<usize, AppError> {
        let _guard = self.io_lock.lock().await;
        let mut records = self.load().await?;
        let mut updated = 0;
        for record in records.iter_mut().filter(|record| record.email == email) {
            record.password = new_password.to_string();
            updated += 1;
        }
        if updated > 0 {
            self.save(&records).await?;
        }
        Ok(updated)
    }
}

fn parse_records(contents: &str) -> Vec<UserRecord> {
    contents
        .lines()
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let record = parse_line(line);
            if record.is_none() {
                warn!(line_length = line.len(), "skipping malformed record line");
            }
            record
        })
        .collect()
}

// Username ends at the first comma and email starts after the last one, so
// the password field in between may itself contain commas (Argon2 PHC
// strings do: `m=19456,t=2,p=1`).
fn parse_line(line: &str) -> Option<UserRecord> {
    let (username, rest) = line.split_once(',')?;
    let (password, email) = rest.rsplit_once(',')?;
    Some(UserRecord {
        username: username.to_string(),
        password: password.to_string(),
        email: email.to_string(),
    })
}

fn encode_record(record: &UserRecord) -> Result<String, AppError> {
    // Usernames and emails are validated upstream; this is the last line of
    // defense for the unescaped format.
    for field in [&record.username, &record.email] {
        if field.contains(',') || field.contains('\n') || field.contains('\r') {
            return Err(anyhow!("record field would corrupt the store line format").into());
        }
    }
    if record.password.contains('\n') || record.password.contains('\r') {
        return Err(anyhow!("password hash would corrupt the store line format").into());
    }
    Ok(format!(
        "{},{},{}",
        record.username, record.password, record.email
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PHC_SAMPLE: &str = "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHQ$YWJjZGVmZ2hpamts";

    fn store(dir: &TempDir) -> FileStore {
        FileStore::new(dir.path().join("users.txt"))
    }

    fn record(username: &str, password: &str, email: &str) -> UserRecord {
        UserRecord {
            username: username.to_string(),
            password: password.to_string(),
            email: email.to_string(),
        }
    }

    #[tokio::test]
    async fn test_missing_file_is_an_empty_store() {
        let dir = TempDir::new().expect("tempdir");
        let store = store(&dir);
        assert!(store.find("alice").await.expect("find").is_none());
        assert!(
            store
                .find_by_email("a@x.com")
                .await
                .expect("find_by_email")
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_insert_writes_one_line_per_record() {
        let dir = TempDir::new().expect("tempdir");
        let store = store(&dir);
        store
            .insert(record("alice", "h1", "a@x.com"))
            .await
            .expect("insert alice");
        store
            .insert(record("bob", "h2", "b@x.com"))
            .await
            .expect("insert bob");

        let contents = std::fs::read_to_string(dir.path().join("users.txt")).expect("read file");
        assert_eq!(contents, "alice,h1,a@x.com\nbob,h2,b@x.com\n");
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let dir = TempDir::new().expect("tempdir");
        let store = store(&dir);
        store
            .insert(record("alice", "h1", "a@x.com"))
            .await
            .expect("first insert");

        let result = store.insert(record("alice", "h2", "other@x.com")).await;
        assert!(matches!(result, Err(AppError::DuplicateUsername)));

        let contents = std::fs::read_to_string(dir.path().join("users.txt")).expect("read file");
        assert_eq!(contents.lines().count(), 1);
    }

    #[tokio::test]
    async fn test_password_hash_with_commas_round_trips() {
        let dir = TempDir::new().expect("tempdir");
        let store = store(&dir);
        store
            .insert(record("alice", PHC_SAMPLE, "a@x.com"))
            .await
            .expect("insert");

        let found = store
            .find("alice")
            .await
            .expect("find")
            .expect("alice present");
        assert_eq!(found.password, PHC_SAMPLE);
        assert_eq!(found.email, "a@x.com");
    }

    #[tokio::test]
    async fn test_update_password_rewrites_matching_records_only() {
        let dir = TempDir::new().expect("tempdir");
        let store = store(&dir);
        store
            .insert(record("alice", "h1", "shared@x.com"))
            .await
            .expect("insert alice");
        store
            .insert(record("bob", "h2", "shared@x.com"))
            .await
            .expect("insert bob");
        store
            .insert(record("carol", "h3", "carol@x.com"))
            .await
            .expect("insert carol");

        let updated = store
            .update_password("shared@x.com", "h9")
            .await
            .expect("update");
        assert_eq!(updated, 2);

        let contents = std::fs::read_to_string(dir.path().join("users.txt")).expect("read file");
        assert_eq!(
            contents,
            "alice,h9,shared@x.com\nbob,h9,shared@x.com\ncarol,h3,carol@x.com\n"
        );
    }

    #[tokio::test]
    async fn test_malformed_lines_are_skipped() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("users.txt");
        std::fs::write(&path, "not a record\nalice,h1,a@x.com\nonly,one\n").expect("seed file");

        let store = FileStore::new(&path);
        assert!(store.find("alice").await.expect("find").is_some());
        assert!(store.find("not a record").await.expect("find").is_none());
        assert!(store.find("only").await.expect("find").is_none());
    }

    #[tokio::test]
    async fn test_comma_in_username_rejected_before_write() {
        let dir = TempDir::new().expect("tempdir");
        let store = store(&dir);
        let result = store.insert(record("al,ice", "h1", "a@x.com")).await;
        assert!(matches!(result, Err(AppError::Internal(_))));
        assert!(!dir.path().join("users.txt").exists());
    }

    #[tokio::test]
    async fn test_update_password_without_match_leaves_file_untouched() {
        let dir = TempDir::new().expect("tempdir");
        let store = store(&dir);
        store
            .insert(record("alice", "h1", "a@x.com"))
            .await
            .expect("insert");

        let updated = store
            .update_password("missing@x.com", "h9")
            .await
            .expect("update");
        assert_eq!(updated, 0);

        let contents = std::fs::read_to_string(dir.path().join("users.txt")).expect("read file");
        assert_eq!(contents, "alice,h1,a@x.com\n");
    }
}
