use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use handkey_gesture::{Credential, MAX_BINS};
use serde::{Deserialize, Serialize};

use crate::config::STORE_PREFIX;
use crate::error::StoreError;

const RECORD_FILE: &str = "gesture.bin";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GestureRecord {
    pub id: String,
    pub credential: Credential,
}

/// Persists `username → credential`. Implementations enforce username uniqueness
/// and serialize concurrent access per username.
pub trait CredentialStore {
    fn lookup(&self, user: &str) -> Result<Option<Credential>, StoreError>;

    /// Fails with [`StoreError::AlreadyExists`] when `user` is taken.
    fn insert(&self, user: &str, credential: Credential) -> Result<(), StoreError>;

    /// Returns whether a record was removed.
    fn remove(&self, user: &str) -> Result<bool, StoreError>;
}

impl<S: CredentialStore + ?Sized> CredentialStore for &S {
    fn lookup(&self, user: &str) -> Result<Option<Credential>, StoreError> {
        (**self).lookup(user)
    }

    fn insert(&self, user: &str, credential: Credential) -> Result<(), StoreError> {
        (**self).insert(user, credential)
    }

    fn remove(&self, user: &str) -> Result<bool, StoreError> {
        (**self).remove(user)
    }
}

/// One directory per user under a prefix, each holding a postcard-encoded [`GestureRecord`].
#[derive(Debug, Clone)]
pub struct FileStore {
    prefix: PathBuf,
}

impl FileStore {
    pub fn new(prefix: impl Into<PathBuf>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Store rooted at the compiled-in prefix.
    pub fn system() -> Self {
        Self::new(STORE_PREFIX.to_path_buf())
    }

    pub fn prefix(&self) -> &Path {
        &self.prefix
    }

    fn user_store_path(&self, user: &str) -> Result<PathBuf, StoreError> {
        validate_username(user)?;
        Ok(self.prefix.join(user))
    }

    pub fn load_record(&self, user: &str) -> Result<Option<GestureRecord>, StoreError> {
        let file = self.user_store_path(user)?.join(RECORD_FILE);
        let data = match std::fs::read(&file) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StoreError::Io { path: file, source }),
        };

        let record: GestureRecord =
            postcard::from_bytes(&data).map_err(|e| StoreError::Corrupt {
                path: file.clone(),
                reason: e.to_string(),
            })?;
        if !record.credential.params.is_supported() {
            return Err(StoreError::Corrupt {
                path: file,
                reason: format!(
                    "num_bins {} exceeds the maximum of {}",
                    record.credential.params.num_bins, MAX_BINS
                ),
            });
        }
        Ok(Some(record))
    }
}

impl CredentialStore for FileStore {
    fn lookup(&self, user: &str) -> Result<Option<Credential>, StoreError> {
        Ok(self.load_record(user)?.map(|r| r.credential))
    }

    fn insert(&self, user: &str, credential: Credential) -> Result<(), StoreError> {
        let path = self.user_store_path(user)?;
        let created = !path.exists();
        std::fs::create_dir_all(&path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;

        let record = GestureRecord {
            id: uuid::Uuid::new_v4().to_string(),
            credential,
        };
        let data =
            postcard::to_allocvec(&record).map_err(|e| StoreError::Unavailable(e.to_string()))?;

        // staged then hard-linked: readers see a whole record or none, and the link
        // fails if another enrollment already published one
        let staging = path.join(format!(".{}.{}", RECORD_FILE, record.id));
        let file = path.join(RECORD_FILE);
        let published =
            write_private(&staging, &data).and_then(|_| std::fs::hard_link(&staging, &file));
        let _ = std::fs::remove_file(&staging);

        match published {
            Ok(()) => {
                log::debug!("stored record {} at {}", record.id, file.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                Err(StoreError::AlreadyExists {
                    user: user.to_string(),
                })
            }
            Err(source) => {
                if created {
                    let _ = std::fs::remove_dir(&path);
                }
                Err(StoreError::Io { path: file, source })
            }
        }
    }

    fn remove(&self, user: &str) -> Result<bool, StoreError> {
        let path = self.user_store_path(user)?;
        if !path.join(RECORD_FILE).exists() {
            return Ok(false);
        }
        std::fs::remove_dir_all(&path).map_err(|source| StoreError::Io { path, source })?;
        Ok(true)
    }
}

/// Write a new file readable by the owner only.
fn write_private(file: &Path, data: &[u8]) -> io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut out = options.open(file)?;
    out.write_all(data)?;
    out.sync_all()
}

fn validate_username(user: &str) -> Result<(), StoreError> {
    let reason = if user.is_empty() {
        Some("empty")
    } else if user == "." || user == ".." {
        Some("reserved name")
    } else if user.contains(['/', '\\', '\0']) {
        Some("contains a path separator")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(StoreError::InvalidUsername {
            user: user.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

/// Process-local store, used by tests and embedders without a filesystem.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, Credential>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Unavailable("memory store lock poisoned".into())
}

impl CredentialStore for MemoryStore {
    fn lookup(&self, user: &str) -> Result<Option<Credential>, StoreError> {
        Ok(self.records.lock().map_err(poisoned)?.get(user).cloned())
    }

    fn insert(&self, user: &str, credential: Credential) -> Result<(), StoreError> {
        let mut records = self.records.lock().map_err(poisoned)?;
        if records.contains_key(user) {
            return Err(StoreError::AlreadyExists {
                user: user.to_string(),
            });
        }
        records.insert(user.to_string(), credential);
        Ok(())
    }

    fn remove(&self, user: &str) -> Result<bool, StoreError> {
        Ok(self.records.lock().map_err(poisoned)?.remove(user).is_some())
    }
}
