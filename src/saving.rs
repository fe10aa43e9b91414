use std::collections::HashMap;
use std::fs::{File, create_dir_all};
use std::io::{BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use log::debug;
use tempfile::NamedTempFile;

use crate::error::Result;
use crate::user::User;

/// Key under which the whole user sequence is persisted.
pub const USERS_KEY: &str = "users";

/// String key-value slot storage, the shape of browser local storage.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// Persistence seam for the record store.
pub trait Repository {
    /// Returns `None` when nothing has been persisted yet.
    fn load(&self) -> Result<Option<Vec<User>>>;

    /// Replaces the persisted sequence with `users`.
    fn save(&mut self, users: &[User]) -> Result<()>;
}

impl<R: Repository + ?Sized> Repository for Box<R> {
    fn load(&self) -> Result<Option<Vec<User>>> {
        (**self).load()
    }

    fn save(&mut self, users: &[User]) -> Result<()> {
        (**self).save(users)
    }
}

/// In-process key-value store.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    slots: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.slots.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.slots.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Key-value store backed by one `<key>.json` file per key in a directory.
///
/// Writes go to a temporary file in the same directory which is then renamed
/// over the target, so readers see either the old blob or the new one.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Opens a store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.exists() {
            create_dir_all(&dir)?;
        }
        Ok(FileStore { dir })
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let mut file = match File::open(self.path_for(key)) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        // Invalid UTF-8 becomes U+FFFD and then fails JSON parsing as a corrupt blob.
        Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let target = self.path_for(key);
        let tmp = NamedTempFile::new_in(&self.dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            writer.write_all(value.as_bytes())?;
            writer.flush()?;
        }
        tmp.persist(&target).map_err(|e| e.error)?;
        debug!("wrote {} bytes to {}", value.len(), target.display());
        Ok(())
    }
}

/// Stores the user sequence as one JSON array under [`USERS_KEY`].
#[derive(Debug, Clone)]
pub struct JsonRepository<S> {
    store: S,
}

impl<S: KeyValueStore> JsonRepository<S> {
    pub fn new(store: S) -> Self {
        JsonRepository { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }
}

impl<S: KeyValueStore> Repository for JsonRepository<S> {
    fn load(&self) -> Result<Option<Vec<User>>> {
        match self.store.get(USERS_KEY)? {
            Some(blob) => Ok(Some(serde_json::from_str(&blob)?)),
            None => Ok(None),
        }
    }

    fn save(&mut self, users: &[User]) -> Result<()> {
        let blob = serde_json::to_string(users)?;
        self.store.set(USERS_KEY, &blob)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;

    #[test]
    fn memory_store_get_set() {
        let mut store = MemoryStore::new();
        assert_eq!(store.get("k").unwrap(), None);
        store.set("k", "v1").unwrap();
        store.set("k", "v2").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v2"));
    }

    #[test]
    fn empty_repository_is_uninitialized() {
        let repo = JsonRepository::new(MemoryStore::new());
        assert!(repo.load().unwrap().is_none());
    }

    #[test]
    fn malformed_blob_is_corrupt() {
        let mut store = MemoryStore::new();
        store.set(USERS_KEY, "[{\"id\": ").unwrap();
        let repo = JsonRepository::new(store);
        assert!(matches!(repo.load(), Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::open(dir.path().join("nested")).unwrap();
        assert_eq!(store.get(USERS_KEY).unwrap(), None);

        store.set(USERS_KEY, "[]").unwrap();
        assert_eq!(store.get(USERS_KEY).unwrap().as_deref(), Some("[]"));
        assert!(store.path_for(USERS_KEY).exists());

        store.set(USERS_KEY, "[1]").unwrap();
        let reopened = FileStore::open(dir.path().join("nested")).unwrap();
        assert_eq!(reopened.get(USERS_KEY).unwrap().as_deref(), Some("[1]"));
    }

    #[test]
    fn non_utf8_file_reads_as_corrupt_blob() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        std::fs::write(store.path_for(USERS_KEY), [0xff, 0xfe, b'[', b']']).unwrap();

        assert!(store.get(USERS_KEY).unwrap().is_some());
        let repo = JsonRepository::new(store);
        assert!(matches!(repo.load(), Err(StoreError::Corrupt(_))));
    }
}
