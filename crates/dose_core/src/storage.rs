use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use crate::error::HistoryError;

/// Minimal key-value persistence. Values are whole serialized blobs; there are no
/// partial updates.
pub trait StorageBackend: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>, HistoryError>;
    fn write(&self, key: &str, value: &str) -> Result<(), HistoryError>;
    fn remove(&self, key: &str) -> Result<(), HistoryError>;
}

impl<B: StorageBackend + ?Sized> StorageBackend for Box<B> {
    fn read(&self, key: &str) -> Result<Option<String>, HistoryError> {
        (**self).read(key)
    }

    fn write(&self, key: &str, value: &str) -> Result<(), HistoryError> {
        (**self).write(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), HistoryError> {
        (**self).remove(key)
    }
}

impl<B: StorageBackend + ?Sized> StorageBackend for &B {
    fn read(&self, key: &str) -> Result<Option<String>, HistoryError> {
        (**self).read(key)
    }

    fn write(&self, key: &str, value: &str) -> Result<(), HistoryError> {
        (**self).write(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), HistoryError> {
        (**self).remove(key)
    }
}

/// Stores each key as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn io_error(key: &str, source: std::io::Error) -> HistoryError {
        HistoryError::Io {
            key: key.to_string(),
            source,
        }
    }
}

impl StorageBackend for FileBackend {
    fn read(&self, key: &str) -> Result<Option<String>, HistoryError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(Self::io_error(key, err)),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), HistoryError> {
        fs::create_dir_all(&self.dir).map_err(|err| Self::io_error(key, err))?;
        let target = self.path_for(key);
        let staging = self.dir.join(format!(".{key}.json.tmp"));
        fs::write(&staging, value).map_err(|err| Self::io_error(key, err))?;
        if let Err(err) = fs::rename(&staging, &target) {
            let _ = fs::remove_file(&staging);
            return Err(Self::io_error(key, err));
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), HistoryError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(Self::io_error(key, err)),
        }
    }
}

/// In-process storage, lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryBackend {
    fn read(&self, key: &str) -> Result<Option<String>, HistoryError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), HistoryError> {
        self.entries
            .write()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), HistoryError> {
        self.entries.write().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_backend_round_trips_and_removes() {
        let temp = tempdir().expect("tempdir");
        let backend = FileBackend::new(temp.path().join("nested"));

        assert_eq!(backend.read("k").unwrap(), None);
        backend.write("k", "[1]").unwrap();
        assert_eq!(backend.read("k").unwrap().as_deref(), Some("[1]"));
        assert!(backend.path_for("k").exists());

        backend.remove("k").unwrap();
        assert_eq!(backend.read("k").unwrap(), None);
        backend.remove("k").expect("removing a missing key is fine");
    }

    #[test]
    fn failed_rename_leaves_no_staging_file() {
        let temp = tempdir().expect("tempdir");
        let backend = FileBackend::new(temp.path());
        fs::create_dir_all(backend.path_for("k").join("occupied")).expect("blocking dir");

        assert!(matches!(backend.write("k", "[]"), Err(HistoryError::Io { .. })));
        assert!(!temp.path().join(".k.json.tmp").exists());
    }

    #[test]
    fn memory_backend_overwrites() {
        let backend = MemoryBackend::new();
        backend.write("k", "a").unwrap();
        backend.write("k", "b").unwrap();
        assert_eq!(backend.read("k").unwrap().as_deref(), Some("b"));
    }
}
