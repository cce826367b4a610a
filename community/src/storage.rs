//! File-backed device storage.

use communitree_core::document_store::BoxFuture;
use communitree_core::local_storage::{KeyValueStore, LocalStorageError};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Key-value store keeping one JSON file per key under a directory
///
/// Writes go to a temporary file that is then renamed over the old value, so
/// a crash mid-write leaves the previous value readable.
#[derive(Clone, Debug)]
pub struct FileKeyValueStore {
    base_dir: PathBuf,
}

impl FileKeyValueStore {
    /// Open (and create if needed) the storage directory
    ///
    /// # Errors
    ///
    /// Returns [`LocalStorageError::Io`] if the directory can't be created.
    pub async fn open(base_dir: impl Into<PathBuf>) -> Result<Self, LocalStorageError> {
        let base_dir = base_dir.into();
        tokio::fs::create_dir_all(&base_dir)
            .await
            .map_err(|e| LocalStorageError::Io(format!("{}: {e}", base_dir.display())))?;
        Ok(Self { base_dir })
    }

    /// The storage directory
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.base_dir.join(format!("{name}.json"))
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn read<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, LocalStorageError>> {
        Box::pin(async move {
            let path = self.path_for(key);
            match tokio::fs::read_to_string(&path).await {
                Ok(value) => Ok(Some(value)),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
                Err(e) => Err(LocalStorageError::Io(format!("{}: {e}", path.display()))),
            }
        })
    }

    fn write<'a>(
        &'a self,
        key: &'a str,
        value: String,
    ) -> BoxFuture<'a, Result<(), LocalStorageError>> {
        Box::pin(async move {
            let path = self.path_for(key);
            let tmp = path.with_extension("json.tmp");
            let io = |e: std::io::Error| LocalStorageError::Io(format!("{}: {e}", path.display()));

            tokio::fs::write(&tmp, value).await.map_err(io)?;
            tokio::fs::rename(&tmp, &path).await.map_err(io)?;
            Ok(())
        })
    }
}
