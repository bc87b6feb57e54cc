//! File system snapshot store implementation

use crate::SnapshotStore;
use async_trait::async_trait;
use rentcache_core::Result;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// File system snapshot store.
///
/// The snapshot lives in a single file. Saves write a sibling `.tmp` file and
/// rename it over the target so a crash mid-write leaves the previous
/// snapshot intact.
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    /// Create a store backed by `path`. Nothing is touched until the first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl SnapshotStore for FileSnapshotStore {
    async fn load(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, snapshot: &str) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await?;
        }

        let temp_path = self.temp_path();
        let written = async {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(snapshot.as_bytes()).await?;
            file.sync_all().await?;
            drop(file);
            fs::rename(&temp_path, &self.path).await
        }
        .await;

        if let Err(e) = written {
            tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "snapshot save failed, previous snapshot left in place"
            );
            if let Err(cleanup) = fs::remove_file(&temp_path).await
                && cleanup.kind() != ErrorKind::NotFound
            {
                tracing::warn!(
                    path = %temp_path.display(),
                    error = %cleanup,
                    "could not remove temporary snapshot file"
                );
            }
            return Err(e.into());
        }
        Ok(())
    }

    async fn erase(&self) -> Result<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_missing_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileSnapshotStore::new(temp_dir.path().join("snapshot.json"));

        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileSnapshotStore::new(temp_dir.path().join("nested/dir/snapshot.json"));

        store.save(r#"{"a":1}"#).await.unwrap();
        assert_eq!(store.load().await.unwrap().as_deref(), Some(r#"{"a":1}"#));

        // Second save replaces the first and leaves no temp file behind
        store.save(r#"{"a":2}"#).await.unwrap();
        assert_eq!(store.load().await.unwrap().as_deref(), Some(r#"{"a":2}"#));
        assert!(!store.temp_path().exists());
    }

    #[tokio::test]
    async fn test_failed_save_removes_temp_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("snapshot.json");
        // A directory in the way makes the final rename fail
        std::fs::create_dir_all(path.join("occupied")).unwrap();
        let store = FileSnapshotStore::new(&path);

        assert!(store.save(r#"{"a":1}"#).await.is_err());
        assert!(!store.temp_path().exists());
        assert!(path.join("occupied").is_dir());
    }

    #[tokio::test]
    async fn test_erase() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileSnapshotStore::new(temp_dir.path().join("snapshot.json"));

        // Erasing before anything was saved is fine
        store.erase().await.unwrap();

        store.save("{}").await.unwrap();
        store.erase().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
    }

    #[test]
    fn test_describe() {
        let store = FileSnapshotStore::new("/var/lib/rentcache/snapshot.json");
        assert_eq!(store.describe(), "file:/var/lib/rentcache/snapshot.json");
        assert_eq!(
            store.temp_path(),
            PathBuf::from("/var/lib/rentcache/snapshot.json.tmp")
        );
    }
}
