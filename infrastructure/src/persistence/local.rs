//! Saves accepted file contents under a project root.

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tracing::debug;
use xpilot_application::ports::persistence::{FilePersistence, PersistenceError};

/// [`FilePersistence`] writing to the local filesystem.
///
/// Paths are relative to `root`; absolute paths and `..` components are
/// rejected. Parent directories are created as needed.
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, PersistenceError> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if path.is_empty() || escapes {
            return Err(PersistenceError::OutsideRoot(path.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl FilePersistence for LocalFileStore {
    async fn save_file(&self, path: &str, content: &str) -> Result<(), PersistenceError> {
        let full_path = self.resolve(path)?;
        let write_error = |source| PersistenceError::Write {
            path: path.to_string(),
            source,
        };

        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(write_error)?;
        }
        tokio::fs::write(&full_path, content)
            .await
            .map_err(write_error)?;

        debug!(path = %full_path.display(), bytes = content.len(), "Saved file");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(dir.path());

        store.save_file("src/bin/main.rs", "fn main() {}\n").await.unwrap();

        let saved = std::fs::read_to_string(dir.path().join("src/bin/main.rs")).unwrap();
        assert_eq!(saved, "fn main() {}\n");
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(dir.path());

        store.save_file("a.txt", "one").await.unwrap();
        store.save_file("./a.txt", "two").await.unwrap();

        assert_eq!(std::fs::read_to_string(dir.path().join("a.txt")).unwrap(), "two");
    }

    #[tokio::test]
    async fn test_rejects_paths_outside_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(dir.path());

        for path in ["../escape.txt", "/etc/passwd", "src/../../x", ""] {
            let err = store.save_file(path, "x").await.unwrap_err();
            assert!(matches!(err, PersistenceError::OutsideRoot(_)), "{path}");
        }
    }

    #[test]
    fn test_input_required_uses_port_default() {
        let store = LocalFileStore::new(".");
        assert_eq!(store.input_required("a\n# INPUT_REQUIRED fill me\n"), vec![2]);
    }
}
