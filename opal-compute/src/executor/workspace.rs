//! Per-run workspace
//!
//! A fresh `<root>/opal-XXXXXX/` directory holding the algorithm, its
//! parameters and the `input/` data directory. Removed explicitly at the
//! end of every run; dropping it removes it as well.

use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::TempDir;

pub const INPUT_DIR: &str = "input";

pub struct Workspace {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl Workspace {
    /// Creates a workspace under `root`
    pub async fn create(root: &Path) -> io::Result<Self> {
        tokio::fs::create_dir_all(root).await?;

        let root = root.to_path_buf();
        let dir = tokio::task::spawn_blocking(move || {
            tempfile::Builder::new().prefix("opal-").tempdir_in(root)
        })
        .await
        .map_err(io::Error::other)??;

        Ok(Self {
            path: dir.path().to_path_buf(),
            dir: Some(dir),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn input_dir(&self) -> PathBuf {
        self.path.join(INPUT_DIR)
    }

    pub async fn write_file(&self, name: &str, contents: impl AsRef<[u8]>) -> io::Result<()> {
        tokio::fs::write(self.path.join(name), contents).await
    }

    pub async fn write_json<T: Serialize>(&self, name: &str, value: &T) -> io::Result<()> {
        let contents = serde_json::to_vec_pretty(value)?;
        self.write_file(name, contents).await
    }

    /// Deletes the workspace and everything in it
    pub async fn remove(&mut self) -> io::Result<()> {
        match self.dir.take() {
            Some(dir) => tokio::task::spawn_blocking(move || dir.close())
                .await
                .map_err(io::Error::other)?,
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_remove() {
        let root = tempfile::tempdir().unwrap();
        let mut workspace = Workspace::create(&root.path().join("nested")).await.unwrap();

        assert!(workspace.path().is_dir());
        assert!(workspace.path().file_name().unwrap().to_str().unwrap().starts_with("opal-"));
        assert_eq!(workspace.input_dir(), workspace.path().join("input"));

        workspace.write_json("params.json", &serde_json::json!({"a": 1})).await.unwrap();
        assert!(workspace.path().join("params.json").is_file());

        let path = workspace.path().to_path_buf();
        workspace.remove().await.unwrap();
        assert!(!path.exists());

        // second removal is a no-op
        workspace.remove().await.unwrap();
    }

    #[tokio::test]
    async fn test_drop_removes_directory() {
        let root = tempfile::tempdir().unwrap();
        let workspace = Workspace::create(root.path()).await.unwrap();
        let path = workspace.path().to_path_buf();

        drop(workspace);
        assert!(!path.exists());
    }
}
