//! Uploaded content storage collaborator.
//!
//! Core keeps only the returned locator, mime type and size; bytes live in
//! the content store.

use chrono::Utc;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Raw upload received from the transport layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub original_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("failed to prepare upload directory `{path}`: {source}")]
    Directory {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write upload `{path}`: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Accepts uploaded bytes and returns a stable locator.
pub trait ContentStore: Send + Sync {
    fn put(&self, upload: &Upload) -> Result<String, ContentError>;
}

/// Stores uploads as files under one directory.
///
/// Locators are file names relative to `root`; files are never overwritten.
#[derive(Debug, Clone)]
pub struct FsContentStore {
    root: PathBuf,
}

impl FsContentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        self.root.as_path()
    }

    /// Resolves a locator back to its file path.
    pub fn path_for(&self, locator: &str) -> PathBuf {
        self.root.join(locator)
    }
}

impl ContentStore for FsContentStore {
    fn put(&self, upload: &Upload) -> Result<String, ContentError> {
        std::fs::create_dir_all(&self.root).map_err(|source| ContentError::Directory {
            path: self.root.clone(),
            source,
        })?;

        let locator = format!(
            "document-{}-{}.pdf",
            Utc::now().timestamp_millis(),
            Uuid::new_v4().simple()
        );
        let path = self.path_for(&locator);
        let write = |path: &Path| -> std::io::Result<()> {
            let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
            file.write_all(&upload.bytes)?;
            file.sync_all()
        };
        write(&path).map_err(|source| ContentError::Write {
            path: path.clone(),
            source,
        })?;

        Ok(locator)
    }
}
