//! Sources for included documents

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::LoadError;

/// Loads the text of an included document.
///
/// Include paths are passed exactly as written after the include token.
pub trait FileLoader {
    /// Read the whole document at `path`
    fn read(&self, path: &Path) -> Result<String, LoadError>;

    /// A stable name for `path`, used to detect include cycles.
    ///
    /// Two spellings of the same document should map to the same identity.
    fn identity(&self, path: &Path) -> PathBuf {
        path.to_path_buf()
    }
}

/// Loader that reads from disk.
///
/// Relative paths resolve against the process working directory, not the
/// including document.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsLoader;

impl FileLoader for FsLoader {
    fn read(&self, path: &Path) -> Result<String, LoadError> {
        std::fs::read_to_string(path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => LoadError::IncludeNotFound {
                path: path.to_path_buf(),
            },
            _ => LoadError::Io {
                path: path.to_path_buf(),
                source,
            },
        })
    }

    fn identity(&self, path: &Path) -> PathBuf {
        std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
    }
}

/// Loader that serves documents from an in-memory map.
///
/// Useful for tests and for documents bundled into an application.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    files: HashMap<PathBuf, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a document under `path`
    pub fn add(&mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> &mut Self {
        self.files.insert(path.into(), content.into());
        self
    }

    /// Create a loader holding the given documents
    pub fn with_files(
        files: impl IntoIterator<Item = (impl Into<PathBuf>, impl Into<String>)>,
    ) -> Self {
        let mut loader = Self::new();
        for (path, content) in files {
            loader.add(path, content);
        }
        loader
    }
}

impl FileLoader for MemoryLoader {
    fn read(&self, path: &Path) -> Result<String, LoadError> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| LoadError::IncludeNotFound {
                path: path.to_path_buf(),
            })
    }
}
