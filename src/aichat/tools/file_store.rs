//! Scripts and reports on local disk.
//!
//! [`LocalFileStore`] owns two flat directories under one root:
//!
//! ```text
//! data/
//!   scripts/   generated code artifacts, `create file` targets
//!   reports/   dated Markdown work logs
//! ```
//!
//! Callers address files by bare name plus a [`StoreDir`]. A name must be exactly one
//! normal path component, so `../x`, `/etc/passwd` or `a/b` never reach the filesystem.
//!
//! # Example
//!
//! ```rust
//! use aichat::tools::file_store::{FileStore, LocalFileStore, StoreDir};
//!
//! let root = tempfile::tempdir().unwrap();
//! let store = LocalFileStore::new(root.path()).unwrap();
//! let path = store.write("hello.py", "print('hi')", StoreDir::Scripts).unwrap();
//! assert!(path.ends_with("scripts/hello.py"));
//! assert_eq!(store.read("hello.py", StoreDir::Scripts).unwrap(), "print('hi')");
//! ```

use std::error::Error;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Which of the store's directories a name lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreDir {
    Scripts,
    Reports,
}

impl StoreDir {
    pub fn dir_name(&self) -> &'static str {
        match self {
            StoreDir::Scripts => "scripts",
            StoreDir::Reports => "reports",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStoreError {
    /// No file with that name in the directory.
    NotFound(String),
    /// The name tried to leave its directory.
    PathTraversal(String),
    /// Empty name or a name with path separators.
    InvalidName(String),
    Io(String),
}

impl fmt::Display for FileStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileStoreError::NotFound(name) => write!(f, "File not found: {}", name),
            FileStoreError::PathTraversal(name) => {
                write!(f, "Path traversal attempt blocked: {}", name)
            }
            FileStoreError::InvalidName(name) => write!(f, "Invalid file name: {}", name),
            FileStoreError::Io(msg) => write!(f, "IO error: {}", msg),
        }
    }
}

impl Error for FileStoreError {}

/// Named-file persistence for generated scripts and reports.
pub trait FileStore: Send + Sync {
    /// Create or overwrite `name` in `dir` and return the full path written.
    fn write(&self, name: &str, content: &str, dir: StoreDir) -> Result<PathBuf, FileStoreError>;

    fn read(&self, name: &str, dir: StoreDir) -> Result<String, FileStoreError>;
}

pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    /// Opens the store at `root`, creating `scripts/` and `reports/` if needed.
    pub fn new(root: impl AsRef<Path>) -> io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(root.join(StoreDir::Scripts.dir_name()))?;
        fs::create_dir_all(root.join(StoreDir::Reports.dir_name()))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dir_path(&self, dir: StoreDir) -> PathBuf {
        self.root.join(dir.dir_name())
    }

    fn validate_name(&self, name: &str, dir: StoreDir) -> Result<PathBuf, FileStoreError> {
        if name.trim().is_empty() {
            return Err(FileStoreError::InvalidName(name.to_string()));
        }

        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(file)), None) => Ok(self.dir_path(dir).join(file)),
            (Some(Component::ParentDir), _) | (Some(Component::RootDir), _) => {
                Err(FileStoreError::PathTraversal(name.to_string()))
            }
            _ => Err(FileStoreError::InvalidName(name.to_string())),
        }
    }
}

impl FileStore for LocalFileStore {
    fn write(&self, name: &str, content: &str, dir: StoreDir) -> Result<PathBuf, FileStoreError> {
        let path = self.validate_name(name, dir)?;
        if path.is_dir() {
            return Err(FileStoreError::InvalidName(name.to_string()));
        }
        fs::write(&path, content).map_err(|e| FileStoreError::Io(e.to_string()))?;
        log::debug!("wrote {} ({} bytes)", path.display(), content.len());
        Ok(path)
    }

    fn read(&self, name: &str, dir: StoreDir) -> Result<String, FileStoreError> {
        let path = self.validate_name(name, dir)?;
        match fs::read_to_string(&path) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(FileStoreError::NotFound(name.to_string()))
            }
            Err(e) => Err(FileStoreError::Io(e.to_string())),
        }
    }
}
