//! MediaShelf file system layer
//!
//! Provides the concrete collaborators the core consumes:
//! - Media classification and the shared entry types
//! - Leaf-directory scanning
//! - Paged media listing for one directory
//! - Raw crawling for the persistent directory index
//! - Library watching
//! - Opening files and folders with the OS shell

mod media;
mod browser;
mod scanner;
mod crawl;
mod walk;
mod watcher;
mod file_operations;

pub use media::{file_url, path_from_file_url, LeafDirectory, MediaEntry, MediaKind};
pub use browser::{list_media_files, list_media_page, natural_cmp, ListOptions, MediaPage};
pub use scanner::scan_leaves;
pub use crawl::{crawl, root_entry, CrawlOptions, IndexEntry};
pub use watcher::{FsEvent, LibraryWatcher};
pub use file_operations::{open_file, open_folder, OpenOutcome};

use std::path::Path;
use thiserror::Error;

/// File system errors
#[derive(Error, Debug)]
pub enum FsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Path not found: {0}")]
    NotFound(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Watcher error: {0}")]
    Watch(#[from] notify::Error),
}

impl FsError {
    /// Attach the offending path to the common I/O failure kinds
    pub fn from_io(err: std::io::Error, path: &Path) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => FsError::NotFound(path.display().to_string()),
            std::io::ErrorKind::PermissionDenied => FsError::AccessDenied(path.display().to_string()),
            _ => FsError::Io(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, FsError>;
