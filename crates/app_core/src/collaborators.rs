//! Interfaces the core consumes, and their filesystem implementations
//!
//! Every collaborator is optional. A missing one is a typed `None` that the
//! core turns into a `MissingCapability`/`Unavailable` failure instead of a
//! runtime check.

use crate::error::{AppError, FetchError};
use app_fs::{LeafDirectory, ListOptions, MediaPage, OpenOutcome};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Window into a directory's media listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub offset: usize,
    /// `None` means "everything from `offset` on"
    pub limit: Option<usize>,
}

impl PageRequest {
    pub fn new(offset: usize, limit: usize) -> Self {
        Self {
            offset,
            limit: (limit > 0).then_some(limit),
        }
    }
}

/// Returns one page of a directory's media.
///
/// Must be idempotent for identical input and never return entries outside
/// the requested window.
#[async_trait]
pub trait MediaPageFetcher: Send + Sync {
    async fn list_page(&self, directory: &Path, request: PageRequest) -> Result<MediaPage, FetchError>;
}

/// Enumerates the leaf directories under a root
#[async_trait]
pub trait DirectoryScanner: Send + Sync {
    async fn scan(&self, root: &Path) -> Result<Vec<LeafDirectory>, AppError>;
}

/// Fire-and-forget OS shell actions
pub trait ShellOpener: Send + Sync {
    fn open_file(&self, path: &Path) -> OpenOutcome;
    fn open_folder(&self, path: &Path) -> OpenOutcome;
}

/// The set of collaborators available in this runtime
#[derive(Clone, Default)]
pub struct Collaborators {
    pub scanner: Option<Arc<dyn DirectoryScanner>>,
    pub page_fetcher: Option<Arc<dyn MediaPageFetcher>>,
    pub opener: Option<Arc<dyn ShellOpener>>,
}

impl Collaborators {
    /// Local-disk scanner and fetcher plus the system shell
    pub fn filesystem(options: ListOptions) -> Self {
        Self {
            scanner: Some(Arc::new(FsScanner::new(options.clone()))),
            page_fetcher: Some(Arc::new(FsPageFetcher::new(options))),
            opener: Some(Arc::new(SystemOpener)),
        }
    }
}

/// Leaf scanner backed by `app_fs::scan_leaves` on the blocking pool
pub struct FsScanner {
    options: ListOptions,
}

impl FsScanner {
    pub fn new(options: ListOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl DirectoryScanner for FsScanner {
    async fn scan(&self, root: &Path) -> Result<Vec<LeafDirectory>, AppError> {
        let root = root.to_path_buf();
        let options = self.options.clone();

        tokio::task::spawn_blocking(move || app_fs::scan_leaves(&root, &options))
            .await
            .map_err(|e| AppError::Storage(format!("scan task failed: {}", e)))?
            .map_err(AppError::from)
    }
}

/// Page fetcher backed by `app_fs::list_media_page` on the blocking pool
pub struct FsPageFetcher {
    options: ListOptions,
}

impl FsPageFetcher {
    pub fn new(options: ListOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl MediaPageFetcher for FsPageFetcher {
    async fn list_page(&self, directory: &Path, request: PageRequest) -> Result<MediaPage, FetchError> {
        let directory: PathBuf = directory.to_path_buf();
        let options = self.options.clone();

        tokio::task::spawn_blocking(move || {
            app_fs::list_media_page(&directory, request.offset, request.limit, &options)
        })
        .await
        .map_err(|e| FetchError::Failed(format!("listing task failed: {}", e)))?
        .map_err(|e| FetchError::Failed(e.to_string()))
    }
}

/// Opens paths with the platform default handler
pub struct SystemOpener;

impl ShellOpener for SystemOpener {
    fn open_file(&self, path: &Path) -> OpenOutcome {
        app_fs::open_file(path)
    }

    fn open_folder(&self, path: &Path) -> OpenOutcome {
        app_fs::open_folder(path)
    }
}
