//! In-memory collaborators for exercising the core without a filesystem
//!
//! Used by the unit tests, the integration tests and anything embedding the
//! core that wants scripted data.

use crate::collaborators::{DirectoryScanner, MediaPageFetcher, PageRequest, ShellOpener};
use crate::error::{AppError, FetchError};
use app_fs::{LeafDirectory, MediaEntry, MediaPage, OpenOutcome};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// `count` image entries named `img_0000.jpg` .. inside `directory`
pub fn sample_entries(directory: &Path, count: usize) -> Vec<MediaEntry> {
    (0..count)
        .map(|i| MediaEntry::from_path(&directory.join(format!("img_{:04}.jpg", i))))
        .collect()
}

/// Page fetcher serving fixed listings and recording every call
#[derive(Default)]
pub struct MemoryFetcher {
    listings: Mutex<HashMap<PathBuf, Vec<MediaEntry>>>,
    failures: Mutex<HashMap<PathBuf, FetchError>>,
    calls: Mutex<Vec<(PathBuf, PageRequest)>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a directory holding `count` generated entries
    pub fn with_directory(self, directory: impl AsRef<Path>, count: usize) -> Self {
        let directory = directory.as_ref();
        self.set_listing(directory, sample_entries(directory, count));
        self
    }

    pub fn set_listing(&self, directory: impl Into<PathBuf>, entries: Vec<MediaEntry>) {
        self.listings.lock().insert(directory.into(), entries);
    }

    /// Make every request for `directory` fail with `error`
    pub fn fail_directory(&self, directory: impl Into<PathBuf>, error: FetchError) {
        self.failures.lock().insert(directory.into(), error);
    }

    pub fn calls(&self) -> Vec<(PathBuf, PageRequest)> {
        self.calls.lock().clone()
    }

    pub fn calls_for(&self, directory: &Path) -> Vec<PageRequest> {
        self.calls
            .lock()
            .iter()
            .filter(|(path, _)| path == directory)
            .map(|(_, request)| *request)
            .collect()
    }
}

#[async_trait]
impl MediaPageFetcher for MemoryFetcher {
    async fn list_page(&self, directory: &Path, request: PageRequest) -> Result<MediaPage, FetchError> {
        self.calls.lock().push((directory.to_path_buf(), request));

        if let Some(error) = self.failures.lock().get(directory) {
            return Err(error.clone());
        }

        let listings = self.listings.lock();
        let entries = listings
            .get(directory)
            .ok_or_else(|| FetchError::Failed(format!("no listing for {}", directory.display())))?;

        let total = entries.len();
        let start = request.offset.min(total);
        let end = match request.limit {
            Some(limit) => (start + limit).min(total),
            None => total,
        };

        Ok(MediaPage {
            files: entries[start..end].to_vec(),
            total,
            next_offset: end,
            has_more: Some(end < total),
            error: None,
        })
    }
}

/// Scanner returning a fixed leaf set per root
#[derive(Default)]
pub struct MemoryScanner {
    roots: Mutex<HashMap<PathBuf, Vec<LeafDirectory>>>,
}

impl MemoryScanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(self, root: impl Into<PathBuf>, leaves: Vec<LeafDirectory>) -> Self {
        self.set_root(root, leaves);
        self
    }

    /// Replace the leaves reported for `root`
    pub fn set_root(&self, root: impl Into<PathBuf>, leaves: Vec<LeafDirectory>) {
        self.roots.lock().insert(root.into(), leaves);
    }
}

#[async_trait]
impl DirectoryScanner for MemoryScanner {
    async fn scan(&self, root: &Path) -> Result<Vec<LeafDirectory>, AppError> {
        self.roots
            .lock()
            .get(root)
            .cloned()
            .ok_or_else(|| AppError::FileNotFound(root.display().to_string()))
    }
}

/// Shell opener that only records what it was asked to open
#[derive(Default)]
pub struct RecordingOpener {
    opened: Mutex<Vec<PathBuf>>,
}

impl RecordingOpener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn opened(&self) -> Vec<PathBuf> {
        self.opened.lock().clone()
    }
}

impl ShellOpener for RecordingOpener {
    fn open_file(&self, path: &Path) -> OpenOutcome {
        self.opened.lock().push(path.to_path_buf());
        OpenOutcome::ok()
    }

    fn open_folder(&self, path: &Path) -> OpenOutcome {
        self.opened.lock().push(path.to_path_buf());
        OpenOutcome::ok()
    }
}
