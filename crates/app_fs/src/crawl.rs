//! Raw crawler feeding the persistent directory index
//!
//! Unlike the leaf scanner this records every file and folder, with size and
//! modification time, relative to the crawl root.

use crate::scanner::relative_display;
use crate::walk::walk;
use crate::{FsError, Result};
use rayon::prelude::*;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::UNIX_EPOCH;
use walkdir::DirEntry;

/// A single file or directory as stored in the index
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    /// Path relative to the root, `.` for the root
    pub path: String,
    /// Relative path of the containing folder, empty for the root
    pub parent: String,
    pub is_dir: bool,
    /// Byte size for files, `None` for directories
    pub size: Option<u64>,
    /// Seconds since the epoch
    pub mtime: f64,
}

#[derive(Debug, Clone, Default)]
pub struct CrawlOptions {
    pub follow_symlinks: bool,
    /// Absolute paths never recorded (the index database itself, for instance)
    pub ignored: HashSet<PathBuf>,
}

/// Entry describing the crawl root itself
pub fn root_entry(root: &Path) -> Result<IndexEntry> {
    let metadata = fs::metadata(root).map_err(|e| FsError::from_io(e, root))?;
    Ok(IndexEntry {
        path: ".".to_string(),
        parent: String::new(),
        is_dir: true,
        size: None,
        mtime: mtime_of(&metadata),
    })
}

/// Entries handed to the sink at a time
const SINK_BATCH: usize = 256;

/// Crawl everything below `root`, handing entries to `sink` in batches.
///
/// Directory walking is sequential; stat calls fan out over the rayon pool
/// the caller runs in, so `sink` is called from worker threads. Returns the
/// number of entries produced.
pub fn crawl<F>(root: &Path, options: &CrawlOptions, sink: &F) -> usize
where
    F: Fn(Vec<IndexEntry>) + Sync,
{
    let produced = AtomicUsize::new(0);
    let flush = |batch: Vec<IndexEntry>| {
        produced.fetch_add(batch.len(), Ordering::Relaxed);
        sink(batch);
    };

    let wanted = |entry: &DirEntry| {
        !options.ignored.contains(entry.path()) && (options.follow_symlinks || !entry.path_is_symlink())
    };

    walk(root, options.follow_symlinks, wanted)
        .par_bridge()
        .filter_map(|entry| index_entry(root, &entry))
        .fold(Vec::new, |mut batch, entry| {
            batch.push(entry);
            if batch.len() >= SINK_BATCH {
                flush(std::mem::take(&mut batch));
            }
            batch
        })
        .for_each(|rest| {
            if !rest.is_empty() {
                flush(rest);
            }
        });

    produced.into_inner()
}

fn index_entry(root: &Path, entry: &DirEntry) -> Option<IndexEntry> {
    let metadata = match entry.metadata() {
        Ok(m) => m,
        Err(e) => {
            tracing::warn!("Cannot stat {}: {}", entry.path().display(), e);
            return None;
        }
    };

    let is_dir = metadata.is_dir();
    Some(IndexEntry {
        path: relative_display(root, entry.path()),
        parent: entry
            .path()
            .parent()
            .map(|p| relative_display(root, p))
            .unwrap_or_default(),
        is_dir,
        size: if is_dir { None } else { Some(metadata.len()) },
        mtime: mtime_of(&metadata),
    })
}

fn mtime_of(metadata: &fs::Metadata) -> f64 {
    metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
