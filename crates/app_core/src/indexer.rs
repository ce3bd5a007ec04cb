//! Persistent directory index builder
//!
//! Crawls a root in parallel and streams entries to a single writer thread
//! that upserts them into SQLite in batches. Rows not seen during a build are
//! removed afterwards, so rebuilding is incremental.

use crate::config::IndexConfig;
use crate::AppError;
use app_db::DirectoryIndexDb;
use app_fs::{CrawlOptions, IndexEntry};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Smallest batch the writer commits
pub const MIN_BATCH_SIZE: usize = 32;

/// Default database file name for the `index` command
pub const DEFAULT_INDEX_FILE: &str = "media_index.db";

#[derive(Debug, Clone, Default)]
pub struct IndexOptions {
    pub batch_size: usize,
    /// Crawl threads; `None` uses the CPU count (at least 4)
    pub workers: Option<usize>,
    pub follow_symlinks: bool,
    /// Extra absolute paths the crawl must not record
    pub ignored: HashSet<PathBuf>,
}

impl IndexOptions {
    pub fn from_config(config: &IndexConfig, follow_symlinks: bool) -> Self {
        Self {
            batch_size: config.batch_size,
            workers: config.workers,
            follow_symlinks,
            ignored: HashSet::new(),
        }
    }

    fn worker_count(&self) -> usize {
        self.workers
            .filter(|&n| n > 0)
            .unwrap_or_else(|| std::thread::available_parallelism().map_or(1, |n| n.get()).max(4))
    }

    /// Skip the database file and its WAL companions
    pub fn ignore_database(&mut self, database: &Path) {
        let database = database.canonicalize().unwrap_or_else(|_| database.to_path_buf());
        let name = database
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        self.ignored.insert(database.with_file_name(format!("{}-wal", name)));
        self.ignored.insert(database.with_file_name(format!("{}-shm", name)));
        self.ignored.insert(database);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexReport {
    /// Entries written, the root included
    pub entries: usize,
    /// Rows dropped because they vanished from disk
    pub removed: usize,
    pub elapsed: Duration,
}

/// Index `root` into the SQLite database at `database`, creating it if needed
pub fn index_into(root: &Path, database: &Path, options: &IndexOptions) -> Result<IndexReport, AppError> {
    let pool = app_db::open(database)?;
    let index = DirectoryIndexDb::new(pool);

    let mut options = options.clone();
    options.ignore_database(database);
    build_index(root, &index, &options)
}

/// Rebuild the index of `root` in `index`
pub fn build_index(root: &Path, index: &DirectoryIndexDb, options: &IndexOptions) -> Result<IndexReport, AppError> {
    let started = Instant::now();
    let root = root
        .canonicalize()
        .map_err(|e| AppError::from(app_fs::FsError::from_io(e, root)))?;
    if !root.is_dir() {
        return Err(AppError::FileNotFound(root.display().to_string()));
    }

    let batch_size = options.batch_size.max(MIN_BATCH_SIZE);
    let workers = options.worker_count();
    info!(
        "Indexing {} ({} workers, batch {})",
        root.display(),
        workers,
        batch_size
    );

    index.reset_seen()?;
    index.upsert_entries(&[app_fs::root_entry(&root)?])?;

    let crawl_options = CrawlOptions {
        follow_symlinks: options.follow_symlinks,
        ignored: options.ignored.clone(),
    };

    let (tx, rx) = crossbeam_channel::bounded::<Vec<IndexEntry>>(workers * 4);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("index-crawl-{}", i))
        .build()
        .map_err(|e| AppError::Init(format!("crawl pool: {}", e)))?;

    let written = std::thread::scope(|scope| {
        let writer = scope.spawn(move || -> Result<usize, AppError> {
            let mut buffer: Vec<IndexEntry> = Vec::with_capacity(batch_size);
            let mut written = 0;
            for entries in rx {
                buffer.extend(entries);
                if buffer.len() >= batch_size {
                    index.upsert_entries(&buffer)?;
                    written += buffer.len();
                    debug!("Index writer flushed {} entries", buffer.len());
                    buffer.clear();
                }
            }
            if !buffer.is_empty() {
                index.upsert_entries(&buffer)?;
                written += buffer.len();
            }
            Ok(written)
        });

        pool.install(|| {
            let sink = |entries: Vec<IndexEntry>| {
                // The writer only hangs up after a failed write, reported below
                let _ = tx.send(entries);
            };
            app_fs::crawl(&root, &crawl_options, &sink);
        });
        drop(tx);

        writer
            .join()
            .unwrap_or_else(|_| Err(AppError::Storage("index writer panicked".into())))
    })?;

    let removed = index.remove_unseen()?;
    let report = IndexReport {
        entries: written + 1,
        removed,
        elapsed: started.elapsed(),
    };

    info!(
        "Indexed {} entries, removed {} in {:?}",
        report.entries, report.removed, report.elapsed
    );
    Ok(report)
}
