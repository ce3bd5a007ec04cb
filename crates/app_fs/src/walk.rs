//! Recursive directory walk shared by the leaf scanner and the index crawl

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Walk `root` in file-name order, yielding every entry below it that `keep`
/// accepts. A rejected directory is not descended into.
///
/// Walk errors, symlink loops included, are logged and skipped.
pub(crate) fn walk<P>(root: &Path, follow_symlinks: bool, mut keep: P) -> impl Iterator<Item = DirEntry> + Send
where
    P: FnMut(&DirEntry) -> bool + Send,
{
    let mut guard = LinkGuard::new(root, follow_symlinks);

    WalkDir::new(root)
        .follow_links(follow_symlinks)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(move |entry| keep(entry) && guard.admit(entry))
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                log_walk_error(&err);
                None
            }
        })
}

fn log_walk_error(err: &walkdir::Error) {
    let path = err.path().map(|p| p.display().to_string()).unwrap_or_default();
    match err.loop_ancestor() {
        Some(ancestor) => tracing::debug!("Symlink loop at {} back to {}", path, ancestor.display()),
        None => tracing::warn!("Cannot access {}: {}", path, err),
    }
}

/// Keeps a followed walk from visiting one directory under several paths.
///
/// Links into the root are skipped because the real directory is walked on
/// its own. Links leading out of the root are walked once per target.
struct LinkGuard {
    root: Option<PathBuf>,
    seen: HashSet<PathBuf>,
}

impl LinkGuard {
    fn new(root: &Path, follow_symlinks: bool) -> Self {
        let root = follow_symlinks.then(|| root.canonicalize().unwrap_or_else(|_| root.to_path_buf()));
        Self {
            seen: root.iter().cloned().collect(),
            root,
        }
    }

    fn admit(&mut self, entry: &DirEntry) -> bool {
        let Some(root) = &self.root else {
            return true;
        };
        if !entry.file_type().is_dir() {
            return true;
        }

        let target = match entry.path().canonicalize() {
            Ok(target) => target,
            Err(e) => {
                tracing::warn!("Cannot resolve {}: {}", entry.path().display(), e);
                return false;
            }
        };

        if entry.path_is_symlink() && target.starts_with(root) {
            tracing::debug!("Skipping link back into the root at {}", entry.path().display());
            return false;
        }
        self.seen.insert(target)
    }
}
