//! Leaf-directory scanner
//!
//! Walks a library root and reports every folder that directly holds media.
//! Unreadable subtrees are logged and skipped; only an unusable root is an
//! error.

use crate::browser::is_hidden_file;
use crate::walk::walk;
use crate::{natural_cmp, FsError, LeafDirectory, ListOptions, MediaKind, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Scan `root` and return its leaf directories sorted by display path
pub fn scan_leaves<P: AsRef<Path>>(root: P, options: &ListOptions) -> Result<Vec<LeafDirectory>> {
    let root = root.as_ref();
    let metadata = fs::metadata(root).map_err(|e| FsError::from_io(e, root))?;
    if !metadata.is_dir() {
        return Err(FsError::InvalidPath(format!("Not a directory: {}", root.display())));
    }

    // Check readability so a root we cannot open is reported rather than swallowed
    fs::read_dir(root).map_err(|e| FsError::from_io(e, root))?;

    let visible = |entry: &walkdir::DirEntry| {
        options.show_hidden || !is_hidden_file(entry.path(), &entry.file_name().to_string_lossy())
    };

    // With links unfollowed a linked file reports as a symlink, not a file
    let mut counts: HashMap<PathBuf, usize> = HashMap::new();
    for entry in walk(root, options.follow_symlinks, visible) {
        if !entry.file_type().is_file() || !MediaKind::from_path(entry.path()).is_media() {
            continue;
        }
        if let Some(dir) = entry.path().parent() {
            *counts.entry(dir.to_path_buf()).or_default() += 1;
        }
    }

    let mut leaves: Vec<LeafDirectory> = counts
        .into_iter()
        .map(|(dir, count)| {
            let display = relative_display(root, &dir);
            LeafDirectory::new(dir, display, count)
        })
        .collect();
    leaves.sort_by(|a, b| natural_cmp(&a.display_path, &b.display_path));

    tracing::info!(root = %root.display(), leaves = leaves.len(), "Scan complete");
    Ok(leaves)
}

/// `dir` relative to `root` with `/` separators, `.` for the root itself
pub(crate) fn relative_display(root: &Path, dir: &Path) -> String {
    match dir.strip_prefix(root) {
        Ok(rel) if rel.as_os_str().is_empty() => ".".to_string(),
        Ok(rel) => rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/"),
        Err(_) => dir.to_string_lossy().into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"x").unwrap();
    }

    #[test]
    fn test_finds_leaves_at_any_depth() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("cover.jpg"));
        touch(&root.join("Beach Trip/1.jpg"));
        touch(&root.join("Beach Trip/2.mp4"));
        touch(&root.join("2023/Mountain Trip/a.png"));
        touch(&root.join("docs/readme.txt"));

        let leaves = scan_leaves(root, &ListOptions::default()).unwrap();
        let shown: Vec<_> = leaves
            .iter()
            .map(|l| (l.display_path.as_str(), l.media_file_count))
            .collect();

        assert_eq!(
            shown,
            vec![("2023/Mountain Trip", 1), (".", 1), ("Beach Trip", 2)]
        );
        assert_eq!(leaves[2].path, root.join("Beach Trip"));
    }

    #[test]
    fn test_hidden_folders_skipped() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join(".cache/thumb.jpg"));
        touch(&dir.path().join("Visible/a.jpg"));

        let leaves = scan_leaves(dir.path(), &ListOptions::default()).unwrap();
        assert_eq!(leaves.len(), 1);

        let all = ListOptions { show_hidden: true, ..Default::default() };
        assert_eq!(scan_leaves(dir.path(), &all).unwrap().len(), 2);
    }

    #[test]
    fn test_missing_root_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = scan_leaves(dir.path().join("missing"), &ListOptions::default());
        assert!(matches!(result, Err(FsError::NotFound(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_link_cycle_yields_each_leaf_once() {
        use std::os::unix::fs::symlink;

        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        touch(&root.join("Beach/a.jpg"));
        fs::create_dir(root.join("Other")).unwrap();
        symlink(root.join("Other"), root.join("Beach/link")).unwrap();
        symlink(root.join("Beach"), root.join("Other/link")).unwrap();

        let follow = ListOptions { follow_symlinks: true, ..Default::default() };
        let leaves = scan_leaves(&root, &follow).unwrap();
        let shown: Vec<_> = leaves.iter().map(|l| l.display_path.as_str()).collect();
        assert_eq!(shown, vec!["Beach"]);
        assert_eq!(leaves[0].media_file_count, 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_linked_library_outside_root() {
        use std::os::unix::fs::symlink;

        let outside = tempfile::tempdir().unwrap();
        touch(&outside.path().join("Snow Day/s.jpg"));
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("Local/l.jpg"));
        symlink(outside.path(), dir.path().join("linked")).unwrap();

        let shown = |options: &ListOptions| -> Vec<String> {
            scan_leaves(dir.path(), options)
                .unwrap()
                .into_iter()
                .map(|l| l.display_path)
                .collect()
        };
        assert_eq!(shown(&ListOptions::default()), vec!["Local"]);

        let follow = ListOptions { follow_symlinks: true, ..Default::default() };
        assert_eq!(shown(&follow), vec!["linked/Snow Day", "Local"]);
    }

    #[test]
    fn test_relative_display() {
        let root = Path::new("/lib");
        assert_eq!(relative_display(root, Path::new("/lib")), ".");
        assert_eq!(relative_display(root, Path::new("/lib/a/b")), "a/b");
    }
}
