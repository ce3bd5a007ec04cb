//! Directory listing - media files of one folder, in natural order, a page at a time

use crate::{FsError, MediaEntry, MediaKind, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

/// Options shared by listing and scanning
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub show_hidden: bool,
    pub follow_symlinks: bool,
}

/// One window of a directory's media files
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaPage {
    pub files: Vec<MediaEntry>,
    pub total: usize,
    pub next_offset: usize,
    /// Explicit continuation flag; when absent callers compare `next_offset` with `total`
    #[serde(default)]
    pub has_more: Option<bool>,
    /// Application-level failure reported instead of a page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// List the media files directly inside `path`, sorted naturally by name
pub fn list_media_files<P: AsRef<Path>>(path: P, options: &ListOptions) -> Result<Vec<PathBuf>> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(FsError::NotFound(path.display().to_string()));
    }

    if !path.is_dir() {
        return Err(FsError::InvalidPath(format!("Not a directory: {}", path.display())));
    }

    let mut files = Vec::new();

    for entry in fs::read_dir(path).map_err(|e| FsError::from_io(e, path))? {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::debug!("Skipping unreadable entry in {}: {}", path.display(), e);
                continue;
            }
        };

        let name = entry.file_name().to_string_lossy().into_owned();
        if !options.show_hidden && is_hidden_file(&entry.path(), &name) {
            continue;
        }

        if !is_regular_file(&entry, options.follow_symlinks) {
            continue;
        }

        if MediaKind::from_path(&name).is_media() {
            files.push(entry.path());
        }
    }

    files.sort_by(|a, b| natural_cmp(&file_name(a), &file_name(b)));
    Ok(files)
}

/// Return media files `[offset, offset + limit)` of `path`.
///
/// A `limit` of `None` or zero means "everything from `offset` on". Offsets past
/// the end produce an empty page with `has_more = Some(false)`.
pub fn list_media_page<P: AsRef<Path>>(
    path: P,
    offset: usize,
    limit: Option<usize>,
    options: &ListOptions,
) -> Result<MediaPage> {
    let all = list_media_files(path, options)?;
    let total = all.len();
    let start = offset.min(total);
    let end = match limit {
        Some(limit) if limit > 0 => start.saturating_add(limit).min(total),
        _ => total,
    };

    let files: Vec<MediaEntry> = all[start..end].iter().map(|p| MediaEntry::from_path(p)).collect();

    Ok(MediaPage {
        files,
        total,
        next_offset: end,
        has_more: Some(end < total),
        error: None,
    })
}

pub(crate) fn is_regular_file(entry: &fs::DirEntry, follow_symlinks: bool) -> bool {
    match entry.file_type() {
        Ok(ft) if ft.is_symlink() => follow_symlinks && entry.path().is_file(),
        Ok(ft) => ft.is_file(),
        Err(_) => false,
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Natural, case-insensitive string ordering: "image2" < "image10"
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    natural_sort_key(a)
        .cmp(&natural_sort_key(b))
        .then_with(|| a.cmp(b))
}

fn natural_sort_key(s: &str) -> Vec<NaturalSortPart> {
    let mut parts = Vec::new();
    let mut current_num = String::new();
    let mut current_str = String::new();

    for c in s.chars() {
        if c.is_ascii_digit() {
            if !current_str.is_empty() {
                parts.push(NaturalSortPart::Str(current_str.to_lowercase()));
                current_str.clear();
            }
            current_num.push(c);
        } else {
            if !current_num.is_empty() {
                parts.push(NaturalSortPart::num(&current_num));
                current_num.clear();
            }
            current_str.push(c);
        }
    }

    if !current_num.is_empty() {
        parts.push(NaturalSortPart::num(&current_num));
    }
    if !current_str.is_empty() {
        parts.push(NaturalSortPart::Str(current_str.to_lowercase()));
    }

    parts
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum NaturalSortPart {
    // Digits compare by value, then by length so "01" and "1" stay distinct
    Num(u128, usize),
    Str(String),
}

impl NaturalSortPart {
    fn num(digits: &str) -> Self {
        let trimmed = digits.trim_start_matches('0');
        let value = if trimmed.is_empty() {
            0
        } else {
            trimmed.parse().unwrap_or(u128::MAX)
        };
        NaturalSortPart::Num(value, digits.len())
    }
}

/// Check if a file is hidden
#[cfg(windows)]
pub(crate) fn is_hidden_file(path: &Path, _name: &str) -> bool {
    use std::os::windows::fs::MetadataExt;

    const FILE_ATTRIBUTE_HIDDEN: u32 = 0x2;

    fs::metadata(path)
        .map(|m| m.file_attributes() & FILE_ATTRIBUTE_HIDDEN != 0)
        .unwrap_or(false)
}

#[cfg(not(windows))]
pub(crate) fn is_hidden_file(_path: &Path, name: &str) -> bool {
    name.starts_with('.')
}
