//! Media classification and the entry types shared with the core

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::path::{Path, PathBuf};

const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "webp", "bmp", "ico", "tiff", "tif", "heic", "heif", "avif",
];

const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "m4v", "mov", "mkv", "webm", "avi", "wmv", "flv", "3gp",
];

/// What a file is, as far as the browser cares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Other,
}

impl MediaKind {
    /// Classify a path by its (case-insensitive) extension
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        let ext = path
            .as_ref()
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            MediaKind::Image
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            MediaKind::Video
        } else {
            MediaKind::Other
        }
    }

    /// Images and videos are media; everything else is ignored by the browser
    pub fn is_media(self) -> bool {
        !matches!(self, MediaKind::Other)
    }
}

/// A folder that directly holds media files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeafDirectory {
    /// Absolute path, unique within one scan
    pub path: PathBuf,
    /// Path relative to the scan root, `.` for the root itself
    pub display_path: String,
    /// Media files seen at scan time
    pub media_file_count: usize,
}

impl LeafDirectory {
    pub fn new(path: impl Into<PathBuf>, display_path: impl Into<String>, media_file_count: usize) -> Self {
        Self {
            path: path.into(),
            display_path: display_path.into(),
            media_file_count,
        }
    }

    /// Final segment of the display path, falling back to the folder name for the root
    pub fn name(&self) -> Option<&str> {
        let segment = self
            .display_path
            .rsplit(['/', '\\'])
            .find(|s| !s.is_empty());

        match segment {
            Some(".") | None => self.path.file_name().and_then(|n| n.to_str()),
            Some(s) => Some(s),
        }
    }
}

/// One viewable file inside a leaf directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaEntry {
    pub name: String,
    pub path: PathBuf,
    pub file_url: String,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f32>,
}

impl MediaEntry {
    pub fn from_path(path: &Path) -> Self {
        Self {
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            path: path.to_path_buf(),
            file_url: file_url(path),
            kind: MediaKind::from_path(path),
            rating: None,
        }
    }
}

/// Build a `file://` URL, percent-encoding each path segment
pub fn file_url(path: &Path) -> String {
    let raw = path.to_string_lossy().replace('\\', "/");
    let encoded = raw
        .split('/')
        .enumerate()
        .map(|(i, segment)| {
            // Keep a leading "C:" drive readable
            if i == 0 && is_drive(segment) {
                Cow::Borrowed(segment)
            } else {
                urlencoding::encode(segment)
            }
        })
        .collect::<Vec<_>>()
        .join("/");

    if encoded.starts_with('/') {
        format!("file://{}", encoded)
    } else {
        format!("file:///{}", encoded)
    }
}

/// Inverse of [`file_url`]; `None` for anything that is not a `file://` URL
/// or does not decode to UTF-8
pub fn path_from_file_url(url: &str) -> Option<PathBuf> {
    let encoded = url.strip_prefix("file://")?;
    let decoded = urlencoding::decode(encoded).ok()?;

    // "/C:/x" on Windows
    let path = match decoded.strip_prefix('/') {
        Some(rest) if rest.split('/').next().is_some_and(is_drive) => rest,
        _ => &*decoded,
    };
    Some(PathBuf::from(path))
}

fn is_drive(segment: &str) -> bool {
    let bytes = segment.as_bytes();
    bytes.len() == 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}
