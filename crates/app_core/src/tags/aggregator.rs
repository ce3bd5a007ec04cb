//! Keyword counting across a leaf set, and tag promotion

use super::tokenizer::{is_cjk, is_star_token, tokenize};
use super::ExcludedTagSet;
use app_fs::LeafDirectory;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// A keyword needs this many distinct directories to become a tag
pub const MIN_TAG_OCCURRENCE: usize = 2;

/// A keyword promoted to a filter category
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tag {
    /// The keyword itself; tags compare by id
    pub id: String,
    pub label: String,
    /// Distinct leaf directories whose name contains the keyword
    pub count: usize,
}

impl Tag {
    pub fn is_star(&self) -> bool {
        is_star_token(&self.id)
    }
}

/// Everything derived from one leaf set + exclusion set
#[derive(Debug, Clone, Default)]
pub struct TagIndex {
    /// Promoted tags, ordered by id
    pub tags: Vec<Tag>,
    /// Keywords of every leaf, excluded ones included
    pub keyword_index: HashMap<PathBuf, HashSet<String>>,
    /// Matching directories per promoted tag, in leaf order
    pub directories: HashMap<String, Vec<PathBuf>>,
}

impl TagIndex {
    pub fn tag(&self, id: &str) -> Option<&Tag> {
        self.tags.iter().find(|t| t.id == id)
    }

    pub fn label(&self, id: &str) -> Option<&str> {
        self.tag(id).map(|t| t.label.as_str())
    }

    pub fn directories_for(&self, id: &str) -> &[PathBuf] {
        self.directories.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn keywords_for(&self, path: &Path) -> Option<&HashSet<String>> {
        self.keyword_index.get(path)
    }
}

/// Recompute tags from scratch.
///
/// Each directory counts at most once per keyword, and a repeated path in
/// `leaves` is only counted the first time. Excluded keywords still appear in
/// `keyword_index` but never become tags.
pub fn derive_tags(leaves: &[LeafDirectory], excluded: &ExcludedTagSet) -> TagIndex {
    let mut keyword_index: HashMap<PathBuf, HashSet<String>> = HashMap::with_capacity(leaves.len());
    let mut matches: HashMap<String, Vec<PathBuf>> = HashMap::new();

    for leaf in leaves {
        if keyword_index.contains_key(&leaf.path) {
            continue;
        }

        let keywords = leaf.name().map(tokenize).unwrap_or_default();
        for keyword in &keywords {
            if excluded.contains(keyword) {
                continue;
            }
            matches.entry(keyword.clone()).or_default().push(leaf.path.clone());
        }
        keyword_index.insert(leaf.path.clone(), keywords);
    }

    matches.retain(|_, dirs| dirs.len() >= MIN_TAG_OCCURRENCE);

    let mut tags: Vec<Tag> = matches
        .iter()
        .map(|(id, dirs)| Tag {
            id: id.clone(),
            label: tag_label(id),
            count: dirs.len(),
        })
        .collect();
    tags.sort_by(|a, b| a.id.cmp(&b.id));

    tracing::debug!(
        leaves = leaves.len(),
        tags = tags.len(),
        excluded = excluded.len(),
        "Tags derived"
    );

    TagIndex {
        tags,
        keyword_index,
        directories: matches,
    }
}

/// Display form of a keyword: word-initial letters uppercased, except for
/// CJK-only and star tokens which pass through untouched
pub fn tag_label(keyword: &str) -> String {
    if is_star_token(keyword) || (!keyword.is_empty() && keyword.chars().all(is_cjk)) {
        return keyword.to_string();
    }

    let mut label = String::with_capacity(keyword.len());
    let mut word_start = true;
    for c in keyword.chars() {
        if word_start {
            label.extend(c.to_uppercase());
        } else {
            label.push(c);
        }
        word_start = c.is_whitespace() || c == '-' || c == '_';
    }
    label
}
