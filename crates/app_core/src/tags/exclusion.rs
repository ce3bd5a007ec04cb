//! User-maintained list of keywords hidden from tag derivation

use super::tokenizer::is_star_token;
use crate::AppError;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Normalize a keyword the same way the tokenizer does: trimmed, and
/// lowercased unless it is a star run
pub fn normalize_keyword(keyword: &str) -> String {
    let trimmed = keyword.trim();
    if is_star_token(trimmed) {
        trimmed.to_string()
    } else {
        trimmed.to_lowercase()
    }
}

/// Set of normalized excluded keywords
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExcludedTagSet {
    keywords: BTreeSet<String>,
}

impl ExcludedTagSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_keywords<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        for keyword in keywords {
            set.insert(keyword.as_ref());
        }
        set
    }

    /// Returns true if the set changed
    pub fn insert(&mut self, keyword: &str) -> bool {
        let keyword = normalize_keyword(keyword);
        !keyword.is_empty() && self.keywords.insert(keyword)
    }

    /// Returns true if the set changed
    pub fn remove(&mut self, keyword: &str) -> bool {
        self.keywords.remove(&normalize_keyword(keyword))
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.keywords.contains(keyword) || self.keywords.contains(&normalize_keyword(keyword))
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keywords.iter().map(String::as_str)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.keywords.iter().cloned().collect()
    }
}

/// Where the exclusion list lives between runs
pub trait ExclusionStore: Send + Sync {
    fn load(&self) -> Result<Vec<String>, AppError>;
    fn save(&self, keywords: &[String]) -> Result<(), AppError>;
}

impl ExclusionStore for app_db::ExclusionDb {
    fn load(&self) -> Result<Vec<String>, AppError> {
        Ok(app_db::ExclusionDb::load(self)?)
    }

    fn save(&self, keywords: &[String]) -> Result<(), AppError> {
        Ok(app_db::ExclusionDb::save(self, keywords)?)
    }
}

/// Process-local store, for tests and for running without a database
#[derive(Debug, Default)]
pub struct MemoryExclusionStore {
    keywords: Mutex<Vec<String>>,
}

impl MemoryExclusionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_keywords(keywords: &[&str]) -> Self {
        Self {
            keywords: Mutex::new(keywords.iter().map(|k| k.to_string()).collect()),
        }
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.keywords.lock().clone()
    }
}

impl ExclusionStore for MemoryExclusionStore {
    fn load(&self) -> Result<Vec<String>, AppError> {
        Ok(self.snapshot())
    }

    fn save(&self, keywords: &[String]) -> Result<(), AppError> {
        *self.keywords.lock() = keywords.to_vec();
        Ok(())
    }
}

/// The exclusion set bound to its store; every effective change is saved
/// before it becomes visible
pub struct ExclusionList {
    set: ExcludedTagSet,
    store: Arc<dyn ExclusionStore>,
}

impl ExclusionList {
    /// Load the persisted list; a failing store starts empty
    pub fn load(store: Arc<dyn ExclusionStore>) -> Self {
        let set = match store.load() {
            Ok(keywords) => ExcludedTagSet::from_keywords(keywords),
            Err(e) => {
                tracing::warn!("Could not load excluded tags, starting empty: {}", e);
                ExcludedTagSet::new()
            }
        };
        Self { set, store }
    }

    pub fn set(&self) -> &ExcludedTagSet {
        &self.set
    }

    /// Exclude a keyword; `Ok(false)` when it already was
    pub fn add(&mut self, keyword: &str) -> Result<bool, AppError> {
        let mut next = self.set.clone();
        if !next.insert(keyword) {
            return Ok(false);
        }
        self.commit(next)
    }

    /// Stop excluding a keyword; `Ok(false)` when it was not excluded
    pub fn remove(&mut self, keyword: &str) -> Result<bool, AppError> {
        let mut next = self.set.clone();
        if !next.remove(keyword) {
            return Ok(false);
        }
        self.commit(next)
    }

    fn commit(&mut self, next: ExcludedTagSet) -> Result<bool, AppError> {
        self.store.save(&next.to_vec())?;
        tracing::info!(count = next.len(), "Excluded tags updated");
        self.set = next;
        Ok(true)
    }
}
