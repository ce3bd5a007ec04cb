//! Folder-name tags
//!
//! Keywords are pulled out of leaf folder names, counted across the whole
//! library, and promoted to tags once they recur. Nothing here is stored;
//! tags are recomputed from the current leaf set and exclusion list.

mod tokenizer;
mod aggregator;
mod view;
mod exclusion;

pub use tokenizer::{tokenize, is_star_token, STAR};
pub use aggregator::{derive_tags, tag_label, Tag, TagIndex, MIN_TAG_OCCURRENCE};
pub use view::{renderable_tags, TagSortMode};
pub use exclusion::{
    normalize_keyword, ExcludedTagSet, ExclusionList, ExclusionStore, MemoryExclusionStore,
};
