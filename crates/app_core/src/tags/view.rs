//! Search + sort projection of the derived tags

use super::Tag;
use app_fs::natural_cmp;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagSortMode {
    #[default]
    Alphabetical,
    Frequency,
}

/// Tags matching `query`, in display order.
///
/// Star tags always lead. Frequency mode then orders by descending count,
/// alphabetical mode by label only; ties in either mode fall back to the
/// alphabetical order, which puts Latin-initial labels first and compares
/// case-insensitively with numbers by value.
pub fn renderable_tags(all: &[Tag], query: &str, sort: TagSortMode) -> Vec<Tag> {
    let needle = query.to_lowercase();

    let mut visible: Vec<Tag> = all
        .iter()
        .filter(|tag| {
            needle.is_empty()
                || tag.label.to_lowercase().contains(&needle)
                || tag.id.to_lowercase().contains(&needle)
        })
        .cloned()
        .collect();

    visible.sort_by(|a, b| compare(a, b, sort));
    visible
}

fn compare(a: &Tag, b: &Tag, sort: TagSortMode) -> Ordering {
    b.is_star().cmp(&a.is_star()).then_with(|| match sort {
        TagSortMode::Frequency => b.count.cmp(&a.count).then_with(|| alphabetical(a, b)),
        TagSortMode::Alphabetical => alphabetical(a, b),
    })
}

fn alphabetical(a: &Tag, b: &Tag) -> Ordering {
    let latin_a = starts_latin(&a.label);
    let latin_b = starts_latin(&b.label);

    latin_b
        .cmp(&latin_a)
        .then_with(|| natural_cmp(&a.label, &b.label))
        .then_with(|| a.id.cmp(&b.id))
}

fn starts_latin(label: &str) -> bool {
    label.chars().next().map_or(false, |c| {
        c.is_ascii_alphabetic() || (c.is_alphabetic() && ('\u{00C0}'..='\u{024F}').contains(&c))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags::tag_label;

    fn tag(id: &str, count: usize) -> Tag {
        Tag {
            id: id.to_string(),
            label: tag_label(id),
            count,
        }
    }

    fn ids(tags: &[Tag]) -> Vec<&str> {
        tags.iter().map(|t| t.id.as_str()).collect()
    }

    fn sample() -> Vec<Tag> {
        vec![
            tag("item10", 2),
            tag("旅行", 9),
            tag("beach", 3),
            tag("⭐", 2),
            tag("item2", 5),
            tag("Zebra", 3),
        ]
    }

    #[test]
    fn test_alphabetical() {
        let sorted = renderable_tags(&sample(), "", TagSortMode::Alphabetical);
        assert_eq!(ids(&sorted), vec!["⭐", "beach", "item2", "item10", "Zebra", "旅行"]);
    }

    #[test]
    fn test_frequency() {
        let sorted = renderable_tags(&sample(), "", TagSortMode::Frequency);
        assert_eq!(ids(&sorted), vec!["⭐", "旅行", "item2", "beach", "Zebra", "item10"]);
    }

    #[test]
    fn test_query_matches_label_or_id() {
        let sorted = renderable_tags(&sample(), "ITEM", TagSortMode::Alphabetical);
        assert_eq!(ids(&sorted), vec!["item2", "item10"]);

        // Plain substring match: surrounding spaces are part of the needle
        assert!(renderable_tags(&sample(), " item", TagSortMode::Alphabetical).is_empty());

        let cjk = renderable_tags(&sample(), "旅", TagSortMode::Alphabetical);
        assert_eq!(ids(&cjk), vec!["旅行"]);

        assert!(renderable_tags(&sample(), "nothing", TagSortMode::Frequency).is_empty());
    }
}
