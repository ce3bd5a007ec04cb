//! Folder name → keyword set

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// Reserved marker glyph; runs of it flag favourites and survive every filter
pub const STAR: char = '⭐';

/// Emoji presentation selector that often trails the star glyph
const VARIATION_SELECTOR_16: char = '\u{FE0F}';

/// Numbered-section noise: "vol", "vol2", "part", "no3", ...
static NUMBERED_SECTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:vol|part|no)\d*$").expect("numbered-section pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Run {
    Star,
    Word,
}

/// Split a folder name into its normalized keywords.
///
/// Star runs are kept verbatim. Letter/digit runs are lowercased and then
/// dropped if purely numeric, a numbered-section marker, or a single char.
pub fn tokenize(name: &str) -> HashSet<String> {
    let mut keywords = HashSet::new();
    let mut run = String::new();
    let mut kind: Option<Run> = None;

    for c in name.chars() {
        let next = if c == STAR {
            Some(Run::Star)
        } else if c == VARIATION_SELECTOR_16 && kind == Some(Run::Star) {
            // Part of the glyph, not of the token
            continue;
        } else if c.is_alphanumeric() {
            Some(Run::Word)
        } else {
            None
        };

        if next != kind {
            flush(&mut run, kind, &mut keywords);
            kind = next;
        }
        if next.is_some() {
            run.push(c);
        }
    }
    flush(&mut run, kind, &mut keywords);

    keywords
}

fn flush(run: &mut String, kind: Option<Run>, keywords: &mut HashSet<String>) {
    if run.is_empty() {
        return;
    }

    match kind {
        Some(Run::Star) => {
            keywords.insert(std::mem::take(run));
        }
        Some(Run::Word) => {
            let word = run.to_lowercase();
            run.clear();
            if is_significant(&word) {
                keywords.insert(word);
            }
        }
        None => run.clear(),
    }
}

fn is_significant(word: &str) -> bool {
    if word.chars().all(char::is_numeric) {
        return false;
    }
    if NUMBERED_SECTION.is_match(word) {
        return false;
    }
    word.chars().count() > 1
}

/// True for a non-empty run made only of the star glyph
pub fn is_star_token(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| c == STAR)
}

/// Han, kana, Hangul and their compatibility blocks
pub(crate) fn is_cjk(c: char) -> bool {
    matches!(c as u32,
        0x3040..=0x30FF
        | 0x3100..=0x312F
        | 0x31F0..=0x31FF
        | 0x3400..=0x4DBF
        | 0x4E00..=0x9FFF
        | 0xAC00..=0xD7AF
        | 0xF900..=0xFAFF
        | 0x20000..=0x2FA1F)
}
