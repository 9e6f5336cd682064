/*!
 * Script and language heuristics over arbitrary text.
 *
 * Used to decide which of two tracks drives the merged timeline and which
 * style profile a document gets. Everything here is a pure function.
 */

use once_cell::sync::Lazy;
use regex::Regex;

/// ASS override blocks (`{\...}`) carry no script information
static OVERRIDE_BLOCK_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{[^}]*\}").expect("Invalid override block regex"));

/// Whether `c` is a CJK Unified Ideograph
pub fn is_cjk_ideograph(c: char) -> bool {
    ('\u{4E00}'..='\u{9FFF}').contains(&c)
}

/// Whether `c` is Hiragana or Katakana
pub fn is_kana(c: char) -> bool {
    ('\u{3040}'..='\u{30FF}').contains(&c)
}

/// Number of CJK ideographs in `text`
pub fn cjk_count(text: &str) -> usize {
    text.chars().filter(|c| is_cjk_ideograph(*c)).count()
}

/// Whether `text` has at least one CJK ideograph
pub fn contains_cjk(text: &str) -> bool {
    text.chars().any(is_cjk_ideograph)
}

/// Share of CJK ideographs in `text`, over `char_count + 1`.
///
/// The `+ 1` keeps empty input at zero and slightly favours "not CJK" on
/// short input; it is applied the same way everywhere so ties stay stable.
pub fn cjk_fraction(text: &str) -> f64 {
    let (total, cjk) = text.chars().fold((0usize, 0usize), |(total, cjk), c| {
        (total + 1, cjk + usize::from(is_cjk_ideograph(c)))
    });
    cjk as f64 / (total + 1) as f64
}

/// Whether `text` contains any Hiragana/Katakana
pub fn has_japanese(text: &str) -> bool {
    text.chars().any(is_kana)
}

/// Whether every letter in `text` is Latin-adjacent. Digits, punctuation
/// and symbols such as music notes are ignored.
pub fn is_english_only(text: &str) -> bool {
    text.chars().filter(|c| c.is_alphabetic()).all(is_latin_adjacent)
}

fn is_latin_adjacent(c: char) -> bool {
    c <= '\u{024F}' || ('\u{1E00}'..='\u{1EFF}').contains(&c)
}

/// Dominant script of a single line of text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptClass {
    /// Contains kana
    Japanese,
    /// Contains ideographs but no kana
    Chinese,
    /// Letters, all Latin-adjacent
    Latin,
    /// Letters from some other script (Hangul, Cyrillic, ...)
    Other,
    /// No letters at all: digits, punctuation, music notes
    Neutral,
}

impl ScriptClass {
    /// Classify one line, ignoring ASS override blocks
    pub fn of(line: &str) -> Self {
        let text = OVERRIDE_BLOCK_REGEX.replace_all(line, "");
        if has_japanese(&text) {
            ScriptClass::Japanese
        } else if contains_cjk(&text) {
            ScriptClass::Chinese
        } else if !text.chars().any(char::is_alphabetic) {
            ScriptClass::Neutral
        } else if is_english_only(&text) {
            ScriptClass::Latin
        } else {
            ScriptClass::Other
        }
    }

    /// Whether two lines are in different scripts. Neutral lines differ from nothing.
    pub fn differs_from(self, other: ScriptClass) -> bool {
        self != other && self != ScriptClass::Neutral && other != ScriptClass::Neutral
    }
}
