/*!
 * ASS rendering and restyling.
 *
 * A document gets one style profile, chosen from the script of its whole
 * text. In multi-line captions, lines written in a different script than the
 * first line are tagged with the secondary style (English or Japanese).
 */

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::app_config::Config;
use crate::ass::{AssDocument, AssEvent, AssStyle, LINE_BREAK};
use crate::errors::SubtitleError;
use crate::script_classifier::{ScriptClass, has_japanese, is_english_only};
use crate::subtitle_processor::Track;

static OPEN_TAG_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<([ubi])>").expect("Invalid open tag regex"));

static CLOSE_TAG_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)</([ubi])>").expect("Invalid close tag regex"));

static FONT_COLOR_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<font\s[^>]*color\s*=\s*["']?#([0-9a-f]{2})([0-9a-f]{2})([0-9a-f]{2})["']?[^>]*>"#)
        .expect("Invalid font color regex")
});

static FONT_TAG_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)</?font[^>]*>").expect("Invalid font tag regex"));

static OVERRIDE_BLOCK_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([^}]*)\}").expect("Invalid override block regex"));

/// Override tags this module applies and therefore removes before restyling
const APPLIED_TAG_PREFIXES: &[&str] = &["r", "fn", "fs", "blur", "1c"];

/// Which style row a line is rendered with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleRole {
    Default,
    SecondaryEnglish,
    SecondaryJapanese,
}

impl StyleRole {
    pub fn style_name(self) -> &'static str {
        match self {
            Self::Default => "Default",
            Self::SecondaryEnglish => "ENG",
            Self::SecondaryJapanese => "JPN",
        }
    }
}

/// Profile picked once per document; only the `Default` row varies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleProfile {
    Cjk,
    English,
    Japanese,
}

impl StyleProfile {
    /// Choose a profile from the document's whole text
    pub fn select(text: &str, english_only: bool) -> Self {
        if english_only || is_english_only(text) {
            StyleProfile::English
        } else if has_japanese(text) {
            StyleProfile::Japanese
        } else {
            StyleProfile::Cjk
        }
    }
}

/// Parsed style rows and override tags
#[derive(Debug, Clone, PartialEq)]
pub struct StyleBook {
    cjk: AssStyle,
    english: AssStyle,
    japanese: AssStyle,
    secondary_english: AssStyle,
    secondary_japanese: AssStyle,
    english_tag: String,
    japanese_tag: String,
    english_only: bool,
}

impl StyleBook {
    pub fn from_config(config: &Config) -> Result<Self, SubtitleError> {
        let styles = &config.styles;
        Ok(Self {
            cjk: styles.cjk.parse()?,
            english: styles.english.parse()?,
            japanese: styles.japanese.parse()?,
            secondary_english: styles.secondary_english.parse()?,
            secondary_japanese: styles.secondary_japanese.parse()?,
            english_tag: styles.english_tag.clone(),
            japanese_tag: styles.japanese_tag.clone(),
            english_only: config.english_only,
        })
    }

    /// The three rows of a profile, `Default` first
    pub fn styles_for(&self, profile: StyleProfile) -> Vec<AssStyle> {
        let default = match profile {
            StyleProfile::Cjk => &self.cjk,
            StyleProfile::English => &self.english,
            StyleProfile::Japanese => &self.japanese,
        };
        vec![default.clone(), self.secondary_english.clone(), self.secondary_japanese.clone()]
    }

    pub fn tag_for(&self, role: StyleRole) -> &str {
        match role {
            StyleRole::Default => "",
            StyleRole::SecondaryEnglish => &self.english_tag,
            StyleRole::SecondaryJapanese => &self.japanese_tag,
        }
    }
}

/// Translate SRT inline markup (`<b>`, `<i>`, `<u>`, `<font color>`) into ASS overrides.
/// Other `<font>` attributes are dropped.
pub fn translate_markup(line: &str) -> String {
    let line = OPEN_TAG_REGEX.replace_all(line, |caps: &Captures| format!("{{\\{}1}}", caps[1].to_ascii_lowercase()));
    let line = CLOSE_TAG_REGEX.replace_all(&line, |caps: &Captures| format!("{{\\{}0}}", caps[1].to_ascii_lowercase()));
    let line = FONT_COLOR_REGEX.replace_all(&line, |caps: &Captures| {
        format!(
            "{{\\c&H{}{}{}&}}",
            caps[3].to_ascii_uppercase(),
            caps[2].to_ascii_uppercase(),
            caps[1].to_ascii_uppercase()
        )
    });
    FONT_TAG_REGEX.replace_all(&line, "").into_owned()
}

/// Remove override blocks made only of styling tags this module applies
/// (`\r`, `\fn`, `\fs*`, `\blur`, `\1c`). Mixed blocks and comments stay.
pub fn strip_applied_overrides(text: &str) -> String {
    OVERRIDE_BLOCK_REGEX
        .replace_all(text, |caps: &Captures| {
            let tags: Vec<&str> = caps[1].split('\\').skip(1).map(str::trim).collect();
            let applied = !tags.is_empty()
                && tags
                    .iter()
                    .all(|tag| APPLIED_TAG_PREFIXES.iter().any(|prefix| tag.starts_with(prefix)));
            if applied { String::new() } else { caps[0].to_string() }
        })
        .into_owned()
}

/// Builds ASS documents from tracks and restyles existing ones
#[derive(Debug, Clone)]
pub struct AssRenderer {
    book: StyleBook,
}

impl AssRenderer {
    pub fn new(book: StyleBook) -> Self {
        Self { book }
    }

    pub fn from_config(config: &Config) -> Result<Self, SubtitleError> {
        Ok(Self::new(StyleBook::from_config(config)?))
    }

    /// Render a track. Every caption becomes one `Default` event.
    pub fn render(&self, track: &Track) -> AssDocument {
        let captions: Vec<(u64, u64, Vec<String>)> = track
            .captions()
            .iter()
            .map(|caption| {
                let lines = caption
                    .lines()
                    .iter()
                    .flat_map(|line| line.split('\n'))
                    .flat_map(|line| line.split(LINE_BREAK))
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(translate_markup)
                    .collect();
                (caption.begin_ms(), caption.end_ms(), lines)
            })
            .collect();

        let profile = StyleProfile::select(&track.text(), self.book.english_only);
        let role = secondary_role(captions.iter().map(|(_, _, lines)| lines.as_slice()));

        let events = captions
            .into_iter()
            .map(|(begin, end, lines)| AssEvent::new(begin, end, self.wrap_lines(&lines, role)))
            .collect();

        AssDocument::new(self.book.styles_for(profile), events)
    }

    /// Replace the style table, reset every event to `Default` and re-tag
    /// secondary lines. Restyling twice gives the same document.
    pub fn restyle(&self, mut doc: AssDocument) -> AssDocument {
        let stripped: Vec<Vec<String>> = doc
            .events
            .iter()
            .map(|event| {
                strip_applied_overrides(&event.text)
                    .split(LINE_BREAK)
                    .map(str::to_string)
                    .collect()
            })
            .collect();

        let full_text: String = stripped.iter().flatten().map(String::as_str).collect();
        let profile = StyleProfile::select(&full_text, self.book.english_only);
        let role = secondary_role(stripped.iter().map(Vec::as_slice));

        for (event, lines) in doc.events.iter_mut().zip(stripped) {
            event.style = StyleRole::Default.style_name().to_string();
            event.text = self.wrap_lines(&lines, role);
        }
        doc.styles = self.book.styles_for(profile);
        doc
    }

    fn wrap_lines(&self, lines: &[String], role: StyleRole) -> String {
        let Some(first) = lines.first() else {
            return String::new();
        };
        let first_class = ScriptClass::of(first);
        let tag = self.book.tag_for(role);

        let mut wrapped = Vec::with_capacity(lines.len());
        wrapped.push(first.clone());
        for line in &lines[1..] {
            if ScriptClass::of(line).differs_from(first_class) {
                wrapped.push(format!("{}{}", tag, line));
            } else {
                wrapped.push(line.clone());
            }
        }
        wrapped.join(LINE_BREAK)
    }
}

/// Japanese if any second-or-later line of a multi-line caption has kana
fn secondary_role<'a>(captions: impl Iterator<Item = &'a [String]>) -> StyleRole {
    let japanese = captions
        .filter(|lines| lines.len() > 1)
        .flat_map(|lines| &lines[1..])
        .any(|line| has_japanese(line));
    if japanese {
        StyleRole::SecondaryJapanese
    } else {
        StyleRole::SecondaryEnglish
    }
}
