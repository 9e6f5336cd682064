/*!
 * Structured ASS (Advanced SubStation Alpha) documents.
 *
 * Documents are parsed into script info lines, `Style:` rows and `Dialogue:`
 * events, mutated as values, and serialized back through `Display`. Other
 * sections (`[Fonts]`, `[Graphics]`) and `Comment:` events are not carried.
 */

use std::fmt;
use std::str::FromStr;

use log::{debug, error};

use crate::errors::SubtitleError;
use crate::timecode::{Timestamp, format_ass};

/// Line-break marker inside event text
pub const LINE_BREAK: &str = "\\N";

const STYLE_FORMAT: &str = "Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding";
const EVENT_FORMAT: &str = "Format: Layer, Start, End, Style, Actor, MarginL, MarginR, MarginV, Effect, Text";
const STYLE_FIELD_COUNT: usize = 23;

/// One `Style:` row. Values are kept as text so unusual inputs pass through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssStyle {
    pub name: String,
    pub fontname: String,
    pub fontsize: String,
    pub primary_colour: String,
    pub secondary_colour: String,
    pub outline_colour: String,
    pub back_colour: String,
    pub bold: String,
    pub italic: String,
    pub underline: String,
    pub strike_out: String,
    pub scale_x: String,
    pub scale_y: String,
    pub spacing: String,
    pub angle: String,
    pub border_style: String,
    pub outline: String,
    pub shadow: String,
    pub alignment: String,
    pub margin_l: String,
    pub margin_r: String,
    pub margin_v: String,
    pub encoding: String,
}

impl FromStr for AssStyle {
    type Err = SubtitleError;

    /// Parse a row with or without its `Style:` prefix
    fn from_str(row: &str) -> Result<Self, Self::Err> {
        let body = row.trim();
        let body = body.strip_prefix("Style:").unwrap_or(body);
        let fields: Vec<String> = body.split(',').map(|f| f.trim().to_string()).collect();
        let Ok::<[String; STYLE_FIELD_COUNT], _>(fields) = fields.try_into() else {
            return Err(SubtitleError::MalformedStyle(row.to_string()));
        };
        let [
            name,
            fontname,
            fontsize,
            primary_colour,
            secondary_colour,
            outline_colour,
            back_colour,
            bold,
            italic,
            underline,
            strike_out,
            scale_x,
            scale_y,
            spacing,
            angle,
            border_style,
            outline,
            shadow,
            alignment,
            margin_l,
            margin_r,
            margin_v,
            encoding,
        ] = fields;
        if name.is_empty() {
            return Err(SubtitleError::MalformedStyle(row.to_string()));
        }

        Ok(Self {
            name,
            fontname,
            fontsize,
            primary_colour,
            secondary_colour,
            outline_colour,
            back_colour,
            bold,
            italic,
            underline,
            strike_out,
            scale_x,
            scale_y,
            spacing,
            angle,
            border_style,
            outline,
            shadow,
            alignment,
            margin_l,
            margin_r,
            margin_v,
            encoding,
        })
    }
}

impl fmt::Display for AssStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = [
            &self.name,
            &self.fontname,
            &self.fontsize,
            &self.primary_colour,
            &self.secondary_colour,
            &self.outline_colour,
            &self.back_colour,
            &self.bold,
            &self.italic,
            &self.underline,
            &self.strike_out,
            &self.scale_x,
            &self.scale_y,
            &self.spacing,
            &self.angle,
            &self.border_style,
            &self.outline,
            &self.shadow,
            &self.alignment,
            &self.margin_l,
            &self.margin_r,
            &self.margin_v,
            &self.encoding,
        ];
        write!(f, "Style: ")?;
        for (i, field) in fields.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            f.write_str(field)?;
        }
        Ok(())
    }
}

/// One `Dialogue:` event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssEvent {
    pub layer: String,
    pub start: Timestamp,
    pub end: Timestamp,
    pub style: String,
    pub actor: String,
    pub margin_l: String,
    pub margin_r: String,
    pub margin_v: String,
    pub effect: String,
    /// Free text; the only field that may contain commas
    pub text: String,
}

impl AssEvent {
    /// Event with the canonical defaults: layer 0, `Default` style, zero margins
    pub fn new(start_ms: u64, end_ms: u64, text: String) -> Self {
        Self {
            layer: "0".to_string(),
            start: Timestamp::from_ms(start_ms),
            end: Timestamp::from_ms(end_ms),
            style: "Default".to_string(),
            actor: String::new(),
            margin_l: "0".to_string(),
            margin_r: "0".to_string(),
            margin_v: "0".to_string(),
            effect: String::new(),
            text,
        }
    }

    /// Parse a `Dialogue:` line. `index` labels errors.
    pub fn parse(line: &str, index: usize) -> Result<Self, SubtitleError> {
        let malformed = |reason: &str| SubtitleError::MalformedBlock {
            index,
            reason: reason.to_string(),
        };

        let body = line
            .trim_start()
            .strip_prefix("Dialogue:")
            .ok_or_else(|| malformed("not a Dialogue line"))?;
        let mut fields = body.splitn(10, ',');
        let mut next = |name: &str| {
            fields
                .next()
                .map(|f| f.to_string())
                .ok_or_else(|| malformed(&format!("missing {} field", name)))
        };

        let layer = next("layer")?.trim().to_string();
        let start = Timestamp::parse(&next("start")?)?;
        let end = Timestamp::parse(&next("end")?)?;
        let style = next("style")?.trim().to_string();
        let actor = next("actor")?;
        let margin_l = next("marginL")?;
        let margin_r = next("marginR")?;
        let margin_v = next("marginV")?;
        let effect = next("effect")?;
        let text = next("text")?.trim_end_matches(['\r', '\n']).to_string();

        Ok(Self {
            layer,
            start,
            end,
            style,
            actor,
            margin_l,
            margin_r,
            margin_v,
            effect,
            text,
        })
    }

    /// Text split on the `\N` marker
    pub fn visual_lines(&self) -> Vec<&str> {
        self.text.split(LINE_BREAK).collect()
    }
}

impl fmt::Display for AssEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Dialogue: {},{},{},{},{},{},{},{},{},{}",
            self.layer,
            format_ass(self.start.ms),
            format_ass(self.end.ms),
            self.style,
            self.actor,
            self.margin_l,
            self.margin_r,
            self.margin_v,
            self.effect,
            self.text
        )
    }
}

/// Extract every `Dialogue:` event from ASS text, skipping malformed rows
pub fn parse_ass_events(content: &str) -> Vec<AssEvent> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| line.trim_start().starts_with("Dialogue:"))
        .filter_map(|(i, line)| match AssEvent::parse(line, i + 1) {
            Ok(event) => Some(event),
            Err(e) => {
                error!("Skipping ASS event: {}", e);
                None
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    ScriptInfo,
    Styles,
    Events,
    Other,
}

/// A whole ASS document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssDocument {
    /// `[Script Info]` lines, header excluded
    pub script_info: Vec<String>,
    pub styles: Vec<AssStyle>,
    pub events: Vec<AssEvent>,
}

impl AssDocument {
    /// A fresh document with the standard script info block
    pub fn new(styles: Vec<AssStyle>, events: Vec<AssEvent>) -> Self {
        Self {
            script_info: default_script_info(),
            styles,
            events,
        }
    }

    /// Parse ASS text. Malformed style rows and events are logged and skipped.
    pub fn parse(content: &str) -> Self {
        let mut section = Section::Other;
        let mut script_info = Vec::new();
        let mut styles = Vec::new();
        let mut events = Vec::new();

        for (i, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            if line.starts_with('[') && line.ends_with(']') {
                section = match line.to_ascii_lowercase().as_str() {
                    "[script info]" => Section::ScriptInfo,
                    "[v4+ styles]" | "[v4 styles]" | "[v4 styles+]" => Section::Styles,
                    "[events]" => Section::Events,
                    _ => Section::Other,
                };
                continue;
            }

            match section {
                Section::ScriptInfo => script_info.push(line.to_string()),
                Section::Styles if line.starts_with("Style:") => match line.parse::<AssStyle>() {
                    Ok(style) => styles.push(style),
                    Err(e) => error!("Skipping ASS style at line {}: {}", i + 1, e),
                },
                Section::Events if line.starts_with("Dialogue:") => match AssEvent::parse(line, i + 1) {
                    Ok(event) => events.push(event),
                    Err(e) => error!("Skipping ASS event: {}", e),
                },
                _ => {}
            }
        }

        if script_info.is_empty() {
            script_info = default_script_info();
        }
        debug!("Parsed ASS document: {} styles, {} events", styles.len(), events.len());

        Self {
            script_info,
            styles,
            events,
        }
    }

    /// Every event's text, concatenated
    pub fn text(&self) -> String {
        self.events.iter().map(|e| e.text.as_str()).collect()
    }
}

impl fmt::Display for AssDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[Script Info]")?;
        for line in &self.script_info {
            writeln!(f, "{}", line)?;
        }
        writeln!(f)?;
        writeln!(f, "[V4+ Styles]")?;
        writeln!(f, "{}", STYLE_FORMAT)?;
        for style in &self.styles {
            writeln!(f, "{}", style)?;
        }
        writeln!(f)?;
        writeln!(f, "[Events]")?;
        writeln!(f, "{}", EVENT_FORMAT)?;
        for event in &self.events {
            writeln!(f, "{}", event)?;
        }
        Ok(())
    }
}

fn default_script_info() -> Vec<String> {
    [
        "; Script generated by subtools",
        "ScriptType: v4.00+",
        "Collisions: Normal",
        "PlayDepth: 0",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
