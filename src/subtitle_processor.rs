use std::fmt;

use log::{debug, error};

use crate::errors::SubtitleError;
use crate::timecode::Timestamp;

// @module: Caption model and SRT parsing/writing

/// Join string for SRT text lines that feed the merge engine
pub const MERGE_JOIN: &str = " ";

/// Join string for SRT text lines that end up in an ASS event
pub const ASS_LINE_BREAK: &str = "\\N";

// @struct: One timed subtitle entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caption {
    // @field: Display start
    pub begin: Timestamp,

    // @field: Display end
    pub end: Timestamp,

    // @field: Text lines, top to bottom; never empty
    lines: Vec<String>,
}

impl Caption {
    // @creates: Validated caption
    // @validates: begin <= end and at least one line
    pub fn new(begin: Timestamp, end: Timestamp, lines: Vec<String>) -> Result<Self, SubtitleError> {
        if begin.ms > end.ms {
            return Err(SubtitleError::MalformedBlock {
                index: 0,
                reason: format!("end {} is before begin {}", end.text, begin.text),
            });
        }
        if lines.is_empty() {
            return Err(SubtitleError::MalformedBlock {
                index: 0,
                reason: "caption has no text".to_string(),
            });
        }
        Ok(Self { begin, end, lines })
    }

    /// Convenience constructor from millisecond offsets
    pub fn from_ms(begin_ms: u64, end_ms: u64, lines: Vec<String>) -> Result<Self, SubtitleError> {
        Self::new(Timestamp::from_ms(begin_ms), Timestamp::from_ms(end_ms), lines)
    }

    pub fn begin_ms(&self) -> u64 {
        self.begin.ms
    }

    pub fn end_ms(&self) -> u64 {
        self.end.ms
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Move another caption's text onto the end of this one. Timing is untouched.
    pub fn absorb(&mut self, other: Caption) {
        self.lines.extend(other.lines);
    }

    /// All lines concatenated without separators
    pub fn text(&self) -> String {
        self.lines.concat()
    }
}

impl fmt::Display for Caption {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{} --> {}", self.begin, self.end)?;
        for line in &self.lines {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

/// Ordered captions read from one source
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Track {
    captions: Vec<Caption>,
}

impl Track {
    /// Wrap captions that are already in source order
    pub fn from_captions(captions: Vec<Caption>) -> Self {
        Self { captions }
    }

    pub fn captions(&self) -> &[Caption] {
        &self.captions
    }

    pub fn into_captions(self) -> Vec<Caption> {
        self.captions
    }

    pub fn len(&self) -> usize {
        self.captions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.captions.is_empty()
    }

    /// Every line of every caption, concatenated
    pub fn text(&self) -> String {
        self.captions.iter().map(Caption::text).collect()
    }

    /// Render as SRT. Indices are recomputed; timestamps keep their source text.
    pub fn to_srt_string(&self) -> String {
        let mut output = String::new();
        for (index, caption) in self.captions.iter().enumerate() {
            output.push_str(&format!("{}\n{}\n", index + 1, caption));
        }
        output
    }

    /// Split a bilingual track: first lines go left, the remaining lines go right.
    ///
    /// Lines are split on `\n` as well, so a track parsed with a newline join
    /// splits the same way as one produced by the merge engine. Captions with
    /// a single line have no counterpart on the right.
    pub fn split_bilingual(&self) -> (Track, Track) {
        let mut first = Vec::with_capacity(self.captions.len());
        let mut second = Vec::new();

        for caption in &self.captions {
            let mut visual = caption
                .lines
                .iter()
                .flat_map(|line| line.split('\n'))
                .map(str::trim)
                .filter(|line| !line.is_empty());

            let Some(top) = visual.next() else { continue };
            let rest: Vec<String> = visual.map(str::to_string).collect();

            first.push(Caption {
                begin: caption.begin.clone(),
                end: caption.end.clone(),
                lines: vec![top.to_string()],
            });
            if !rest.is_empty() {
                second.push(Caption {
                    begin: caption.begin.clone(),
                    end: caption.end.clone(),
                    lines: vec![rest.join(" ")],
                });
            }
        }

        (Track::from_captions(first), Track::from_captions(second))
    }
}

/// Parse SRT text into a track.
///
/// Blocks are separated by blank lines. Each block may start with a numeric
/// index, must have a `begin --> end` line and at least one text line; the
/// text lines are joined with `join` into a single caption line. Blocks that
/// do not fit are logged and skipped.
pub fn parse_srt(content: &str, join: &str) -> Track {
    let (track, skipped) = parse_srt_lenient(content, join);
    for e in &skipped {
        error!("Skipping SRT block: {}", e);
    }
    track
}

/// Like `parse_srt`, but hands back the errors of the skipped blocks instead of logging them
pub fn parse_srt_lenient(content: &str, join: &str) -> (Track, Vec<SubtitleError>) {
    let normalized = content.replace("\r\n", "\n").replace('\r', "\n");
    let mut captions = Vec::new();
    let mut skipped = Vec::new();

    let mut block: Vec<&str> = Vec::new();
    let mut block_index = 0;
    for line in normalized.lines().chain(std::iter::once("")) {
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            block.push(trimmed);
            continue;
        }
        if block.is_empty() {
            continue;
        }

        block_index += 1;
        match parse_block(&block, block_index, join) {
            Ok(caption) => captions.push(caption),
            Err(e) => skipped.push(e),
        }
        block.clear();
    }

    debug!("Parsed {} captions from {} SRT blocks", captions.len(), block_index);
    (Track::from_captions(captions), skipped)
}

fn parse_block(block: &[&str], index: usize, join: &str) -> Result<Caption, SubtitleError> {
    let malformed = |reason: &str| SubtitleError::MalformedBlock {
        index,
        reason: reason.to_string(),
    };

    let mut lines = block.iter().copied().peekable();
    if lines.peek().is_some_and(|l| l.bytes().all(|b| b.is_ascii_digit())) {
        lines.next();
    }

    let timing = lines.next().ok_or_else(|| malformed("missing timecode line"))?;
    let (begin, end) = timing
        .split_once("-->")
        .ok_or_else(|| malformed(&format!("missing '-->' in {:?}", timing)))?;

    // Some files carry positioning after the end time ("X1:...").
    let end = end.split_whitespace().next().unwrap_or_default();
    let begin = Timestamp::parse(begin)?;
    let end = Timestamp::parse(end)?;

    let text: Vec<&str> = lines.collect();
    if text.is_empty() {
        return Err(malformed("no text lines"));
    }

    Caption::new(begin, end, vec![text.join(join)]).map_err(|e| match e {
        SubtitleError::MalformedBlock { reason, .. } => SubtitleError::MalformedBlock { index, reason },
        other => other,
    })
}
