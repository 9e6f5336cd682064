/*!
 * Timecode codec.
 *
 * Parses `H+:MM:SS[.,]fff` timestamps into integer milliseconds and formats
 * them back in the SRT (`HH:MM:SS,mmm`) or ASS (`H:MM:SS.cc`) style.
 * Converting to ASS truncates to centiseconds, it never rounds.
 */

use std::fmt;

use crate::errors::SubtitleError;

const MS_PER_HOUR: u64 = 3_600_000;
const MS_PER_MINUTE: u64 = 60_000;
const MS_PER_SECOND: u64 = 1_000;

/// A display timestamp: the text it was read from plus its millisecond value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timestamp {
    /// Source text, kept for lossless passthrough
    pub text: String,

    /// Normalized offset in milliseconds
    pub ms: u64,
}

impl Timestamp {
    /// Parse a timestamp, keeping its trimmed source text
    pub fn parse(text: &str) -> Result<Self, SubtitleError> {
        let trimmed = text.trim();
        Ok(Self {
            ms: parse_timecode(trimmed)?,
            text: trimmed.to_string(),
        })
    }

    /// Build a timestamp from milliseconds, rendering the text in SRT form
    pub fn from_ms(ms: u64) -> Self {
        Self {
            text: format_srt(ms),
            ms,
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Parse `H+:MM:SS[.,]fff` into milliseconds.
///
/// Hours may have any number of digits. The fraction is scaled by its digit
/// count, so `.12` reads as 120 ms and `,1234` is truncated to 123 ms. A
/// leading `-` appears in some broken sources; such timestamps clamp to zero.
pub fn parse_timecode(text: &str) -> Result<u64, SubtitleError> {
    let malformed = || SubtitleError::MalformedTimecode(text.to_string());

    let trimmed = text.trim();
    let (negative, body) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };

    let mut fields = body.split(':');
    let (Some(hours), Some(minutes), Some(rest), None) =
        (fields.next(), fields.next(), fields.next(), fields.next())
    else {
        return Err(malformed());
    };
    let (seconds, fraction) = rest.split_once([',', '.']).ok_or_else(malformed)?;

    let groups = [hours, minutes, seconds, fraction];
    if groups
        .iter()
        .any(|g| g.is_empty() || !g.bytes().all(|b| b.is_ascii_digit()))
    {
        return Err(malformed());
    }

    let hours: u64 = hours.parse().map_err(|_| malformed())?;
    let minutes: u64 = minutes.parse().map_err(|_| malformed())?;
    let seconds: u64 = seconds.parse().map_err(|_| malformed())?;
    if minutes >= 60 || seconds >= 60 {
        return Err(malformed());
    }

    let digits = &fraction[..fraction.len().min(3)];
    let scale = 10u64.pow(3 - digits.len() as u32);
    let millis: u64 = digits.parse::<u64>().map_err(|_| malformed())? * scale;

    if negative {
        return Ok(0);
    }

    hours
        .checked_mul(MS_PER_HOUR)
        .and_then(|ms| ms.checked_add(minutes * MS_PER_MINUTE + seconds * MS_PER_SECOND + millis))
        .ok_or_else(malformed)
}

/// Format milliseconds as an SRT timestamp (`HH:MM:SS,mmm`)
pub fn format_srt(ms: u64) -> String {
    let (hours, minutes, seconds, millis) = split(ms);
    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
}

/// Format milliseconds as an ASS timestamp (`H:MM:SS.cc`), truncating to centiseconds
pub fn format_ass(ms: u64) -> String {
    let (hours, minutes, seconds, millis) = split(ms);
    format!("{}:{:02}:{:02}.{:02}", hours, minutes, seconds, millis / 10)
}

fn split(ms: u64) -> (u64, u64, u64, u64) {
    (
        ms / MS_PER_HOUR,
        (ms % MS_PER_HOUR) / MS_PER_MINUTE,
        (ms % MS_PER_MINUTE) / MS_PER_SECOND,
        ms % MS_PER_SECOND,
    )
}
