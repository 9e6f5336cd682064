/*!
 * Byte-level charset detection for subtitle files.
 *
 * Subtitle files in the wild come in UTF-16/32 with BOMs, plain UTF-8, and a
 * handful of legacy CJK and Western code pages. Decoding tries a fixed
 * candidate list, strictly (no replacement characters), and lets `chardetng`
 * pick the most likely legacy candidate first.
 */

use std::borrow::Cow;

use chardetng::EncodingDetector;
use encoding_rs::{BIG5, EUC_KR, Encoding, GBK, SHIFT_JIS, UTF_8, WINDOWS_1252};
use log::debug;

use crate::errors::SubtitleError;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const UTF32_LE_BOM: &[u8] = &[0xFF, 0xFE, 0x00, 0x00];
const UTF32_BE_BOM: &[u8] = &[0x00, 0x00, 0xFE, 0xFF];

/// Legacy encodings tried after UTF-8, in order
fn legacy_candidates() -> [&'static Encoding; 5] {
    [GBK, BIG5, SHIFT_JIS, EUC_KR, WINDOWS_1252]
}

/// Text decoded from a subtitle file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    /// Decoded content, BOM removed
    pub text: String,

    /// Name of the encoding that matched
    pub encoding: &'static str,

    /// Whether the source started with a byte-order mark
    pub had_bom: bool,
}

/// Decode raw subtitle bytes. `origin` only labels the error.
pub fn decode_bytes(bytes: &[u8], origin: &str) -> Result<DecodedText, SubtitleError> {
    if let Some(decoded) = decode_with_bom(bytes) {
        return decoded.ok_or_else(|| SubtitleError::Decode(origin.to_string()));
    }

    if let Some(text) = UTF_8.decode_without_bom_handling_and_without_replacement(bytes) {
        return Ok(finish(text, UTF_8.name(), false));
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let guess = detector.guess(None, false);
    debug!("Charset guess for {}: {}", origin, guess.name());

    let candidates = legacy_candidates();
    let ordered = std::iter::once(guess)
        .filter(|g| candidates.contains(g))
        .chain(candidates.iter().copied().filter(|c| *c != guess));

    for encoding in ordered {
        if let Some(text) = encoding.decode_without_bom_handling_and_without_replacement(bytes) {
            return Ok(finish(text, encoding.name(), false));
        }
    }

    Err(SubtitleError::Decode(origin.to_string()))
}

/// Encode text for saving: always UTF-8, with a BOM when the source had one
pub fn encode_for_save(text: &str, with_bom: bool) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(text.len() + UTF8_BOM.len());
    if with_bom {
        bytes.extend_from_slice(UTF8_BOM);
    }
    bytes.extend_from_slice(text.as_bytes());
    bytes
}

/// `None` when no BOM is present, `Some(None)` when a BOM is present but the
/// payload is not valid in that encoding.
fn decode_with_bom(bytes: &[u8]) -> Option<Option<DecodedText>> {
    if let Some(payload) = bytes.strip_prefix(UTF32_LE_BOM) {
        return Some(decode_utf32(payload, u32::from_le_bytes).map(|t| finish(Cow::Owned(t), "UTF-32LE", true)));
    }
    if let Some(payload) = bytes.strip_prefix(UTF32_BE_BOM) {
        return Some(decode_utf32(payload, u32::from_be_bytes).map(|t| finish(Cow::Owned(t), "UTF-32BE", true)));
    }

    let (encoding, bom_len) = Encoding::for_bom(bytes)?;
    Some(
        encoding
            .decode_without_bom_handling_and_without_replacement(&bytes[bom_len..])
            .map(|text| finish(text, encoding.name(), true)),
    )
}

fn decode_utf32(payload: &[u8], to_u32: fn([u8; 4]) -> u32) -> Option<String> {
    let chunks = payload.chunks_exact(4);
    if !chunks.remainder().is_empty() {
        return None;
    }
    chunks
        .map(|chunk| char::from_u32(to_u32([chunk[0], chunk[1], chunk[2], chunk[3]])))
        .collect()
}

fn finish(text: Cow<'_, str>, encoding: &'static str, had_bom: bool) -> DecodedText {
    match text.strip_prefix('\u{feff}') {
        Some(rest) => DecodedText {
            text: rest.to_string(),
            encoding,
            had_bom: true,
        },
        None => DecodedText {
            text: text.into_owned(),
            encoding,
            had_bom,
        },
    }
}
