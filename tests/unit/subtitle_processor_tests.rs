/*!
 * Tests for the caption model and SRT parsing
 */

use subtools::errors::SubtitleError;
use subtools::subtitle_processor::{ASS_LINE_BREAK, Caption, MERGE_JOIN, Track, parse_srt, parse_srt_lenient};
use crate::common;

/// Test that a well-formed file parses every block in order
#[test]
fn test_parse_srt_withValidContent_shouldParseAllCaptions() {
    let track = parse_srt(common::ENGLISH_SRT, MERGE_JOIN);

    assert_eq!(track.len(), 2);
    assert_eq!(track.captions()[0].begin_ms(), 1_000);
    assert_eq!(track.captions()[0].end_ms(), 3_000);
    assert_eq!(track.captions()[1].lines(), ["How are you?"]);
}

/// Test that multi-line text is joined with the requested separator
#[test]
fn test_parse_srt_withMultilineText_shouldJoinLines() {
    let content = "1\n00:00:01,000 --> 00:00:02,000\nfirst\nsecond\n";

    assert_eq!(parse_srt(content, MERGE_JOIN).captions()[0].lines(), ["first second"]);
    assert_eq!(parse_srt(content, ASS_LINE_BREAK).captions()[0].lines(), [r"first\Nsecond"]);
}

/// Test that a missing index line is tolerated
#[test]
fn test_parse_srt_withoutIndex_shouldStillParse() {
    let track = parse_srt("00:00:01,000 --> 00:00:02,000\nNo index\n", MERGE_JOIN);
    assert_eq!(track.len(), 1);
    assert_eq!(track.captions()[0].text(), "No index");
}

/// Test that a bad block is skipped and reported while its neighbours survive
#[test]
fn test_parse_srt_lenient_withMalformedTimecode_shouldSkipOnlyThatBlock() {
    common::init_test_logger();
    let content = "1\n00:00:01,000 --> 00:00:02,000\nA\n\n2\n00:00:xx,000 --> 00:00:04,000\nB\n\n3\n00:00:05,000 --> 00:00:06,000\nC\n";

    let (track, skipped) = parse_srt_lenient(content, MERGE_JOIN);

    let texts: Vec<String> = track.captions().iter().map(Caption::text).collect();
    assert_eq!(texts, ["A", "C"]);
    assert_eq!(skipped.len(), 1);
    assert!(matches!(skipped[0], SubtitleError::MalformedTimecode(_)));

    // The logging variant gives the same track
    assert_eq!(parse_srt(content, MERGE_JOIN), track);
}

/// Test that an hour field too large for milliseconds skips the block instead of overflowing
#[test]
fn test_parse_srt_lenient_withOverflowingHours_shouldSkipBlock() {
    let content = "1\n5124095576030432:00:00,000 --> 5124095576030432:00:01,000\nHuge\n\n2\n00:00:05,000 --> 00:00:06,000\nFine\n";

    let (track, skipped) = parse_srt_lenient(content, MERGE_JOIN);

    assert_eq!(track.len(), 1);
    assert_eq!(track.captions()[0].text(), "Fine");
    assert!(matches!(skipped.as_slice(), [SubtitleError::MalformedTimecode(_)]));
}

/// Test that a block without an arrow line is skipped
#[test]
fn test_parse_srt_lenient_withMissingArrow_shouldKeepGoodBlock() {
    let content = "1\n00:00:01,000 --> 00:00:02,000\nGood\n\n2\n00:00:03,000 00:00:04,000\nBad\n";

    let (track, skipped) = parse_srt_lenient(content, MERGE_JOIN);

    assert_eq!(track.len(), 1);
    assert_eq!(track.captions()[0].text(), "Good");
    assert!(matches!(skipped.as_slice(), [SubtitleError::MalformedBlock { index: 2, .. }]));
}

/// Test that blocks without text or with reversed times are rejected
#[test]
fn test_parse_srt_lenient_withIncompleteBlocks_shouldReportIndex() {
    let content = "1\n00:00:01,000 --> 00:00:02,000\n\n2\n00:00:05,000 --> 00:00:04,000\nBackwards\n";

    let (track, skipped) = parse_srt_lenient(content, MERGE_JOIN);

    assert!(track.is_empty());
    assert_eq!(skipped.len(), 2);
    assert!(matches!(skipped[1], SubtitleError::MalformedBlock { index: 2, .. }));
}

/// Test that writing renumbers from one and keeps timestamp text verbatim
#[test]
fn test_to_srt_string_withParsedTrack_shouldRenumberAndKeepTimestamps() {
    let content = "7\n00:00:01.5 --> 00:00:02,000\nA\n\n9\n00:00:03,000 --> 00:00:04,000\nB\n";
    let srt = parse_srt(content, MERGE_JOIN).to_srt_string();

    assert_eq!(srt, "1\n00:00:01.5 --> 00:00:02,000\nA\n\n2\n00:00:03,000 --> 00:00:04,000\nB\n\n");
}

/// Test that absorbed lines are written one per line
#[test]
fn test_caption_absorb_withSecondCaption_shouldAppendLinesOnly() {
    let mut caption = Caption::from_ms(0, 2_000, vec!["A".to_string()]).unwrap();
    caption.absorb(Caption::from_ms(500, 5_000, vec!["B".to_string()]).unwrap());

    assert_eq!(caption.lines(), ["A", "B"]);
    assert_eq!(caption.end_ms(), 2_000);
    assert_eq!(caption.to_string(), "00:00:00,000 --> 00:00:02,000\nA\nB\n");
}

/// Test splitting a bilingual track into its first and remaining lines
#[test]
fn test_split_bilingual_withMixedCaptions_shouldSeparateLines() {
    let track = Track::from_captions(vec![
        Caption::from_ms(0, 1_000, vec!["你好".to_string(), "Hello".to_string()]).unwrap(),
        Caption::from_ms(2_000, 3_000, vec!["只有一行".to_string()]).unwrap(),
        Caption::from_ms(4_000, 5_000, vec!["再见\nGood\nbye".to_string()]).unwrap(),
    ]);

    let (first, second) = track.split_bilingual();

    let first_texts: Vec<String> = first.captions().iter().map(Caption::text).collect();
    let second_texts: Vec<String> = second.captions().iter().map(Caption::text).collect();
    assert_eq!(first_texts, ["你好", "只有一行", "再见"]);
    assert_eq!(second_texts, ["Hello", "Good bye"]);
    assert_eq!(second.captions()[1].begin_ms(), 4_000);
}
