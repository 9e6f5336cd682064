/*!
 * Tests for the ASS document model
 */

use subtools::ass::{AssDocument, AssEvent, AssStyle, parse_ass_events};

const SAMPLE_ASS: &str = "[Script Info]
Title: Sample
ScriptType: v4.00+

[V4+ Styles]
Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding
Style: Default,Arial,20,&H00FFFFFF,&H000000FF,&H00000000,&H00000000,0,0,0,0,100,100,0,0,1,2,2,2,10,10,10,1
Style: Broken,Arial

[Fonts]
fontname: something.ttf

[Events]
Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text
Comment: 0,0:00:00.00,0:00:01.00,Default,,0,0,0,,ignored
Dialogue: 0,0:00:01.00,0:00:02.00,Default,,0,0,0,,First\\NLine two
Dialogue: 0,0:00:03.00,0:00:04.50,Sign,Bob,10,20,30,fade,Second, with comma
Dialogue: 0,bad,0:00:05.00,Default,,0,0,0,,Broken
";

/// Test that styles and events are read and malformed rows skipped
#[test]
fn test_parse_withSampleDocument_shouldReadStylesAndEvents() {
    let doc = AssDocument::parse(SAMPLE_ASS);

    assert_eq!(doc.script_info, ["Title: Sample", "ScriptType: v4.00+"]);
    assert_eq!(doc.styles.len(), 1);
    assert_eq!(doc.styles[0].fontname, "Arial");
    assert_eq!(doc.events.len(), 2);
    assert_eq!(doc.events[1].style, "Sign");
    assert_eq!(doc.events[1].actor, "Bob");
    assert_eq!(doc.events[1].text, "Second, with comma");
}

/// Test that section headers are matched case-insensitively
#[test]
fn test_parse_withLowercaseHeaders_shouldFindEvents() {
    let doc = AssDocument::parse("[events]\nDialogue: 0,0:00:01.00,0:00:02.00,Default,,0,0,0,,Hi\n");
    assert_eq!(doc.events.len(), 1);
    assert!(!doc.script_info.is_empty());
}

/// Test the standalone event scanner
#[test]
fn test_parse_ass_events_withSampleDocument_shouldSkipCommentsAndBrokenRows() {
    let events = parse_ass_events(SAMPLE_ASS);
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].visual_lines(), ["First", "Line two"]);
}

/// Test serialization of a fresh document
#[test]
fn test_display_withNewDocument_shouldWriteAllSections() {
    let style: AssStyle = "Default,Verdana,18,&H00FFFFFF,&H000000FF,&H00000000,&H00000000,0,0,0,0,90,100,0,0,1,0.3,3,2,30,30,20,1"
        .parse()
        .unwrap();
    let doc = AssDocument::new(vec![style], vec![AssEvent::new(1_000, 2_000, "Hello".to_string())]);

    let text = doc.to_string();

    assert!(text.starts_with("[Script Info]\n; Script generated by subtools\nScriptType: v4.00+\n"));
    assert!(text.contains("\n[V4+ Styles]\nFormat: Name, Fontname,"));
    assert!(text.contains("\nStyle: Default,Verdana,18,"));
    assert!(text.contains("\n[Events]\nFormat: Layer, Start, End, Style, Actor,"));
    assert!(text.ends_with("Dialogue: 0,0:00:01.00,0:00:02.00,Default,,0,0,0,,Hello\n"));
}

/// Test that a parsed document written and parsed again keeps its events
#[test]
fn test_display_withParsedDocument_shouldReparseToSameEvents() {
    let doc = AssDocument::parse(SAMPLE_ASS);
    let again = AssDocument::parse(&doc.to_string());

    assert_eq!(again.styles, doc.styles);
    assert_eq!(again.events.len(), doc.events.len());
    assert_eq!(again.events[1].text, doc.events[1].text);
    assert_eq!(again.events[1].end.ms, 4_500);
}

/// Test that a style row keeps its fields when written back
#[test]
fn test_style_display_withPrefixedRow_shouldRoundTripFields() {
    let row = "Style: ENG,GenYoMin TW B,11,&H003CA8DC,&H000000FF,&H00000000,&H00000000,1,0,0,0,90,100,0,0,1,1,2,2,30,30,10,1";
    let style: AssStyle = row.parse().unwrap();

    assert_eq!(style.name, "ENG");
    assert_eq!(style.bold, "1");
    assert_eq!(style.encoding, "1");
    assert_eq!(style.to_string(), row);
}
