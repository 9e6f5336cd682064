/*!
 * Tests for ASS rendering and restyling
 */

use subtools::app_config::Config;
use subtools::ass::AssDocument;
use subtools::errors::SubtitleError;
use subtools::styling::{AssRenderer, StyleBook, StyleProfile, StyleRole, strip_applied_overrides};
use subtools::subtitle_processor::{Caption, Track};

fn renderer() -> AssRenderer {
    AssRenderer::from_config(&Config::default()).unwrap()
}

fn track(captions: &[(u64, u64, &[&str])]) -> Track {
    Track::from_captions(
        captions
            .iter()
            .map(|(b, e, lines)| Caption::from_ms(*b, *e, lines.iter().map(|l| l.to_string()).collect()).unwrap())
            .collect(),
    )
}

/// Test rendering a plain English caption
#[test]
fn test_render_withEnglishCaption_shouldUseEnglishProfile() {
    let doc = renderer().render(&track(&[(1_000, 2_000, &["Hello"])]));

    assert_eq!(doc.events.len(), 1);
    assert_eq!(
        doc.events[0].to_string(),
        "Dialogue: 0,0:00:01.00,0:00:02.00,Default,,0,0,0,,Hello"
    );
    assert_eq!(doc.styles.len(), 3);
    assert_eq!(doc.styles[0].name, "Default");
    assert_eq!(doc.styles[0].fontname, "Verdana");
    assert_eq!(doc.styles[1].name, "ENG");
    assert_eq!(doc.styles[2].name, "JPN");
}

/// Test that the English second line of a Chinese caption gets the secondary tag
#[test]
fn test_render_withBilingualCaption_shouldTagSecondaryLine() {
    let doc = renderer().render(&track(&[(0, 1_000, &["你好", "Hello"])]));

    assert_eq!(doc.events[0].text, r"你好\N{\rENG\blur3}Hello");
    assert_eq!(doc.styles[0].fontname, "思源宋体 Heavy");
}

/// Test that Japanese secondaries switch to the Japanese profile and tag
#[test]
fn test_render_withJapaneseSecondary_shouldUseJapaneseTag() {
    let doc = renderer().render(&track(&[(0, 1_000, &["你好", "こんにちは"])]));

    assert_eq!(doc.events[0].text, r"你好\N{\rJPN\blur3}こんにちは");
    assert_eq!(doc.styles[0].fontsize, "23");
}

/// Test that lines in the same script, or without letters, stay untagged
#[test]
fn test_render_withSameScriptLines_shouldNotTag() {
    let doc = renderer().render(&track(&[(0, 1_000, &["Hello", "World"]), (2_000, 3_000, &["你好", "♪♪"])]));

    assert_eq!(doc.events[0].text, r"Hello\NWorld");
    assert_eq!(doc.events[1].text, r"你好\N♪♪");
}

/// Test SRT markup and embedded line breaks
#[test]
fn test_render_withMarkupAndBreaks_shouldTranslate() {
    let doc = renderer().render(&track(&[(0, 1_000, &[r"<i>Hello</i>\N <b>there</b>"])]));
    assert_eq!(doc.events[0].text, r"{\i1}Hello{\i0}\N{\b1}there{\b0}");
}

/// Test the English override
#[test]
fn test_render_withEnglishOnly_shouldForceEnglishProfile() {
    let config = Config {
        english_only: true,
        ..Config::default()
    };
    let doc = AssRenderer::from_config(&config).unwrap().render(&track(&[(0, 1_000, &["你好"])]));
    assert_eq!(doc.styles[0].fontname, "Verdana");
}

/// Test profile selection on its own
#[test]
fn test_style_profile_select_withSampleTexts_shouldPickProfile() {
    assert_eq!(StyleProfile::select("Hello", false), StyleProfile::English);
    assert_eq!(StyleProfile::select("", false), StyleProfile::English);
    assert_eq!(StyleProfile::select("你好Hello", false), StyleProfile::Cjk);
    assert_eq!(StyleProfile::select("你好こんにちは", false), StyleProfile::Japanese);
    assert_eq!(StyleProfile::select("こんにちは", true), StyleProfile::English);
}

/// Test that restyling replaces styles, resets event styles and is idempotent
#[test]
fn test_restyle_withForeignDocument_shouldBeIdempotent() {
    let source = "[Script Info]
Title: Foreign

[V4+ Styles]
Style: Sign,Arial,20,&H00FFFFFF,&H000000FF,&H00000000,&H00000000,0,0,0,0,100,100,0,0,1,2,2,2,10,10,10,1

[Events]
Dialogue: 0,0:00:01.00,0:00:02.00,Sign,,0,0,0,,{\\fnArial\\fs20}你好\\NHello
Dialogue: 0,0:00:03.00,0:00:04.00,Sign,,0,0,0,,{\\pos(10,10)}再见\\N{\\rENG\\blur3}Bye
";
    let renderer = renderer();

    let once = renderer.restyle(AssDocument::parse(source));
    let twice = renderer.restyle(AssDocument::parse(&once.to_string()));

    assert_eq!(once.events[0].text, r"你好\N{\rENG\blur3}Hello");
    assert_eq!(once.events[1].text, r"{\pos(10,10)}再见\N{\rENG\blur3}Bye");
    assert!(once.events.iter().all(|e| e.style == "Default"));
    assert_eq!(once.styles[0].fontname, "思源宋体 Heavy");
    assert_eq!(once.script_info, ["Title: Foreign"]);
    assert_eq!(once.to_string(), twice.to_string());
}

/// Test that restyling a rendered document keeps it unchanged
#[test]
fn test_restyle_withRenderedDocument_shouldKeepText() {
    let renderer = renderer();
    let rendered = renderer.render(&track(&[(0, 1_000, &["你好", "Hello"])]));
    let restyled = renderer.restyle(rendered.clone());
    assert_eq!(restyled, rendered);
}

/// Test override stripping keeps mixed blocks
#[test]
fn test_strip_applied_overrides_withMixedBlock_shouldKeepIt() {
    assert_eq!(strip_applied_overrides(r"{\fs20\pos(1,1)}x"), r"{\fs20\pos(1,1)}x");
    assert_eq!(strip_applied_overrides(r"{\1c&H00FF00&}x"), "x");
}

/// Test that a broken style row surfaces as a style error
#[test]
fn test_style_book_withBrokenRow_shouldFail() {
    let mut config = Config::default();
    config.styles.english = "Style: Default,Verdana".to_string();
    assert!(matches!(StyleBook::from_config(&config), Err(SubtitleError::MalformedStyle(_))));
}

/// Test style names and tags per role
#[test]
fn test_style_book_tag_for_withRoles_shouldReturnConfiguredTags() {
    let book = StyleBook::from_config(&Config::default()).unwrap();
    assert_eq!(book.tag_for(StyleRole::Default), "");
    assert_eq!(book.tag_for(StyleRole::SecondaryEnglish), r"{\rENG\blur3}");
    assert_eq!(book.tag_for(StyleRole::SecondaryJapanese), r"{\rJPN\blur3}");
    assert_eq!(StyleRole::SecondaryJapanese.style_name(), "JPN");
}
