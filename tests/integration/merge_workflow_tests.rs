/*!
 * Integration tests for merging SRT pairs on disk
 */

use std::fs;

use anyhow::Result;
use subtools::app_config::Config;
use subtools::app_controller::{Controller, JobOutcome};
use subtools::errors::{JobError, SubtitleError};
use subtools::file_utils::FileManager;
use crate::common;

fn controller(config: Config) -> Controller {
    Controller::with_config(config).unwrap()
}

/// Test merging an English and a Chinese file into SRT and ASS
#[test]
fn test_merge_withEnglishAndChinese_shouldWriteSrtAndAss() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let en = common::create_test_file(temp_dir.path(), "en.srt", common::ENGLISH_SRT)?;
    let zh = common::create_test_file(temp_dir.path(), "zh.srt", common::CHINESE_SRT)?;
    let output = FileManager::merged_output_path(&en, &zh);

    let outcome = controller(common::test_config()).merge(&en, &zh, &output)?;

    let ass = temp_dir.path().join("en.zh.ass");
    assert_eq!(output, temp_dir.path().join("en.zh_merge.srt"));
    assert_eq!(outcome, JobOutcome::Written(vec![output.clone(), ass.clone()]));
    assert_eq!(
        fs::read_to_string(&output)?,
        "1\n00:00:01,100 --> 00:00:02,900\n你好。\nHello there.\n\n2\n00:00:04,050 --> 00:00:05,900\n你好吗？\nHow are you?\n\n"
    );
    let ass_text = fs::read_to_string(&ass)?;
    assert!(ass_text.contains(r"Dialogue: 0,0:00:01.10,0:00:02.90,Default,,0,0,0,,你好。\N{\rENG\blur3}Hello there."));
    assert!(ass_text.contains("Style: Default,思源宋体 Heavy,"));
    assert!(en.exists() && zh.exists());
    Ok(())
}

/// Test that argument order does not change which track leads
#[test]
fn test_merge_withSwappedArguments_shouldGiveSameSrt() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let en = common::create_test_file(temp_dir.path(), "en.srt", common::ENGLISH_SRT)?;
    let zh = common::create_test_file(temp_dir.path(), "zh.srt", common::CHINESE_SRT)?;
    let controller = controller(common::test_config());

    controller.merge(&en, &zh, &temp_dir.path().join("a_merge.srt"))?;
    controller.merge(&zh, &en, &temp_dir.path().join("b_merge.srt"))?;

    assert_eq!(
        fs::read_to_string(temp_dir.path().join("a_merge.srt"))?,
        fs::read_to_string(temp_dir.path().join("b_merge.srt"))?
    );
    Ok(())
}

/// Test that an existing merged SRT skips the whole job
#[test]
fn test_merge_withExistingOutput_shouldSkip() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let en = common::create_test_file(temp_dir.path(), "en.srt", common::ENGLISH_SRT)?;
    let zh = common::create_test_file(temp_dir.path(), "zh.srt", common::CHINESE_SRT)?;
    let output = common::create_test_file(temp_dir.path(), "out_merge.srt", "keep me")?;

    let outcome = controller(common::test_config()).merge(&en, &zh, &output)?;

    assert!(matches!(outcome, JobOutcome::Skipped(_)));
    assert_eq!(fs::read_to_string(&output)?, "keep me");
    assert!(!temp_dir.path().join("out.ass").exists());
    Ok(())
}

/// Test that an existing ASS rendering is kept while the SRT is still written
#[test]
fn test_merge_withExistingAss_shouldOnlyWriteSrt() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let en = common::create_test_file(temp_dir.path(), "en.srt", common::ENGLISH_SRT)?;
    let zh = common::create_test_file(temp_dir.path(), "zh.srt", common::CHINESE_SRT)?;
    let ass = common::create_test_file(temp_dir.path(), "out.ass", "keep me")?;
    let output = temp_dir.path().join("out_merge.srt");

    let outcome = controller(common::test_config()).merge(&en, &zh, &output)?;

    assert_eq!(outcome, JobOutcome::Written(vec![output.clone()]));
    assert_eq!(fs::read_to_string(&ass)?, "keep me");
    Ok(())
}

/// Test that both sources are removed when configured
#[test]
fn test_merge_withDeleteSource_shouldRemoveBothInputs() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let en = common::create_test_file(temp_dir.path(), "en.srt", common::ENGLISH_SRT)?;
    let zh = common::create_test_file(temp_dir.path(), "zh.srt", common::CHINESE_SRT)?;
    let config = Config {
        delete_source: true,
        ..common::test_config()
    };

    controller(config).merge(&en, &zh, &temp_dir.path().join("out_merge.srt"))?;

    assert!(!en.exists());
    assert!(!zh.exists());
    assert!(temp_dir.path().join("out_merge.srt").exists());
    Ok(())
}

/// Test that an empty input fails without writing or deleting anything
#[test]
fn test_merge_withEmptySecondFile_shouldFailAndKeepSources() -> Result<()> {
    common::init_test_logger();
    let temp_dir = common::create_temp_dir()?;
    let en = common::create_test_file(temp_dir.path(), "en.srt", common::ENGLISH_SRT)?;
    let empty = common::create_test_file(temp_dir.path(), "empty.srt", "")?;
    let output = temp_dir.path().join("out_merge.srt");
    let config = Config {
        delete_source: true,
        ..common::test_config()
    };

    let result = controller(config).merge(&en, &empty, &output);

    match result {
        Err(JobError::Subtitle(SubtitleError::EmptySource(path))) => assert!(path.ends_with("empty.srt")),
        other => panic!("expected EmptySource, got {:?}", other),
    }
    assert!(!output.exists());
    assert!(en.exists() && empty.exists());
    Ok(())
}

/// Test that the BOM of the first input decides the output's BOM
#[test]
fn test_merge_withBomOnFirstInput_shouldWriteBom() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let mut bytes = vec![0xEF, 0xBB, 0xBF];
    bytes.extend_from_slice(common::ENGLISH_SRT.as_bytes());
    let en = common::create_test_bytes(temp_dir.path(), "en.srt", &bytes)?;
    let zh = common::create_test_file(temp_dir.path(), "zh.srt", common::CHINESE_SRT)?;
    let output = temp_dir.path().join("out_merge.srt");

    controller(common::test_config()).merge(&en, &zh, &output)?;

    assert_eq!(&fs::read(&output)?[..3], &[0xEF, 0xBB, 0xBF]);
    assert_eq!(&fs::read(temp_dir.path().join("out.ass"))?[..3], &[0xEF, 0xBB, 0xBF]);
    Ok(())
}

/// Test the lock-step strategy end to end
#[test]
fn test_merge_withLockStepStrategy_shouldPairCaptionsOneToOne() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let en = common::create_test_file(temp_dir.path(), "en.srt", common::ENGLISH_SRT)?;
    let zh = common::create_test_file(temp_dir.path(), "zh.srt", common::CHINESE_SRT)?;
    let output = temp_dir.path().join("out_merge.srt");
    let config = Config {
        merge_strategy: subtools::MergeStrategy::LockStep,
        ..common::test_config()
    };

    controller(config).merge(&en, &zh, &output)?;

    let text = fs::read_to_string(&output)?;
    assert!(text.starts_with("1\n00:00:01,100 --> 00:00:02,900\n你好。\nHello there.\n"));
    assert!(text.contains("\n2\n00:00:04,050 --> 00:00:05,900\n你好吗？\nHow are you?\n"));
    Ok(())
}
