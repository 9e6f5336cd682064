/*!
 * Tests for error types
 */

use std::error::Error;
use std::io;

use subtools::errors::{JobError, SubtitleError, ToolError};

/// Test subtitle error messages
#[test]
fn test_subtitle_error_display_withVariants_shouldDescribeProblem() {
    assert_eq!(
        SubtitleError::MalformedTimecode("00:xx".to_string()).to_string(),
        "Malformed timecode: \"00:xx\""
    );
    let block = SubtitleError::MalformedBlock {
        index: 4,
        reason: "no text lines".to_string(),
    };
    assert_eq!(block.to_string(), "Malformed block 4: no text lines");
    assert!(SubtitleError::EmptySource("a.srt".to_string()).to_string().contains("a.srt"));
}

/// Test conversion into job errors
#[test]
fn test_job_error_from_withInnerErrors_shouldWrap() {
    let job: JobError = SubtitleError::Decode("a.srt".to_string()).into();
    assert!(matches!(job, JobError::Subtitle(SubtitleError::Decode(_))));
    assert!(job.to_string().starts_with("Subtitle error: Failed to decode a.srt"));

    let job: JobError = ToolError::Timeout {
        tool: "ffprobe".to_string(),
        secs: 5,
    }
    .into();
    assert_eq!(job.to_string(), "External tool error: ffprobe timed out after 5s");
}

/// Test that I/O errors keep their path and source
#[test]
fn test_job_error_io_withPath_shouldKeepSource() {
    let error = JobError::io("/v/movie.srt", io::Error::new(io::ErrorKind::PermissionDenied, "denied"));

    assert!(error.to_string().contains("/v/movie.srt"));
    assert_eq!(error.source().map(|e| e.to_string()).as_deref(), Some("denied"));
}

/// Test that launch failures expose the io error as source
#[test]
fn test_tool_error_launch_withIoError_shouldExposeSource() {
    let error = ToolError::Launch {
        tool: "ffmpeg".to_string(),
        source: io::Error::new(io::ErrorKind::NotFound, "No such file"),
    };
    assert!(error.to_string().starts_with("Failed to launch ffmpeg"));
    assert!(error.source().is_some());
}
