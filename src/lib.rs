/*!
 * # subtools - SRT/ASS subtitle conversion and dual-language merging
 *
 * A Rust library for turning pairs of independently timed subtitle tracks
 * into one bilingual track, and for moving subtitles between SRT and ASS.
 *
 * ## Features
 *
 * - Merge two SRT tracks by nesting secondary captions into primary ones
 * - Convert SRT to ASS with script-aware style profiles
 * - Restyle existing ASS files in place
 * - Split bilingual SRT files back into two tracks
 * - Extract subtitle streams from containers with ffprobe/ffmpeg
 * - Detect legacy CJK encodings and UTF-16/32 byte-order marks
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `timecode`: Timestamp parsing and SRT/ASS formatting
 * - `text_encoding`: Charset detection and UTF-8 output
 * - `subtitle_processor`: Caption/track model, SRT parsing and writing
 * - `ass`: Structured ASS documents
 * - `script_classifier`: CJK, kana and Latin heuristics
 * - `merge`: The interval merge engine
 * - `styling`: ASS rendering and restyling
 * - `media_tools`: ffprobe/ffmpeg boundary
 * - `app_controller`: Jobs and the worker pool
 * - `file_utils`: File system operations and derived paths
 * - `language_utils`: ISO language code utilities
 * - `app_config`: Configuration management
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod ass;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod media_tools;
pub mod merge;
pub mod script_classifier;
pub mod styling;
pub mod subtitle_processor;
pub mod text_encoding;
pub mod timecode;

// Re-export main types for easier usage
pub use app_config::{Config, MergeStrategy, Precedence};
pub use app_controller::{BatchSummary, Controller, Job, JobOutcome, JobReport};
pub use errors::{JobError, SubtitleError, ToolError};
pub use merge::{MergeOptions, merge_lock_step, merge_pair, merge_tracks, order_by_precedence};
pub use subtitle_processor::{Caption, Track, parse_srt, parse_srt_lenient};
pub use timecode::Timestamp;
