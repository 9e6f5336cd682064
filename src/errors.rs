/*!
 * Error types for the subtools crate.
 *
 * Parsing problems, external tool failures and per-job failures each get
 * their own enum. Everything is recovered at the job boundary by the
 * controller, so none of these abort a batch.
 */

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while decoding or parsing subtitle content
#[derive(Error, Debug)]
pub enum SubtitleError {
    /// No candidate character encoding could decode the bytes
    #[error("Failed to decode {0}: no candidate encoding matched")]
    Decode(String),

    /// A timestamp did not match `H+:MM:SS[.,]fff`
    #[error("Malformed timecode: {0:?}")]
    MalformedTimecode(String),

    /// A caption block did not match the expected grammar
    #[error("Malformed block {index}: {reason}")]
    MalformedBlock {
        /// 1-based position of the block in the source
        index: usize,
        /// What was wrong with it
        reason: String,
    },

    /// A `Style:` row did not carry the 23 expected fields
    #[error("Malformed style row: {0}")]
    MalformedStyle(String),

    /// The source yielded zero captions
    #[error("No captions found in {0}")]
    EmptySource(String),
}

/// Errors raised by the external media prober/extractor
#[derive(Error, Debug)]
pub enum ToolError {
    /// The process could not be spawned at all
    #[error("Failed to launch {tool}: {source}")]
    Launch {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// The process exited with a non-zero status
    #[error("{tool} failed: {message}")]
    Failed { tool: String, message: String },

    /// The process exceeded its time budget
    #[error("{tool} timed out after {secs}s")]
    Timeout { tool: String, secs: u64 },

    /// The process output could not be understood
    #[error("Could not parse {tool} output: {message}")]
    Output { tool: String, message: String },
}

/// Failure of a single job (one file or one file pair)
#[derive(Error, Debug)]
pub enum JobError {
    /// Error from subtitle decoding or parsing
    #[error("Subtitle error: {0}")]
    Subtitle(#[from] SubtitleError),

    /// Error from the prober/extractor
    #[error("External tool error: {0}")]
    Tool(#[from] ToolError),

    /// Error from a file operation
    #[error("File error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The job did not match what the input supports
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The worker running the job panicked or was aborted
    #[error("Worker failure: {0}")]
    Worker(String),
}

impl JobError {
    /// Attach a path to an I/O error
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
