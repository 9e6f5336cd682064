/*!
 * Boundary to the external media tools.
 *
 * `ffprobe` lists the subtitle streams of a container and `ffmpeg` copies one
 * stream out as SRT or ASS. Both sit behind the `MediaToolbox` trait so the
 * orchestrator can be driven by a fake in tests.
 */

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error, warn};
use serde::Deserialize;
use tokio::process::Command;

use crate::errors::ToolError;

const FFPROBE: &str = "ffprobe";
const FFMPEG: &str = "ffmpeg";

/// How a subtitle stream can be extracted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    /// Styled text, extracted as ASS
    Ass,
    /// Plain text, extracted as SRT
    SubRip,
    /// Image based; never extracted
    Bitmap,
    /// Text codec we do not handle
    Other,
}

/// Output format handed to ffmpeg's `-c:s`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractFormat {
    Srt,
    Ass,
}

impl ExtractFormat {
    pub fn codec(self) -> &'static str {
        match self {
            Self::Srt => "srt",
            Self::Ass => "ass",
        }
    }

    pub fn extension(self) -> &'static str {
        self.codec()
    }
}

/// One subtitle stream reported by the prober
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackDescriptor {
    /// Stream index within the container
    pub index: usize,
    pub codec: String,
    /// Language tag as written in the container, if any
    pub language: Option<String>,
}

impl TrackDescriptor {
    pub fn kind(&self) -> TrackKind {
        match self.codec.as_str() {
            "ass" | "ssa" => TrackKind::Ass,
            "subrip" | "srt" | "mov_text" | "webvtt" | "text" => TrackKind::SubRip,
            codec if is_bitmap_codec(codec) => TrackKind::Bitmap,
            _ => TrackKind::Other,
        }
    }

    /// Extraction format, `None` for streams that are not extracted
    pub fn extract_format(&self) -> Option<ExtractFormat> {
        match self.kind() {
            TrackKind::Ass => Some(ExtractFormat::Ass),
            TrackKind::SubRip => Some(ExtractFormat::Srt),
            TrackKind::Bitmap | TrackKind::Other => None,
        }
    }

    /// Language tag for file names, `und` when missing
    pub fn language_tag(&self) -> &str {
        self.language.as_deref().filter(|l| !l.is_empty()).unwrap_or("und")
    }
}

/// A stream to copy out of a container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionJob {
    pub container: PathBuf,
    pub track: TrackDescriptor,
    pub format: ExtractFormat,
}

/// Probe and extract subtitle streams
#[async_trait]
pub trait MediaToolbox: Send + Sync {
    /// List the subtitle streams of a container
    async fn probe(&self, container: &Path) -> Result<Vec<TrackDescriptor>, ToolError>;

    /// Write one stream to `output`. A failed extraction leaves no file behind.
    async fn extract(&self, job: &ExtractionJob, output: &Path) -> Result<(), ToolError>;
}

/// Check if a subtitle codec is bitmap-based (cannot be converted to text)
pub fn is_bitmap_codec(codec_name: &str) -> bool {
    matches!(
        codec_name,
        "hdmv_pgs_subtitle" | "dvd_subtitle" | "dvb_subtitle" | "xsub" | "dvb_teletext"
    )
}

/// Keep only the lines of ffmpeg's stderr that describe the failure,
/// dropping the version banner, build flags and stream listing.
pub fn filter_ffmpeg_stderr(stderr: &str) -> String {
    const NOISE: &[&str] = &[
        "ffmpeg version",
        "built with",
        "configuration:",
        "lib",
        "Input #",
        "Metadata:",
        "Duration:",
        "Chapter",
        "Stream #",
        "title",
        "BPS",
        "DURATION",
        "NUMBER_OF",
        "_STATISTICS",
        "Output #",
        "Stream mapping:",
        "Press [q]",
    ];

    let meaningful: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !NOISE.iter().any(|p| line.starts_with(p)))
        .collect();

    if meaningful.is_empty() {
        "unknown ffmpeg error (stderr was empty after filtering)".to_string()
    } else {
        meaningful.join("\n")
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    index: usize,
    #[serde(default)]
    codec_name: Option<String>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

impl ProbeStream {
    fn tag(&self, key: &str) -> Option<String> {
        self.tags
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}

/// Parse `ffprobe -print_format json -show_streams` output
pub fn parse_ffprobe_json(json: &str) -> Result<Vec<TrackDescriptor>, ToolError> {
    if json.trim().is_empty() {
        return Ok(Vec::new());
    }

    let output: ProbeOutput = serde_json::from_str(json).map_err(|e| ToolError::Output {
        tool: FFPROBE.to_string(),
        message: e.to_string(),
    })?;

    Ok(output
        .streams
        .into_iter()
        .map(|stream| TrackDescriptor {
            index: stream.index,
            codec: stream.codec_name.clone().unwrap_or_else(|| "unknown".to_string()),
            language: stream.tag("language"),
        })
        .collect())
}

/// `MediaToolbox` backed by the ffprobe and ffmpeg binaries on `PATH`
#[derive(Debug, Clone)]
pub struct FfmpegToolbox {
    timeout: Duration,
}

impl FfmpegToolbox {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    async fn run(&self, tool: &str, command: &mut Command) -> Result<Output, ToolError> {
        command.kill_on_drop(true);
        match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(source)) => Err(ToolError::Launch {
                tool: tool.to_string(),
                source,
            }),
            Err(_) => Err(ToolError::Timeout {
                tool: tool.to_string(),
                secs: self.timeout.as_secs(),
            }),
        }
    }
}

#[async_trait]
impl MediaToolbox for FfmpegToolbox {
    async fn probe(&self, container: &Path) -> Result<Vec<TrackDescriptor>, ToolError> {
        let mut command = Command::new(FFPROBE);
        command
            .args(["-v", "quiet", "-print_format", "json", "-show_streams", "-select_streams", "s"])
            .arg(container);

        let output = self.run(FFPROBE, &mut command).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!("ffprobe failed on {:?}: {}", container, stderr.trim());
            return Err(ToolError::Failed {
                tool: FFPROBE.to_string(),
                message: format!("exit status {}: {}", output.status, stderr.trim()),
            });
        }

        let tracks = parse_ffprobe_json(&String::from_utf8_lossy(&output.stdout))?;
        debug!("Found {} subtitle stream(s) in {:?}", tracks.len(), container);
        Ok(tracks)
    }

    async fn extract(&self, job: &ExtractionJob, output: &Path) -> Result<(), ToolError> {
        let mut command = Command::new(FFMPEG);
        command
            .arg("-y")
            .arg("-i")
            .arg(&job.container)
            .arg("-map")
            .arg(format!("0:{}", job.track.index))
            .arg("-c:s")
            .arg(job.format.codec())
            .arg(output);

        let result = match self.run(FFMPEG, &mut command).await {
            Ok(result) if result.status.success() => Ok(()),
            Ok(result) => Err(ToolError::Failed {
                tool: FFMPEG.to_string(),
                message: filter_ffmpeg_stderr(&String::from_utf8_lossy(&result.stderr)),
            }),
            Err(e) => Err(e),
        };

        if let Err(e) = &result {
            error!("Subtitle extraction of track {} failed: {}", job.track.index, e);
            remove_partial_output(output).await;
        }
        result
    }
}

async fn remove_partial_output(output: &Path) {
    match tokio::fs::remove_file(output).await {
        Ok(()) => debug!("Removed partial output {:?}", output),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Could not remove partial output {:?}: {}", output, e),
    }
}
