use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::ass::AssStyle;

/// Application configuration module
/// This module holds the immutable settings every job receives: merge
/// tolerances, precedence and strategy, the language allow-list, overwrite
/// policy, worker pool size and the ASS style rows.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// Tolerance in milliseconds when nesting a secondary caption into a primary one
    #[serde(default = "default_time_shift_ms")]
    pub time_shift_ms: u64,

    /// Rule deciding which track drives the merged timeline
    #[serde(default)]
    pub precedence: Precedence,

    /// Merge algorithm
    #[serde(default)]
    pub merge_strategy: MergeStrategy,

    /// Track languages extracted from containers (ISO 639 codes)
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,

    /// Overwrite outputs that already exist
    #[serde(default)]
    pub force_overwrite: bool,

    /// Remove source SRT files after a successful convert or merge
    #[serde(default)]
    pub delete_source: bool,

    /// Always use the English style profile
    #[serde(default)]
    pub english_only: bool,

    /// Size of the worker pool
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Time budget for each ffprobe/ffmpeg invocation
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,

    /// ASS style rows and override tags
    #[serde(default)]
    pub styles: StyleConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Track precedence rule
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Precedence {
    // @rule: Lower CJK share becomes secondary
    #[default]
    CjkFraction,
    // @rule: Lower raw ideograph count becomes secondary
    CjkCount,
    // @rule: A track with any ideograph is primary
    AnyCjk,
}

/// Merge algorithm selection
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    // @strategy: Secondary captions nest into tolerance-widened primaries
    #[default]
    Nesting,
    // @strategy: Both pointers advance together, begin times only
    LockStep,
}

impl std::fmt::Display for Precedence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::CjkFraction => "cjk_fraction",
            Self::CjkCount => "cjk_count",
            Self::AnyCjk => "any_cjk",
        };
        write!(f, "{}", name)
    }
}

impl std::fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Nesting => "nesting",
            Self::LockStep => "lock_step",
        };
        write!(f, "{}", name)
    }
}

/// ASS style rows for each profile, plus the secondary override tags
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StyleConfig {
    // @field: Default row of the CJK profile
    #[serde(default = "default_cjk_style")]
    pub cjk: String,

    // @field: Default row of the English profile
    #[serde(default = "default_english_style")]
    pub english: String,

    // @field: Default row of the Japanese profile
    #[serde(default = "default_japanese_style")]
    pub japanese: String,

    // @field: Row for English secondary lines
    #[serde(default = "default_secondary_english_style")]
    pub secondary_english: String,

    // @field: Row for Japanese secondary lines
    #[serde(default = "default_secondary_japanese_style")]
    pub secondary_japanese: String,

    // @field: Override block prefixed to English secondary lines
    #[serde(default = "default_english_tag")]
    pub english_tag: String,

    // @field: Override block prefixed to Japanese secondary lines
    #[serde(default = "default_japanese_tag")]
    pub japanese_tag: String,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            cjk: default_cjk_style(),
            english: default_english_style(),
            japanese: default_japanese_style(),
            secondary_english: default_secondary_english_style(),
            secondary_japanese: default_secondary_japanese_style(),
            english_tag: default_english_tag(),
            japanese_tag: default_japanese_tag(),
        }
    }
}

impl StyleConfig {
    /// Check every row parses and the tags are override blocks
    pub fn validate(&self) -> Result<()> {
        let rows = [
            ("cjk", &self.cjk),
            ("english", &self.english),
            ("japanese", &self.japanese),
            ("secondary_english", &self.secondary_english),
            ("secondary_japanese", &self.secondary_japanese),
        ];
        for (name, row) in rows {
            row.parse::<AssStyle>()
                .with_context(|| format!("Invalid style row '{}'", name))?;
        }

        for (name, tag) in [("english_tag", &self.english_tag), ("japanese_tag", &self.japanese_tag)] {
            if !(tag.starts_with("{\\") && tag.ends_with('}')) {
                return Err(anyhow!("Style tag '{}' must be an override block like {{\\rENG}}: {}", name, tag));
            }
        }

        Ok(())
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

fn default_time_shift_ms() -> u64 {
    1000
}

fn default_languages() -> Vec<String> {
    ["eng", "zho", "chi", "jpn"].iter().map(|s| s.to_string()).collect()
}

fn default_max_workers() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4)
}

fn default_tool_timeout_secs() -> u64 {
    120
}

fn default_cjk_style() -> String {
    "Style: Default,思源宋体 Heavy,28,&H00AAE2E6,&H00FFFFFF,&H00000000,&H00000000,0,0,0,0,85,100,0.1,0,1,1,3,2,30,30,15,1".to_string()
}

fn default_english_style() -> String {
    "Style: Default,Verdana,18,&H00FFFFFF,&H000000FF,&H00000000,&H00000000,0,0,0,0,90,100,0,0,1,0.3,3,2,30,30,20,1".to_string()
}

fn default_japanese_style() -> String {
    "Style: Default,GenYoMin JP B,23,&H003CA8DC,&H000000FF,&H00000000,&H00000000,0,0,0,0,100,100,0,0,1,0.1,2,2,30,30,10,1".to_string()
}

fn default_secondary_english_style() -> String {
    "Style: ENG,GenYoMin TW B,11,&H003CA8DC,&H000000FF,&H00000000,&H00000000,1,0,0,0,90,100,0,0,1,1,2,2,30,30,10,1".to_string()
}

fn default_secondary_japanese_style() -> String {
    "Style: JPN,GenYoMin JP B,15,&H003CA8DC,&H000000FF,&H00000000,&H00000000,0,0,0,0,100,100,0,0,1,1,2,2,30,30,10,1".to_string()
}

fn default_english_tag() -> String {
    "{\\rENG\\blur3}".to_string()
}

fn default_japanese_tag() -> String {
    "{\\rJPN\\blur3}".to_string()
}

impl Config {
    /// Load a JSON configuration file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).context(format!("Failed to open config file: {}", path.display()))?;
        let reader = BufReader::new(file);
        let config: Config =
            serde_json::from_reader(reader).context(format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.max_workers == 0 {
            return Err(anyhow!("max_workers must be at least 1"));
        }
        if self.tool_timeout_secs == 0 {
            return Err(anyhow!("tool_timeout_secs must be at least 1"));
        }

        for code in &self.languages {
            crate::language_utils::validate_language_code(code)
                .with_context(|| format!("Invalid language in allow-list: {}", code))?;
        }

        self.styles.validate().context("Style configuration is invalid")?;

        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            time_shift_ms: default_time_shift_ms(),
            precedence: Precedence::default(),
            merge_strategy: MergeStrategy::default(),
            languages: default_languages(),
            force_overwrite: false,
            delete_source: false,
            english_only: false,
            max_workers: default_max_workers(),
            tool_timeout_secs: default_tool_timeout_secs(),
            styles: StyleConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}
