// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use indicatif::{ProgressBar, ProgressStyle};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, info, warn};
use std::io::Write;
use std::path::PathBuf;

use subtools::app_config::{self, Config, MergeStrategy, Precedence};
use subtools::file_utils::{CONTAINER_EXTENSIONS, FileManager};
use subtools::{BatchSummary, Controller, Job, JobReport};

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

/// CLI Wrapper for Precedence to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliPrecedence {
    CjkFraction,
    CjkCount,
    AnyCjk,
}

impl From<CliPrecedence> for Precedence {
    fn from(cli: CliPrecedence) -> Self {
        match cli {
            CliPrecedence::CjkFraction => Precedence::CjkFraction,
            CliPrecedence::CjkCount => Precedence::CjkCount,
            CliPrecedence::AnyCjk => Precedence::AnyCjk,
        }
    }
}

/// CLI Wrapper for MergeStrategy to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliMergeStrategy {
    Nesting,
    LockStep,
}

impl From<CliMergeStrategy> for MergeStrategy {
    fn from(cli: CliMergeStrategy) -> Self {
        match cli {
            CliMergeStrategy::Nesting => MergeStrategy::Nesting,
            CliMergeStrategy::LockStep => MergeStrategy::LockStep,
        }
    }
}

fn level_filter(level: &app_config::LogLevel) -> LevelFilter {
    match level {
        app_config::LogLevel::Error => LevelFilter::Error,
        app_config::LogLevel::Warn => LevelFilter::Warn,
        app_config::LogLevel::Info => LevelFilter::Info,
        app_config::LogLevel::Debug => LevelFilter::Debug,
        app_config::LogLevel::Trace => LevelFilter::Trace,
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert SRT files to ASS
    Convert(JobArgs),

    /// Merge pairs of SRT files into bilingual SRT and ASS
    Merge(JobArgs),

    /// Replace the styles of ASS files in place
    Restyle(JobArgs),

    /// Extract subtitle tracks from containers, then restyle, convert and merge them
    Extract(JobArgs),

    /// Split bilingual SRT files into two single-language files
    Split(JobArgs),

    /// Generate shell completions for subtools
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug, Clone)]
struct JobArgs {
    /// Input files or directories
    #[arg(value_name = "PATH", default_value = ".")]
    paths: Vec<PathBuf>,

    /// Search directories recursively
    #[arg(short, long)]
    recurse: bool,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force: bool,

    /// Delete source SRT files after a successful convert or merge
    #[arg(long)]
    delete: bool,

    /// Always use the English style profile
    #[arg(long)]
    english: bool,

    /// Merge tolerance in milliseconds
    #[arg(long, value_name = "MS")]
    time_shift: Option<u64>,

    /// Track precedence rule for merging
    #[arg(long, value_enum)]
    precedence: Option<CliPrecedence>,

    /// Merge algorithm
    #[arg(long, value_enum)]
    strategy: Option<CliMergeStrategy>,

    /// Number of parallel jobs
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Configuration file path (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Show debug information
    #[arg(short, long)]
    verbose: bool,
}

/// subtools - convert, restyle, extract and merge SRT/ASS subtitles
#[derive(Parser, Debug)]
#[command(name = "subtools")]
#[command(version)]
#[command(about = "Convert, restyle, extract and merge dual-language subtitles")]
#[command(long_about = "subtools converts SRT subtitles to ASS, merges two single-language SRT tracks into
one bilingual track, restyles ASS files and extracts subtitle streams from video containers.

EXAMPLES:
    subtools convert movie.srt                  # Write movie.ass
    subtools merge movie.eng.srt movie.chi.srt  # Merge an explicit pair
    subtools merge -r /shows/                   # Pair extracted tracks by container
    subtools extract -f movie.mkv               # Extract, restyle, convert and merge
    subtools restyle --english *.ass            # Force the English style profile
    subtools split bilingual.srt                # Write bilingual_1.srt and bilingual_2.srt
    subtools completions bash > subtools.bash   # Generate bash completions

CONFIGURATION:
    Settings come from built-in defaults, optionally overridden by a JSON file
    given with --config, then by command-line flags.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Convert,
    Merge,
    Restyle,
    Extract,
    Split,
}

// @struct: Custom logger implementation; the level lives in `log::max_level`
struct CustomLogger;

impl CustomLogger {
    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI colour and tag for a level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("\x1B[1;31m", "ERROR"),
            Level::Warn => ("\x1B[1;33m", "WARN "),
            Level::Info => ("\x1B[1;32m", "INFO "),
            Level::Debug => ("\x1B[1;36m", "DEBUG"),
            Level::Trace => ("\x1B[1;35m", "TRACE"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (colour, tag) = Self::style_for_level(record.level());
            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "{}{} {} {}\x1B[0m", colour, now, tag, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Info until the configuration says otherwise
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    let (mode, args) = match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "subtools", &mut std::io::stdout());
            return Ok(());
        }
        Commands::Convert(args) => (Mode::Convert, args),
        Commands::Merge(args) => (Mode::Merge, args),
        Commands::Restyle(args) => (Mode::Restyle, args),
        Commands::Extract(args) => (Mode::Extract, args),
        Commands::Split(args) => (Mode::Split, args),
    };

    run(mode, args).await
}

fn cli_level(args: &JobArgs) -> Option<app_config::LogLevel> {
    if args.verbose {
        return Some(app_config::LogLevel::Debug);
    }
    args.log_level.clone().map(Into::into)
}

/// Defaults, then the config file, then command-line flags
fn load_config(args: &JobArgs) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    if args.force {
        config.force_overwrite = true;
    }
    if args.delete {
        config.delete_source = true;
    }
    if args.english {
        config.english_only = true;
    }
    if let Some(shift) = args.time_shift {
        config.time_shift_ms = shift;
    }
    if let Some(precedence) = &args.precedence {
        config.precedence = precedence.clone().into();
    }
    if let Some(strategy) = &args.strategy {
        config.merge_strategy = strategy.clone().into();
    }
    if let Some(jobs) = args.jobs {
        config.max_workers = jobs;
    }
    if let Some(level) = cli_level(args) {
        config.log_level = level;
    }

    config.validate().context("Configuration validation failed")?;
    Ok(config)
}

fn collect(args: &JobArgs, extensions: &[&str]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in &args.paths {
        let mut found = FileManager::collect_inputs(path, extensions, args.recurse)
            .with_context(|| format!("Failed to collect inputs from {:?}", path))?;
        files.append(&mut found);
    }
    files.sort();
    files.dedup();
    Ok(files)
}

fn plan_jobs(mode: Mode, args: &JobArgs) -> Result<Vec<Job>> {
    let jobs = match mode {
        Mode::Convert => collect(args, &["srt"])?.into_iter().map(Job::Convert).collect(),
        Mode::Split => collect(args, &["srt"])?.into_iter().map(Job::Split).collect(),
        Mode::Restyle => collect(args, &["ass", "ssa"])?.into_iter().map(Job::Restyle).collect(),
        Mode::Extract => collect(args, CONTAINER_EXTENSIONS)?.into_iter().map(Job::Extract).collect(),
        Mode::Merge => {
            let explicit_pair = args.paths.len() == 2 && args.paths.iter().all(|p| p.is_file());
            if explicit_pair {
                let (first, second) = (&args.paths[0], &args.paths[1]);
                vec![Job::Merge {
                    first: first.clone(),
                    second: second.clone(),
                    output: FileManager::merged_output_path(first, second),
                }]
            } else {
                Controller::plan_merges(&collect(args, &["srt"])?)
            }
        }
    };
    Ok(jobs)
}

fn progress_bar() -> ProgressBar {
    let progress_bar = ProgressBar::new(0);
    let template_result = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} jobs ({percent}%) {msg}")
        .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    progress_bar.set_style(template_result.progress_chars("█▓▒░"));
    progress_bar
}

async fn run(mode: Mode, args: JobArgs) -> Result<()> {
    // A level given on the command line applies before the config is read
    if let Some(level) = cli_level(&args) {
        log::set_max_level(level_filter(&level));
    }

    let config = load_config(&args)?;
    log::set_max_level(level_filter(&config.log_level));

    let controller = Controller::with_config(config).context("Failed to create controller")?;
    let jobs = plan_jobs(mode, &args)?;
    if jobs.is_empty() {
        warn!("No input files found");
        return Ok(());
    }
    info!("Found {} job(s)", jobs.len());

    let progress = progress_bar();
    let reports: Vec<JobReport> = if mode == Mode::Extract {
        let containers = jobs
            .into_iter()
            .filter_map(|job| match job {
                Job::Extract(path) => Some(path),
                _ => None,
            })
            .collect();
        controller.run_extract_mode(containers, &progress).await
    } else {
        controller.run_batch(jobs, &progress).await
    };
    progress.finish_and_clear();

    for report in &reports {
        println!("{}", report.summary_line());
    }

    let summary = BatchSummary::from_reports(&reports);
    info!(
        "Done: {} written, {} skipped, {} failed",
        summary.written, summary.skipped, summary.failed
    );
    if summary.has_failures() {
        return Err(anyhow!("{} job(s) failed", summary.failed));
    }
    Ok(())
}
