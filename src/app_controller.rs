use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use log::{debug, error, info, warn};

use crate::app_config::Config;
use crate::ass::AssDocument;
use crate::errors::{JobError, SubtitleError, ToolError};
use crate::file_utils::FileManager;
use crate::language_utils;
use crate::media_tools::{ExtractFormat, ExtractionJob, FfmpegToolbox, MediaToolbox};
use crate::merge::{MergeOptions, merge_pair};
use crate::styling::AssRenderer;
use crate::subtitle_processor::{ASS_LINE_BREAK, MERGE_JOIN, Track, parse_srt};

// @module: Job orchestration for convert, merge, restyle, split and extract

/// One unit of work for the worker pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    /// SRT to ASS
    Convert(PathBuf),
    /// Two SRT files into one bilingual SRT plus its ASS rendering
    Merge { first: PathBuf, second: PathBuf, output: PathBuf },
    /// Replace the styles of an ASS file in place
    Restyle(PathBuf),
    /// Bilingual SRT into two single-language SRT files
    Split(PathBuf),
    /// Copy subtitle streams out of a container
    Extract(PathBuf),
}

impl Job {
    pub fn kind(&self) -> &'static str {
        match self {
            Job::Convert(_) => "convert",
            Job::Merge { .. } => "merge",
            Job::Restyle(_) => "restyle",
            Job::Split(_) => "split",
            Job::Extract(_) => "extract",
        }
    }

    /// Input files the job removes when sources are deleted
    pub fn sources(&self) -> Vec<&Path> {
        match self {
            Job::Convert(path) => vec![path.as_path()],
            Job::Merge { first, second, .. } => vec![first.as_path(), second.as_path()],
            Job::Restyle(_) | Job::Split(_) | Job::Extract(_) => Vec::new(),
        }
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Job::Merge { first, second, .. } => {
                write!(f, "merge {} + {}", first.display(), second.display())
            }
            Job::Convert(path) | Job::Restyle(path) | Job::Split(path) | Job::Extract(path) => {
                write!(f, "{} {}", self.kind(), path.display())
            }
        }
    }
}

/// What a successful job did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Files written, in the order they were produced
    Written(Vec<PathBuf>),
    /// Nothing done, with the reason
    Skipped(String),
    /// Some files written, some parts failed
    Partial { written: Vec<PathBuf>, failed: Vec<String> },
}

/// Result of one job
#[derive(Debug)]
pub struct JobReport {
    pub job: Job,
    pub result: Result<JobOutcome, JobError>,
}

impl JobReport {
    /// Failed outright or in part
    pub fn is_failure(&self) -> bool {
        matches!(self.result, Err(_) | Ok(JobOutcome::Partial { .. }))
    }

    pub fn written(&self) -> &[PathBuf] {
        match &self.result {
            Ok(JobOutcome::Written(paths)) => paths,
            Ok(JobOutcome::Partial { written, .. }) => written,
            _ => &[],
        }
    }

    /// One line for the end-of-run summary
    pub fn summary_line(&self) -> String {
        match &self.result {
            Ok(JobOutcome::Written(paths)) => {
                let outputs: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
                format!("OK    {} -> {}", self.job, outputs.join(", "))
            }
            Ok(JobOutcome::Skipped(reason)) => format!("SKIP  {} ({})", self.job, reason),
            Ok(JobOutcome::Partial { written, failed }) => {
                let outputs: Vec<String> = written.iter().map(|p| p.display().to_string()).collect();
                format!("PART  {} -> {}; failed: {}", self.job, outputs.join(", "), failed.join("; "))
            }
            Err(e) => format!("FAIL  {}: {}", self.job, e),
        }
    }
}

/// Counts over a set of reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub written: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn from_reports(reports: &[JobReport]) -> Self {
        reports.iter().fold(Self::default(), |mut summary, report| {
            match &report.result {
                Ok(JobOutcome::Written(_)) => summary.written += 1,
                Ok(JobOutcome::Skipped(_)) => summary.skipped += 1,
                Ok(JobOutcome::Partial { .. }) | Err(_) => summary.failed += 1,
            }
            summary
        })
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

/// Main application controller. Cheap to clone; every clone shares the same
/// immutable configuration, toolbox and renderer.
#[derive(Clone)]
pub struct Controller {
    // @field: App configuration
    config: Arc<Config>,

    // @field: Prober/extractor
    toolbox: Arc<dyn MediaToolbox>,

    // @field: ASS renderer built from the configured styles
    renderer: Arc<AssRenderer>,
}

impl Controller {
    // @method: Create a controller that shells out to ffprobe/ffmpeg
    pub fn with_config(config: Config) -> Result<Self, JobError> {
        let toolbox = Arc::new(FfmpegToolbox::new(config.tool_timeout_secs));
        Self::with_toolbox(config, toolbox)
    }

    // @method: Create a controller with a custom toolbox
    pub fn with_toolbox(config: Config, toolbox: Arc<dyn MediaToolbox>) -> Result<Self, JobError> {
        let renderer = AssRenderer::from_config(&config)?;
        Ok(Self {
            config: Arc::new(config),
            toolbox,
            renderer: Arc::new(renderer),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Same controller, but never deleting sources
    fn keeping_sources(&self) -> Self {
        let mut config = (*self.config).clone();
        config.delete_source = false;
        Self {
            config: Arc::new(config),
            ..self.clone()
        }
    }

    fn skip_existing(&self, output: &Path) -> Option<JobOutcome> {
        if FileManager::should_write(output, self.config.force_overwrite) {
            return None;
        }
        warn!("Skipping, {:?} already exists (use -f to force overwrite)", output);
        Some(JobOutcome::Skipped(format!("{} exists", output.display())))
    }

    fn read_track(path: &Path, join: &str) -> Result<(Track, bool), JobError> {
        let decoded = FileManager::read_subtitle(path)?;
        let track = parse_srt(&decoded.text, join);
        if track.is_empty() {
            return Err(SubtitleError::EmptySource(path.display().to_string()).into());
        }
        Ok((track, decoded.had_bom))
    }

    fn delete_sources(&self, sources: &[&Path]) -> Result<(), JobError> {
        if !self.config.delete_source {
            return Ok(());
        }
        for source in sources {
            FileManager::remove_file(source)?;
            info!("Deleted {:?}", source);
        }
        Ok(())
    }

    /// Convert an SRT file to `<stem>.ass`
    pub fn convert(&self, srt: &Path) -> Result<JobOutcome, JobError> {
        let output = FileManager::ass_output_for(srt);
        if let Some(skipped) = self.skip_existing(&output) {
            return Ok(skipped);
        }

        let (track, had_bom) = Self::read_track(srt, ASS_LINE_BREAK)?;
        let doc = self.renderer.render(&track);
        FileManager::write_subtitle(&output, &doc.to_string(), had_bom)?;
        info!("Converted {:?} -> {:?} ({} events)", srt, output, doc.events.len());

        self.delete_sources(&[srt])?;
        Ok(JobOutcome::Written(vec![output]))
    }

    /// Merge two SRT files into `output`, then render the merged track as ASS
    pub fn merge(&self, first: &Path, second: &Path, output: &Path) -> Result<JobOutcome, JobError> {
        if let Some(skipped) = self.skip_existing(output) {
            return Ok(skipped);
        }

        let (a, had_bom) = Self::read_track(first, MERGE_JOIN)?;
        let (b, _) = Self::read_track(second, MERGE_JOIN)?;
        let merged = merge_pair(a, b, &MergeOptions::from_config(&self.config))?;

        FileManager::write_subtitle(output, &merged.to_srt_string(), had_bom)?;
        info!("Merged {:?} + {:?} -> {:?} ({} captions)", first, second, output, merged.len());
        let mut written = vec![output.to_path_buf()];

        let ass = FileManager::ass_output_for(output);
        if self.skip_existing(&ass).is_none() {
            let doc = self.renderer.render(&merged);
            FileManager::write_subtitle(&ass, &doc.to_string(), had_bom)?;
            written.push(ass);
        }

        self.delete_sources(&[first, second])?;
        Ok(JobOutcome::Written(written))
    }

    /// Rewrite an ASS file's styles in place
    pub fn restyle(&self, ass: &Path) -> Result<JobOutcome, JobError> {
        let decoded = FileManager::read_subtitle(ass)?;
        let doc = AssDocument::parse(&decoded.text);
        if doc.events.is_empty() {
            return Err(SubtitleError::EmptySource(ass.display().to_string()).into());
        }

        let restyled = self.renderer.restyle(doc);
        FileManager::write_subtitle(ass, &restyled.to_string(), decoded.had_bom)?;
        info!("Restyled {:?}", ass);
        Ok(JobOutcome::Written(vec![ass.to_path_buf()]))
    }

    /// Split a bilingual SRT into `<stem>_1.srt` and `<stem>_2.srt`
    pub fn split(&self, srt: &Path) -> Result<JobOutcome, JobError> {
        let (first_path, second_path) = FileManager::split_output_paths(srt);
        for output in [&first_path, &second_path] {
            if let Some(skipped) = self.skip_existing(output) {
                return Ok(skipped);
            }
        }

        let (track, had_bom) = Self::read_track(srt, "\n")?;
        let (first, second) = track.split_bilingual();

        FileManager::write_subtitle(&first_path, &first.to_srt_string(), had_bom)?;
        let mut written = vec![first_path];
        if second.is_empty() {
            warn!("{:?} has no second lines, only {:?} written", srt, written[0]);
        } else {
            FileManager::write_subtitle(&second_path, &second.to_srt_string(), had_bom)?;
            written.push(second_path);
        }
        Ok(JobOutcome::Written(written))
    }

    /// Extract the usable subtitle streams of a container next to it.
    /// A failed stream does not stop the others; it turns the outcome partial,
    /// or into an error when nothing was written.
    pub async fn extract(&self, container: &Path) -> Result<JobOutcome, JobError> {
        if !self.config.force_overwrite && FileManager::has_sibling_ass(container) {
            return Ok(JobOutcome::Skipped("an .ass file for this container exists".to_string()));
        }

        let tracks = self.toolbox.probe(container).await?;
        let mut written = Vec::new();
        let mut failures: Vec<ToolError> = Vec::new();
        for track in tracks {
            let Some(format) = track.extract_format() else {
                debug!("Skipping track {} with codec {}", track.index, track.codec);
                continue;
            };
            if format == ExtractFormat::Srt
                && !language_utils::is_language_allowed(track.language.as_deref(), &self.config.languages)
            {
                debug!("Skipping track {} in language {}", track.index, track.language_tag());
                continue;
            }

            let output = FileManager::extracted_track_path(container, track.index, track.language_tag(), format);
            if self.skip_existing(&output).is_some() {
                continue;
            }

            let job = ExtractionJob {
                container: container.to_path_buf(),
                track,
                format,
            };
            if let Err(e) = self.toolbox.extract(&job, &output).await {
                error!("Track {} of {:?} not extracted: {}", job.track.index, container, e);
                failures.push(e);
                continue;
            }
            info!("Extracted track {} -> {:?}", job.track.index, output);
            written.push(output);
        }

        if written.is_empty() {
            return match failures.into_iter().next() {
                Some(first) => Err(first.into()),
                None => Ok(JobOutcome::Skipped("no subtitle tracks to extract".to_string())),
            };
        }
        if failures.is_empty() {
            return Ok(JobOutcome::Written(written));
        }
        Ok(JobOutcome::Partial {
            written,
            failed: failures.iter().map(ToString::to_string).collect(),
        })
    }

    fn run_file_job(&self, job: &Job) -> Result<JobOutcome, JobError> {
        match job {
            Job::Convert(path) => self.convert(path),
            Job::Merge { first, second, output } => self.merge(first, second, output),
            Job::Restyle(path) => self.restyle(path),
            Job::Split(path) => self.split(path),
            Job::Extract(path) => Err(JobError::InvalidInput(format!(
                "extraction of {:?} is not a file job",
                path
            ))),
        }
    }

    /// Run one job on its own task. Panics become `JobError::Worker`.
    pub async fn run_job(&self, job: Job) -> JobReport {
        let this = self.clone();
        let task_job = job.clone();
        let joined = match job {
            Job::Extract(ref path) => {
                let path = path.clone();
                tokio::spawn(async move { this.extract(&path).await }).await
            }
            _ => tokio::task::spawn_blocking(move || this.run_file_job(&task_job)).await,
        };

        let result = joined.unwrap_or_else(|e| Err(JobError::Worker(e.to_string())));
        if let Err(e) = &result {
            error!("{} failed: {}", job, e);
        }
        JobReport { job, result }
    }

    /// Run jobs on a pool of at most `max_workers`. Reports come back in completion order.
    ///
    /// When sources are deleted and one file feeds several jobs, deletion waits
    /// until the whole batch is done and only removes files whose jobs all wrote.
    pub async fn run_batch(&self, jobs: Vec<Job>, progress: &ProgressBar) -> Vec<JobReport> {
        let shared = Self::shared_sources(&jobs);
        if !self.config.delete_source || shared.is_empty() {
            return self.run_pool(jobs, progress).await;
        }

        debug!("{} source file(s) feed several jobs, deleting after the batch", shared.len());
        let reports = self.keeping_sources().run_pool(jobs, progress).await;
        self.delete_after_batch(&reports);
        reports
    }

    /// Sources used by more than one job
    fn shared_sources(jobs: &[Job]) -> BTreeSet<PathBuf> {
        let mut seen = HashSet::new();
        jobs.iter()
            .flat_map(Job::sources)
            .filter(|source| !seen.insert(source.to_path_buf()))
            .map(Path::to_path_buf)
            .collect()
    }

    fn delete_after_batch(&self, reports: &[JobReport]) {
        let mut blocked: HashSet<&Path> = HashSet::new();
        let mut sources: BTreeSet<&Path> = BTreeSet::new();
        for report in reports {
            let wrote = matches!(report.result, Ok(JobOutcome::Written(_)));
            for source in report.job.sources() {
                sources.insert(source);
                if !wrote {
                    blocked.insert(source);
                }
            }
        }

        for source in sources.into_iter().filter(|s| !blocked.contains(s)) {
            match FileManager::remove_file(source) {
                Ok(()) => info!("Deleted {:?}", source),
                Err(e) => warn!("Could not delete {:?}: {}", source, e),
            }
        }
    }

    async fn run_pool(&self, jobs: Vec<Job>, progress: &ProgressBar) -> Vec<JobReport> {
        progress.inc_length(jobs.len() as u64);
        let workers = self.config.max_workers.max(1);

        stream::iter(jobs)
            .map(|job| self.run_job(job))
            .buffer_unordered(workers)
            .inspect(|report| {
                progress.set_message(report.job.kind());
                progress.inc(1);
            })
            .collect()
            .await
    }

    /// Extract every container, then restyle, convert and merge what came out
    pub async fn run_extract_mode(&self, containers: Vec<PathBuf>, progress: &ProgressBar) -> Vec<JobReport> {
        let jobs = containers.into_iter().map(Job::Extract).collect();
        let mut reports = self.run_batch(jobs, progress).await;

        let followups = Self::plan_followups(&reports);
        if !followups.is_empty() {
            debug!("Queueing {} follow-up jobs", followups.len());
            // Extracted SRTs feed several jobs, so none of them may delete it.
            let worker = self.keeping_sources();
            reports.extend(worker.run_batch(followups, progress).await);
        }
        reports
    }

    /// Restyle extracted ASS, convert extracted SRT, and pair SRTs of one container for merging
    pub fn plan_followups(reports: &[JobReport]) -> Vec<Job> {
        let mut jobs = Vec::new();
        for report in reports.iter().filter(|r| matches!(r.job, Job::Extract(_))) {
            let written = report.written();
            let srts: Vec<PathBuf> = written
                .iter()
                .filter(|p| FileManager::has_extension(p, &["srt"]))
                .cloned()
                .collect();

            jobs.extend(
                written
                    .iter()
                    .filter(|p| FileManager::has_extension(p, &["ass"]))
                    .cloned()
                    .map(Job::Restyle),
            );
            jobs.extend(srts.iter().cloned().map(Job::Convert));
            jobs.extend(Self::plan_merges(&srts));
        }
        jobs
    }

    /// Pair SRT files that share a track stem and differ in language.
    /// Files not named `<stem>.track<i>.<lang>.srt` are left alone.
    pub fn plan_merges(files: &[PathBuf]) -> Vec<Job> {
        let mut groups: BTreeMap<(PathBuf, String), Vec<&PathBuf>> = BTreeMap::new();
        for file in files {
            match FileManager::track_stem(file) {
                Some(stem) => {
                    let dir = file.parent().map(Path::to_path_buf).unwrap_or_default();
                    groups.entry((dir, stem)).or_default().push(file);
                }
                None => debug!("{:?} is not an extracted track, not pairing it", file),
            }
        }

        let mut taken: HashSet<PathBuf> = HashSet::new();
        let mut jobs = Vec::new();
        for members in groups.values() {
            for (i, first) in members.iter().enumerate() {
                for second in &members[i + 1..] {
                    if FileManager::language_tag(first) == FileManager::language_tag(second) {
                        continue;
                    }
                    let mut output = FileManager::merged_output_path(first, second);
                    if taken.contains(&output) {
                        output = FileManager::pair_output_path(first, second);
                    }
                    taken.insert(output.clone());
                    jobs.push(Job::Merge {
                        first: (*first).clone(),
                        second: (*second).clone(),
                        output,
                    });
                }
            }
        }
        jobs
    }
}
