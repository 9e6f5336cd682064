use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use tempfile::NamedTempFile;
use walkdir::WalkDir;

use crate::errors::JobError;
use crate::media_tools::ExtractFormat;
use crate::text_encoding::{DecodedText, decode_bytes, encode_for_save};

// @module: File and directory utilities, derived output paths

/// `<stem>.track<index>.<lang>` as written by extraction
static TRACK_NAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<stem>.+)\.track(?P<index>\d+)\.(?P<lang>[^.]+)$").expect("Invalid track name regex")
});

const MERGE_SUFFIX: &str = "_merge";

/// Container extensions handed to the prober
pub const CONTAINER_EXTENSIONS: &[&str] = &[
    "mkv", "mp4", "m4v", "mov", "avi", "webm", "ts", "m2ts", "mts", "mpg", "mpeg", "wmv", "flv", "ogv",
];

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    /// Whether a job may write `path`: it does not exist yet, or overwriting is allowed.
    /// Checked before the work starts, not re-checked at write time.
    pub fn should_write<P: AsRef<Path>>(path: P, force: bool) -> bool {
        force || !path.as_ref().exists()
    }

    /// Read and decode a subtitle file
    pub fn read_subtitle<P: AsRef<Path>>(path: P) -> Result<DecodedText, JobError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| JobError::io(path, e))?;
        let decoded = decode_bytes(&bytes, &path.display().to_string())?;
        debug!("Read {:?} as {}", path, decoded.encoding);
        Ok(decoded)
    }

    /// Write subtitle text as UTF-8, with a BOM when asked
    pub fn write_subtitle<P: AsRef<Path>>(path: P, text: &str, with_bom: bool) -> Result<(), JobError> {
        Self::write_atomic(path, &encode_for_save(text, with_bom))
    }

    /// Write through a temporary file in the target directory, then rename over `path`
    pub fn write_atomic<P: AsRef<Path>>(path: P, bytes: &[u8]) -> Result<(), JobError> {
        let path = path.as_ref();
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).map_err(|e| JobError::io(parent, e))?;

        let mut temp = NamedTempFile::new_in(parent).map_err(|e| JobError::io(parent, e))?;
        temp.write_all(bytes).map_err(|e| JobError::io(temp.path(), e))?;
        temp.persist(path).map_err(|e| JobError::io(path, e.error))?;
        Ok(())
    }

    pub fn remove_file<P: AsRef<Path>>(path: P) -> Result<(), JobError> {
        let path = path.as_ref();
        fs::remove_file(path).map_err(|e| JobError::io(path, e))
    }

    /// Find files with one of `extensions` under `dir`, sorted by path.
    /// Only `dir` itself is searched unless `recursive`.
    pub fn find_files<P: AsRef<Path>>(dir: P, extensions: &[&str], recursive: bool) -> Result<Vec<PathBuf>, JobError> {
        let dir = dir.as_ref();
        let max_depth = if recursive { usize::MAX } else { 1 };

        let mut result = Vec::new();
        for entry in WalkDir::new(dir).max_depth(max_depth).follow_links(true) {
            let entry = entry.map_err(|e| {
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| dir.to_path_buf());
                JobError::io(path, e.into())
            })?;
            let path = entry.path();
            if path.is_file() && Self::has_extension(path, extensions) {
                result.push(path.to_path_buf());
            }
        }

        result.sort();
        Ok(result)
    }

    /// A single file if `path` is one with a matching extension, otherwise a directory search
    pub fn collect_inputs<P: AsRef<Path>>(path: P, extensions: &[&str], recursive: bool) -> Result<Vec<PathBuf>, JobError> {
        let path = path.as_ref();
        if path.is_file() {
            if Self::has_extension(path, extensions) {
                return Ok(vec![path.to_path_buf()]);
            }
            return Err(JobError::InvalidInput(format!(
                "{:?} does not have one of the extensions: {}",
                path,
                extensions.join(", ")
            )));
        }
        if !path.is_dir() {
            return Err(JobError::InvalidInput(format!("Input path does not exist: {:?}", path)));
        }
        Self::find_files(path, extensions, recursive)
    }

    pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy())
            .is_some_and(|ext| extensions.iter().any(|e| ext.eq_ignore_ascii_case(e)))
    }

    fn file_stem_string(path: &Path) -> String {
        path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default()
    }

    fn sibling(path: &Path, file_name: String) -> PathBuf {
        match path.parent() {
            Some(parent) => parent.join(file_name),
            None => PathBuf::from(file_name),
        }
    }

    // @generates: ASS path for a converted SRT, without any `_merge` suffix
    pub fn ass_output_for(srt: &Path) -> PathBuf {
        let stem = Self::file_stem_string(srt);
        let stem = stem.strip_suffix(MERGE_SUFFIX).unwrap_or(&stem);
        Self::sibling(srt, format!("{}.ass", stem))
    }

    // @generates: `<stem>.track<index>.<lang>.<ext>` next to the container
    pub fn extracted_track_path(container: &Path, index: usize, language: &str, format: ExtractFormat) -> PathBuf {
        let stem = Self::file_stem_string(container);
        Self::sibling(
            container,
            format!("{}.track{}.{}.{}", stem, index, language, format.extension()),
        )
    }

    /// `movie` for `movie.track3.eng.srt`; `None` for files not named by extraction
    pub fn track_stem(path: &Path) -> Option<String> {
        let stem = Self::file_stem_string(path);
        TRACK_NAME_REGEX.captures(&stem).map(|caps| caps["stem"].to_string())
    }

    /// `eng` for `movie.track3.eng.srt`
    pub fn language_tag(path: &Path) -> Option<String> {
        let stem = Self::file_stem_string(path);
        TRACK_NAME_REGEX.captures(&stem).map(|caps| caps["lang"].to_string())
    }

    // @generates: Merged SRT path for a pair
    /// `<stem>.srt` when both files come from the same container and that name
    /// is free, otherwise the pair's own name from `pair_output_path`.
    pub fn merged_output_path(first: &Path, second: &Path) -> PathBuf {
        if let (Some(a), Some(b)) = (Self::track_stem(first), Self::track_stem(second)) {
            if a == b {
                let shared = Self::sibling(first, format!("{}.srt", a));
                if !shared.exists() {
                    return shared;
                }
            }
        }
        Self::pair_output_path(first, second)
    }

    /// `<first stem>.<second lang>_merge.srt`. Without a track tag the second
    /// file's last dotted stem segment stands in (`chi` for `movie.chi.srt`).
    /// Its ASS rendering drops the `_merge`.
    pub fn pair_output_path(first: &Path, second: &Path) -> PathBuf {
        let tag = Self::language_tag(second).unwrap_or_else(|| {
            let stem = Self::file_stem_string(second);
            stem.rsplit('.').next().unwrap_or_default().to_string()
        });
        Self::sibling(
            first,
            format!("{}.{}{}.srt", Self::file_stem_string(first), tag, MERGE_SUFFIX),
        )
    }

    // @generates: `<stem>_1.srt` and `<stem>_2.srt`
    pub fn split_output_paths(path: &Path) -> (PathBuf, PathBuf) {
        let stem = Self::file_stem_string(path);
        (
            Self::sibling(path, format!("{}_1.srt", stem)),
            Self::sibling(path, format!("{}_2.srt", stem)),
        )
    }

    /// Whether an `.ass` file starting with the container's stem sits next to it
    pub fn has_sibling_ass(container: &Path) -> bool {
        let stem = Self::file_stem_string(container);
        let dir = match container.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let Ok(entries) = fs::read_dir(dir) else {
            return false;
        };
        entries.filter_map(Result::ok).any(|entry| {
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();
            name.starts_with(&stem) && Self::has_extension(&path, &["ass"])
        })
    }
}
