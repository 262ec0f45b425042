// Directory scanner
//
// Discovers source files under a root, filters them with include/exclude
// globs and extracts them in parallel. Every file that cannot be extracted
// comes back as a diagnostic next to the successful extractions.

use crate::config::ScanConfig;
use crate::error::{Error, Result};
use crate::extract::{Language, LanguageExtractors};
use crate::index::FileDiagnostic;
use crate::model::{normalize_path, RawExtraction};
use glob::Pattern;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

/// Directories never worth descending into
const SKIPPED_DIRS: [&str; 8] = [
    ".git",
    "node_modules",
    "__pycache__",
    "venv",
    ".venv",
    ".tox",
    ".eggs",
    ".architectum",
];

/// Extractions and per-file problems from one scan
#[derive(Debug, Default)]
pub struct ScanOutput {
    /// Successful extractions ordered by path
    pub extractions: Vec<RawExtraction>,
    /// Files that failed to read or parse
    pub failures: Vec<FileDiagnostic>,
    /// Files left out because they exceed the size limit
    pub skipped: Vec<FileDiagnostic>,
}

/// File discovery and parallel extraction
pub struct Scanner {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
    parallel: bool,
    max_file_size: u64,
    progress: bool,
}

impl Scanner {
    pub fn new(config: &ScanConfig) -> Result<Self> {
        Ok(Self {
            include: compile(&config.include)?,
            exclude: compile(&config.exclude)?,
            parallel: config.parallel,
            max_file_size: config.max_file_size,
            progress: false,
        })
    }

    /// Show a progress bar while extracting
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// Supported files under `root` that pass the filters, as sorted relative paths
    pub fn discover(&self, root: &Path) -> Result<Vec<String>> {
        if !root.exists() {
            return Err(Error::PathNotFound(root.to_path_buf()));
        }
        let mut files = Vec::new();
        let walker = WalkDir::new(root)
            .follow_links(true)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_skipped_dir(entry));
        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_file() || Language::from_path(entry.path()).is_none() {
                continue;
            }
            let relative = relative_path(root, entry.path());
            if self.is_included(&relative) {
                files.push(relative);
            }
        }
        files.sort();
        debug!("Discovered {} source files under {}", files.len(), root.display());
        Ok(files)
    }

    fn is_included(&self, relative: &str) -> bool {
        self.include.iter().any(|p| p.matches(relative)) && !self.exclude.iter().any(|p| p.matches(relative))
    }

    /// Discover and extract every file under `root`
    pub fn scan(&self, root: &Path) -> Result<ScanOutput> {
        let files = self.discover(root)?;
        let mut output = ScanOutput::default();

        let mut candidates: Vec<(String, PathBuf)> = Vec::with_capacity(files.len());
        for relative in files {
            let absolute = root.join(&relative);
            let size = fs::metadata(&absolute)?.len();
            if size > self.max_file_size {
                debug!("Skipping {} ({} bytes)", relative, size);
                output.skipped.push(FileDiagnostic::new(
                    relative,
                    format!("{} bytes exceeds max_file_size of {}", size, self.max_file_size),
                ));
                continue;
            }
            candidates.push((relative, absolute));
        }

        let progress = self.progress.then(|| progress_bar(candidates.len() as u64));
        let extract_one = |extractors: &mut Result<LanguageExtractors>, (relative, absolute): &(String, PathBuf)| {
            let result = match extractors {
                Ok(extractors) => fs::read_to_string(absolute)
                    .map_err(Error::from)
                    .and_then(|source| extractors.extract(relative, &source)),
                Err(e) => Err(Error::parser(e.to_string())),
            };
            if let Some(pb) = &progress {
                pb.set_message(relative.clone());
                pb.inc(1);
            }
            result.map_err(|e| FileDiagnostic::new(relative.clone(), e.to_string()))
        };

        let results: Vec<std::result::Result<RawExtraction, FileDiagnostic>> = if self.parallel {
            candidates.par_iter().map_init(LanguageExtractors::new, extract_one).collect()
        } else {
            let mut extractors = LanguageExtractors::new();
            candidates.iter().map(|c| extract_one(&mut extractors, c)).collect()
        };

        if let Some(pb) = progress {
            pb.finish_with_message("Extraction complete");
        }

        for result in results {
            match result {
                Ok(raw) => output.extractions.push(raw),
                Err(diagnostic) => {
                    warn!("Failed to extract {}: {}", diagnostic.path, diagnostic.message);
                    output.failures.push(diagnostic);
                }
            }
        }
        info!(
            "Extracted {} files ({} failed, {} skipped)",
            output.extractions.len(),
            output.failures.len(),
            output.skipped.len()
        );
        Ok(output)
    }
}

fn compile(patterns: &[String]) -> Result<Vec<Pattern>> {
    patterns
        .iter()
        .map(|p| Pattern::new(p).map_err(Error::from))
        .collect()
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir() && entry.file_name().to_str().is_some_and(|name| SKIPPED_DIRS.contains(&name))
}

fn relative_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    normalize_path(&relative.to_string_lossy())
}

fn progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::default_bar().template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}") {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}
