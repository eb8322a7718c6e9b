//! Directory-level batch processing.
//!
//! Every file is handled independently: a fatal error on one file is recorded
//! in the summary and the batch moves on.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{info, warn};
use walkdir::WalkDir;

use crate::codec::{decode_file, encode_file};
use crate::error::Result;

/// Direction of a batch run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// `*.isb` -> `*.txt`
    Decode,
    /// `*.txt` -> `*.isb`
    Encode,
}

impl Mode {
    /// Input and output file extensions
    pub fn extensions(self) -> (&'static str, &'static str) {
        match self {
            Mode::Decode => ("isb", "txt"),
            Mode::Encode => ("txt", "isb"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub mode: Mode,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Descend into subdirectories, mirroring them under `output_dir`
    pub recursive: bool,
}

/// Outcome of a batch run
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub processed: usize,
    pub failed: Vec<(PathBuf, String)>,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.processed + self.failed.len()
    }
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

/// Collects matching input files, sorted by path
fn collect_inputs(opts: &BatchOptions) -> Vec<PathBuf> {
    let (ext_from, _) = opts.mode.extensions();
    let max_depth = if opts.recursive { usize::MAX } else { 1 };

    WalkDir::new(&opts.input_dir)
        .min_depth(1)
        .max_depth(max_depth)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| has_extension(p, ext_from))
        .collect()
}

fn process_one(mode: Mode, src: &Path, dst: &Path) -> Result<usize> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }

    let warnings = match mode {
        Mode::Decode => decode_file(src, dst)?.warnings,
        Mode::Encode => encode_file(src, dst)?.warnings,
    };
    Ok(warnings.len())
}

/// Decodes or encodes every matching file under `opts.input_dir`
pub fn process_directory(opts: &BatchOptions) -> Result<BatchSummary> {
    if !opts.input_dir.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("input directory not found: {}", opts.input_dir.display()),
        )
        .into());
    }
    fs::create_dir_all(&opts.output_dir)?;

    let (_, ext_to) = opts.mode.extensions();
    let inputs = collect_inputs(opts);
    info!("found {} file(s) to process", inputs.len());

    let mut summary = BatchSummary::default();

    for src in inputs {
        let rel = src.strip_prefix(&opts.input_dir).unwrap_or(&src);
        let dst = opts.output_dir.join(rel).with_extension(ext_to);

        match process_one(opts.mode, &src, &dst) {
            Ok(warnings) => {
                info!(
                    "{} -> {} ({} warning(s))",
                    src.display(),
                    dst.display(),
                    warnings
                );
                summary.processed += 1;
            }
            Err(e) => {
                warn!("{}: {}", src.display(), e);
                summary.failed.push((src, e.to_string()));
            }
        }
    }

    Ok(summary)
}
