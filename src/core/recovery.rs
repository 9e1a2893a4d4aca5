/*
 * Repairs assets whose texture compression failed during a content build.
 * For the narrow class of failures this pass understands (a square-texture
 * constraint on a raster image), the stale compiled artifact is deleted and
 * the original image is copied into the build output tree in its place, so
 * the game loads the raw image instead. Copies in a quantizable format are
 * collected into a worklist for the external quantization tool.
 *
 * The pass is best-effort: records it does not recognize are skipped, and a
 * failure on one item is recorded and does not stop the remaining items.
 * File operations go through `RecoveryFileOperations` so the decision logic
 * can be tested without touching the disk.
 */
use crate::core::config::RecoveryConfig;
use crate::core::log_scanner::FailureRecord;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum RecoveryError {
    // The rewrite rule did not change the path; copying would target the source itself.
    OutputPathUnchanged(PathBuf),
    DeleteFailed(PathBuf, io::Error),
    CopyFailed {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },
}

impl std::fmt::Display for RecoveryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecoveryError::OutputPathUnchanged(p) => {
                write!(f, "Output path rewrite does not apply to {p:?}")
            }
            RecoveryError::DeleteFailed(p, e) => {
                write!(f, "Failed to delete compiled artifact {p:?}: {e}")
            }
            RecoveryError::CopyFailed { from, to, source } => {
                write!(f, "Failed to copy {from:?} to {to:?}: {source}")
            }
        }
    }
}

impl std::error::Error for RecoveryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RecoveryError::DeleteFailed(_, e) => Some(e),
            RecoveryError::CopyFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, RecoveryError>;

pub trait RecoveryFileOperations: Send + Sync {
    fn remove_file(&self, path: &Path) -> io::Result<()>;
    // Overwrites `to` if it exists.
    fn copy_file(&self, from: &Path, to: &Path) -> io::Result<()>;
}

pub struct CoreRecoveryFileOperations {}

impl CoreRecoveryFileOperations {
    pub fn new() -> Self {
        CoreRecoveryFileOperations {}
    }
}

impl Default for CoreRecoveryFileOperations {
    fn default() -> Self {
        Self::new()
    }
}

impl RecoveryFileOperations for CoreRecoveryFileOperations {
    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn copy_file(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::copy(from, to).map(|_| ())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryAction {
    pub original_path: PathBuf,
    // Where the original is copied, keeping its own extension.
    pub output_path: PathBuf,
    pub compiled_output_path: PathBuf,
    pub requires_quantization: bool,
}

#[derive(Debug)]
pub struct RecoveryFailure {
    pub source_path: String,
    pub error: RecoveryError,
}

#[derive(Debug, Default)]
pub struct RecoveryReport {
    pub repaired: Vec<RecoveryAction>,
    pub failures: Vec<RecoveryFailure>,
    pub skipped: usize,
    // Output paths to quantize, in first-seen order without duplicates.
    pub quantize_worklist: Vec<PathBuf>,
}

// Progress notifications, emitted in log order while the pass runs.
#[derive(Debug)]
pub enum RecoveryEvent<'a> {
    Fixing(&'a RecoveryAction),
    Failed(&'a RecoveryFailure),
}

pub struct RecoveryEngine<'a> {
    config: &'a RecoveryConfig,
    file_ops: &'a dyn RecoveryFileOperations,
}

fn has_extension_in(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy())
        .is_some_and(|ext| extensions.iter().any(|allowed| *allowed == ext))
}

impl<'a> RecoveryEngine<'a> {
    pub fn new(config: &'a RecoveryConfig, file_ops: &'a dyn RecoveryFileOperations) -> Self {
        RecoveryEngine { config, file_ops }
    }

    /*
     * Decides whether `record` is repairable and, if so, derives the paths
     * involved. Only a failure naming the square-texture constraint, on a
     * source with one of the repairable extensions (exact, case-sensitive),
     * qualifies; everything else yields `None`. No file system access.
     */
    pub fn plan(&self, record: &FailureRecord) -> Option<RecoveryAction> {
        let config = self.config;
        if config.square_texture_marker.is_empty()
            || !record.reason_text.contains(&config.square_texture_marker)
        {
            return None;
        }
        let original_path = PathBuf::from(&record.source_path);
        if !has_extension_in(&original_path, &config.repairable_extensions) {
            return None;
        }

        let rewrite = &config.output_rewrite;
        let output_path = if rewrite.source_segment.is_empty() {
            original_path.clone()
        } else {
            PathBuf::from(
                record
                    .source_path
                    .replace(&rewrite.source_segment, &rewrite.output_segment),
            )
        };
        let compiled_output_path = output_path.with_extension(&config.compiled_extension);
        let requires_quantization = has_extension_in(&output_path, &config.quantizable_extensions);

        Some(RecoveryAction {
            original_path,
            output_path,
            compiled_output_path,
            requires_quantization,
        })
    }

    /*
     * Deletes the compiled artifact, then copies the original into the output
     * tree. A missing artifact counts as already deleted. The delete happens
     * before the copy, so a failed copy leaves the artifact gone.
     */
    pub fn apply(&self, action: &RecoveryAction) -> Result<()> {
        if action.output_path == action.original_path {
            return Err(RecoveryError::OutputPathUnchanged(
                action.original_path.clone(),
            ));
        }

        match self.file_ops.remove_file(&action.compiled_output_path) {
            Ok(()) => log::debug!(
                "RecoveryEngine: Deleted compiled artifact {:?}",
                action.compiled_output_path
            ),
            Err(e) if e.kind() == io::ErrorKind::NotFound => log::debug!(
                "RecoveryEngine: Compiled artifact {:?} already absent",
                action.compiled_output_path
            ),
            Err(e) => {
                return Err(RecoveryError::DeleteFailed(
                    action.compiled_output_path.clone(),
                    e,
                ));
            }
        }

        self.file_ops
            .copy_file(&action.original_path, &action.output_path)
            .map_err(|source| RecoveryError::CopyFailed {
                from: action.original_path.clone(),
                to: action.output_path.clone(),
                source,
            })?;
        log::debug!(
            "RecoveryEngine: Copied {:?} to {:?}",
            action.original_path,
            action.output_path
        );
        Ok(())
    }

    /*
     * Plans and applies every record in order. `on_event` sees each repair
     * just before it is attempted and each failure right after it happens.
     */
    pub fn run<I>(&self, records: I, mut on_event: impl FnMut(RecoveryEvent<'_>)) -> RecoveryReport
    where
        I: IntoIterator<Item = FailureRecord>,
    {
        let mut report = RecoveryReport::default();
        let mut queued: HashSet<PathBuf> = HashSet::new();

        for record in records {
            let Some(action) = self.plan(&record) else {
                log::trace!(
                    "RecoveryEngine: Skipping non-repairable failure for '{}'",
                    record.source_path
                );
                report.skipped += 1;
                continue;
            };

            on_event(RecoveryEvent::Fixing(&action));
            match self.apply(&action) {
                Ok(()) => {
                    if action.requires_quantization && queued.insert(action.output_path.clone()) {
                        report.quantize_worklist.push(action.output_path.clone());
                    }
                    report.repaired.push(action);
                }
                Err(error) => {
                    log::warn!(
                        "RecoveryEngine: Repair of '{}' failed: {error}",
                        record.source_path
                    );
                    let failure = RecoveryFailure {
                        source_path: record.source_path,
                        error,
                    };
                    on_event(RecoveryEvent::Failed(&failure));
                    report.failures.push(failure);
                }
            }
        }

        log::info!(
            "RecoveryEngine: {} repaired, {} failed, {} skipped, {} to quantize.",
            report.repaired.len(),
            report.failures.len(),
            report.skipped,
            report.quantize_worklist.len()
        );
        report
    }
}
