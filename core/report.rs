use crate::error::{AppError, Result};
use chrono::{DateTime, Local};
use log;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

const REPORT_RULE: &str = "==================================================";
const MAX_COLLISION_SUFFIX: u32 = 99;

/// Run counters carried into the report header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub files_analyzed: usize,
    pub files_skipped: usize,
    pub files_omitted: usize,
}

/// One completed analysis run. Immutable; persisted exactly once.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub generated_at: DateTime<Local>,
    pub root_path: PathBuf,
    pub body: String,
    pub summary: RunSummary,
}

impl AnalysisReport {
    pub fn new(root_path: PathBuf, body: String, summary: RunSummary) -> Self {
        Self {
            generated_at: Local::now(),
            root_path,
            body,
            summary,
        }
    }

    pub fn render(&self) -> String {
        format!(
            "Coding Assistant Analysis Report\n\
             {rule}\n\
             Generated: {generated}\n\
             Analyzed Directory: {root}\n\
             Files analyzed: {analyzed}\n\
             Files skipped: {skipped}\n\
             Files omitted from prompt: {omitted}\n\
             {rule}\n\
             \n\
             {body}\n\
             \n\
             {rule}\n\
             End of Analysis Report\n",
            rule = REPORT_RULE,
            generated = self.generated_at.format("%Y-%m-%d %H:%M:%S"),
            root = self.root_path.display(),
            analyzed = self.summary.files_analyzed,
            skipped = self.summary.files_skipped,
            omitted = self.summary.files_omitted,
            body = self.body,
        )
    }
}

/// Persist the report under `output_dir` as `analysis_<YYYYMMDD>_<HHMMSS>.txt`.
///
/// Creates the directory if absent. If two runs land in the same second the
/// name gets a numeric suffix (`_1` .. `_99`); `create_new` makes the
/// check-and-create atomic, so an existing report is never overwritten.
pub fn write_report(report: &AnalysisReport, output_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(output_dir).map_err(|e| AppError::DirCreation {
        path: output_dir.to_path_buf(),
        source: e,
    })?;

    let stamp = report.generated_at.format("%Y%m%d_%H%M%S");
    let content = report.render();

    for attempt in 0..=MAX_COLLISION_SUFFIX {
        let filename = if attempt == 0 {
            format!("analysis_{}.txt", stamp)
        } else {
            format!("analysis_{}_{}.txt", stamp, attempt)
        };
        let path = output_dir.join(&filename);

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                file.write_all(content.as_bytes())
                    .map_err(|e| AppError::FileWrite {
                        path: path.clone(),
                        source: e,
                    })?;
                log::info!("Analysis saved to: {}", path.display());
                return Ok(path);
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                log::debug!("Report name collision on {}, retrying.", path.display());
                continue;
            }
            Err(e) => {
                return Err(AppError::FileWrite { path, source: e });
            }
        }
    }

    Err(AppError::FileWrite {
        path: output_dir.join(format!("analysis_{}.txt", stamp)),
        source: std::io::Error::new(
            ErrorKind::AlreadyExists,
            "exhausted collision suffixes for this second",
        ),
    })
}
