//! Export of finished feature tables.
//!
//! An [`Exporter`] validates a job against its table, then hands the write to
//! a background thread and returns immediately. Progress is reported over a
//! channel on the returned [`ExportHandle`]; failed writes are retried with
//! exponential backoff.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::ExportSpec;
use crate::error::{PipelineError, Result};
use crate::table::FeatureTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
        }
    }
}

/// A named table export request.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportJob {
    pub description: String,
    pub folder: String,
    pub format: ExportFormat,
    /// Output columns, in order
    pub selectors: Vec<String>,
}

impl ExportJob {
    pub fn from_spec(spec: &ExportSpec) -> Self {
        Self {
            description: spec.description.clone(),
            folder: spec.folder.clone(),
            format: spec.format,
            selectors: spec.selectors.clone(),
        }
    }

    /// Project `table` onto the selectors. Fails on the first unknown column.
    pub fn validate(&self, table: &FeatureTable) -> Result<FeatureTable> {
        table.select(&self.selectors)
    }

    /// Path of the output file relative to a target root
    pub fn relative_path(&self) -> PathBuf {
        Path::new(&self.folder).join(format!("{}.{}", self.description, self.format.extension()))
    }
}

/// Destination that persists one table per job.
pub trait ExportTarget: Send + Sync {
    fn write(&self, job: &ExportJob, table: &FeatureTable) -> Result<PathBuf>;
}

/// Writes `<root>/<folder>/<description>.csv`.
#[derive(Debug, Clone)]
pub struct LocalDriveTarget {
    root: PathBuf,
}

impl LocalDriveTarget {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ExportTarget for LocalDriveTarget {
    fn write(&self, job: &ExportJob, table: &FeatureTable) -> Result<PathBuf> {
        let path = self.root.join(job.relative_path());
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut writer = csv::Writer::from_path(&path)?;
        writer.write_record(table.columns())?;
        for row in table.rows() {
            writer.write_record(row.iter().map(|v| v.to_string()))?;
        }
        writer.flush()?;

        debug!("Wrote {} rows to {}", table.len(), path.display());
        Ok(path)
    }
}

/// Retry schedule: attempt `n` failing waits `base_delay * 2^(n-1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    /// Delay after the given failed attempt (1-based)
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExportStatus {
    Running { attempt: u32 },
    Retrying { attempt: u32, error: String },
    Completed { path: PathBuf },
    Failed { attempts: u32, error: String },
}

impl ExportStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExportStatus::Completed { .. } | ExportStatus::Failed { .. })
    }
}

impl fmt::Display for ExportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportStatus::Running { attempt } => write!(f, "running (attempt {attempt})"),
            ExportStatus::Retrying { attempt, error } => {
                write!(f, "attempt {attempt} failed, retrying: {error}")
            }
            ExportStatus::Completed { path } => write!(f, "completed: {}", path.display()),
            ExportStatus::Failed { attempts, error } => {
                write!(f, "failed after {attempts} attempt(s): {error}")
            }
        }
    }
}

/// Submits export jobs to a target.
#[derive(Clone)]
pub struct Exporter {
    target: Arc<dyn ExportTarget>,
    retry: RetryPolicy,
}

impl Exporter {
    pub fn new(target: Arc<dyn ExportTarget>) -> Self {
        Self {
            target,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn local(root: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(LocalDriveTarget::new(root)))
    }

    /// Validate `job` against `table` and start writing in the background.
    ///
    /// Unknown selectors are reported here, before anything is spawned.
    pub fn submit(&self, job: ExportJob, table: &FeatureTable) -> Result<ExportHandle> {
        let projected = job.validate(table)?;
        let (tx, rx) = crossbeam_channel::unbounded();
        let target = Arc::clone(&self.target);
        let retry = self.retry;
        let description = job.description.clone();

        info!("Submitting export {} ({} rows)", job.description, projected.len());
        let worker = thread::Builder::new()
            .name(format!("export-{}", job.description))
            .spawn(move || run_job(target.as_ref(), &job, &projected, retry, &tx))?;

        Ok(ExportHandle {
            description,
            status: rx,
            last: None,
            worker: Some(worker),
        })
    }
}

fn run_job(
    target: &dyn ExportTarget,
    job: &ExportJob,
    table: &FeatureTable,
    retry: RetryPolicy,
    tx: &Sender<ExportStatus>,
) {
    let attempts = retry.max_retries + 1;
    for attempt in 1..=attempts {
        // The handle may be gone; the job still runs to completion.
        let _ = tx.send(ExportStatus::Running { attempt });
        match target.write(job, table) {
            Ok(path) => {
                info!("Export {} written to {}", job.description, path.display());
                let _ = tx.send(ExportStatus::Completed { path });
                return;
            }
            Err(e) if attempt < attempts => {
                warn!("Export {} attempt {attempt} failed: {e}", job.description);
                let _ = tx.send(ExportStatus::Retrying {
                    attempt,
                    error: e.to_string(),
                });
                thread::sleep(retry.delay(attempt));
            }
            Err(e) => {
                warn!("Export {} failed: {e}", job.description);
                let _ = tx.send(ExportStatus::Failed {
                    attempts,
                    error: e.to_string(),
                });
                return;
            }
        }
    }
}

/// Handle on a submitted export.
pub struct ExportHandle {
    description: String,
    status: Receiver<ExportStatus>,
    last: Option<ExportStatus>,
    worker: Option<thread::JoinHandle<()>>,
}

impl ExportHandle {
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Latest status without blocking; `None` until the worker reports.
    pub fn try_status(&mut self) -> Option<&ExportStatus> {
        while let Ok(status) = self.status.try_recv() {
            self.last = Some(status);
        }
        self.last.as_ref()
    }

    /// Block until the job finishes.
    pub fn wait(mut self) -> Result<PathBuf> {
        if !self.last.as_ref().is_some_and(ExportStatus::is_terminal) {
            for status in self.status.iter() {
                let done = status.is_terminal();
                self.last = Some(status);
                if done {
                    break;
                }
            }
        }
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }

        match self.last.take() {
            Some(ExportStatus::Completed { path }) => Ok(path),
            Some(ExportStatus::Failed { attempts, error }) => Err(PipelineError::ExportFailed {
                description: self.description,
                attempts,
                reason: error,
            }),
            _ => Err(PipelineError::ExportFailed {
                description: self.description,
                attempts: 0,
                reason: "export worker exited without reporting".into(),
            }),
        }
    }
}

impl fmt::Debug for ExportHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportHandle")
            .field("description", &self.description)
            .field("last", &self.last)
            .finish()
    }
}
