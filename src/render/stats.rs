//! Per-build render report.

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::scout::ScoutReport;
use crate::template::TemplateError;
use crate::writer::WriteError;

/// Why one page did not make it to the writer.
#[derive(Debug, Error)]
pub enum RenderFailure {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("enqueue failed: {0}")]
    Write(#[from] WriteError),

    #[error("template engine panicked: {0}")]
    Panic(String),
}

#[derive(Debug)]
pub struct PageFailure {
    pub source_path: PathBuf,
    pub error: RenderFailure,
}

/// Outcome of one build. Page failures never abort the build; they are
/// collected here.
#[derive(Debug, Default)]
pub struct RenderStats {
    /// Pages rendered and handed to the writer.
    pub rendered: usize,
    pub failed: Vec<PageFailure>,
    /// Pages never started because the build was cancelled.
    pub skipped: usize,
    /// Pages the writer reports as written.
    pub written: usize,
    /// Waves fully processed.
    pub waves: usize,
    pub cancelled: bool,
    /// Set when flushing the writer failed.
    pub writer_error: Option<WriteError>,
    pub scout: ScoutReport,
    pub elapsed: Duration,
}

impl RenderStats {
    /// Every page rendered and written, and the build was not cancelled.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.writer_error.is_none() && !self.cancelled
    }

    pub fn failed_paths(&self) -> impl Iterator<Item = &Path> {
        self.failed.iter().map(|f| f.source_path.as_path())
    }

    pub fn failure_for(&self, source_path: &Path) -> Option<&RenderFailure> {
        self.failed
            .iter()
            .find(|f| f.source_path == source_path)
            .map(|f| &f.error)
    }
}
