use crate::{job::JobOutcome, orchestrator::RunSummary, retrieve::ArtifactResult};
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub program: String,
    pub input: String,
    pub started: String,
    pub finished: String,
    pub outcome: JobOutcome,
    pub artifacts: Vec<ArtifactResult>,
    pub failed_artifacts: usize,
    pub exit_code: i32,
}

impl RunReport {
    pub fn new(program: &str, input: &Path, started: String, finished: String, summary: &RunSummary) -> Self {
        Self {
            program: program.to_string(),
            input: input.display().to_string(),
            started,
            finished,
            outcome: summary.outcome.clone(),
            artifacts: summary.artifacts.clone(),
            failed_artifacts: summary.failed_artifacts().count(),
            exit_code: summary.exit_code(),
        }
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            crate::util::ensure_dir(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)
            .with_context(|| format!("writing report: {}", path.display()))
    }
}
