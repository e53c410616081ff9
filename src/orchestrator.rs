use crate::{
    config::Config,
    error::RunError,
    job::{JobOutcome, OutcomeStatus},
    retrieve::{ArtifactResult, Retriever},
    submit::{validate_program_name, SubmitClient},
    transfer::Transfer,
    util::{basename, ensure_dir},
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// One remote run as the caller describes it.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub program: String,
    pub input: PathBuf,
    pub out_dir: PathBuf,
    pub parameters: String,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub outcome: JobOutcome,
    pub artifacts: Vec<ArtifactResult>,
}

impl RunSummary {
    pub fn failed_artifacts(&self) -> impl Iterator<Item = &ArtifactResult> {
        self.artifacts.iter().filter(|a| !a.is_ok())
    }

    /// 0 all good, 2 the remote program did not succeed, 3 the program
    /// succeeded but some artifact did not arrive. Fatal errors exit 1
    /// before a summary exists.
    pub fn exit_code(&self) -> i32 {
        if self.outcome.status() != OutcomeStatus::Ok {
            2
        } else if self.failed_artifacts().next().is_some() {
            3
        } else {
            0
        }
    }
}

pub struct Orchestrator {
    cfg: Config,
    client: SubmitClient,
    transfer: Arc<dyn Transfer>,
}

impl Orchestrator {
    pub fn new(cfg: &Config, client: SubmitClient, transfer: Arc<dyn Transfer>) -> Self {
        Self {
            cfg: cfg.clone(),
            client,
            transfer,
        }
    }

    /// Upload the input and have the service run the program on it.
    ///
    /// Any failure here is fatal: a job is either fully submitted and
    /// decoded, or not attempted.
    pub async fn submit(&self, req: &RunRequest) -> Result<JobOutcome, RunError> {
        validate_input(&req.input)?;
        validate_program_name(&req.program)?;
        let input_str = req.input.display().to_string();

        let upload_url = self.client.upload_url();
        info!("upload {} -> {upload_url} via {}", input_str, self.transfer.name());
        let started = Instant::now();
        let out = self
            .transfer
            .upload(&req.input, &upload_url)
            .await
            .map_err(|source| RunError::Upload {
                path: input_str.clone(),
                source: source.into(),
            })?;
        debug!("upload stdout: {}", out.stdout.trim());
        debug!("upload stderr: {}", out.stderr.trim());
        debug!("upload took {:?}", started.elapsed());

        let uploaded = basename(&input_str).unwrap_or(&input_str);
        let outcome = self
            .client
            .submit(&req.program, uploaded, &req.parameters)
            .await?;
        Ok(outcome)
    }

    /// Fetch every artifact the outcome names, whatever its status.
    pub async fn retrieve(&self, outcome: &JobOutcome, out_dir: &Path) -> Vec<ArtifactResult> {
        if outcome.artifact_locations.is_empty() {
            debug!("no artifacts to retrieve");
            return Vec::new();
        }
        if self.cfg.retrieval.create_output_dir {
            if let Err(e) = ensure_dir(out_dir) {
                warn!("{e:#}");
            }
        }
        let retriever = Retriever::new(&self.cfg, Arc::clone(&self.transfer));
        retriever
            .retrieve_all(&outcome.artifact_locations, out_dir)
            .await
    }

    /// `submit` followed by `retrieve`, for callers that render afterwards.
    pub async fn run(&self, req: &RunRequest) -> Result<RunSummary, RunError> {
        let outcome = self.submit(req).await?;
        let artifacts = self.retrieve(&outcome, &req.out_dir).await;
        Ok(RunSummary { outcome, artifacts })
    }
}

fn validate_input(input: &Path) -> Result<(), RunError> {
    let invalid = |reason: &str| RunError::InvalidInput {
        path: input.display().to_string(),
        reason: reason.to_string(),
    };
    match std::fs::metadata(input) {
        Ok(meta) if meta.is_file() => Ok(()),
        Ok(_) => Err(invalid("not a regular file")),
        Err(e) => Err(invalid(&e.to_string())),
    }
}
