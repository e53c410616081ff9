//! Job submission against the execution service.

use crate::config::Config;
use crate::error::SubmitError;
use crate::job::{JobOutcome, JobRequest};
use crate::wire::decode_outcome;
use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, info};

fn program_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]*$").expect("static regex"))
}

pub fn validate_program_name(name: &str) -> Result<(), SubmitError> {
    if program_name_re().is_match(name) {
        Ok(())
    } else {
        Err(SubmitError::InvalidProgramName(name.to_string()))
    }
}

/// Checks `raw` is an absolute http(s) URL and strips trailing slashes so
/// endpoint paths can be appended.
pub fn normalize_base_url(raw: &str) -> Result<String, SubmitError> {
    let invalid = |reason: &str| SubmitError::InvalidBaseUrl {
        url: raw.to_string(),
        reason: reason.to_string(),
    };
    let url = reqwest::Url::parse(raw.trim()).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https"));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(invalid("base URL must not carry a query or fragment"));
    }
    Ok(url.as_str().trim_end_matches('/').to_string())
}

fn build_client(builder: reqwest::ClientBuilder) -> Result<reqwest::Client, SubmitError> {
    builder.build().map_err(SubmitError::Client)
}

pub struct SubmitClient {
    http: reqwest::Client,
    base_url: String,
}

impl SubmitClient {
    pub fn new(cfg: &Config, base_url: &str) -> Result<Self, SubmitError> {
        let base_url = normalize_base_url(base_url)?;
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = cfg.service.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let http = build_client(builder)?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn upload_url(&self) -> String {
        format!("{}/upload", self.base_url)
    }

    pub fn program_url(&self, program: &str) -> String {
        format!("{}/pro/{}", self.base_url, program)
    }

    /// Ask the service to run `program` on an already uploaded file.
    ///
    /// Sends exactly one POST and waits for the whole body. The HTTP status is
    /// not interpreted; a body that does not decode is the failure signal.
    pub async fn submit(
        &self,
        program: &str,
        uploaded_basename: &str,
        parameters: &str,
    ) -> Result<JobOutcome, SubmitError> {
        validate_program_name(program)?;
        let url = self.program_url(program);
        let request = JobRequest::new(uploaded_basename, parameters);

        info!("submit program={program} file={}", request.filename);
        debug!(
            "POST {url} body={}",
            serde_json::to_string(&request).unwrap_or_default()
        );

        let transport = |source| SubmitError::Transport {
            url: url.clone(),
            source,
        };
        let resp = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(transport)?;
        let status = resp.status().as_u16();
        let raw = resp.bytes().await.map_err(transport)?;
        debug!("response HTTP {status} body={}", String::from_utf8_lossy(&raw));

        let outcome = decode_outcome(&raw).map_err(|source| SubmitError::Decode {
            url: url.clone(),
            status,
            source,
        })?;
        info!(
            "outcome status={} artifacts={}",
            outcome.status,
            outcome.artifact_locations.len()
        );
        Ok(outcome)
    }

    /// Raw listing of the programs registered on the service.
    pub async fn list_programs(&self) -> Result<String, SubmitError> {
        let url = format!("{}/pro/all", self.base_url);
        let transport = |source| SubmitError::Transport {
            url: url.clone(),
            source,
        };
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(transport)?
            .error_for_status()
            .map_err(transport)?;
        resp.text().await.map_err(transport)
    }
}
