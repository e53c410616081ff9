//! Response decoding.
//!
//! The execution service has shipped two response shapes: one carrying a
//! `status` string (optionally with `errmsg`), and an older one reporting
//! `cmdStartSuccess`/`cmdEndSuccess` booleans. Both decode into the same
//! [`JobOutcome`]; nothing downstream sees which shape arrived.

use crate::job::{classify, JobOutcome, OutcomeStatus};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    cmd_start_success: Option<bool>,
    #[serde(default)]
    cmd_end_success: Option<bool>,
    #[serde(default)]
    stdout: Option<String>,
    #[serde(default)]
    stderr: Option<String>,
    #[serde(default)]
    errmsg: Option<String>,
    #[serde(default, rename = "outURLs")]
    out_urls: Option<Vec<String>>,
}

impl WireResponse {
    fn status(&self) -> OutcomeStatus {
        if let Some(raw) = self.status.as_deref() {
            return classify(raw);
        }
        match (self.cmd_start_success, self.cmd_end_success) {
            (Some(false), _) => OutcomeStatus::ServerError,
            (Some(true), Some(false)) => OutcomeStatus::ProgramError,
            (Some(true), Some(true)) => OutcomeStatus::Ok,
            _ => OutcomeStatus::ServerError,
        }
    }

    fn into_outcome(self) -> JobOutcome {
        JobOutcome {
            status: self.status(),
            standard_output: self.stdout.unwrap_or_default(),
            standard_error: self.stderr.unwrap_or_default(),
            error_message: self.errmsg.unwrap_or_default(),
            artifact_locations: self.out_urls.unwrap_or_default(),
        }
    }
}

/// Decode a raw response body into a canonical outcome.
pub fn decode_outcome(body: &[u8]) -> Result<JobOutcome, serde_json::Error> {
    let wire: WireResponse = serde_json::from_slice(body)?;
    Ok(wire.into_outcome())
}
