use serde::{Deserialize, Serialize};

/// Body of the submission POST. `parameta` is the service's field name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRequest {
    pub filename: String,
    #[serde(rename = "parameta")]
    pub parameters: String,
}

impl JobRequest {
    /// `filename` is reduced to its final component; the service only knows
    /// uploads by basename.
    pub fn new(filename: &str, parameters: impl Into<String>) -> Self {
        Self {
            filename: crate::util::basename(filename).unwrap_or(filename).to_string(),
            parameters: parameters.into(),
        }
    }
}

/// Result of one remote run, in the service's canonical wire shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobOutcome {
    pub status: OutcomeStatus,
    #[serde(rename = "stdout")]
    pub standard_output: String,
    #[serde(rename = "stderr")]
    pub standard_error: String,
    #[serde(rename = "errmsg", default)]
    pub error_message: String,
    #[serde(rename = "outURLs", default)]
    pub artifact_locations: Vec<String>,
}

impl JobOutcome {
    pub fn status(&self) -> OutcomeStatus {
        self.status
    }

    pub fn is_ok(&self) -> bool {
        self.status == OutcomeStatus::Ok
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OutcomeStatus {
    Ok,
    ProgramError,
    ProgramTimeout,
    ServerError,
}

impl OutcomeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OutcomeStatus::Ok => "ok",
            OutcomeStatus::ProgramError => "program error",
            OutcomeStatus::ProgramTimeout => "program timeout",
            OutcomeStatus::ServerError => "server error",
        }
    }
}

impl std::fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for OutcomeStatus {
    fn from(raw: String) -> Self {
        classify(&raw)
    }
}

impl From<OutcomeStatus> for String {
    fn from(status: OutcomeStatus) -> Self {
        status.as_str().to_string()
    }
}

/// Map a wire status onto the closed outcome set.
///
/// Anything unrecognized is a server error; an unknown status is never `ok`.
pub fn classify(raw: &str) -> OutcomeStatus {
    match raw {
        "ok" => OutcomeStatus::Ok,
        "program error" => OutcomeStatus::ProgramError,
        "program timeout" => OutcomeStatus::ProgramTimeout,
        "server error" => OutcomeStatus::ServerError,
        _ => OutcomeStatus::ServerError,
    }
}
