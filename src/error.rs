//! Error types for submission, retrieval and the run as a whole.

use serde::Serialize;
use thiserror::Error;

/// Failure to get a decoded outcome out of the execution service.
#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("invalid service URL {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("could not build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// Program names end up as a URL path segment.
    #[error("invalid program name {0:?}")]
    InvalidProgramName(String),

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("could not decode response from {url} (HTTP {status}): {source}")]
    Decode {
        url: String,
        status: u16,
        #[source]
        source: serde_json::Error,
    },
}

/// Why a single artifact did not arrive in the output directory.
///
/// Recorded per artifact; never aborts the other downloads.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum ArtifactError {
    #[error("download failed: {0}")]
    Transfer(String),

    #[error("could not move artifact into place: {0}")]
    Relocate(String),

    #[error("location has no file name: {0}")]
    InvalidLocation(String),

    #[error("another artifact already claims {0}")]
    Collision(String),
}

/// Fatal errors of a run. Anything here stops the run before retrieval.
#[derive(Error, Debug)]
pub enum RunError {
    #[error("invalid input file {path}: {reason}")]
    InvalidInput { path: String, reason: String },

    #[error("upload of {path} failed")]
    Upload {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    #[error(transparent)]
    Submit(#[from] SubmitError),
}
