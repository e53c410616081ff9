pub mod curl;
pub mod http;

use crate::config::Config;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

pub use curl::CurlTransfer;
pub use http::HttpTransfer;

/// Captured output of one transfer. The HTTP backend reports the response
/// body as `stdout` and leaves `stderr` empty.
#[derive(Debug, Clone, Default)]
pub struct TransferOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Moves bytes between this machine and the execution service.
#[async_trait]
pub trait Transfer: Send + Sync {
    fn name(&self) -> &str;

    /// Send `local` to `url` as a file upload.
    async fn upload(&self, local: &Path, url: &str) -> Result<TransferOutput>;

    /// Fetch `url` into the file at `target`, replacing it if present.
    async fn download(&self, url: &str, target: &Path) -> Result<TransferOutput>;
}

/// Build the backend named by `transfer.backend`.
pub fn from_config(cfg: &Config) -> Result<Arc<dyn Transfer>> {
    match cfg.transfer.backend.as_str() {
        "http" => Ok(Arc::new(HttpTransfer::new(cfg)?)),
        "curl" => Ok(Arc::new(CurlTransfer::new(cfg))),
        other => Err(anyhow!("unknown transfer backend: {other}")),
    }
}
