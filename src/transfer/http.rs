use super::{Transfer, TransferOutput};
use crate::config::Config;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use std::path::Path;
use tracing::debug;

/// Transfers over the service's own HTTP endpoints.
pub struct HttpTransfer {
    client: reqwest::Client,
    upload_field: String,
}

impl HttpTransfer {
    pub fn new(cfg: &Config) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = cfg.transfer.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("building HTTP client")?;
        Ok(Self {
            client,
            upload_field: cfg.transfer.upload_field.clone(),
        })
    }
}

#[async_trait]
impl Transfer for HttpTransfer {
    fn name(&self) -> &str {
        "http"
    }

    async fn upload(&self, local: &Path, url: &str) -> Result<TransferOutput> {
        let file_name = local
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        let bytes = tokio::fs::read(local)
            .await
            .with_context(|| format!("reading {}", local.display()))?;
        debug!("upload {} ({} bytes) -> {url}", local.display(), bytes.len());

        let part = Part::bytes(bytes).file_name(file_name);
        let form = Form::new().part(self.upload_field.clone(), part);

        let resp = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .with_context(|| format!("POST {url}"))?;
        let status = resp.status();
        if !status.is_success() {
            // The status is the error; an unreadable body only loses detail.
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!("POST {url} returned {status}: {}", body.trim()));
        }
        let body = resp
            .text()
            .await
            .with_context(|| format!("reading response of {url}"))?;
        Ok(TransferOutput {
            stdout: body,
            stderr: String::new(),
        })
    }

    async fn download(&self, url: &str, target: &Path) -> Result<TransferOutput> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("GET {url} returned {status}"));
        }
        let bytes = resp
            .bytes()
            .await
            .with_context(|| format!("reading body of {url}"))?;
        tokio::fs::write(target, &bytes)
            .await
            .with_context(|| format!("writing {}", target.display()))?;
        debug!("download {url} -> {} ({} bytes)", target.display(), bytes.len());
        Ok(TransferOutput::default())
    }
}
