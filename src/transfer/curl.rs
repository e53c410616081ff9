use super::{Transfer, TransferOutput};
use crate::config::Config;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Transfers by shelling out to `curl`.
pub struct CurlTransfer {
    curl_exe: PathBuf,
    upload_field: String,
    timeout: Option<Duration>,
}

impl CurlTransfer {
    pub fn new(cfg: &Config) -> Self {
        Self {
            curl_exe: PathBuf::from(&cfg.transfer.curl_exe),
            upload_field: cfg.transfer.upload_field.clone(),
            timeout: cfg.transfer.timeout(),
        }
    }

    pub fn upload_args(&self, local: &Path, url: &str) -> Vec<String> {
        vec![
            "-sS".into(),
            "--fail".into(),
            "-X".into(),
            "POST".into(),
            "-F".into(),
            format!("{}=@{}", self.upload_field, local.display()),
            url.into(),
        ]
    }

    pub fn download_args(&self, url: &str, target: &Path) -> Vec<String> {
        vec![
            "-sS".into(),
            "--fail".into(),
            "-L".into(),
            "-o".into(),
            target.display().to_string(),
            url.into(),
        ]
    }

    async fn run(&self, args: Vec<String>) -> Result<TransferOutput> {
        debug!("{} {}", self.curl_exe.display(), args.join(" "));
        let child = Command::new(&self.curl_exe)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("spawning {}", self.curl_exe.display()))?;

        let output = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(res) => res,
                Err(_) => {
                    warn!("curl timed out after {:?}", limit);
                    return Err(anyhow!("curl exceeded timeout ({:?})", limit));
                }
            },
            None => child.wait_with_output().await,
        }
        .with_context(|| "waiting for curl")?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            return Err(anyhow!("curl exited with {code}: {}", stderr.trim()));
        }
        Ok(TransferOutput { stdout, stderr })
    }
}

#[async_trait]
impl Transfer for CurlTransfer {
    fn name(&self) -> &str {
        "curl"
    }

    async fn upload(&self, local: &Path, url: &str) -> Result<TransferOutput> {
        self.run(self.upload_args(local, url)).await
    }

    async fn download(&self, url: &str, target: &Path) -> Result<TransferOutput> {
        self.run(self.download_args(url, target)).await
    }
}
