use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub service: Service,
    #[serde(default)]
    pub transfer: Transfer,
    #[serde(default)]
    pub retrieval: Retrieval,
    #[serde(default)]
    pub paths: Paths,
    #[serde(default)]
    pub output: Output,
    #[serde(default)]
    pub logging: Logging,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        match self.transfer.backend.as_str() {
            "http" | "curl" => {}
            other => return Err(anyhow!("unknown transfer.backend: {other}")),
        }
        if self.transfer.upload_field.trim().is_empty() {
            return Err(anyhow!("transfer.upload_field must not be empty"));
        }
        self.retrieval
            .on_collision
            .parse::<CollisionPolicy>()
            .map_err(|e| anyhow!("retrieval.on_collision: {e}"))?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    /// Base URL of the execution service, e.g. `http://127.0.0.1:8082`.
    pub base_url: String,
    /// Timeout for the submission request; 0 waits indefinitely.
    pub request_timeout_seconds: u64,
}
impl Default for Service {
    fn default() -> Self {
        Self {
            base_url: "".into(),
            request_timeout_seconds: 0,
        }
    }
}

impl Service {
    pub fn request_timeout(&self) -> Option<Duration> {
        seconds(self.request_timeout_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transfer {
    /// `http` (in-process) or `curl` (external binary).
    pub backend: String,
    pub curl_exe: String,
    pub upload_field: String,
    /// Per upload/download timeout; 0 waits indefinitely.
    pub timeout_seconds: u64,
}
impl Default for Transfer {
    fn default() -> Self {
        Self {
            backend: "http".into(),
            curl_exe: "curl".into(),
            upload_field: "file".into(),
            timeout_seconds: 0,
        }
    }
}

impl Transfer {
    pub fn timeout(&self) -> Option<Duration> {
        seconds(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Retrieval {
    /// Upper bound on simultaneous downloads; 0 means one task per artifact.
    pub max_parallel: usize,
    pub on_collision: String,
    pub checksum: bool,
    pub create_output_dir: bool,
}
impl Default for Retrieval {
    fn default() -> Self {
        Self {
            max_parallel: 0,
            on_collision: "fail".into(),
            checksum: true,
            create_output_dir: true,
        }
    }
}

impl Retrieval {
    pub fn collision_policy(&self) -> CollisionPolicy {
        self.on_collision.parse().unwrap_or_default()
    }
}

/// What happens when two artifact locations share a basename.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CollisionPolicy {
    #[default]
    Fail,
    Rename,
    Overwrite,
}

impl std::str::FromStr for CollisionPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "fail" => Ok(Self::Fail),
            "rename" => Ok(Self::Rename),
            "overwrite" => Ok(Self::Overwrite),
            other => Err(format!("unknown collision policy: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paths {
    /// Downloads land here before being moved into the output directory.
    pub work_dir: String,
}
impl Default for Paths {
    fn default() -> Self {
        Self {
            work_dir: ".remote-run-work".into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Output {
    pub json: bool,
    pub report_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: false,
            file_path: "remote-run.log".into(),
        }
    }
}

fn seconds(n: u64) -> Option<Duration> {
    (n > 0).then(|| Duration::from_secs(n))
}
