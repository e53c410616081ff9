//! Concurrent artifact retrieval.
//!
//! Every location becomes one task: download into a private staging file,
//! then move into the output directory under the location's basename. A
//! failing task records its error on its own [`ArtifactResult`]; the others
//! carry on. [`Retriever::retrieve_all`] returns once every task has finished,
//! with results in input order.

use crate::config::{CollisionPolicy, Config};
use crate::error::ArtifactError;
use crate::transfer::Transfer;
use crate::util::{basename, hash_file, suffixed_name};
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactResult {
    pub location: String,
    pub local_path: PathBuf,
    pub error: Option<ArtifactError>,
    pub sha256: Option<String>,
}

impl ArtifactResult {
    fn failed(location: &str, local_path: PathBuf, error: ArtifactError) -> Self {
        Self {
            location: location.to_string(),
            local_path,
            error: Some(error),
            sha256: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

pub struct Retriever {
    transfer: Arc<dyn Transfer>,
    staging_dir: PathBuf,
    max_parallel: usize,
    collision: CollisionPolicy,
    checksum: bool,
}

impl Retriever {
    pub fn new(cfg: &Config, transfer: Arc<dyn Transfer>) -> Self {
        Self {
            transfer,
            staging_dir: PathBuf::from(&cfg.paths.work_dir),
            max_parallel: cfg.retrieval.max_parallel,
            collision: cfg.retrieval.collision_policy(),
            checksum: cfg.retrieval.checksum,
        }
    }

    pub async fn retrieve_all(&self, locations: &[String], dest: &Path) -> Vec<ArtifactResult> {
        if locations.is_empty() {
            return Vec::new();
        }

        if let Err(e) = tokio::fs::create_dir_all(&self.staging_dir).await {
            warn!(
                "cannot create staging dir {}: {e}",
                self.staging_dir.display()
            );
        }

        let targets = plan_targets(locations, dest, self.collision);
        let semaphore =
            (self.max_parallel > 0).then(|| Arc::new(Semaphore::new(self.max_parallel)));
        let mut slots: Vec<Option<ArtifactResult>> = vec![None; locations.len()];
        let mut set = JoinSet::new();

        for (index, (location, target)) in locations.iter().zip(targets).enumerate() {
            let target = match target {
                Ok(path) => path,
                Err(err) => {
                    warn!("skipping {location}: {err}");
                    slots[index] = Some(ArtifactResult::failed(location, dest.to_path_buf(), err));
                    continue;
                }
            };

            let unit = FetchUnit {
                transfer: Arc::clone(&self.transfer),
                location: location.clone(),
                staging: self
                    .staging_dir
                    .join(format!("{}-{index:04}.part", std::process::id())),
                target,
                checksum: self.checksum,
            };
            let semaphore = semaphore.clone();
            set.spawn(async move {
                // Held for the whole unit; dropped with the task.
                let _permit = match semaphore {
                    Some(s) => s.acquire_owned().await.ok(),
                    None => None,
                };
                (index, unit.run().await)
            });
        }

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(e) => warn!("artifact task did not complete: {e}"),
            }
        }

        let results: Vec<ArtifactResult> = slots
            .into_iter()
            .zip(locations)
            .map(|(slot, location)| {
                slot.unwrap_or_else(|| {
                    ArtifactResult::failed(
                        location,
                        dest.to_path_buf(),
                        ArtifactError::Transfer("download task aborted".to_string()),
                    )
                })
            })
            .collect();

        let failed = results.iter().filter(|r| !r.is_ok()).count();
        info!(
            "retrieved {}/{} artifacts into {}",
            results.len() - failed,
            results.len(),
            dest.display()
        );
        results
    }
}

/// Destination path for each location, with the collision policy applied.
fn plan_targets(
    locations: &[String],
    dest: &Path,
    policy: CollisionPolicy,
) -> Vec<Result<PathBuf, ArtifactError>> {
    let mut taken: HashSet<String> = HashSet::new();

    locations
        .iter()
        .map(|location| {
            let name = basename(location)
                .ok_or_else(|| ArtifactError::InvalidLocation(location.clone()))?;

            if !taken.contains(name) || policy == CollisionPolicy::Overwrite {
                taken.insert(name.to_string());
                return Ok(dest.join(name));
            }
            match policy {
                CollisionPolicy::Fail => Err(ArtifactError::Collision(name.to_string())),
                _ => {
                    let mut n = 1;
                    let mut candidate = suffixed_name(name, n);
                    while taken.contains(&candidate) {
                        n += 1;
                        candidate = suffixed_name(name, n);
                    }
                    taken.insert(candidate.clone());
                    Ok(dest.join(candidate))
                }
            }
        })
        .collect()
}

struct FetchUnit {
    transfer: Arc<dyn Transfer>,
    location: String,
    staging: PathBuf,
    target: PathBuf,
    checksum: bool,
}

impl FetchUnit {
    async fn run(self) -> ArtifactResult {
        debug!("fetch {} via {}", self.location, self.transfer.name());

        if let Err(e) = self.transfer.download(&self.location, &self.staging).await {
            let _ = tokio::fs::remove_file(&self.staging).await;
            warn!("download failed for {}: {e:#}", self.location);
            return ArtifactResult::failed(
                &self.location,
                self.target,
                ArtifactError::Transfer(format!("{e:#}")),
            );
        }

        if let Err(e) = relocate(&self.staging, &self.target).await {
            warn!(
                "cannot place {} at {}: {e}",
                self.location,
                self.target.display()
            );
            return ArtifactResult::failed(
                &self.location,
                self.target,
                ArtifactError::Relocate(e.to_string()),
            );
        }

        let sha256 = if self.checksum {
            match hash_file(&self.target).await {
                Ok(h) => Some(h),
                Err(e) => {
                    warn!("checksum failed for {}: {e:#}", self.target.display());
                    None
                }
            }
        } else {
            None
        };

        ArtifactResult {
            location: self.location,
            local_path: self.target,
            error: None,
            sha256,
        }
    }
}

/// Rename, falling back to copy + remove when the rename itself fails
/// (staging and destination on different filesystems).
async fn relocate(from: &Path, to: &Path) -> std::io::Result<()> {
    match tokio::fs::rename(from, to).await {
        Ok(()) => Ok(()),
        Err(rename_err) => match tokio::fs::copy(from, to).await {
            Ok(_) => {
                let _ = tokio::fs::remove_file(from).await;
                Ok(())
            }
            Err(_) => {
                let _ = tokio::fs::remove_file(from).await;
                Err(rename_err)
            }
        },
    }
}
