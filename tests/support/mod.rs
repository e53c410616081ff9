#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::{Path as UrlPath, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use remote_run::{
    config::Config,
    transfer::{Transfer, TransferOutput},
};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Barrier;

/// In-process stand-in for the execution service.
#[derive(Clone, Default)]
pub struct ServiceState {
    pub posts: Arc<AtomicUsize>,
    pub requests: Arc<Mutex<Vec<(String, serde_json::Value)>>>,
    pub uploads: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
    pub response: Arc<(u16, String)>,
}

pub struct FakeService {
    pub base: String,
    pub state: ServiceState,
}

/// `respond` gets the base URL so artifact locations can point back at the
/// fake service.
pub async fn spawn_service(respond: impl FnOnce(&str) -> (u16, String)) -> FakeService {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let state = ServiceState {
        response: Arc::new(respond(&base)),
        ..Default::default()
    };

    let app = Router::new()
        .route("/upload", post(upload))
        .route("/pro/all", get(list_programs))
        .route("/pro/:name", post(run_program))
        .route("/out/:file", get(artifact))
        .with_state(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    FakeService { base, state }
}

/// Bodies containing `reject-me` are refused with 422 and a reason.
async fn upload(
    State(s): State<ServiceState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, &'static str) {
    let content_type = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    if !content_type.starts_with("multipart/form-data") {
        return (StatusCode::BAD_REQUEST, "expected multipart");
    }
    if String::from_utf8_lossy(&body).contains("reject-me") {
        return (StatusCode::UNPROCESSABLE_ENTITY, "upload rejected");
    }
    s.uploads.lock().unwrap().push((content_type, body.to_vec()));
    (StatusCode::OK, "stored")
}

async fn list_programs() -> &'static str {
    "convertToJson\nsortCsv\n"
}

async fn run_program(
    State(s): State<ServiceState>,
    UrlPath(name): UrlPath<String>,
    Json(req): Json<serde_json::Value>,
) -> (StatusCode, String) {
    s.posts.fetch_add(1, Ordering::SeqCst);
    s.requests.lock().unwrap().push((name, req));
    let (code, body) = &*s.response;
    (StatusCode::from_u16(*code).unwrap(), body.clone())
}

async fn artifact(UrlPath(file): UrlPath<String>) -> Result<String, StatusCode> {
    if file.starts_with("missing") {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(format!("content of {file}"))
}

/// A port nothing listens on.
pub async fn dead_base_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

pub fn test_config(work_dir: &Path) -> Config {
    let mut cfg = Config::default();
    cfg.paths.work_dir = work_dir.display().to_string();
    cfg
}

/// Transfer that never touches the network. Locations containing `fail`
/// fail; everything else is written as `content of <location>`.
#[derive(Default)]
pub struct FakeTransfer {
    pub calls: AtomicUsize,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub delay: Duration,
    pub barrier: Option<Barrier>,
}

impl FakeTransfer {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Default::default()
        }
    }

    pub fn with_barrier(n: usize) -> Self {
        Self {
            barrier: Some(Barrier::new(n)),
            ..Default::default()
        }
    }
}

#[async_trait]
impl Transfer for FakeTransfer {
    fn name(&self) -> &str {
        "fake"
    }

    async fn upload(&self, _local: &Path, _url: &str) -> Result<TransferOutput> {
        Ok(TransferOutput::default())
    }

    async fn download(&self, url: &str, target: &Path) -> Result<TransferOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if url.contains("fail") {
            anyhow::bail!("404 Not Found for {url}");
        }
        tokio::fs::write(target, format!("content of {url}")).await?;
        Ok(TransferOutput::default())
    }
}
