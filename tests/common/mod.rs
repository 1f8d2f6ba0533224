#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response},
};
use http_body_util::BodyExt;
use pdf_merge_service::config::MergeConfig;
use pdf_merge_service::models::MergeJob;
use pdf_merge_service::services::merger::{MergeToolError, PdfMerger};
use pdf_merge_service::{AppState, create_app};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

pub const BOUNDARY: &str = "---------------------------123456789012345678901234567";

/// Deterministic stand-in for pdftk: writes the inputs back to back.
#[derive(Default)]
pub struct ConcatMerger {
    pub jobs: Mutex<Vec<MergeJob>>,
}

#[async_trait::async_trait]
impl PdfMerger for ConcatMerger {
    async fn merge(&self, job: &MergeJob) -> Result<(), MergeToolError> {
        self.jobs.lock().unwrap().push(job.clone());
        let mut out = Vec::new();
        for input in &job.inputs {
            out.extend(tokio::fs::read(input).await.map_err(MergeToolError::Spawn)?);
        }
        tokio::fs::write(&job.output, out)
            .await
            .map_err(MergeToolError::Spawn)?;
        Ok(())
    }

    async fn health_check(&self) -> bool {
        true
    }
}

/// Always fails, like pdftk on a corrupt input
pub struct FailingMerger;

#[async_trait::async_trait]
impl PdfMerger for FailingMerger {
    async fn merge(&self, _job: &MergeJob) -> Result<(), MergeToolError> {
        Err(MergeToolError::TimedOut { secs: 1 })
    }

    async fn health_check(&self) -> bool {
        false
    }
}

/// Concatenating merger with a per-output delay and an optional failing
/// output, tracking how many merges were in flight at once.
#[derive(Default)]
pub struct ScriptedMerger {
    pub delays: HashMap<String, Duration>,
    pub fail_output: Option<String>,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub started: Mutex<Vec<String>>,
}

impl ScriptedMerger {
    pub fn with_delays(delays: &[(&str, u64)]) -> Self {
        Self {
            delays: delays
                .iter()
                .map(|(name, ms)| (name.to_string(), Duration::from_millis(*ms)))
                .collect(),
            ..Self::default()
        }
    }
}

#[async_trait::async_trait]
impl PdfMerger for ScriptedMerger {
    async fn merge(&self, job: &MergeJob) -> Result<(), MergeToolError> {
        let name = job.output.file_name().unwrap().to_string_lossy().to_string();
        self.started.lock().unwrap().push(name.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delays.get(&name) {
            tokio::time::sleep(*delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_output.as_deref() == Some(name.as_str()) {
            return Err(MergeToolError::TimedOut { secs: 1 });
        }

        let mut out = Vec::new();
        for input in &job.inputs {
            out.extend(tokio::fs::read(input).await.map_err(MergeToolError::Spawn)?);
        }
        tokio::fs::write(&job.output, out)
            .await
            .map_err(MergeToolError::Spawn)?;
        Ok(())
    }

    async fn health_check(&self) -> bool {
        true
    }
}

pub struct FilePart {
    pub field: String,
    pub filename: String,
    pub content_type: String,
    pub content: Vec<u8>,
}

impl FilePart {
    /// A valid PDF upload named `<name>.pdf` whose body identifies `name`
    pub fn pdf(name: &str) -> Self {
        Self {
            field: "pdfs[]".to_string(),
            filename: format!("{}.pdf", name),
            content_type: "application/pdf".to_string(),
            content: pdf_bytes(name),
        }
    }
}

pub fn pdfs(names: &[&str]) -> Vec<FilePart> {
    names.iter().map(|n| FilePart::pdf(n)).collect()
}

pub fn pdf_bytes(label: &str) -> Vec<u8> {
    format!("%PDF-1.4\n% {}\n", label).into_bytes()
}

pub fn test_config(workspace_root: &Path) -> MergeConfig {
    MergeConfig {
        workspace_root: workspace_root.to_path_buf(),
        max_file_size: 1024 * 1024,
        ..MergeConfig::development()
    }
}

pub fn test_app(merger: Arc<dyn PdfMerger>, workspace_root: &Path) -> Router {
    test_app_with_config(merger, test_config(workspace_root))
}

pub fn test_app_with_config(merger: Arc<dyn PdfMerger>, config: MergeConfig) -> Router {
    create_app(AppState::new(merger, config))
}

pub fn multipart_body(files: &[FilePart], texts: &[(&str, &str)]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in files {
        body.extend(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                BOUNDARY, part.field, part.filename, part.content_type
            )
            .as_bytes(),
        );
        body.extend(&part.content);
        body.extend(b"\r\n");
    }
    for (field, value) in texts {
        body.extend(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, field, value
            )
            .as_bytes(),
        );
    }
    body.extend(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub async fn post_multipart(app: &Router, uri: &str, body: Vec<u8>) -> Response<Body> {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(
                    "Content-Type",
                    format!("multipart/form-data; boundary={}", BOUNDARY),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

pub fn dir_is_empty(path: &Path) -> bool {
    std::fs::read_dir(path).unwrap().next().is_none()
}
