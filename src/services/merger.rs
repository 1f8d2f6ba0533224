use crate::models::MergeJob;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use thiserror::Error;
use tokio::process::Command;

/// Directive placed between the inputs and the output path
pub const CONCAT_DIRECTIVE: [&str; 2] = ["cat", "output"];

#[derive(Error, Debug)]
pub enum MergeToolError {
    #[error("failed to start merge tool: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("merge tool exited with {status}")]
    Failed {
        status: ExitStatus,
        stderr: String,
        stdout: String,
    },

    #[error("merge tool timed out after {secs} seconds")]
    TimedOut { secs: u64 },

    #[error("merge tool reported success but produced no file at {}", .0.display())]
    MissingOutput(PathBuf),
}

impl MergeToolError {
    /// Logs the captured diagnostics of a failed run
    pub fn log(&self, target: &str) {
        match self {
            MergeToolError::Failed {
                status,
                stderr,
                stdout,
            } => {
                tracing::error!("❌ Merge tool error for {} ({}): {}", target, status, stderr.trim());
                tracing::error!("❌ Merge tool stdout for {}: {}", target, stdout.trim());
            }
            other => tracing::error!("❌ Merge failed for {}: {}", target, other),
        }
    }
}

/// Seam around the external PDF concatenation tool
#[async_trait::async_trait]
pub trait PdfMerger: Send + Sync {
    /// Concatenates `job.inputs` in order into `job.output`
    async fn merge(&self, job: &MergeJob) -> Result<(), MergeToolError>;

    /// Check if the tool is available
    async fn health_check(&self) -> bool;
}

/// Runs a pdftk-compatible command line:
/// `<tool> <input>... cat output <output>`
pub struct PdftkMerger {
    tool: PathBuf,
}

impl PdftkMerger {
    pub fn new(tool: impl Into<PathBuf>) -> Self {
        Self { tool: tool.into() }
    }
}

/// Arguments following the tool path, in invocation order
pub fn build_args(job: &MergeJob) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::with_capacity(job.inputs.len() + 3);
    args.extend(job.inputs.iter().map(|p| p.as_os_str().to_owned()));
    args.extend(CONCAT_DIRECTIVE.iter().map(OsString::from));
    args.push(job.output.as_os_str().to_owned());
    args
}

#[async_trait::async_trait]
impl PdfMerger for PdftkMerger {
    async fn merge(&self, job: &MergeJob) -> Result<(), MergeToolError> {
        let args = build_args(job);
        tracing::info!(
            "Merge command: {} {}",
            self.tool.display(),
            args.iter()
                .map(|a| format!("\"{}\"", a.to_string_lossy()))
                .collect::<Vec<_>>()
                .join(" ")
        );

        let child = Command::new(&self.tool)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(MergeToolError::Spawn)?;

        let output = match job.timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| MergeToolError::TimedOut {
                    secs: limit.as_secs(),
                })?,
            None => child.wait_with_output().await,
        }
        .map_err(MergeToolError::Spawn)?;

        if !output.status.success() {
            return Err(MergeToolError::Failed {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            });
        }

        if !tokio::fs::try_exists(&job.output).await.unwrap_or(false) {
            return Err(MergeToolError::MissingOutput(job.output.clone()));
        }

        Ok(())
    }

    async fn health_check(&self) -> bool {
        tokio::fs::metadata(&self.tool)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }
}
