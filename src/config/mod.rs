use anyhow::{Context, Result, anyhow};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Runtime configuration for the merge service
#[derive(Debug, Clone)]
pub struct MergeConfig {
    /// Maximum size of a single uploaded PDF in bytes (default: 10 MB)
    pub max_file_size: usize,

    /// Maximum size of a whole multipart request in bytes (default: 256 MB)
    pub max_request_size: usize,

    /// Explicit path to the merge tool, skips the PATH lookup when set
    pub merge_tool_path: Option<PathBuf>,

    /// Merge tool binary name searched on PATH (default: "pdftk")
    pub merge_tool_name: String,

    /// Timeout for the single ordered merge in seconds (default: 60)
    pub ordered_merge_timeout_secs: u64,

    /// Timeout for each group merge in seconds (default: 600)
    pub group_merge_timeout_secs: u64,

    /// Number of group merges allowed to run at once (default: 1)
    pub merge_concurrency: usize,

    /// Directory under which per-request workspaces are created
    pub workspace_root: PathBuf,

    /// Age after which an abandoned workspace is swept (default: 24)
    pub workspace_max_age_hours: u64,

    /// Interval between sweeper runs in seconds (default: 3600)
    pub workspace_sweep_interval_secs: u64,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            max_file_size: 10 * 1024 * 1024,     // 10 MB
            max_request_size: 256 * 1024 * 1024, // 256 MB
            merge_tool_path: None,
            merge_tool_name: "pdftk".to_string(),
            ordered_merge_timeout_secs: 60,
            group_merge_timeout_secs: 600,
            merge_concurrency: 1,
            workspace_root: env::temp_dir(),
            workspace_max_age_hours: 24,
            workspace_sweep_interval_secs: 3600,
        }
    }
}

impl MergeConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            max_file_size: env::var("MAX_FILE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_file_size),

            max_request_size: env::var("MAX_REQUEST_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_request_size),

            merge_tool_path: env::var("PDFTK_PATH")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),

            merge_tool_name: env::var("MERGE_TOOL").unwrap_or(default.merge_tool_name),

            ordered_merge_timeout_secs: env::var("ORDERED_MERGE_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.ordered_merge_timeout_secs),

            group_merge_timeout_secs: env::var("GROUP_MERGE_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.group_merge_timeout_secs),

            merge_concurrency: env::var("MERGE_CONCURRENCY")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(default.merge_concurrency),

            workspace_root: env::var("WORKSPACE_ROOT")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(default.workspace_root),

            workspace_max_age_hours: env::var("WORKSPACE_MAX_AGE_HOURS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.workspace_max_age_hours),

            workspace_sweep_interval_secs: env::var("WORKSPACE_SWEEP_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.workspace_sweep_interval_secs),
        }
    }

    /// Create config for development (short timeouts, frequent sweeps)
    pub fn development() -> Self {
        Self {
            ordered_merge_timeout_secs: 30,
            group_merge_timeout_secs: 120,
            workspace_max_age_hours: 1,
            workspace_sweep_interval_secs: 300,
            ..Self::default()
        }
    }

    /// Age after which the sweeper removes a workspace
    pub fn workspace_max_age(&self) -> Duration {
        Duration::from_secs(self.workspace_max_age_hours.saturating_mul(3600))
    }

    /// Resolves the merge tool location once, at start-up.
    ///
    /// An explicit `PDFTK_PATH` wins; a bare name in it is still looked up on
    /// PATH. Without one, `MERGE_TOOL` is searched on PATH.
    pub fn resolve_merge_tool(&self) -> Result<PathBuf> {
        match &self.merge_tool_path {
            Some(path) if is_explicit_path(path) => {
                if path.is_file() {
                    Ok(path.clone())
                } else {
                    Err(anyhow!(
                        "Merge tool not found at configured path {}",
                        path.display()
                    ))
                }
            }
            Some(name) => which::which(name)
                .with_context(|| format!("Merge tool '{}' not found on PATH", name.display())),
            None => which::which(&self.merge_tool_name).with_context(|| {
                format!(
                    "Merge tool '{}' not found on PATH (set PDFTK_PATH to override)",
                    self.merge_tool_name
                )
            }),
        }
    }
}

fn is_explicit_path(path: &Path) -> bool {
    path.is_absolute() || path.components().count() > 1
}
