//! Per-request temporary directory tree.

use crate::models::{StagedFile, UploadedFile};
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::io::AsyncWriteExt;

/// Name prefix of every workspace root, also used by the sweeper
pub const WORKSPACE_PREFIX: &str = "pdf-merger-";

const UPLOADS_DIR: &str = "uploads";
const MERGED_DIR: &str = "merged";

/// Request-scoped workspace: `<root>/uploads` and `<root>/merged`.
///
/// The root is removed by [`Workspace::destroy`] or, on any other exit path
/// (error, panic, dropped future), when the value is dropped. Removal runs on
/// the blocking pool whenever a tokio runtime is available.
#[derive(Debug)]
pub struct Workspace {
    root: Option<TempDir>,
    path: PathBuf,
    uploads: PathBuf,
    merged: PathBuf,
}

impl Workspace {
    pub async fn create(base: &Path) -> io::Result<Self> {
        tokio::fs::create_dir_all(base).await?;
        let root = tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir_in(base)?;

        let uploads = root.path().join(UPLOADS_DIR);
        let merged = root.path().join(MERGED_DIR);
        tokio::fs::create_dir_all(&uploads).await?;
        tokio::fs::create_dir_all(&merged).await?;

        tracing::debug!("Created workspace {}", root.path().display());
        Ok(Self {
            path: root.path().to_path_buf(),
            root: Some(root),
            uploads,
            merged,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn uploads_dir(&self) -> &Path {
        &self.uploads
    }

    pub fn merged_dir(&self) -> &Path {
        &self.merged
    }

    /// Writes an upload into `uploads/`, never overwriting an existing file.
    ///
    /// A taken name becomes `<base>_conflict_<n>.<ext>` with the first free `n`.
    pub async fn stage(&self, upload: &UploadedFile) -> io::Result<StagedFile> {
        let mut attempt = 0u32;
        loop {
            let file_name = if attempt == 0 {
                upload.name.clone()
            } else {
                conflict_name(&upload.name, attempt)
            };
            let path = self.uploads.join(&file_name);

            let opened = tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await;

            match opened {
                Ok(mut file) => {
                    file.write_all(&upload.content).await?;
                    file.flush().await?;
                    if attempt > 0 {
                        tracing::info!(
                            "Upload '{}' collided, staged as '{}'",
                            upload.name,
                            file_name
                        );
                    }
                    return Ok(StagedFile {
                        logical_name: upload.name.clone(),
                        file_name,
                        path,
                    });
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => return Err(e),
            }
        }
    }

    /// Stages every upload in order
    pub async fn stage_all(&self, uploads: &[UploadedFile]) -> io::Result<Vec<StagedFile>> {
        let mut staged = Vec::with_capacity(uploads.len());
        for upload in uploads {
            staged.push(self.stage(upload).await?);
        }
        Ok(staged)
    }

    /// Drops staged inputs and per-group outputs, keeping anything at the root.
    pub async fn clear_intermediates(&self) -> io::Result<()> {
        tokio::fs::remove_dir_all(&self.uploads).await?;
        tokio::fs::remove_dir_all(&self.merged).await?;
        Ok(())
    }

    /// Removes the whole workspace tree, waiting for the removal to finish.
    pub async fn destroy(mut self) {
        let Some(root) = self.root.take() else {
            return;
        };
        let path = self.path.clone();
        match tokio::task::spawn_blocking(move || root.close()).await {
            Ok(Ok(())) => tracing::debug!("Removed workspace {}", path.display()),
            Ok(Err(e)) => tracing::error!("Failed to remove workspace {}: {}", path.display(), e),
            Err(e) => tracing::error!("Workspace removal task failed for {}: {}", path.display(), e),
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        let Some(root) = self.root.take() else {
            return;
        };
        tracing::debug!("Workspace {} dropped, removing", self.path.display());
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(move || drop(root));
            }
            Err(_) => drop(root),
        }
    }
}

fn conflict_name(name: &str, n: u32) -> String {
    match name.rsplit_once('.') {
        Some((base, ext)) if !base.is_empty() => format!("{}_conflict_{}.{}", base, n, ext),
        _ => format!("{}_conflict_{}", name, n),
    }
}
