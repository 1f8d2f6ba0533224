use crate::api::error::{AppError, MergeScope};
use crate::config::MergeConfig;
use crate::models::{Group, MergeJob, MergedPdf, UploadedFile};
use crate::services::grouping::partition;
use crate::services::merger::PdfMerger;
use crate::services::ordering::resolve_order;
use crate::services::packager::{ARCHIVE_NAME, build_archive, output_filename};
use crate::services::workspace::Workspace;
use bytes::Bytes;
use futures::{StreamExt, TryStreamExt, stream};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Zip produced by the group merge. Owns its workspace, which the caller
/// destroys once the archive has been sent.
#[derive(Debug)]
pub struct PackagedArchive {
    pub workspace: Workspace,
    pub path: PathBuf,
    pub filename: String,
}

pub struct MergeService {
    merger: Arc<dyn PdfMerger>,
    config: MergeConfig,
}

impl MergeService {
    pub fn new(merger: Arc<dyn PdfMerger>, config: MergeConfig) -> Self {
        Self { merger, config }
    }

    /// Merges the uploads into one PDF following `order`.
    pub async fn merge_ordered(
        &self,
        uploads: &[UploadedFile],
        order: &[String],
        output_name: Option<&str>,
    ) -> Result<MergedPdf, AppError> {
        let workspace = Workspace::create(&self.config.workspace_root).await?;
        let result = self.run_ordered(&workspace, uploads, order).await;
        workspace.destroy().await;

        let bytes = result?;
        Ok(MergedPdf {
            filename: output_filename(output_name),
            bytes,
        })
    }

    async fn run_ordered(
        &self,
        workspace: &Workspace,
        uploads: &[UploadedFile],
        order: &[String],
    ) -> Result<Bytes, AppError> {
        let staged = workspace.stage_all(uploads).await?;
        let inputs = resolve_order(order, &staged)?;

        let job = MergeJob {
            inputs,
            output: workspace.path().join("merged.pdf"),
            timeout: Some(Duration::from_secs(self.config.ordered_merge_timeout_secs)),
        };

        self.merger
            .merge(&job)
            .await
            .map_err(|source| AppError::MergeFailed {
                scope: MergeScope::Ordered,
                source,
            })?;

        let bytes = tokio::fs::read(&job.output).await?;
        tracing::info!(
            "✅ Merged {} files into {} bytes",
            job.inputs.len(),
            bytes.len()
        );
        Ok(Bytes::from(bytes))
    }

    /// Groups the uploads by file name, merges each group and zips the results.
    ///
    /// The first failing group aborts the whole batch.
    pub async fn merge_by_group(&self, uploads: &[UploadedFile]) -> Result<PackagedArchive, AppError> {
        let workspace = Workspace::create(&self.config.workspace_root).await?;

        match self.run_grouped(&workspace, uploads).await {
            Ok(path) => Ok(PackagedArchive {
                workspace,
                path,
                filename: ARCHIVE_NAME.to_string(),
            }),
            Err(e) => {
                tracing::error!("❌ Group merge aborted: {}", e);
                workspace.destroy().await;
                Err(e)
            }
        }
    }

    async fn run_grouped(
        &self,
        workspace: &Workspace,
        uploads: &[UploadedFile],
    ) -> Result<PathBuf, AppError> {
        tracing::info!("Files received: {}", uploads.len());
        for (index, upload) in uploads.iter().enumerate() {
            tracing::debug!("File {}: {}", index, upload.name);
        }

        let staged = workspace.stage_all(uploads).await?;
        let groups = partition(staged);

        tracing::info!("Groups formed: {}", groups.len());
        for group in &groups {
            tracing::info!("Group '{}': {} files", group.key, group.files.len());
        }

        // Futures are collected first so the stream holds no borrowing closure
        let jobs: Vec<_> = groups
            .iter()
            .map(|group| self.merge_group(workspace, group))
            .collect();
        let merged: Vec<PathBuf> = stream::iter(jobs)
            .buffered(self.config.merge_concurrency.max(1))
            .try_collect()
            .await?;

        if merged.is_empty() {
            return Err(AppError::NothingGenerated);
        }

        let archive_path = workspace.path().join(ARCHIVE_NAME);
        let dest = archive_path.clone();
        let size = tokio::task::spawn_blocking(move || build_archive(&merged, &dest))
            .await
            .map_err(|e| AppError::Internal(format!("Archive task failed: {}", e)))??;
        tracing::info!("✅ Final archive: {} bytes", size);

        workspace.clear_intermediates().await?;
        Ok(archive_path)
    }

    async fn merge_group(&self, workspace: &Workspace, group: &Group) -> Result<PathBuf, AppError> {
        let job = MergeJob {
            inputs: group.files.iter().map(|f| f.path.clone()).collect(),
            output: workspace.merged_dir().join(group.output_file_name()),
            timeout: Some(Duration::from_secs(self.config.group_merge_timeout_secs)),
        };

        tracing::info!(
            "Merging group '{}' with {} files",
            group.key,
            job.inputs.len()
        );

        self.merger
            .merge(&job)
            .await
            .map_err(|source| AppError::MergeFailed {
                scope: MergeScope::Group(group.key.clone()),
                source,
            })?;

        let size = tokio::fs::metadata(&job.output).await?.len();
        tracing::info!("✅ PDF generated: {} ({} bytes)", group.output_file_name(), size);
        Ok(job.output)
    }
}
