use bytes::Bytes;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use utoipa::ToSchema;

/// A file received in the multipart form, before it touches the disk.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Client-declared name, already sanitized
    pub name: String,
    pub content: Bytes,
    pub content_type: Option<String>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            content_type: Some(mime::APPLICATION_PDF.to_string()),
        }
    }

    /// Logical name with its last extension removed
    pub fn stem(&self) -> &str {
        strip_extension(&self.name)
    }
}

/// An upload persisted inside a workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub logical_name: String,
    /// On-disk name, differs from `logical_name` after a collision
    pub file_name: String,
    pub path: PathBuf,
}

impl StagedFile {
    pub fn stem(&self) -> &str {
        strip_extension(&self.logical_name)
    }
}

/// Files bucketed under one grouping key, in natural order.
#[derive(Debug, Clone)]
pub struct Group {
    pub key: String,
    pub files: Vec<StagedFile>,
}

impl Group {
    /// File name of the merged output for this group
    pub fn output_file_name(&self) -> String {
        if self.key.is_empty() {
            "_.pdf".to_string()
        } else {
            format!("{}.pdf", self.key)
        }
    }
}

/// One invocation of the external merge tool.
#[derive(Debug, Clone)]
pub struct MergeJob {
    pub inputs: Vec<PathBuf>,
    pub output: PathBuf,
    pub timeout: Option<Duration>,
}

/// Merged result of the ordered path, already read into memory.
#[derive(Debug)]
pub struct MergedPdf {
    pub filename: String,
    pub bytes: Bytes,
}

#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

/// Strips the last `.ext` of a file name, keeping dot-only or leading-dot names intact.
pub fn strip_extension(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((base, _)) if !base.is_empty() => base,
        _ => name,
    }
}
