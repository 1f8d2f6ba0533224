use crate::AppState;
use crate::api::error::AppError;
use crate::models::UploadedFile;
use crate::utils::validation::{
    FieldErrors, OrderedMergeFields, sanitize_filename, validate_ordered_form, validate_uploads,
};
use axum::{
    body::Body,
    extract::{Multipart, State},
    http::header,
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use futures::{StreamExt, future, stream};
use tokio_util::io::ReaderStream;

/// Fields collected from a merge form. Both `pdfs` and `pdfs[]` spellings are accepted.
#[derive(Debug, Default)]
pub struct MergeForm {
    pub pdfs: Vec<UploadedFile>,
    pub order: Vec<String>,
    pub output_name: Option<String>,
}

impl MergeForm {
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = MergeForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?
        {
            let name = field.name().unwrap_or_default().to_string();

            match name.trim_end_matches("[]") {
                "pdfs" => {
                    let original = field.file_name().map(|s| s.to_string());
                    let content_type = field.content_type().map(|s| s.to_string());
                    let content = field
                        .bytes()
                        .await
                        .map_err(|e| AppError::BadRequest(e.to_string()))?;

                    // Entries without a usable file name fail validation at their index
                    let name = original
                        .as_deref()
                        .and_then(sanitize_filename)
                        .unwrap_or_default();
                    if let Some(original) = original.as_deref() {
                        if original != name {
                            tracing::warn!("Upload name '{}' sanitized to '{}'", original, name);
                        }
                    }

                    form.pdfs.push(UploadedFile {
                        name,
                        content,
                        content_type,
                    });
                }
                "order" => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| AppError::BadRequest(e.to_string()))?;
                    form.order.push(text);
                }
                "output_name" => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| AppError::BadRequest(e.to_string()))?;
                    let text = text.trim();
                    if !text.is_empty() {
                        form.output_name = Some(text.to_string());
                    }
                }
                other => tracing::debug!("Ignoring unknown form field '{}'", other),
            }
        }

        Ok(form)
    }
}

#[utoipa::path(
    post,
    path = "/api/pdfs/merge",
    request_body(content = Multipart, description = "pdfs[] files, order[] logical names, optional output_name"),
    responses(
        (status = 200, description = "Merged PDF"),
        (status = 422, description = "Invalid input, unmatched order names or merge tool failure", body = crate::models::ErrorResponse),
        (status = 500, description = "Workspace failure", body = crate::models::ErrorResponse)
    ),
    tag = "pdfs"
)]
pub async fn merge_ordered(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let form = MergeForm::from_multipart(multipart).await?;
    let fields = OrderedMergeFields {
        order: form.order,
        output_name: form.output_name,
    };

    validate_ordered_form(&form.pdfs, &fields, state.config.max_file_size)
        .map_err(AppError::Validation)?;

    tracing::info!(
        "📥 Ordered merge of {} files ({} order entries)",
        form.pdfs.len(),
        fields.order.len()
    );

    let merged = state
        .merge_service
        .merge_ordered(&form.pdfs, &fields.order, fields.output_name.as_deref())
        .await?;

    let headers = [
        (header::CONTENT_TYPE, mime::APPLICATION_PDF.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", merged.filename),
        ),
    ];

    Ok((headers, merged.bytes).into_response())
}

#[utoipa::path(
    post,
    path = "/api/pdfs/merge-by-group",
    request_body(content = Multipart, description = "pdfs[] files, grouped by file name prefix"),
    responses(
        (status = 200, description = "Zip archive with one merged PDF per group"),
        (status = 422, description = "Invalid input", body = crate::models::ErrorResponse),
        (status = 500, description = "Merge tool, workspace or packaging failure", body = crate::models::ErrorResponse)
    ),
    tag = "pdfs"
)]
pub async fn merge_by_group(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let form = MergeForm::from_multipart(multipart).await?;

    let mut errors = FieldErrors::default();
    validate_uploads(&form.pdfs, state.config.max_file_size, &mut errors);
    errors.into_result().map_err(AppError::Validation)?;

    tracing::info!("📥 Group merge of {} files", form.pdfs.len());

    let archive = state.merge_service.merge_by_group(&form.pdfs).await?;

    let file = tokio::fs::File::open(&archive.path).await?;
    let length = file.metadata().await?.len();
    let filename = archive.filename.clone();

    // The workspace rides along with the body: destroyed after the last chunk,
    // or dropped with the body if the client goes away first
    let workspace = archive.workspace;
    let cleanup = stream::once(async move { workspace.destroy().await })
        .filter_map(|()| future::ready(None::<std::io::Result<Bytes>>));
    let body = ReaderStream::new(file).chain(cleanup);

    let headers = [
        (header::CONTENT_TYPE, "application/zip".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        ),
        (header::CONTENT_LENGTH, length.to_string()),
    ];

    Ok((headers, Body::from_stream(body)).into_response())
}
