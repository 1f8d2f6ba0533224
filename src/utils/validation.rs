use crate::models::UploadedFile;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use validator::{Validate, ValidationErrors};

/// Declared content types expected for an uploaded PDF
pub const DECLARED_PDF_TYPES: &[&str] = &["application/pdf", "application/x-pdf"];

/// Maximum length of the requested output name
pub const MAX_OUTPUT_NAME_LEN: u64 = 100;

/// Field-level validation messages keyed by form field (`pdfs`, `pdfs.0`, `order.2`, ...)
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn merge_validator(&mut self, errors: &ValidationErrors) {
        for (field, errs) in errors.field_errors() {
            for err in errs.iter() {
                let message = err
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("The {} field is invalid.", field));
                self.add(field.to_string(), message);
            }
        }
    }

    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

/// Scalar fields of the ordered-merge form
#[derive(Debug, Default, Validate)]
pub struct OrderedMergeFields {
    #[validate(length(min = 1, message = "The order field is required."))]
    pub order: Vec<String>,
    #[validate(length(
        max = MAX_OUTPUT_NAME_LEN,
        message = "The output_name field must not be greater than 100 characters."
    ))]
    pub output_name: Option<String>,
}

/// Sanitizes a client file name to prevent path traversal.
/// Returns `None` when nothing usable remains.
pub fn sanitize_filename(filename: &str) -> Option<String> {
    // Take only the last component, whichever separator the client used
    let name = filename.rsplit(['/', '\\']).next().unwrap_or("");
    let name = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");

    if name.is_empty() || name.starts_with('.') {
        return None;
    }

    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_control()
                || c == ':'
                || c == '*'
                || c == '?'
                || c == '"'
                || c == '<'
                || c == '>'
                || c == '|'
                || c == ';'
            {
                '_'
            } else {
                c
            }
        })
        .collect();

    // Limit length safely for UTF-8
    if sanitized.len() > 255 {
        let mut end = 255;
        while !sanitized.is_char_boundary(end) {
            end -= 1;
        }
        Some(sanitized[..end].to_string())
    } else {
        Some(sanitized)
    }
}

/// Checks one uploaded entry: size, declared MIME type and PDF magic bytes.
pub fn validate_pdf_upload(
    field: &str,
    upload: &UploadedFile,
    max_size: usize,
    errors: &mut FieldErrors,
) {
    if upload.name.is_empty() {
        errors.add(field, format!("The {} field must be a file.", field));
        return;
    }

    if upload.content.len() > max_size {
        errors.add(
            field,
            format!(
                "The {} field must not be greater than {} kilobytes.",
                field,
                max_size / 1024
            ),
        );
    }

    // The content decides; a mismatched declared type is only worth a note
    if let Some(content_type) = &upload.content_type {
        let normalized = content_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_lowercase();
        if !DECLARED_PDF_TYPES.contains(&normalized.as_str()) {
            tracing::debug!(
                "Upload '{}' declared as '{}', checking its content",
                upload.name,
                normalized
            );
        }
    }

    let sniffed = infer::get(&upload.content).map(|kind| kind.mime_type());
    if sniffed != Some("application/pdf") {
        tracing::debug!(
            "Upload '{}' does not look like a PDF (detected {:?})",
            upload.name,
            sniffed
        );
        errors.add(
            field,
            format!("The {} field must be a file of type: pdf.", field),
        );
    }
}

/// Validates the uploads shared by both endpoints.
pub fn validate_uploads(uploads: &[UploadedFile], max_size: usize, errors: &mut FieldErrors) {
    if uploads.is_empty() {
        errors.add("pdfs", "The pdfs field is required.");
        return;
    }

    for (index, upload) in uploads.iter().enumerate() {
        validate_pdf_upload(&format!("pdfs.{}", index), upload, max_size, errors);
    }
}

/// Validates the ordered-merge form as a whole
pub fn validate_ordered_form(
    uploads: &[UploadedFile],
    fields: &OrderedMergeFields,
    max_size: usize,
) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::default();
    validate_uploads(uploads, max_size, &mut errors);

    if let Err(e) = fields.validate() {
        errors.merge_validator(&e);
    }

    for (index, name) in fields.order.iter().enumerate() {
        if name.trim().is_empty() {
            let field = format!("order.{}", index);
            errors.add(field.clone(), format!("The {} field is required.", field));
        }
    }

    errors.into_result()
}
