use crate::services::merger::MergeToolError;
use crate::utils::validation::FieldErrors;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;
use thiserror::Error;

/// Merge flow a tool failure came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeScope {
    Ordered,
    Group(String),
}

impl fmt::Display for MergeScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeScope::Ordered => write!(f, "ordered merge"),
            MergeScope::Group(key) => write!(f, "group '{}'", key),
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("The given data was invalid.")]
    Validation(FieldErrors),

    #[error("The order contains file names that were not uploaded: {}", .0.join(", "))]
    UnmatchedOrder(Vec<String>),

    #[error("No valid PDF files were found to merge.")]
    NoValidFiles,

    #[error("No merged PDF could be generated.")]
    NothingGenerated,

    #[error("PDF merge failed for {scope}: {source}")]
    MergeFailed {
        scope: MergeScope,
        #[source]
        source: MergeToolError,
    },

    #[error("Workspace error: {0}")]
    Workspace(#[from] std::io::Error),

    #[error("Packaging error: {0}")]
    Packaging(String),

    #[error("Internal Server Error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            AppError::Validation(fields) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({ "error": self.to_string(), "errors": fields }),
            ),
            AppError::UnmatchedOrder(_) | AppError::NoValidFiles => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({ "error": self.to_string() }),
            ),
            AppError::NothingGenerated => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": self.to_string() }),
            ),
            AppError::MergeFailed { scope, source } => {
                source.log(&scope.to_string());
                // The ordered form reports every failure as unprocessable
                let status = match scope {
                    MergeScope::Ordered => StatusCode::UNPROCESSABLE_ENTITY,
                    MergeScope::Group(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (
                    status,
                    json!({ "error": format!("PDF merge failed for {}", scope) }),
                )
            }
            AppError::Workspace(e) => {
                tracing::error!("Workspace error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Failed to prepare temporary workspace" }),
                )
            }
            AppError::Packaging(msg) => {
                tracing::error!("Packaging error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Failed to package merged PDFs" }),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal Server Error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use serde_json::Value;

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_unmatched_order_lists_every_name() {
        let err = AppError::UnmatchedOrder(vec!["missing1".into(), "missing2".into()]);
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let json = body_json(response).await;
        let message = json["error"].as_str().unwrap();
        assert!(message.contains("missing1"));
        assert!(message.contains("missing2"));
    }

    #[tokio::test]
    async fn test_validation_carries_field_errors() {
        let mut fields = FieldErrors::default();
        fields.add("pdfs", "The pdfs field is required.");
        let response = AppError::Validation(fields).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let json = body_json(response).await;
        assert_eq!(json["errors"]["pdfs"][0], "The pdfs field is required.");
    }

    #[tokio::test]
    async fn test_processing_errors_are_server_errors() {
        let response = AppError::NothingGenerated.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = AppError::MergeFailed {
            scope: MergeScope::Group("10".to_string()),
            source: MergeToolError::TimedOut { secs: 600 },
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["error"], "PDF merge failed for group '10'");
    }

    #[tokio::test]
    async fn test_ordered_tool_failure_is_unprocessable() {
        let response = AppError::MergeFailed {
            scope: MergeScope::Ordered,
            source: MergeToolError::TimedOut { secs: 60 },
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let json = body_json(response).await;
        assert_eq!(json["error"], "PDF merge failed for ordered merge");
    }
}
