pub mod api;
pub mod config;
pub mod models;
pub mod services;
pub mod utils;

use crate::config::MergeConfig;
use crate::services::merge_service::MergeService;
use crate::services::merger::PdfMerger;
use axum::{
    Router,
    middleware::from_fn,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::merge::merge_ordered,
        api::handlers::merge::merge_by_group,
        api::handlers::health::health_check,
    ),
    components(
        schemas(
            models::ErrorResponse,
            api::handlers::health::HealthResponse,
        )
    ),
    tags(
        (name = "pdfs", description = "PDF merge endpoints"),
        (name = "system", description = "Service status")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub merger: Arc<dyn PdfMerger>,
    pub merge_service: Arc<MergeService>,
    pub config: MergeConfig,
}

impl AppState {
    pub fn new(merger: Arc<dyn PdfMerger>, config: MergeConfig) -> Self {
        let merge_service = Arc::new(MergeService::new(merger.clone(), config.clone()));
        Self {
            merger,
            merge_service,
            config,
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(api::handlers::health::health_check))
        .route("/api/pdfs/merge", post(api::handlers::merge::merge_ordered))
        .route(
            "/api/pdfs/merge-by-group",
            post(api::handlers::merge::merge_by_group),
        )
        .layer(from_fn(api::middleware::request_id::request_id_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
                .expose_headers(Any),
        )
        .layer(axum::extract::DefaultBodyLimit::max(
            state.config.max_request_size,
        ))
        .with_state(state)
}
