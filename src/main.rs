use anyhow::Context;
use clap::Parser;
use dotenvy::dotenv;
use pdf_merge_service::config::MergeConfig;
use pdf_merge_service::services::merger::PdftkMerger;
use pdf_merge_service::services::sweeper::WorkspaceSweeper;
use pdf_merge_service::{AppState, create_app};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to bind the API server to
    #[arg(long, default_value = "127.0.0.1")]
    host: IpAddr,

    /// Port for the API server
    #[arg(short, long, default_value_t = 3000)]
    port: u16,

    /// Path to the merge tool, overrides PDFTK_PATH
    #[arg(long)]
    merge_tool: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Environment & Logging Setup
    dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pdf_merge_service=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("🚀 Starting PDF Merge Service...");

    // 2. Configuration & Merge Tool
    let mut config = MergeConfig::from_env();
    if let Some(tool) = args.merge_tool {
        config.merge_tool_path = Some(tool);
    }

    let tool = config
        .resolve_merge_tool()
        .context("Cannot start without a merge tool")?;
    info!(
        "🛠️  Merge tool: {} | Max file size: {}MB | Timeouts: ordered={}s group={}s",
        tool.display(),
        config.max_file_size / 1024 / 1024,
        config.ordered_merge_timeout_secs,
        config.group_merge_timeout_secs
    );

    tokio::fs::create_dir_all(&config.workspace_root)
        .await
        .with_context(|| {
            format!(
                "Cannot create workspace root {}",
                config.workspace_root.display()
            )
        })?;

    let state = AppState::new(Arc::new(PdftkMerger::new(tool)), config.clone());

    // 3. Shutdown Channel & Workspace Sweeper
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let sweeper = WorkspaceSweeper::new(
        config.workspace_root.clone(),
        config.workspace_max_age(),
        Duration::from_secs(config.workspace_sweep_interval_secs),
        shutdown_rx,
    );
    let sweeper_handle = tokio::spawn(sweeper.run());

    // 4. HTTP Server
    let app = create_app(state).layer(
        TraceLayer::new_for_http()
            .make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("unknown");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            })
            .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
                info!("📥 {} {}", request.method(), request.uri());
            })
            .on_response(
                |response: &axum::http::Response<_>,
                 latency: std::time::Duration,
                 _span: &tracing::Span| {
                    info!(
                        "📤 Finished in {:?} with status {}",
                        latency,
                        response.status()
                    );
                },
            ),
    );

    let addr = SocketAddr::from((args.host, args.port));
    info!("✅ Server ready at http://{}", addr);
    info!("📖 Swagger UI: http://{}/swagger-ui", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = shutdown_tx.send(true);
        })
        .await?;

    let _ = sweeper_handle.await;
    info!("🛑 Server shut down gracefully.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("⌨️  Ctrl+C received, starting graceful shutdown...");
        },
        _ = terminate => {
            info!("💤 SIGTERM received, starting graceful shutdown...");
        },
    }
}
