use crate::config::ExtractorConfig;
use crate::handlers;
use crate::services::{InvoiceExtractor, PdfTextExtractor, TextExtractor, UploadArchive};
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::llm::{AzureOpenAiClient, CompletionClient, CompletionParams};
use service_core::middleware::{metrics_middleware, request_id_middleware};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Headroom for multipart boundaries and part headers on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub config: ExtractorConfig,
    pub extractor: InvoiceExtractor,
    pub text_extractor: Arc<dyn TextExtractor>,
    pub archive: Arc<UploadArchive>,
}

pub struct Application {
    port: u16,
    server: Box<dyn std::future::Future<Output = std::io::Result<()>> + Send + Unpin>,
}

impl Application {
    pub async fn build(config: ExtractorConfig) -> Result<Self, AppError> {
        let client: Arc<dyn CompletionClient> =
            Arc::new(AzureOpenAiClient::new(config.llm.clone())?);
        Self::build_with(config, client, Arc::new(PdfTextExtractor)).await
    }

    /// Build with explicit backends; tests inject mocks here.
    pub async fn build_with(
        config: ExtractorConfig,
        client: Arc<dyn CompletionClient>,
        text_extractor: Arc<dyn TextExtractor>,
    ) -> Result<Self, AppError> {
        let archive = Arc::new(UploadArchive::new(&config.upload.dir).await.map_err(|e| {
            tracing::error!(
                "Failed to initialize upload archive at {}: {}",
                config.upload.dir,
                e
            );
            e
        })?);

        let state = AppState {
            extractor: InvoiceExtractor::new(client, CompletionParams::from(&config.llm)),
            text_extractor,
            archive,
            config: config.clone(),
        };

        let app = router(state);

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Listening on {}", port);

        let server = axum::serve(listener, app);

        Ok(Self {
            port,
            server: Box::new(server.into_future()),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.server.await
    }
}

pub fn router(state: AppState) -> Router {
    let body_limit = state.config.upload.max_bytes + MULTIPART_OVERHEAD_BYTES;

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .route("/extract", post(handlers::extract_invoice))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}
