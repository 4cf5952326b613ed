use crate::config::{Adapter, ValidatorConfig};
use crate::handlers;
use crate::services::{ExtractorClient, InvoiceValidator};
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

/// Headroom for the `data` part and multipart framing on top of the file.
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

pub const VALIDATE_ROUTE: &str = "/api/validate_invoice";

#[derive(Clone)]
pub struct AppState {
    pub config: ValidatorConfig,
    pub extractor: ExtractorClient,
    pub validator: InvoiceValidator,
}

pub struct Application {
    port: u16,
    server: Box<dyn std::future::Future<Output = std::io::Result<()>> + Send + Unpin>,
}

impl Application {
    pub async fn build(config: ValidatorConfig) -> Result<Self, AppError> {
        let client: Arc<dyn CompletionClient> =
            Arc::new(AzureOpenAiClient::new(config.llm.clone())?);
        Self::build_with(config, client).await
    }

    /// Build with an explicit completion backend; tests inject a mock here.
    pub async fn build_with(
        config: ValidatorConfig,
        client: Arc<dyn CompletionClient>,
    ) -> Result<Self, AppError> {
        let state = AppState {
            extractor: ExtractorClient::new(config.extractor_url.clone()),
            validator: InvoiceValidator::new(client, CompletionParams::from(&config.llm)),
            config: config.clone(),
        };

        tracing::info!(
            extractor_url = %config.extractor_url,
            adapter = ?config.adapter,
            "Initialized invoice validator"
        );

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
    let body_limit = state.config.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;
    let validate = match state.config.adapter {
        Adapter::Service => post(handlers::validate_invoice),
        Adapter::Function => post(handlers::validate_invoice_function),
    };

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .route(VALIDATE_ROUTE, validate)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}
