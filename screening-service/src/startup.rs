use crate::config::ScreeningConfig;
use crate::handlers;
use crate::processing::{Annotator, DemoDetector, Detector, ReportWriter};
use crate::services::{LocalStorage, Storage};
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    metrics_middleware, request_id_middleware, security_headers_middleware,
};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub config: ScreeningConfig,
    pub uploads: Arc<dyn Storage>,
    pub outputs: Arc<dyn Storage>,
    pub detector: Arc<dyn Detector>,
    pub annotator: Annotator,
    pub reports: ReportWriter,
}

impl AppState {
    pub async fn from_config(config: ScreeningConfig) -> Result<Self, AppError> {
        let uploads: Arc<dyn Storage> = Arc::new(
            LocalStorage::new(&config.storage.upload_dir)
                .await
                .map_err(|e| {
                    tracing::error!(
                        "Failed to initialize upload storage at {}: {}",
                        config.storage.upload_dir,
                        e
                    );
                    e
                })?,
        );
        let outputs: Arc<dyn Storage> = Arc::new(
            LocalStorage::new(&config.storage.output_dir)
                .await
                .map_err(|e| {
                    tracing::error!(
                        "Failed to initialize output storage at {}: {}",
                        config.storage.output_dir,
                        e
                    );
                    e
                })?,
        );

        let annotator = Annotator::from_config(&config.render)?;
        let detector: Arc<dyn Detector> = Arc::new(DemoDetector::new(config.detection.clone()));

        Ok(Self {
            config,
            uploads,
            outputs,
            detector,
            annotator,
            reports: ReportWriter::new(),
        })
    }
}

pub fn router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .route("/analyze", post(handlers::analyze_image))
        .route("/result/image", get(handlers::get_result_image))
        .route("/result/pdf", get(handlers::get_result_pdf))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub struct Application {
    port: u16,
    server: Box<dyn std::future::Future<Output = std::io::Result<()>> + Send + Unpin>,
}

impl Application {
    pub async fn build(config: ScreeningConfig) -> Result<Self, AppError> {
        config.validate()?;

        let state = AppState::from_config(config.clone()).await?;
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
