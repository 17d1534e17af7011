use crate::startup::AppState;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
};
use service_core::error::AppError;

pub const ANNOTATED_IMAGE_KEY: &str = "annotated.jpg";
pub const REPORT_KEY: &str = "report.pdf";

pub async fn get_result_image(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    serve_output(&state, ANNOTATED_IMAGE_KEY, "image/jpeg").await
}

pub async fn get_result_pdf(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    serve_output(&state, REPORT_KEY, "application/pdf").await
}

/// Streams back whatever the most recent analysis wrote under `key`.
async fn serve_output(
    state: &AppState,
    key: &'static str,
    content_type: &'static str,
) -> Result<impl IntoResponse, AppError> {
    let data = state.outputs.download(key).await.map_err(|e| {
        tracing::warn!(key = %key, error = %e, "Result not available");
        e
    })?;

    tracing::info!(key = %key, size = data.len(), "Result download completed");

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"{}\"", key),
            ),
            (header::CACHE_CONTROL, "no-store".to_string()),
        ],
        data,
    ))
}
