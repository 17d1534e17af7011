use crate::dtos::AnalyzeResponse;
use crate::handlers::results::{ANNOTATED_IMAGE_KEY, REPORT_KEY};
use crate::models::Finding;
use crate::services::{record_analysis, sanitize_filename, AnalysisOutcome};
use crate::startup::AppState;
use axum::{
    body::Bytes,
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;

const IMAGE_FIELD: &str = "image";

struct ImageUpload {
    filename: String,
    data: Bytes,
}

struct Rendered {
    findings: Vec<Finding>,
    width: u32,
    height: u32,
    annotated: Vec<u8>,
    report: Vec<u8>,
}

pub async fn analyze_image(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<AnalyzeResponse>, AppError> {
    match run_analysis(&state, multipart).await {
        Ok(response) => {
            record_analysis(AnalysisOutcome::Success, &response.findings);
            Ok(Json(response))
        }
        Err(e) => {
            let outcome = match e {
                AppError::BadRequest(_) | AppError::PayloadTooLarge(_) => {
                    AnalysisOutcome::RejectedInput
                }
                _ => AnalysisOutcome::Failed,
            };
            record_analysis(outcome, &[]);
            tracing::warn!(error = %e, "Analysis failed");
            Err(e)
        }
    }
}

async fn run_analysis(
    state: &AppState,
    mut multipart: Multipart,
) -> Result<AnalyzeResponse, AppError> {
    let upload = read_image_field(&mut multipart).await?;

    tracing::info!(
        filename = %upload.filename,
        size = upload.data.len(),
        "Image upload received"
    );

    state
        .uploads
        .upload(&upload.filename, upload.data.to_vec())
        .await
        .map_err(|e| {
            tracing::error!("Failed to store upload {}: {}", upload.filename, e);
            e
        })?;

    let detector = state.detector.clone();
    let annotator = state.annotator.clone();
    let reports = state.reports.clone();
    let data = upload.data;

    // Decoding, drawing and encoding are CPU-bound.
    let rendered = tokio::task::spawn_blocking(move || -> Result<Rendered, AppError> {
        let mut image = annotator.decode(&data)?;
        let (width, height) = image.dimensions();
        let findings = detector.detect(width, height);
        annotator.annotate(&mut image, &findings);
        let annotated = annotator.encode_jpeg(&image)?;
        let report = reports.render(&findings)?;
        Ok(Rendered {
            findings,
            width,
            height,
            annotated,
            report,
        })
    })
    .await??;

    state
        .outputs
        .upload(ANNOTATED_IMAGE_KEY, rendered.annotated)
        .await
        .map_err(|e| {
            tracing::error!("Failed to write annotated image: {}", e);
            e
        })?;
    state
        .outputs
        .upload(REPORT_KEY, rendered.report)
        .await
        .map_err(|e| {
            tracing::error!("Failed to write report: {}", e);
            e
        })?;

    tracing::info!(
        filename = %upload.filename,
        width = rendered.width,
        height = rendered.height,
        findings = rendered.findings.len(),
        "Analysis completed"
    );

    Ok(AnalyzeResponse::new(state.detector.mode(), rendered.findings))
}

async fn read_image_field(multipart: &mut Multipart) -> Result<ImageUpload, AppError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let filename = sanitize_filename(field.file_name().unwrap_or_default());
        let data = field.bytes().await.map_err(multipart_error)?;

        if data.is_empty() {
            return Err(AppError::BadRequest(anyhow::anyhow!("Uploaded image is empty")));
        }

        return Ok(ImageUpload { filename, data });
    }

    Err(AppError::BadRequest(anyhow::anyhow!(
        "Missing multipart field '{}'",
        IMAGE_FIELD
    )))
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(anyhow::anyhow!("{}", e.body_text()))
    } else {
        AppError::BadRequest(anyhow::anyhow!("Failed to read multipart field: {}", e))
    }
}
