use crate::models::Finding;
use printpdf::{BuiltinFont, Mm, PdfDocument, Pt};
use service_core::error::AppError;

pub const REPORT_TITLE: &str = "NeuroScript - Screening Report (Demo Mode)";

const PAGE_WIDTH: Mm = Mm(210.0);
const PAGE_HEIGHT: Mm = Mm(297.0);
const FONT_SIZE: f32 = 12.0;
const LEFT_MARGIN: f32 = 50.0;
const TITLE_Y: f32 = 800.0;
const SUMMARY_Y: f32 = 770.0;
const FIRST_FINDING_Y: f32 = 740.0;
const LINE_HEIGHT: f32 = 20.0;

/// Text lines of the report, top to bottom.
pub fn report_lines(findings: &[Finding]) -> Vec<String> {
    let mut lines = Vec::with_capacity(findings.len() + 2);
    lines.push(REPORT_TITLE.to_string());
    lines.push(format!("Markers Detected: {}", findings.len()));
    lines.extend(findings.iter().map(|f| format!("- {} detected", f.kind)));
    lines
}

/// Renders the one-page screening report.
#[derive(Debug, Clone, Default)]
pub struct ReportWriter;

impl ReportWriter {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, findings: &[Finding]) -> Result<Vec<u8>, AppError> {
        let (doc, page, layer) = PdfDocument::new(REPORT_TITLE, PAGE_WIDTH, PAGE_HEIGHT, "Report");
        let font = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(|e| {
            AppError::InternalError(anyhow::anyhow!("Failed to load PDF font: {}", e))
        })?;
        let layer = doc.get_page(page).get_layer(layer);

        for (text, y) in report_lines(findings).iter().zip(line_positions()) {
            layer.use_text(
                text.as_str(),
                FONT_SIZE,
                Mm::from(Pt(LEFT_MARGIN)),
                Mm::from(Pt(y)),
                &font,
            );
        }

        let bytes = doc
            .save_to_bytes()
            .map_err(|e| AppError::InternalError(anyhow::anyhow!("Failed to write PDF: {}", e)))?;

        tracing::debug!(findings = findings.len(), size = bytes.len(), "Report rendered");
        Ok(bytes)
    }
}

/// Baseline heights in points: title, summary, then one per finding.
fn line_positions() -> impl Iterator<Item = f32> {
    [TITLE_Y, SUMMARY_Y]
        .into_iter()
        .chain((0u32..).map(|i| FIRST_FINDING_Y - i as f32 * LINE_HEIGHT))
}
