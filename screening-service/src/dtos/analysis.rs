use crate::models::{DetectionMode, Finding};
use serde::{Deserialize, Serialize};

pub const IMAGE_RESULT_URL: &str = "/result/image";
pub const PDF_RESULT_URL: &str = "/result/pdf";

#[derive(Debug, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub mode: DetectionMode,
    pub findings: Vec<Finding>,
    pub image_url: String,
    pub pdf_url: String,
}

impl AnalyzeResponse {
    pub fn new(mode: DetectionMode, findings: Vec<Finding>) -> Self {
        Self {
            mode,
            findings,
            image_url: IMAGE_RESULT_URL.to_string(),
            pdf_url: PDF_RESULT_URL.to_string(),
        }
    }
}
