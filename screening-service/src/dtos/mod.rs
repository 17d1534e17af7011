pub mod analysis;

pub use analysis::{AnalyzeResponse, IMAGE_RESULT_URL, PDF_RESULT_URL};
