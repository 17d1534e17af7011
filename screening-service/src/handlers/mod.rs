pub mod analysis;
pub mod health;
pub mod results;

pub use analysis::analyze_image;
pub use health::{health_check, metrics_endpoint};
pub use results::{get_result_image, get_result_pdf, ANNOTATED_IMAGE_KEY, REPORT_KEY};
