mod annotator;
mod detector;
mod report;

pub use annotator::{Annotator, BOX_COLOR};
pub use detector::{DemoDetector, Detector};
pub use report::{report_lines, ReportWriter, REPORT_TITLE};
