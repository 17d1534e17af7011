pub mod metrics;
pub mod storage;

pub use self::metrics::{get_metrics, init_metrics, record_analysis, AnalysisOutcome};
pub use storage::{sanitize_filename, LocalStorage, Storage};
