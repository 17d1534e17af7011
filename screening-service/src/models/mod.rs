pub mod finding;

pub use finding::{BoundingBox, DetectionMode, Finding, FindingKind};
