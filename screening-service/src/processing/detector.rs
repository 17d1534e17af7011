use crate::config::DetectionConfig;
use crate::models::{BoundingBox, DetectionMode, Finding, FindingKind};
use rand::Rng;

/// Produces findings for an image of the given dimensions.
///
/// The JSON contract of `/analyze` only depends on this trait, so a
/// model-backed implementation can replace [`DemoDetector`] without touching
/// the handlers.
pub trait Detector: Send + Sync {
    fn mode(&self) -> DetectionMode;

    fn detect(&self, width: u32, height: u32) -> Vec<Finding>;
}

/// Random placeholder generator used while no model is available.
#[derive(Debug, Clone, Default)]
pub struct DemoDetector {
    config: DetectionConfig,
}

impl DemoDetector {
    pub fn new(config: DetectionConfig) -> Self {
        Self { config }
    }

    pub fn generate_with<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        width: u32,
        height: u32,
    ) -> Vec<Finding> {
        let count = rng.gen_range(self.config.min_findings..=self.config.max_findings);

        (0..count)
            .map(|_| {
                let x1 = rng.gen_range(0..=start_limit(width));
                let y1 = rng.gen_range(0..=start_limit(height));
                let x2 = clamp_edge(x1, self.box_extent(rng), width);
                let y2 = clamp_edge(y1, self.box_extent(rng), height);
                let kind = FindingKind::ALL[rng.gen_range(0..FindingKind::ALL.len())];

                Finding {
                    kind,
                    bbox: BoundingBox::new(x1, y1, x2, y2),
                }
            })
            .collect()
    }

    fn box_extent<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        rng.gen_range(self.config.min_box_size..=self.config.max_box_size)
    }
}

impl Detector for DemoDetector {
    fn mode(&self) -> DetectionMode {
        DetectionMode::Demo
    }

    fn detect(&self, width: u32, height: u32) -> Vec<Finding> {
        let findings = self.generate_with(&mut rand::thread_rng(), width, height);
        tracing::debug!(width, height, count = findings.len(), "Generated demo findings");
        findings
    }
}

/// Boxes start in the first half of the image, leaving room for at least
/// one more pixel before the far edge.
fn start_limit(extent: u32) -> u32 {
    (extent / 2).min(extent.saturating_sub(2))
}

/// Far edge of a box starting at `start`: kept inside `limit` where possible,
/// always strictly greater than `start`.
fn clamp_edge(start: u32, extent: u32, limit: u32) -> u32 {
    start
        .saturating_add(extent)
        .min(limit.saturating_sub(1))
        .max(start + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn findings_respect_count_bounds_and_geometry() {
        let detector = DemoDetector::default();

        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            let findings = detector.generate_with(&mut rng, 200, 200);

            assert!((1..=4).contains(&findings.len()), "seed {seed}");
            for f in &findings {
                assert!(f.bbox.is_well_formed(), "seed {seed}: {:?}", f.bbox);
                assert!(f.bbox.x1 <= 100 && f.bbox.y1 <= 100);
                assert!(f.bbox.x2 < 200 && f.bbox.y2 < 200);
                assert!(f.bbox.width() <= 120 && f.bbox.height() <= 120);
            }
        }
    }

    #[test]
    fn large_images_keep_full_box_extent() {
        let detector = DemoDetector::default();
        let mut rng = StdRng::seed_from_u64(7);

        for f in detector.generate_with(&mut rng, 4000, 3000) {
            assert!((40..=120).contains(&f.bbox.width()));
            assert!((40..=120).contains(&f.bbox.height()));
        }
    }

    #[test]
    fn tiny_images_still_yield_positive_boxes() {
        let detector = DemoDetector::default();
        let mut rng = StdRng::seed_from_u64(3);

        for f in detector.generate_with(&mut rng, 1, 1) {
            assert_eq!(f.bbox, BoundingBox::new(0, 0, 1, 1));
        }
    }

    #[test]
    fn two_pixel_images_keep_boxes_inside() {
        let detector = DemoDetector::default();

        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            for f in detector.generate_with(&mut rng, 2, 2) {
                assert_eq!(f.bbox, BoundingBox::new(0, 0, 1, 1), "seed {seed}");
            }
        }
    }

    #[test]
    fn both_labels_are_produced() {
        let detector = DemoDetector::new(DetectionConfig {
            min_findings: 32,
            max_findings: 32,
            ..DetectionConfig::default()
        });
        let mut rng = StdRng::seed_from_u64(11);
        let findings = detector.generate_with(&mut rng, 640, 480);

        assert_eq!(findings.len(), 32);
        assert!(findings.iter().any(|f| f.kind == FindingKind::Reversal));
        assert!(findings.iter().any(|f| f.kind == FindingKind::Correction));
    }

    #[test]
    fn demo_detector_reports_demo_mode() {
        assert_eq!(DemoDetector::default().mode(), DetectionMode::Demo);
        let findings = DemoDetector::default().detect(300, 300);
        assert!(!findings.is_empty());
    }
}
