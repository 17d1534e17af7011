use crate::config::RenderConfig;
use crate::models::Finding;
use ab_glyph::{FontVec, PxScale};
use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use service_core::error::AppError;
use std::path::Path;
use std::sync::Arc;

pub const BOX_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const BOX_THICKNESS: u32 = 2;

/// Gap between a label's baseline area and the top edge of its box.
const LABEL_GAP: i32 = 4;

fn load_font(path: impl AsRef<Path>) -> Result<FontVec, AppError> {
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(|e| {
        AppError::ConfigError(anyhow::anyhow!(
            "Cannot read font file {}: {}",
            path.display(),
            e
        ))
    })?;
    FontVec::try_from_vec(data).map_err(|e| {
        AppError::ConfigError(anyhow::anyhow!(
            "Unable to parse font data in {}: {}",
            path.display(),
            e
        ))
    })
}

/// Draws findings onto images and encodes the result as JPEG.
#[derive(Clone)]
pub struct Annotator {
    font: Option<Arc<FontVec>>,
    scale: PxScale,
    jpeg_quality: u8,
}

impl Annotator {
    pub fn new(font: Option<FontVec>, config: &RenderConfig) -> Self {
        Self {
            font: font.map(Arc::new),
            scale: PxScale::from(config.font_scale),
            jpeg_quality: config.jpeg_quality,
        }
    }

    /// Loads the configured font, if any.
    pub fn from_config(config: &RenderConfig) -> Result<Self, AppError> {
        let font = match &config.font_path {
            Some(path) => Some(load_font(path)?),
            None => {
                tracing::warn!("No label font configured; findings will be drawn without labels");
                None
            }
        };
        Ok(Self::new(font, config))
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<RgbImage, AppError> {
        image::load_from_memory(bytes)
            .map(|img| img.to_rgb8())
            .map_err(|e| AppError::BadRequest(anyhow::anyhow!("Failed to decode image: {}", e)))
    }

    pub fn annotate(&self, image: &mut RgbImage, findings: &[Finding]) {
        for finding in findings {
            let bbox = &finding.bbox;
            let base = Rect::at(bbox.x1 as i32, bbox.y1 as i32)
                .of_size(bbox.width().max(1), bbox.height().max(1));

            for i in 0..BOX_THICKNESS {
                let offset = Rect::at(base.left() - i as i32, base.top() - i as i32)
                    .of_size(base.width() + 2 * i, base.height() + 2 * i);
                draw_hollow_rect_mut(image, offset, BOX_COLOR);
            }

            if let Some(font) = &self.font {
                let above = base.top() - self.scale.y.ceil() as i32 - LABEL_GAP;
                // Labels that would leave the canvas go just inside the box.
                let y = if above >= 0 {
                    above
                } else {
                    base.top() + BOX_THICKNESS as i32
                };
                draw_text_mut(
                    image,
                    BOX_COLOR,
                    base.left(),
                    y,
                    self.scale,
                    font.as_ref(),
                    finding.kind.as_str(),
                );
            }
        }
    }

    pub fn encode_jpeg(&self, image: &RgbImage) -> Result<Vec<u8>, AppError> {
        let mut buf = Vec::new();
        JpegEncoder::new_with_quality(&mut buf, self.jpeg_quality)
            .encode_image(image)
            .map_err(|e| AppError::InternalError(anyhow::anyhow!("Failed to encode JPEG: {}", e)))?;
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BoundingBox, FindingKind};
    use std::ops::Range;

    const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

    fn annotator() -> Annotator {
        Annotator::new(None, &RenderConfig::default())
    }

    fn labelled_annotator() -> Annotator {
        let font = load_font(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/tests/fixtures/RobotoMedium.ttf"
        ))
        .unwrap();
        Annotator::new(Some(font), &RenderConfig::default())
    }

    fn painted_pixels(image: &RgbImage, xs: Range<u32>, ys: Range<u32>) -> usize {
        ys.flat_map(|y| xs.clone().map(move |x| (x, y)))
            .filter(|&(x, y)| *image.get_pixel(x, y) != WHITE)
            .count()
    }

    fn finding(x1: u32, y1: u32, x2: u32, y2: u32) -> Finding {
        Finding {
            kind: FindingKind::Correction,
            bbox: BoundingBox::new(x1, y1, x2, y2),
        }
    }

    #[test]
    fn box_outline_is_drawn_in_red() {
        let mut image = RgbImage::from_pixel(200, 200, Rgb([255, 255, 255]));
        annotator().annotate(&mut image, &[finding(20, 30, 80, 90)]);

        assert_eq!(*image.get_pixel(20, 30), BOX_COLOR);
        assert_eq!(*image.get_pixel(50, 30), BOX_COLOR);
        // second border pixel, one step outside
        assert_eq!(*image.get_pixel(19, 29), BOX_COLOR);
        // interior untouched
        assert_eq!(*image.get_pixel(50, 60), Rgb([255, 255, 255]));
    }

    #[test]
    fn label_sits_above_box_when_there_is_room() {
        let boxes = [finding(20, 100, 180, 160)];
        let mut plain = RgbImage::from_pixel(200, 200, WHITE);
        let mut labelled = plain.clone();
        annotator().annotate(&mut plain, &boxes);
        labelled_annotator().annotate(&mut labelled, &boxes);

        // 18px label plus the gap puts the text in rows 78..96, clear of the
        // border rows at 99 and 100.
        assert_eq!(painted_pixels(&plain, 20..140, 70..98), 0);
        assert!(painted_pixels(&labelled, 20..140, 70..98) > 0);
        // nothing is written inside the box
        assert_eq!(painted_pixels(&labelled, 22..178, 102..158), 0);
    }

    #[test]
    fn label_moves_inside_box_near_the_top_edge() {
        let boxes = [finding(20, 5, 180, 60)];
        let mut plain = RgbImage::from_pixel(200, 200, WHITE);
        let mut labelled = plain.clone();
        annotator().annotate(&mut plain, &boxes);
        labelled_annotator().annotate(&mut labelled, &boxes);

        assert_eq!(painted_pixels(&plain, 22..140, 7..30), 0);
        assert!(painted_pixels(&labelled, 22..140, 7..30) > 0);
        // above the outline stays clean
        assert_eq!(painted_pixels(&labelled, 0..200, 0..4), 0);
    }

    #[test]
    fn boxes_past_the_edge_are_clipped() {
        let mut image = RgbImage::from_pixel(50, 50, Rgb([0, 0, 0]));
        annotator().annotate(&mut image, &[finding(0, 0, 300, 300)]);

        assert_eq!(*image.get_pixel(0, 0), BOX_COLOR);
        assert_eq!(*image.get_pixel(25, 25), Rgb([0, 0, 0]));
    }

    #[test]
    fn encode_produces_jpeg() {
        let image = RgbImage::from_pixel(16, 16, Rgb([10, 20, 30]));
        let bytes = annotator().encode_jpeg(&image).unwrap();

        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        assert_eq!(image::guess_format(&bytes).unwrap(), image::ImageFormat::Jpeg);
    }

    #[test]
    fn decode_rejects_garbage() {
        let err = annotator().decode(b"definitely not an image").unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn missing_font_file_is_a_config_error() {
        let err = load_font("/nonexistent/font.ttf").unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }
}
