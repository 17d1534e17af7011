use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::str::FromStr;
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, Deserialize)]
pub struct ScreeningConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub storage: StorageConfig,
    pub detection: DetectionConfig,
    pub render: RenderConfig,
    pub observability: ObservabilityConfig,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Where raw uploads are kept, keyed by client filename.
    pub upload_dir: String,
    /// Where `annotated.jpg` and `report.pdf` are (over)written.
    pub output_dir: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = "validate_detection_bounds"))]
pub struct DetectionConfig {
    #[validate(range(min = 1, max = 64))]
    pub min_findings: u32,
    #[validate(range(min = 1, max = 64))]
    pub max_findings: u32,
    #[validate(range(min = 1))]
    pub min_box_size: u32,
    #[validate(range(min = 1))]
    pub max_box_size: u32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            min_findings: 1,
            max_findings: 4,
            min_box_size: 40,
            max_box_size: 120,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RenderConfig {
    /// TTF/OTF used for finding labels. Boxes are drawn without labels when unset.
    pub font_path: Option<String>,
    pub font_scale: f32,
    #[validate(range(min = 1, max = 100))]
    pub jpeg_quality: u8,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            font_path: None,
            font_scale: 18.0,
            jpeg_quality: 90,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    pub otlp_endpoint: Option<String>,
}

fn validate_detection_bounds(cfg: &DetectionConfig) -> Result<(), ValidationError> {
    if cfg.min_findings > cfg.max_findings {
        return Err(ValidationError::new("min_findings_exceeds_max"));
    }
    if cfg.min_box_size > cfg.max_box_size {
        return Err(ValidationError::new("min_box_size_exceeds_max"));
    }
    Ok(())
}

impl ScreeningConfig {
    pub fn load() -> Result<Self, AppError> {
        // Load common config (handles .env and APP__ prefix)
        let common_config = core_config::Config::load()?;

        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";
        let detection_defaults = DetectionConfig::default();
        let render_defaults = RenderConfig::default();

        let config = ScreeningConfig {
            common: common_config,
            storage: StorageConfig {
                upload_dir: get_env("SCREENING_UPLOAD_DIR", Some("uploads"), is_prod)?,
                output_dir: get_env("SCREENING_OUTPUT_DIR", Some("outputs"), is_prod)?,
            },
            detection: DetectionConfig {
                min_findings: parse_env("SCREENING_MIN_FINDINGS", detection_defaults.min_findings)?,
                max_findings: parse_env("SCREENING_MAX_FINDINGS", detection_defaults.max_findings)?,
                min_box_size: parse_env("SCREENING_MIN_BOX_SIZE", detection_defaults.min_box_size)?,
                max_box_size: parse_env("SCREENING_MAX_BOX_SIZE", detection_defaults.max_box_size)?,
            },
            render: RenderConfig {
                font_path: env::var("SCREENING_FONT_PATH").ok(),
                font_scale: parse_env("SCREENING_FONT_SCALE", render_defaults.font_scale)?,
                jpeg_quality: parse_env("SCREENING_JPEG_QUALITY", render_defaults.jpeg_quality)?,
            },
            observability: ObservabilityConfig {
                otlp_endpoint: env::var("OTLP_ENDPOINT").ok(),
            },
            max_upload_bytes: parse_env("SCREENING_MAX_UPLOAD_BYTES", 20 * 1024 * 1024)?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        self.detection.validate()?;
        self.render.validate()?;
        Ok(())
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

fn parse_env<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(val) => val.trim().parse().map_err(|e: T::Err| {
            AppError::ConfigError(anyhow::anyhow!("Invalid value for {}: {}", key, e))
        }),
        Err(_) => Ok(default),
    }
}
