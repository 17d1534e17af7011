use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};
use screening_service::config::ScreeningConfig;
use screening_service::startup::Application;
use uuid::Uuid;

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub root: String,
    pub upload_dir: String,
    pub output_dir: String,
    pub client: reqwest::Client,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(|_| {}).await
    }

    /// Spawn with a configuration tweak applied after defaults are loaded.
    pub async fn spawn_with(customize: impl FnOnce(&mut ScreeningConfig)) -> Self {
        let root = format!("target/test-storage-{}", Uuid::new_v4());
        let upload_dir = format!("{}/uploads", root);
        let output_dir = format!("{}/outputs", root);

        let mut config = ScreeningConfig::load().expect("Failed to load configuration");
        config.common.port = 0; // Random port for testing
        config.storage.upload_dir = upload_dir.clone();
        config.storage.output_dir = output_dir.clone();
        config.render.font_path = None;
        customize(&mut config);

        let app = Application::build(config)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for HTTP server to be ready by polling health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            port,
            root,
            upload_dir,
            output_dir,
            client,
        }
    }

    pub async fn analyze(&self, filename: &str, data: Vec<u8>) -> reqwest::Response {
        let form = reqwest::multipart::Form::new().part(
            "image",
            reqwest::multipart::Part::bytes(data)
                .file_name(filename.to_string())
                .mime_str("image/jpeg")
                .unwrap(),
        );

        self.client
            .post(format!("{}/analyze", self.address))
            .multipart(form)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{}", self.address, path))
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Cleanup test resources (upload and output directories).
    pub async fn cleanup(&self) {
        let _ = tokio::fs::remove_dir_all(&self.root).await;
    }
}

/// A plain white JPEG of the given size.
pub fn white_jpeg(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, 90)
        .encode_image(&image)
        .expect("Failed to encode test JPEG");
    buf
}
