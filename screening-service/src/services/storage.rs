use async_trait::async_trait;
use service_core::error::AppError;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

const FALLBACK_FILENAME: &str = "upload.bin";

#[async_trait]
pub trait Storage: Send + Sync {
    async fn upload(&self, key: &str, data: Vec<u8>) -> Result<(), AppError>;
    async fn download(&self, key: &str) -> Result<Vec<u8>, AppError>;
}

/// Reduces a client-supplied filename to a safe name inside the storage root:
/// directories are stripped, then control characters and reserved names are
/// removed.
pub fn sanitize_filename(name: &str) -> String {
    // Clients on Windows send backslash-separated paths.
    let normalized = name.replace('\\', "/");
    let base = Path::new(&normalized)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();

    // Windows rules apply everywhere: results are downloaded by browsers on any OS.
    let options = sanitize_filename::Options {
        windows: true,
        ..Default::default()
    };
    let sanitized = sanitize_filename::sanitize_with_options(base.trim(), options);
    let sanitized = sanitized.trim();
    if sanitized.is_empty() {
        FALLBACK_FILENAME.to_string()
    } else {
        sanitized.to_string()
    }
}

pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub async fn new(base_path: impl Into<PathBuf>) -> Result<Self, AppError> {
        let base_path = base_path.into();
        if !base_path.exists() {
            fs::create_dir_all(&base_path).await?;
        }
        Ok(Self { base_path })
    }

    fn resolve(&self, key: &str) -> PathBuf {
        self.base_path.join(sanitize_filename(key))
    }
}

#[async_trait]
impl Storage for LocalStorage {
    /// Replaces `key` atomically: readers see either the old or the new file.
    async fn upload(&self, key: &str, data: Vec<u8>) -> Result<(), AppError> {
        let path = self.resolve(key);
        // Unique per write so concurrent writers never share a temp file.
        let mut tmp = path.clone().into_os_string();
        tmp.push(format!(".{:016x}.partial", rand::random::<u64>()));
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, data).await?;
        fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn download(&self, key: &str) -> Result<Vec<u8>, AppError> {
        let path = self.resolve(key);
        match fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(AppError::NotFound(anyhow::anyhow!("{} has not been generated yet", key)))
            }
            Err(e) => Err(e.into()),
        }
    }
}
