//! Image files written to `uploads.dir` and served back under `/uploads`.

use axum::http::{header, HeaderMap};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

use crate::config::UploadConfig;

const MIB: usize = 1024 * 1024;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("no image file provided")]
    NoFile,

    #[error("only image files are allowed, got {0}")]
    NotAnImage(String),

    #[error("file exceeds {limit} bytes")]
    TooLarge { limit: usize },

    #[error("more than {limit} files")]
    TooManyFiles { limit: usize },

    #[error("request body exceeds the upload limit")]
    BodyTooLarge,

    #[error("malformed multipart body: {0}")]
    Multipart(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// What the client gets back for each stored file.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredImage {
    pub filename: String,
    pub original_name: String,
    pub size: usize,
    pub url: String,
}

/// A file part accepted from a multipart body, not yet on disk.
#[derive(Debug)]
pub struct IncomingImage {
    pub original_name: String,
    pub bytes: Vec<u8>,
}

pub struct UploadStore {
    dir: PathBuf,
    max_file_bytes: usize,
    max_files: usize,
}

impl UploadStore {
    pub fn from_config(config: &UploadConfig) -> Self {
        Self {
            dir: PathBuf::from(&config.dir),
            max_file_bytes: config.max_file_bytes,
            max_files: config.max_files,
        }
    }

    pub fn max_files(&self) -> usize {
        self.max_files
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Reject anything that is not `image/*`.
    pub fn check_content_type(&self, content_type: Option<&str>) -> Result<(), UploadError> {
        match content_type {
            Some(ct) if ct.trim().to_ascii_lowercase().starts_with("image/") => Ok(()),
            other => Err(UploadError::NotAnImage(other.unwrap_or("no content type").to_string())),
        }
    }

    /// Append a chunk, failing as soon as the running size crosses the limit.
    pub fn push_chunk(&self, buffer: &mut Vec<u8>, chunk: &[u8]) -> Result<(), UploadError> {
        if buffer.len() + chunk.len() > self.max_file_bytes {
            return Err(UploadError::TooLarge {
                limit: self.max_file_bytes,
            });
        }
        buffer.extend_from_slice(chunk);
        Ok(())
    }

    /// Write every image under a fresh name, creating the directory on first use.
    pub async fn save_all(
        &self,
        field: &str,
        images: Vec<IncomingImage>,
        millis: i64,
        base_url: &str,
    ) -> Result<Vec<StoredImage>, UploadError> {
        if images.is_empty() {
            return Err(UploadError::NoFile);
        }
        tokio::fs::create_dir_all(&self.dir).await?;

        let mut stored = Vec::with_capacity(images.len());
        for image in images {
            let filename = stored_filename(field, &image.original_name, millis, random_suffix());
            tokio::fs::write(self.dir.join(&filename), &image.bytes).await?;

            tracing::info!("Stored upload {} ({} bytes)", filename, image.bytes.len());
            stored.push(StoredImage {
                url: format!("{}/uploads/{}", base_url, filename),
                filename,
                original_name: image.original_name,
                size: image.bytes.len(),
            });
        }
        Ok(stored)
    }
}

/// `<field>-<millis>-<suffix><.ext>`, keeping only a short alphanumeric extension.
pub fn stored_filename(field: &str, original_name: &str, millis: i64, suffix: u32) -> String {
    let extension = Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.len() <= 10 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default();

    format!("{}-{}-{}{}", field, millis, suffix, extension)
}

fn random_suffix() -> u32 {
    (Uuid::new_v4().as_u128() % 1_000_000_000) as u32
}

/// Base URL for links to stored files: the configured one, else the request's own origin.
pub fn public_base_url(config: &UploadConfig, headers: &HeaderMap) -> String {
    if let Some(base) = &config.public_base_url {
        return base.trim_end_matches('/').to_string();
    }

    let proto = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| v == "http" || v == "https")
        .unwrap_or_else(|| "http".to_string());
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");

    format!("{}://{}", proto, host)
}

pub fn describe_limit(bytes: usize) -> String {
    if bytes >= MIB && bytes % MIB == 0 {
        format!("{}MB", bytes / MIB)
    } else {
        format!("{} bytes", bytes)
    }
}
