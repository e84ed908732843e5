// handlers/upload.rs - POST /api/upload/image and /api/upload/images

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::{HeaderMap, StatusCode},
};
use serde::Serialize;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::uploads::{describe_limit, public_base_url, IncomingImage, StoredImage, UploadError, UploadStore};

#[derive(Debug, Serialize)]
pub struct UploadedImages {
    pub images: Vec<StoredImage>,
    pub count: usize,
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::NoFile => ApiError::bad_request("No image file provided"),
            UploadError::NotAnImage(content_type) => {
                tracing::debug!("Rejected upload with content type {}", content_type);
                ApiError::bad_request("Only image files are allowed")
            }
            UploadError::TooLarge { limit } => {
                ApiError::bad_request(format!("File too large. Maximum size is {}.", describe_limit(limit)))
            }
            UploadError::TooManyFiles { limit } => {
                ApiError::bad_request(format!("Too many files. At most {} images per request.", limit))
            }
            UploadError::BodyTooLarge => ApiError::bad_request("Upload too large. Send fewer or smaller images."),
            UploadError::Multipart(msg) => ApiError::bad_request(msg),
            UploadError::Io(e) => {
                tracing::error!("Failed to store upload: {}", e);
                ApiError::internal_server_error("Failed to store upload")
            }
        }
    }
}

fn multipart_error(err: MultipartError) -> UploadError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        UploadError::BodyTooLarge
    } else {
        UploadError::Multipart(err.body_text())
    }
}

/// Pull every `field` part out of the body, enforcing type, size and count.
async fn collect_images(
    multipart: &mut Multipart,
    field: &str,
    store: &UploadStore,
    max_files: usize,
) -> Result<Vec<IncomingImage>, UploadError> {
    let mut images = Vec::new();

    while let Some(mut part) = multipart
        .next_field()
        .await
        .map_err(multipart_error)?
    {
        if part.name() != Some(field) {
            continue;
        }
        if images.len() == max_files {
            return Err(UploadError::TooManyFiles { limit: max_files });
        }
        store.check_content_type(part.content_type())?;

        let original_name = part.file_name().unwrap_or("upload").to_string();
        let mut bytes = Vec::new();
        while let Some(chunk) = part
            .chunk()
            .await
            .map_err(multipart_error)?
        {
            store.push_chunk(&mut bytes, &chunk)?;
        }

        images.push(IncomingImage { original_name, bytes });
    }

    Ok(images)
}

/// POST /api/upload/image - one file in field `image`
pub async fn upload_image(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> ApiResult<StoredImage> {
    let store = UploadStore::from_config(&state.config.uploads);
    let images = collect_images(&mut multipart, "image", &store, 1).await?;

    let millis = state.clock.now().timestamp_millis();
    let base_url = public_base_url(&state.config.uploads, &headers);
    let stored = store
        .save_all("image", images, millis, &base_url)
        .await?
        .into_iter()
        .next()
        .ok_or(UploadError::NoFile)?;

    Ok(ApiResponse::success(stored).with_message("Image uploaded successfully"))
}

/// POST /api/upload/images - up to `uploads.max_files` files in field `images`
pub async fn upload_images(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> ApiResult<UploadedImages> {
    let store = UploadStore::from_config(&state.config.uploads);
    let max_files = store.max_files();
    let images = collect_images(&mut multipart, "images", &store, max_files).await?;

    let millis = state.clock.now().timestamp_millis();
    let base_url = public_base_url(&state.config.uploads, &headers);
    let images = store.save_all("images", images, millis, &base_url).await?;

    Ok(ApiResponse::success(UploadedImages {
        count: images.len(),
        images,
    })
    .with_message("Images uploaded successfully"))
}
