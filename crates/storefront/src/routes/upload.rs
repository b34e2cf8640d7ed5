//! Product image upload.

use axum::{
    Json,
    extract::{
        Multipart, State,
        multipart::{MultipartError, MultipartRejection},
    },
};
use serde_json::{Value, json};
use tracing::instrument;

use crate::error::Result;
use crate::services::uploads::UploadError;
use crate::state::AppState;

/// Multipart field carrying the image.
pub const UPLOAD_FIELD: &str = "product";

fn malformed(e: &MultipartError) -> UploadError {
    UploadError::Malformed(e.body_text())
}

/// `POST /upload`: stores the `product` file and answers `{success: 1, image_url}`.
#[instrument(skip_all)]
pub async fn upload_image(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<Value>> {
    let mut multipart = multipart.map_err(|e| UploadError::Malformed(e.body_text()))?;

    while let Some(field) = multipart.next_field().await.map_err(|e| malformed(&e))? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_owned();
        let bytes = field.bytes().await.map_err(|e| malformed(&e))?;
        let image_url = state.images().save(&file_name, &bytes).await?;
        return Ok(Json(json!({ "success": 1, "image_url": image_url })));
    }

    Err(UploadError::MissingFile.into())
}
