//! Background removal route
//!
//! - POST /api/remove-background - multipart `file`, returns a transparent PNG
//! - GET /api/remove-background - usage hint

use axum::{
    body::Body,
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::Response,
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::imaging::{codec, segment};
use crate::state::AppState;

use super::upload::{attachment, UploadForm};

/// Prefix of the downloaded file name
const OUTPUT_PREFIX: &str = "no-bg-";

/// Create the background removal router
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(usage).post(remove_background))
}

#[derive(Serialize)]
struct UsageResponse {
    message: &'static str,
}

async fn usage() -> Json<UsageResponse> {
    Json(UsageResponse {
        message: "Background Remover API - Use POST to upload an image",
    })
}

/// Decode the upload, make its background transparent, return it as PNG
async fn remove_background(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response> {
    let mut form = UploadForm::read(multipart, state.config()).await?;
    let file = form.take_file()?;
    codec::ensure_image_mime(file.content_type.as_deref())?;

    tracing::info!(
        file_name = %file.file_name,
        size = file.data.len(),
        "Removing background"
    );

    let data = file.data.clone();
    let png = tokio::task::spawn_blocking(move || -> Result<Vec<u8>> {
        let raster = codec::decode_raster(&data)?;
        tracing::debug!(width = raster.width, height = raster.height, "Decoded upload");
        let output = segment(&raster)?;
        Ok(codec::encode_png_raster(output)?)
    })
    .await??;

    let filename = format!("{}{}.png", OUTPUT_PREFIX, file.stem());
    tracing::info!(file_name = %filename, size = png.len(), "Background removed");

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "image/png")
        .header(header::CONTENT_DISPOSITION, attachment(&filename))
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from(png))
        .map_err(|e| AppError::Internal(e.to_string()))
}
