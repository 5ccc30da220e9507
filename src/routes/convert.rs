//! Image format conversion route
//!
//! POST /api/convert/image - multipart `file` and `outputFormat`

use axum::{
    body::Body,
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::Response,
    routing::post,
    Router,
};

use crate::error::{AppError, Result};
use crate::imaging::codec::{self, OutputFormat, DEFAULT_QUALITY};
use crate::state::AppState;

use super::upload::{attachment, UploadForm};

/// Create the conversion router
pub fn router() -> Router<AppState> {
    Router::new().route("/", post(convert_image))
}

async fn convert_image(State(state): State<AppState>, multipart: Multipart) -> Result<Response> {
    let mut form = UploadForm::read(multipart, state.config()).await?;
    let file = form.take_file()?;

    let requested = form
        .text("outputFormat")
        .ok_or_else(|| AppError::BadRequest("No output format specified".to_string()))?;
    let format: OutputFormat = requested.parse().map_err(|_| {
        AppError::BadRequest(format!(
            "Unsupported format. Supported formats: {}",
            OutputFormat::supported_list()
        ))
    })?;

    tracing::info!(
        file_name = %file.file_name,
        size = file.data.len(),
        format = %format,
        "Converting image"
    );

    let data = file.data.clone();
    let converted = tokio::task::spawn_blocking(move || -> Result<Vec<u8>> {
        let image = codec::decode(&data)?;
        Ok(codec::encode(&image, format, DEFAULT_QUALITY)?)
    })
    .await??;

    let filename = format!("{}.{}", file.stem(), format.name());

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, format.content_type())
        .header(header::CONTENT_DISPOSITION, attachment(&filename))
        .header(header::CONTENT_LENGTH, converted.len())
        .body(Body::from(converted))
        .map_err(|e| AppError::Internal(e.to_string()))
}
