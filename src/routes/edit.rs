//! Image editor route
//!
//! POST /api/edit-image - multipart `file` and optional JSON `options`

use axum::{
    body::Body,
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::Response,
    routing::post,
    Router,
};

use crate::error::{AppError, Result};
use crate::imaging::{codec, filters, EditOptions};
use crate::state::AppState;

use super::upload::{attachment, UploadForm};

/// Create the editor router
pub fn router() -> Router<AppState> {
    Router::new().route("/", post(edit_image))
}

async fn edit_image(State(state): State<AppState>, multipart: Multipart) -> Result<Response> {
    let mut form = UploadForm::read(multipart, state.config()).await?;
    let file = form.take_file()?;
    codec::ensure_image_mime(file.content_type.as_deref())?;

    let options: EditOptions = match form.text("options") {
        Some(raw) => serde_json::from_str(raw).map_err(|e| {
            tracing::debug!("Rejecting edit options: {}", e);
            AppError::BadRequest("Invalid options format".to_string())
        })?,
        None => EditOptions::default(),
    };
    options.validate()?;
    let format = options.output_format();
    let quality = options.quality();

    tracing::info!(
        file_name = %file.file_name,
        size = file.data.len(),
        format = %format,
        options = ?options,
        "Editing image"
    );

    let data = file.data.clone();
    let edited = tokio::task::spawn_blocking(move || -> Result<Vec<u8>> {
        let image = codec::decode(&data)?;
        let image = filters::apply(image, &options)?;
        Ok(codec::encode(&image, format, quality)?)
    })
    .await??;

    let filename = format!("edited-{}.{}", file.stem(), format.extension());

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, format.content_type())
        .header(header::CONTENT_DISPOSITION, attachment(&filename))
        .header(header::CONTENT_LENGTH, edited.len())
        .body(Body::from(edited))
        .map_err(|e| AppError::Internal(e.to_string()))
}
