//! Decoding uploads and encoding results
//!
//! Thin wrappers around the `image` crate. Input formats are sniffed from the
//! bytes; output formats are chosen by the caller.

use std::fmt;
use std::io::Cursor;
use std::str::FromStr;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::DynamicImage;
use thiserror::Error;

use super::raster::{Raster, RasterError};

/// Quality used when the caller does not pick one
pub const DEFAULT_QUALITY: u8 = 90;

/// Codec errors
#[derive(Debug, Error)]
pub enum CodecError {
    /// Declared content type is not an image
    #[error("File must be an image, got {0}")]
    UnsupportedMediaType(String),

    /// Requested output format is not supported
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Bytes could not be decoded as an image
    #[error("Failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    /// Image could not be encoded
    #[error("Failed to encode image: {0}")]
    Encode(#[source] image::ImageError),

    #[error(transparent)]
    Raster(#[from] RasterError),
}

/// Output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    Jpeg,
    Webp,
    Gif,
    Bmp,
    Tiff,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 6] = [
        OutputFormat::Png,
        OutputFormat::Jpeg,
        OutputFormat::Webp,
        OutputFormat::Gif,
        OutputFormat::Bmp,
        OutputFormat::Tiff,
    ];

    /// Canonical lowercase name
    pub fn name(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Webp => "webp",
            OutputFormat::Gif => "gif",
            OutputFormat::Bmp => "bmp",
            OutputFormat::Tiff => "tiff",
        }
    }

    /// File extension for download names
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            other => other.name(),
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::Png => "image/png",
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Webp => "image/webp",
            OutputFormat::Gif => "image/gif",
            OutputFormat::Bmp => "image/bmp",
            OutputFormat::Tiff => "image/tiff",
        }
    }

    /// Comma-separated list of every supported format name
    pub fn supported_list() -> String {
        Self::ALL
            .iter()
            .map(|f| f.name())
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn image_format(&self) -> image::ImageFormat {
        match self {
            OutputFormat::Png => image::ImageFormat::Png,
            OutputFormat::Jpeg => image::ImageFormat::Jpeg,
            OutputFormat::Webp => image::ImageFormat::WebP,
            OutputFormat::Gif => image::ImageFormat::Gif,
            OutputFormat::Bmp => image::ImageFormat::Bmp,
            OutputFormat::Tiff => image::ImageFormat::Tiff,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OutputFormat {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|f| f.name() == lower)
            .ok_or_else(|| CodecError::UnsupportedFormat(s.to_string()))
    }
}

/// Reject declared content types that are not `image/*`
pub fn ensure_image_mime(content_type: Option<&str>) -> Result<(), CodecError> {
    match content_type {
        Some(mime) if mime.starts_with("image/") => Ok(()),
        Some(mime) => Err(CodecError::UnsupportedMediaType(mime.to_string())),
        None => Err(CodecError::UnsupportedMediaType("unknown".to_string())),
    }
}

pub fn decode(bytes: &[u8]) -> Result<DynamicImage, CodecError> {
    image::load_from_memory(bytes).map_err(CodecError::Decode)
}

/// Decode uploaded bytes into an RGBA raster
pub fn decode_raster(bytes: &[u8]) -> Result<Raster, CodecError> {
    let image = decode(bytes)?;
    let raster = Raster::from_rgba_image(image.to_rgba8());
    raster.validate()?;
    Ok(raster)
}

/// Encode `image` as `format`
///
/// `quality` (1-100) drives the JPEG quality and the PNG compression level;
/// the other formats ignore it.
pub fn encode(image: &DynamicImage, format: OutputFormat, quality: u8) -> Result<Vec<u8>, CodecError> {
    let quality = quality.clamp(1, 100);
    let mut output = Vec::new();

    match format {
        OutputFormat::Jpeg => {
            // JPEG has no alpha channel
            let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
            rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut output, quality))
                .map_err(CodecError::Encode)?;
        }
        OutputFormat::Png => {
            let encoder = PngEncoder::new_with_quality(
                &mut output,
                png_compression(quality),
                FilterType::Adaptive,
            );
            image.write_with_encoder(encoder).map_err(CodecError::Encode)?;
        }
        other => {
            let rgba = DynamicImage::ImageRgba8(image.to_rgba8());
            rgba.write_to(&mut Cursor::new(&mut output), other.image_format())
                .map_err(CodecError::Encode)?;
        }
    }

    Ok(output)
}

/// Encode a raster as PNG, keeping its alpha channel
pub fn encode_png_raster(raster: Raster) -> Result<Vec<u8>, CodecError> {
    let image = DynamicImage::ImageRgba8(raster.into_rgba_image()?);
    encode(&image, OutputFormat::Png, DEFAULT_QUALITY)
}

/// Map quality to a zlib-style level `round((100 - q) / 10)` and bucket it
fn png_compression(quality: u8) -> CompressionType {
    let level = ((100 - quality.min(100)) as f32 / 10.0).round() as u8;
    match level {
        0..=3 => CompressionType::Fast,
        4..=6 => CompressionType::Default,
        _ => CompressionType::Best,
    }
}
