//! Raster data model
//!
//! A decoded image as a flat, row-major RGBA8 buffer. Rasters are owned by a
//! single request: decoded from the upload, handed to the segmenter, and
//! encoded back out.

use image::RgbaImage;
use thiserror::Error;

/// Bytes per pixel (R, G, B, A)
pub const CHANNELS: usize = 4;

/// Raster errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RasterError {
    /// Zero dimensions or a buffer that does not hold `width * height` pixels
    #[error("Invalid image: {0}")]
    InvalidImage(String),
}

/// Rectangular grid of RGBA pixels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl Raster {
    /// Create a raster from raw parts
    ///
    /// The parts are not checked here; see [`Raster::validate`].
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self { width, height, data }
    }

    /// Create a raster with every pixel set to `rgba`
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let count = width as usize * height as usize;
        let mut data = Vec::with_capacity(count * CHANNELS);
        for _ in 0..count {
            data.extend_from_slice(&rgba);
        }
        Self { width, height, data }
    }

    /// Number of bytes a `width x height` raster must hold
    pub fn expected_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * CHANNELS
    }

    /// Check the dimension and buffer-length invariants
    pub fn validate(&self) -> Result<(), RasterError> {
        if self.width == 0 || self.height == 0 {
            return Err(RasterError::InvalidImage(format!(
                "dimensions must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }

        let expected = Self::expected_len(self.width, self.height);
        if self.data.len() != expected {
            return Err(RasterError::InvalidImage(format!(
                "buffer length {} does not match {}x{}x{} = {}",
                self.data.len(),
                self.width,
                self.height,
                CHANNELS,
                expected
            )));
        }

        Ok(())
    }

    /// Byte offset of the pixel at `(x, y)`
    #[inline]
    pub fn pixel_offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * CHANNELS
    }

    /// RGB channels of the pixel at `(x, y)`
    #[inline]
    pub fn rgb(&self, x: u32, y: u32) -> [u8; 3] {
        let offset = self.pixel_offset(x, y);
        [self.data[offset], self.data[offset + 1], self.data[offset + 2]]
    }

    /// Alpha channel of the pixel at `(x, y)`
    #[inline]
    pub fn alpha(&self, x: u32, y: u32) -> u8 {
        self.data[self.pixel_offset(x, y) + 3]
    }

    /// Set the alpha channel of the pixel at `(x, y)`
    pub fn set_alpha(&mut self, x: u32, y: u32, alpha: u8) {
        let offset = self.pixel_offset(x, y);
        self.data[offset + 3] = alpha;
    }

    /// Iterator over the alpha channel in row-major order
    pub fn alpha_channel(&self) -> impl Iterator<Item = u8> + '_ {
        self.data.chunks_exact(CHANNELS).map(|px| px[3])
    }

    pub fn from_rgba_image(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            data: image.into_raw(),
        }
    }

    /// Convert into an `image` buffer for encoding
    pub fn into_rgba_image(self) -> Result<RgbaImage, RasterError> {
        self.validate()?;
        let (width, height) = (self.width, self.height);
        RgbaImage::from_raw(width, height, self.data).ok_or_else(|| {
            RasterError::InvalidImage("failed to create image buffer".to_string())
        })
    }
}

/// Euclidean distance between two RGB triples
#[inline]
pub fn color_distance(a: [u8; 3], b: [f64; 3]) -> f64 {
    let dr = a[0] as f64 - b[0];
    let dg = a[1] as f64 - b[1];
    let db = a[2] as f64 - b[2];
    (dr * dr + dg * dg + db * db).sqrt()
}

/// Euclidean distance between two pixels' RGB triples
#[inline]
pub fn pixel_distance(a: [u8; 3], b: [u8; 3]) -> f64 {
    color_distance(a, [b[0] as f64, b[1] as f64, b[2] as f64])
}
