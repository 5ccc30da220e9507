//! Image editor pipeline
//!
//! Applies the adjustments requested by an [`EditOptions`] in a fixed order:
//! rotation, resize, blur, sharpen, brightness/saturation, contrast,
//! grayscale, sepia.

use image::{DynamicImage, Rgba, RgbaImage};
use serde::Deserialize;
use thiserror::Error;

use super::codec::{OutputFormat, DEFAULT_QUALITY};

/// Tint applied by the sepia filter
const SEPIA_TINT: [f32; 3] = [255.0, 240.0, 196.0];

/// Filter option errors
#[derive(Debug, Error, PartialEq)]
pub enum FilterError {
    #[error("Rotation must be a multiple of 90 degrees, got {0}")]
    InvalidRotation(i32),

    #[error("Invalid {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

/// Editing options as sent by the client
///
/// Percentages use 100 as the identity value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditOptions {
    pub brightness: Option<f32>,
    pub contrast: Option<f32>,
    pub saturation: Option<f32>,
    pub rotation: Option<i32>,
    pub blur: Option<f32>,
    #[serde(default)]
    pub sharpen: bool,
    #[serde(default)]
    pub grayscale: bool,
    #[serde(default)]
    pub sepia: bool,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub quality: Option<u8>,
    pub format: Option<String>,
}

impl EditOptions {
    /// Check ranges before any pixel work
    pub fn validate(&self) -> Result<(), FilterError> {
        if let Some(rotation) = self.rotation {
            if rotation % 90 != 0 {
                return Err(FilterError::InvalidRotation(rotation));
            }
        }

        for (name, value) in [
            ("brightness", self.brightness),
            ("contrast", self.contrast),
            ("saturation", self.saturation),
            ("blur", self.blur),
        ] {
            if let Some(v) = value {
                if !v.is_finite() || v < 0.0 {
                    return Err(FilterError::InvalidValue {
                        name,
                        value: v.to_string(),
                    });
                }
            }
        }

        for (name, value) in [("width", self.width), ("height", self.height)] {
            if value == Some(0) {
                return Err(FilterError::InvalidValue {
                    name,
                    value: "0".to_string(),
                });
            }
        }

        if let Some(q) = self.quality {
            if !(1..=100).contains(&q) {
                return Err(FilterError::InvalidValue {
                    name: "quality",
                    value: q.to_string(),
                });
            }
        }

        Ok(())
    }

    /// Output format: PNG or WebP when asked for, JPEG otherwise
    pub fn output_format(&self) -> OutputFormat {
        match self.format.as_deref().map(str::to_ascii_lowercase).as_deref() {
            Some("png") => OutputFormat::Png,
            Some("webp") => OutputFormat::Webp,
            _ => OutputFormat::Jpeg,
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality.unwrap_or(DEFAULT_QUALITY)
    }
}

/// Run the editing pipeline
pub fn apply(image: DynamicImage, options: &EditOptions) -> Result<DynamicImage, FilterError> {
    options.validate()?;

    let mut image = rotate(image, options.rotation.unwrap_or(0));

    if options.width.is_some() || options.height.is_some() {
        // Fit inside the requested box, keeping the aspect ratio
        let width = options.width.unwrap_or(u32::MAX);
        let height = options.height.unwrap_or(u32::MAX);
        image = image.resize(width, height, image::imageops::FilterType::Lanczos3);
    }

    if let Some(sigma) = options.blur.filter(|&s| s > 0.0) {
        image = image.blur(sigma);
    }

    if options.sharpen {
        image = image.unsharpen(1.0, 1);
    }

    let mut rgba = image.to_rgba8();

    let brightness = percent(options.brightness);
    let saturation = percent(options.saturation);
    if brightness != 1.0 || saturation != 1.0 {
        modulate(&mut rgba, brightness, saturation);
    }

    let contrast = percent(options.contrast);
    if contrast != 1.0 {
        linear(&mut rgba, contrast, 128.0 - 128.0 * contrast);
    }

    if options.grayscale {
        grayscale(&mut rgba);
    }

    if options.sepia {
        tint(&mut rgba, SEPIA_TINT);
    }

    Ok(DynamicImage::ImageRgba8(rgba))
}

/// Rotate clockwise by a multiple of 90 degrees
fn rotate(image: DynamicImage, degrees: i32) -> DynamicImage {
    match degrees.rem_euclid(360) {
        90 => image.rotate90(),
        180 => image.rotate180(),
        270 => image.rotate270(),
        _ => image,
    }
}

fn percent(value: Option<f32>) -> f32 {
    value.map(|v| v / 100.0).unwrap_or(1.0)
}

#[inline]
fn luma(r: f32, g: f32, b: f32) -> f32 {
    0.299 * r + 0.587 * g + 0.114 * b
}

#[inline]
fn to_channel(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

fn map_rgb(image: &mut RgbaImage, f: impl Fn(f32, f32, f32) -> [f32; 3]) {
    for Rgba([r, g, b, _]) in image.pixels_mut() {
        let [nr, ng, nb] = f(*r as f32, *g as f32, *b as f32);
        *r = to_channel(nr);
        *g = to_channel(ng);
        *b = to_channel(nb);
    }
}

/// Scale brightness, then pull colours towards or away from their luma
fn modulate(image: &mut RgbaImage, brightness: f32, saturation: f32) {
    map_rgb(image, |r, g, b| {
        let (r, g, b) = (r * brightness, g * brightness, b * brightness);
        let l = luma(r, g, b);
        [
            l + (r - l) * saturation,
            l + (g - l) * saturation,
            l + (b - l) * saturation,
        ]
    });
}

/// `a * x + b` on every colour channel
fn linear(image: &mut RgbaImage, a: f32, b: f32) {
    map_rgb(image, |r, g, bl| [a * r + b, a * g + b, a * bl + b]);
}

fn grayscale(image: &mut RgbaImage) {
    map_rgb(image, |r, g, b| {
        let l = luma(r, g, b);
        [l, l, l]
    });
}

/// Keep luma, take the hue from `color`
fn tint(image: &mut RgbaImage, color: [f32; 3]) {
    map_rgb(image, |r, g, b| {
        let l = luma(r, g, b);
        [l * color[0] / 255.0, l * color[1] / 255.0, l * color[2] / 255.0]
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GenericImageView;

    fn solid(width: u32, height: u32, rgba: [u8; 4]) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba(rgba)))
    }

    fn options(json: &str) -> EditOptions {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_defaults_are_identity() {
        let src = solid(3, 3, [10, 120, 200, 255]);
        let out = apply(src.clone(), &EditOptions::default()).unwrap();
        assert_eq!(out.to_rgba8(), src.to_rgba8());
    }

    #[test]
    fn test_parse_options_json() {
        let opts = options(r#"{"brightness":120,"grayscale":true,"width":50,"format":"png"}"#);
        assert_eq!(opts.brightness, Some(120.0));
        assert!(opts.grayscale);
        assert!(!opts.sepia);
        assert_eq!(opts.width, Some(50));
        assert_eq!(opts.output_format(), OutputFormat::Png);
        assert_eq!(opts.quality(), 90);
    }

    #[test]
    fn test_default_format_is_jpeg() {
        assert_eq!(
            EditOptions::default().output_format(),
            OutputFormat::Jpeg
        );
    }

    #[test]
    fn test_editor_falls_back_to_jpeg() {
        for format in ["tiff", "gif", "jpg", "JPEG", "nonsense"] {
            let opts = EditOptions {
                format: Some(format.to_string()),
                ..Default::default()
            };
            assert!(opts.validate().is_ok(), "{}", format);
            assert_eq!(opts.output_format(), OutputFormat::Jpeg, "{}", format);
        }
        assert_eq!(options(r#"{"format":"WebP"}"#).output_format(), OutputFormat::Webp);
    }

    #[test]
    fn test_validate_ranges() {
        assert!(matches!(
            options(r#"{"rotation":45}"#).validate(),
            Err(FilterError::InvalidRotation(45))
        ));
        assert!(options(r#"{"rotation":-90}"#).validate().is_ok());
        assert!(options(r#"{"blur":-1}"#).validate().is_err());
        assert!(options(r#"{"width":0}"#).validate().is_err());
        assert!(options(r#"{"quality":0}"#).validate().is_err());
        assert!(options(r#"{"quality":100}"#).validate().is_ok());
    }

    #[test]
    fn test_rotation_swaps_dimensions() {
        let out = apply(solid(4, 2, [0, 0, 0, 255]), &options(r#"{"rotation":90}"#)).unwrap();
        assert_eq!(out.dimensions(), (2, 4));

        let out = apply(solid(4, 2, [0, 0, 0, 255]), &options(r#"{"rotation":180}"#)).unwrap();
        assert_eq!(out.dimensions(), (4, 2));
    }

    #[test]
    fn test_resize_fits_inside() {
        let out = apply(solid(200, 100, [0, 0, 0, 255]), &options(r#"{"width":50}"#)).unwrap();
        assert_eq!(out.dimensions(), (50, 25));

        let out = apply(
            solid(200, 100, [0, 0, 0, 255]),
            &options(r#"{"width":60,"height":60}"#),
        )
        .unwrap();
        assert_eq!(out.dimensions(), (60, 30));
    }

    #[test]
    fn test_grayscale() {
        let out = apply(solid(2, 2, [200, 100, 50, 255]), &options(r#"{"grayscale":true}"#))
            .unwrap()
            .to_rgba8();
        let Rgba([r, g, b, a]) = *out.get_pixel(0, 0);
        assert_eq!(r, g);
        assert_eq!(g, b);
        assert_eq!(a, 255);
    }

    #[test]
    fn test_brightness_scales_channels() {
        let out = apply(solid(1, 1, [100, 50, 20, 255]), &options(r#"{"brightness":50}"#))
            .unwrap()
            .to_rgba8();
        assert_eq!(*out.get_pixel(0, 0), Rgba([50, 25, 10, 255]));
    }

    #[test]
    fn test_zero_saturation_is_gray() {
        let out = apply(solid(1, 1, [200, 100, 50, 255]), &options(r#"{"saturation":0}"#))
            .unwrap()
            .to_rgba8();
        let Rgba([r, g, b, _]) = *out.get_pixel(0, 0);
        assert_eq!((r, g), (g, b));
    }

    #[test]
    fn test_contrast_pivots_on_mid_gray() {
        let out = apply(solid(1, 1, [128, 64, 192, 255]), &options(r#"{"contrast":200}"#))
            .unwrap()
            .to_rgba8();
        assert_eq!(*out.get_pixel(0, 0), Rgba([128, 0, 255, 255]));
    }

    #[test]
    fn test_sepia_tints_white() {
        let out = apply(solid(1, 1, [255, 255, 255, 255]), &options(r#"{"sepia":true}"#))
            .unwrap()
            .to_rgba8();
        assert_eq!(*out.get_pixel(0, 0), Rgba([255, 240, 196, 255]));
    }

    #[test]
    fn test_alpha_is_untouched() {
        let out = apply(
            solid(2, 2, [10, 20, 30, 77]),
            &options(r#"{"grayscale":true,"contrast":150,"sepia":true}"#),
        )
        .unwrap()
        .to_rgba8();
        assert!(out.pixels().all(|p| p.0[3] == 77));
    }
}
