//! Heuristic background removal
//!
//! Estimates the background colour from 12 fixed sample points, derives a
//! colour-distance threshold and an edge threshold from its luminance, then
//! classifies each pixel in a single pass:
//!
//! - pixels far enough from the background colour are kept opaque
//! - interior pixels with strong local contrast (8-neighbour gradient) are
//!   kept opaque even when their colour is close to the background
//! - everything else fades to transparent in proportion to its colour distance
//!
//! The output is not a fixed point: segmenting an already segmented raster
//! re-estimates the background from RGB only and may produce a different
//! alpha pattern.

use super::raster::{color_distance, pixel_distance, Raster, RasterError};

pub const COLOR_THRESHOLD_MIN: f64 = 30.0;
pub const COLOR_THRESHOLD_MAX: f64 = 80.0;
pub const EDGE_THRESHOLD_MIN: f64 = 20.0;
pub const EDGE_THRESHOLD_MAX: f64 = 50.0;

/// Edge threshold as a fraction of the colour threshold
pub const EDGE_RATIO: f64 = 0.6;

/// Fraction of the edge threshold above which a gradient still keeps a pixel
pub const SOFT_EDGE_RATIO: f64 = 0.7;

/// (dx, dy) of the 8 neighbours: N, S, E, W, then the diagonals
const NEIGHBOURS: [(i64, i64); 8] = [
    (0, -1),
    (0, 1),
    (1, 0),
    (-1, 0),
    (-1, -1),
    (1, -1),
    (-1, 1),
    (1, 1),
];

/// The 12 background sample coordinates for a `width x height` image
///
/// Corners, edge midpoints, then the four quadrant-interior points. Points
/// outside the image are dropped.
pub fn sample_points(width: u32, height: u32) -> Vec<(u32, u32)> {
    let (w, h) = (width as i64, height as i64);
    let candidates: [(i64, i64); 12] = [
        (0, 0),
        (w - 1, 0),
        (0, h - 1),
        (w - 1, h - 1),
        (w / 2, 0),
        (w / 2, h - 1),
        (0, h / 2),
        (w - 1, h / 2),
        (w / 4, h / 4),
        (3 * w / 4, h / 4),
        (w / 4, 3 * h / 4),
        (3 * w / 4, 3 * h / 4),
    ];

    candidates
        .into_iter()
        .filter(|&(x, y)| x >= 0 && y >= 0 && x < w && y < h)
        .map(|(x, y)| (x as u32, y as u32))
        .collect()
}

/// Mean RGB over the sample points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackgroundEstimate {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl BackgroundEstimate {
    /// Average the raster's colour at its sample points
    ///
    /// Returns `None` when no sample point falls inside the raster, which only
    /// happens for empty rasters.
    pub fn sample(raster: &Raster) -> Option<Self> {
        let points = sample_points(raster.width, raster.height);
        if points.is_empty() {
            return None;
        }

        let (mut r, mut g, mut b) = (0.0, 0.0, 0.0);
        for &(x, y) in &points {
            let [pr, pg, pb] = raster.rgb(x, y);
            r += pr as f64;
            g += pg as f64;
            b += pb as f64;
        }

        let count = points.len() as f64;
        Some(Self {
            r: r / count,
            g: g / count,
            b: b / count,
        })
    }

    /// Channel mean, used as a cheap luminance proxy
    pub fn luminance(&self) -> f64 {
        (self.r + self.g + self.b) / 3.0
    }

    pub fn as_array(&self) -> [f64; 3] {
        [self.r, self.g, self.b]
    }
}

/// Classification thresholds, fixed for the whole image
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub color: f64,
    pub edge: f64,
}

impl Thresholds {
    pub fn from_luminance(luminance: f64) -> Self {
        let color = (luminance / 10.0).clamp(COLOR_THRESHOLD_MIN, COLOR_THRESHOLD_MAX);
        let edge = (color * EDGE_RATIO).clamp(EDGE_THRESHOLD_MIN, EDGE_THRESHOLD_MAX);
        Self { color, edge }
    }

    pub fn from_background(background: &BackgroundEstimate) -> Self {
        Self::from_luminance(background.luminance())
    }
}

/// Per-pixel decision
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelClass {
    pub color_distance: f64,
    /// 0 on the image border
    pub max_gradient: f64,
    pub is_edge: bool,
    pub keep: bool,
    pub alpha: u8,
}

/// Background segmenter for one raster
#[derive(Debug)]
pub struct Segmenter<'a> {
    raster: &'a Raster,
    background: BackgroundEstimate,
    thresholds: Thresholds,
}

impl<'a> Segmenter<'a> {
    /// Validate the raster and compute the background estimate and thresholds
    pub fn new(raster: &'a Raster) -> Result<Self, RasterError> {
        raster.validate()?;

        let background = BackgroundEstimate::sample(raster).ok_or_else(|| {
            RasterError::InvalidImage("no sample point inside the image".to_string())
        })?;
        let thresholds = Thresholds::from_background(&background);

        Ok(Self {
            raster,
            background,
            thresholds,
        })
    }

    pub fn background(&self) -> BackgroundEstimate {
        self.background
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    /// Whether `(x, y)` lies on the outermost row or column
    pub fn is_border(&self, x: u32, y: u32) -> bool {
        x == 0 || y == 0 || x + 1 >= self.raster.width || y + 1 >= self.raster.height
    }

    /// Largest RGB distance between `(x, y)` and its 8 neighbours
    pub fn max_gradient(&self, x: u32, y: u32) -> f64 {
        if self.is_border(x, y) {
            return 0.0;
        }

        let center = self.raster.rgb(x, y);
        NEIGHBOURS
            .iter()
            .map(|&(dx, dy)| {
                let nx = (x as i64 + dx) as u32;
                let ny = (y as i64 + dy) as u32;
                pixel_distance(center, self.raster.rgb(nx, ny))
            })
            .fold(0.0, f64::max)
    }

    pub fn classify(&self, x: u32, y: u32) -> PixelClass {
        let Thresholds { color, edge } = self.thresholds;

        let distance = color_distance(self.raster.rgb(x, y), self.background.as_array());
        let max_gradient = self.max_gradient(x, y);
        let is_edge = max_gradient > edge;
        let keep = distance > color || is_edge || max_gradient > edge * SOFT_EDGE_RATIO;

        let alpha = if keep {
            u8::MAX
        } else {
            (distance / color * 255.0).clamp(0.0, 255.0).round() as u8
        };

        PixelClass {
            color_distance: distance,
            max_gradient,
            is_edge,
            keep,
            alpha,
        }
    }

    /// Produce the output raster: input RGB with the computed alpha
    pub fn run(&self) -> Raster {
        let mut output = self.raster.clone();
        let mut kept = 0usize;

        for y in 0..self.raster.height {
            for x in 0..self.raster.width {
                let class = self.classify(x, y);
                if class.keep {
                    kept += 1;
                }
                output.set_alpha(x, y, class.alpha);
            }
        }

        tracing::debug!(
            width = self.raster.width,
            height = self.raster.height,
            background = ?self.background.as_array(),
            color_threshold = self.thresholds.color,
            edge_threshold = self.thresholds.edge,
            kept_pixels = kept,
            "Segmentation complete"
        );

        output
    }
}

/// Make the background of `raster` transparent
///
/// Fails with [`RasterError::InvalidImage`] before touching any pixel when the
/// raster has zero dimensions or a mismatched buffer.
pub fn segment(raster: &Raster) -> Result<Raster, RasterError> {
    Ok(Segmenter::new(raster)?.run())
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRAY: [u8; 4] = [128, 128, 128, 255];

    fn set_rgb(raster: &mut Raster, x: u32, y: u32, rgb: [u8; 3]) {
        let offset = raster.pixel_offset(x, y);
        raster.data[offset..offset + 3].copy_from_slice(&rgb);
    }

    fn two_tone(width: u32, height: u32) -> Raster {
        let mut raster = Raster::filled(width, height, [0, 0, 0, 255]);
        for y in 0..height {
            for x in width / 2..width {
                set_rgb(&mut raster, x, y, [255, 255, 255]);
            }
        }
        raster
    }

    #[test]
    fn test_sample_points_layout() {
        let points = sample_points(10, 8);
        assert_eq!(
            points,
            vec![
                (0, 0),
                (9, 0),
                (0, 7),
                (9, 7),
                (5, 0),
                (5, 7),
                (0, 4),
                (9, 4),
                (2, 2),
                (7, 2),
                (2, 6),
                (7, 6),
            ]
        );
    }

    #[test]
    fn test_sample_points_single_pixel() {
        let points = sample_points(1, 1);
        assert_eq!(points.len(), 12);
        assert!(points.iter().all(|&p| p == (0, 0)));
    }

    #[test]
    fn test_sample_points_empty_image() {
        assert!(sample_points(0, 0).is_empty());
    }

    #[test]
    fn test_threshold_floor() {
        let t = Thresholds::from_luminance(0.0);
        assert_eq!(t.color, 30.0);
        assert_eq!(t.edge, 20.0);
    }

    #[test]
    fn test_threshold_for_white_stays_at_floor() {
        // 255 / 10 = 25.5, below the floor of 30
        let t = Thresholds::from_luminance(255.0);
        assert_eq!(t.color, 30.0);
        assert_eq!(t.edge, 20.0);
    }

    #[test]
    fn test_threshold_formula_between_bounds() {
        let t = Thresholds::from_luminance(500.0);
        assert_eq!(t.color, 50.0);
        assert!((t.edge - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_threshold_ceiling() {
        let t = Thresholds::from_luminance(800.0);
        assert_eq!(t.color, 80.0);
        assert!((t.edge - 48.0).abs() < 1e-9);

        let t = Thresholds::from_luminance(10_000.0);
        assert_eq!(t.color, COLOR_THRESHOLD_MAX);
        assert!(t.edge <= EDGE_THRESHOLD_MAX);
    }

    #[test]
    fn test_all_black_thresholds() {
        let raster = Raster::filled(6, 6, [0, 0, 0, 255]);
        let segmenter = Segmenter::new(&raster).unwrap();
        assert_eq!(segmenter.background().luminance(), 0.0);
        assert_eq!(segmenter.thresholds(), Thresholds { color: 30.0, edge: 20.0 });
    }

    #[test]
    fn test_uniform_gray_is_fully_transparent() {
        let raster = Raster::filled(10, 10, GRAY);
        let output = segment(&raster).unwrap();

        assert_eq!(output.width, 10);
        assert_eq!(output.height, 10);
        assert!(output.alpha_channel().all(|a| a == 0));
    }

    #[test]
    fn test_background_estimate_two_tone() {
        let raster = two_tone(10, 10);
        let segmenter = Segmenter::new(&raster).unwrap();

        // 7 of the 12 sample points land on the white half
        let expected = 7.0 * 255.0 / 12.0;
        let bg = segmenter.background();
        assert!((bg.r - expected).abs() < 1e-9);
        assert!((bg.g - expected).abs() < 1e-9);
        assert!((bg.b - expected).abs() < 1e-9);
    }

    #[test]
    fn test_two_tone_boundary_is_opaque() {
        let raster = two_tone(10, 10);
        let segmenter = Segmenter::new(&raster).unwrap();
        let hard_edge = 255.0 * 3f64.sqrt();

        for y in 1..9 {
            for x in [4, 5] {
                let class = segmenter.classify(x, y);
                assert!((class.max_gradient - hard_edge).abs() < 1e-9);
                assert!(class.is_edge);
                assert_eq!(class.alpha, 255);
            }
        }

        // Both halves are far from the mid-gray estimate
        let output = segmenter.run();
        assert!(output.alpha_channel().all(|a| a == 255));
    }

    #[test]
    fn test_border_pixels_have_no_gradient() {
        let raster = two_tone(10, 10);
        let segmenter = Segmenter::new(&raster).unwrap();

        for i in 0..10 {
            for (x, y) in [(i, 0), (i, 9), (0, i), (9, i)] {
                let class = segmenter.classify(x, y);
                assert_eq!(class.max_gradient, 0.0);
                assert!(!class.is_edge);
            }
        }
    }

    #[test]
    fn test_border_pixel_fades_with_distance() {
        let mut raster = Raster::filled(5, 5, GRAY);
        // (1, 0) is on the border and not a sample point
        set_rgb(&mut raster, 1, 0, [138, 128, 128]);

        let segmenter = Segmenter::new(&raster).unwrap();
        assert_eq!(segmenter.background().as_array(), [128.0, 128.0, 128.0]);

        let class = segmenter.classify(1, 0);
        assert!(!class.keep);
        assert_eq!(class.alpha, 85);

        let output = segmenter.run();
        for y in 0..5 {
            for x in 0..5 {
                let expected = if (x, y) == (1, 0) { 85 } else { 0 };
                assert_eq!(output.alpha(x, y), expected, "pixel ({}, {})", x, y);
            }
        }
    }

    #[test]
    fn test_soft_edge_keeps_interior_block() {
        let mut raster = Raster::filled(5, 5, GRAY);
        // Distance 20: below the colour threshold and not above the edge
        // threshold, but above 0.7 of it
        set_rgb(&mut raster, 2, 2, [148, 128, 128]);

        let segmenter = Segmenter::new(&raster).unwrap();
        let center = segmenter.classify(2, 2);
        assert!(!center.is_edge);
        assert!(center.keep);

        let output = segmenter.run();
        for y in 0..5 {
            for x in 0..5 {
                let inner = (1..=3).contains(&x) && (1..=3).contains(&y);
                let expected = if inner { 255 } else { 0 };
                assert_eq!(output.alpha(x, y), expected, "pixel ({}, {})", x, y);
            }
        }
    }

    #[test]
    fn test_rgb_is_preserved_and_input_alpha_ignored() {
        let mut raster = two_tone(6, 4);
        for px in raster.data.chunks_exact_mut(4) {
            px[3] = 3;
        }

        let output = segment(&raster).unwrap();
        for (src, dst) in raster.data.chunks_exact(4).zip(output.data.chunks_exact(4)) {
            assert_eq!(src[..3], dst[..3]);
            assert_eq!(dst[3], 255);
        }
    }

    #[test]
    fn test_thin_images_are_all_border() {
        let mut raster = Raster::filled(2, 6, GRAY);
        set_rgb(&mut raster, 1, 3, [0, 0, 0]);
        let segmenter = Segmenter::new(&raster).unwrap();

        for y in 0..6 {
            for x in 0..2 {
                assert!(segmenter.is_border(x, y));
                assert_eq!(segmenter.max_gradient(x, y), 0.0);
            }
        }
    }

    #[test]
    fn test_rejects_zero_dimensions() {
        let raster = Raster::new(0, 0, Vec::new());
        assert!(matches!(segment(&raster), Err(RasterError::InvalidImage(_))));
    }

    #[test]
    fn test_rejects_mismatched_buffer() {
        let raster = Raster::new(4, 4, vec![0; 4 * 4 * 3]);
        assert!(matches!(
            Segmenter::new(&raster),
            Err(RasterError::InvalidImage(_))
        ));
    }
}
