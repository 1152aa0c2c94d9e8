//! Foreground/background classification.
//!
//! Near-monochrome images go straight to luminance thresholding. Colour images
//! get a background colour voted from eight border samples and a per-pixel
//! RGB distance test against it.

use crate::binarizer::{self, BinaryBitmap};
use crate::image_processor::{Pixels, RasterImage};
use crate::{ConversionOptions, Tuning};
use rgb::RGB8;
use tracing::debug;

/// Default threshold for images that are already monochrome.
pub const MONOCHROME_THRESHOLD: u8 = 140;
/// Default threshold when a colour image has to be thresholded on luminance.
pub const COLOR_THRESHOLD: u8 = 128;

/// How an image ended up binarized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Grayscale input, thresholded on luminance.
    Monochrome { threshold: u8 },
    /// Colour input, distance from a detected background colour.
    Background { color: [u8; 3] },
    /// Colour input without a dominant border colour, thresholded on luminance.
    Luminance { threshold: u8 },
}

/// Fraction of sampled pixels whose channels are pairwise close.
pub fn grayscale_ratio(image: &RasterImage, tuning: &Tuning) -> f64 {
    let pixels = match &image.pixels {
        Pixels::Gray(_) => return 1.0,
        Pixels::Rgb(p) => p,
    };
    let step = tuning.sample_step.max(1);
    let tol = tuning.grayscale_tolerance as i32;
    let (mut gray, mut total) = (0usize, 0usize);
    for p in pixels.iter().step_by(step) {
        let (r, g, b) = (p.r as i32, p.g as i32, p.b as i32);
        if (r - g).abs() < tol && (g - b).abs() < tol && (r - b).abs() < tol {
            gray += 1;
        }
        total += 1;
    }
    if total == 0 {
        return 1.0;
    }
    gray as f64 / total as f64
}

pub fn is_monochrome(image: &RasterImage, tuning: &Tuning) -> bool {
    grayscale_ratio(image, tuning) >= tuning.grayscale_ratio
}

/// Most frequent colour among the four corners and four edge midpoints.
///
/// Ties go to the colour sampled first. Returns `None` when all eight
/// samples differ, i.e. there is no background to speak of.
pub fn detect_background(image: &RasterImage) -> Option<RGB8> {
    let (w, h) = (image.width - 1, image.height - 1);
    let points = [
        (0, 0),
        (w, 0),
        (0, h),
        (w, h),
        (w / 2, 0),
        (w / 2, h),
        (0, h / 2),
        (w, h / 2),
    ];
    let samples: Vec<RGB8> = points.iter().map(|&(x, y)| image.rgb(x, y)).collect();

    let mut best: Option<(RGB8, usize)> = None;
    for &c in &samples {
        let count = samples.iter().filter(|&&s| s == c).count();
        if best.is_none_or(|(_, n)| count > n) {
            best = Some((c, count));
        }
    }
    match best {
        Some((c, n)) if n > 1 => Some(c),
        _ => None,
    }
}

/// Pixels further than `sensitivity` from `background` (Euclidean RGB) are foreground.
pub fn foreground_mask(image: &RasterImage, background: RGB8, sensitivity: f64) -> BinaryBitmap {
    let limit = sensitivity * sensitivity;
    BinaryBitmap::from_fn(image.width, image.height, |x, y| {
        let p = image.rgb(x, y);
        let dr = p.r as f64 - background.r as f64;
        let dg = p.g as f64 - background.g as f64;
        let db = p.b as f64 - background.b as f64;
        dr * dr + dg * dg + db * db > limit
    })
}

/// Binarize a normalized image, choosing the monochrome or colour path.
pub fn classify(image: &RasterImage, options: &ConversionOptions) -> (BinaryBitmap, Classification) {
    let tuning = &options.tuning;
    let luma_threshold = |default: u8| {
        if options.adaptive_threshold {
            binarizer::adaptive_threshold(&image.luma())
        } else {
            options.threshold.unwrap_or(default)
        }
    };

    if image.is_gray() || is_monochrome(image, tuning) {
        let t = luma_threshold(MONOCHROME_THRESHOLD);
        debug!(threshold = t, "monochrome path");
        let bitmap = binarizer::threshold(&image.luma(), image.width, image.height, t);
        return (bitmap, Classification::Monochrome { threshold: t });
    }

    let (raw, class) = match detect_background(image) {
        Some(bg) => {
            debug!(r = bg.r, g = bg.g, b = bg.b, "background colour");
            (
                foreground_mask(image, bg, tuning.sensitivity),
                Classification::Background { color: [bg.r, bg.g, bg.b] },
            )
        }
        None => {
            let t = luma_threshold(COLOR_THRESHOLD);
            debug!(threshold = t, "no dominant background, thresholding luminance");
            (
                binarizer::threshold(&image.luma(), image.width, image.height, t),
                Classification::Luminance { threshold: t },
            )
        }
    };
    (binarizer::despeckle(&raw, tuning), class)
}
