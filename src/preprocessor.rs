//! Optional enhancement passes applied to the bounded image before classification.
//!
//! All passes are deterministic so that binarization stays a pure function of
//! the input image and options.

use crate::image_processor::luma_of;
use crate::ConversionOptions;
use image::RgbImage;
use rgb::RGB8;

/// Preprocessing options
#[derive(Debug, Clone)]
pub struct PreprocessOptions {
    /// Stretch the luminance range to the full 0-255 span
    pub enhance_contrast: bool,
    /// Unsharp-mask the image
    pub sharpen: bool,
    /// Number of edge-preserving smoothing iterations (0 = none)
    pub denoise_iterations: u32,
    /// Bilateral filter sigma for the color domain
    pub color_sigma: f32,
}

impl Default for PreprocessOptions {
    fn default() -> Self {
        Self {
            enhance_contrast: false,
            sharpen: false,
            denoise_iterations: 0,
            color_sigma: 30.0,
        }
    }
}

impl From<&ConversionOptions> for PreprocessOptions {
    fn from(options: &ConversionOptions) -> Self {
        Self {
            enhance_contrast: options.enhance_contrast,
            sharpen: options.sharpen,
            denoise_iterations: if options.denoise { 1 } else { 0 },
            ..Default::default()
        }
    }
}

impl PreprocessOptions {
    pub fn is_noop(&self) -> bool {
        !self.enhance_contrast && !self.sharpen && self.denoise_iterations == 0
    }
}

/// Apply the selected passes in order: denoise, contrast, sharpen.
pub fn preprocess(img: &RgbImage, options: &PreprocessOptions) -> RgbImage {
    if options.is_noop() {
        return img.clone();
    }
    let (w, h) = img.dimensions();
    let mut pixels: Vec<RGB8> = img.pixels().map(|p| RGB8::new(p[0], p[1], p[2])).collect();

    for _ in 0..options.denoise_iterations {
        pixels = bilateral_filter(&pixels, w, h, options.color_sigma);
    }
    if options.enhance_contrast {
        pixels = stretch_contrast(&pixels);
    }

    let mut out = RgbImage::from_fn(w, h, |x, y| {
        let p = pixels[(y * w + x) as usize];
        image::Rgb([p.r, p.g, p.b])
    });
    if options.sharpen {
        out = image::imageops::unsharpen(&out, 1.0, 2);
    }
    out
}

/// Fast LUT-based bilateral filter with a fixed radius of 2.
fn bilateral_filter(pixels: &[RGB8], width: u32, height: u32, color_sigma: f32) -> Vec<RGB8> {
    let w = width as usize;
    let h = height as usize;
    let r = 2usize;

    // 195075 = 255^2 * 3, the largest squared RGB distance
    let range_denom = 2.0 * (color_sigma as f64) * (color_sigma as f64);
    let lut_size: usize = 256;
    let bin_scale = 195075.0 / lut_size as f64;
    let range_lut: Vec<u64> = (0..lut_size)
        .map(|i| ((-(i as f64 * bin_scale) / range_denom).exp() * 1024.0) as u64)
        .collect();

    let mut output = pixels.to_vec();
    for y in 0..h {
        for x in 0..w {
            let c = pixels[y * w + x];
            let (mut sr, mut sg, mut sb, mut sw) = (0u64, 0u64, 0u64, 0u64);

            for ny in y.saturating_sub(r)..(y + r + 1).min(h) {
                for nx in x.saturating_sub(r)..(x + r + 1).min(w) {
                    let n = pixels[ny * w + nx];
                    let dr = n.r as i32 - c.r as i32;
                    let dg = n.g as i32 - c.g as i32;
                    let db = n.b as i32 - c.b as i32;
                    let dist_sq = (dr * dr + dg * dg + db * db) as usize;
                    let weight = range_lut[((dist_sq * lut_size) / 195076).min(lut_size - 1)];

                    sr += n.r as u64 * weight;
                    sg += n.g as u64 * weight;
                    sb += n.b as u64 * weight;
                    sw += weight;
                }
            }

            if sw > 0 {
                output[y * w + x] = RGB8::new((sr / sw) as u8, (sg / sw) as u8, (sb / sw) as u8);
            }
        }
    }
    output
}

/// Linearly map the darkest luminance to 0 and the brightest to 255.
fn stretch_contrast(pixels: &[RGB8]) -> Vec<RGB8> {
    let (lo, hi) = pixels
        .iter()
        .map(|&p| luma_of(p))
        .fold((255u8, 0u8), |(lo, hi), l| (lo.min(l), hi.max(l)));
    if hi <= lo {
        return pixels.to_vec();
    }
    let span = (hi - lo) as i32;
    let stretch = |v: u8| (((v as i32 - lo as i32) * 255 + span / 2) / span).clamp(0, 255) as u8;
    pixels
        .iter()
        .map(|p| RGB8::new(stretch(p.r), stretch(p.g), stretch(p.b)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_returns_identical_image() {
        let img = RgbImage::from_fn(4, 3, |x, y| image::Rgb([(x * 40) as u8, (y * 60) as u8, 7]));
        let out = preprocess(&img, &PreprocessOptions::default());
        assert_eq!(out, img);
    }

    #[test]
    fn test_stretch_contrast_spans_full_range() {
        let pixels = vec![RGB8::new(100, 100, 100), RGB8::new(150, 150, 150), RGB8::new(200, 200, 200)];
        let result = stretch_contrast(&pixels);
        assert_eq!(result[0].r, 0);
        assert_eq!(result[2].r, 255);
        assert!(result[1].r > 100 && result[1].r < 155);
    }

    #[test]
    fn test_stretch_contrast_uniform_unchanged() {
        let pixels = vec![RGB8::new(90, 90, 90); 4];
        assert_eq!(stretch_contrast(&pixels), pixels);
    }

    #[test]
    fn test_bilateral_filter_uniform() {
        let pixels = vec![RGB8::new(128, 128, 128); 9];
        let result = bilateral_filter(&pixels, 3, 3, 30.0);
        for p in result {
            assert_eq!(p, RGB8::new(128, 128, 128));
        }
    }

    #[test]
    fn test_bilateral_filter_keeps_strong_edge() {
        let mut pixels = Vec::new();
        for _y in 0..6 {
            for x in 0..6 {
                pixels.push(if x < 3 { RGB8::new(0, 0, 0) } else { RGB8::new(255, 255, 255) });
            }
        }
        let result = bilateral_filter(&pixels, 6, 6, 30.0);
        assert!(result[2 * 6 + 2].r < 20);
        assert!(result[2 * 6 + 3].r > 235);
    }

    #[test]
    fn test_options_from_conversion_flags() {
        let conv = ConversionOptions {
            sharpen: true,
            denoise: true,
            ..Default::default()
        };
        let opts = PreprocessOptions::from(&conv);
        assert!(opts.sharpen);
        assert!(!opts.enhance_contrast);
        assert_eq!(opts.denoise_iterations, 1);
    }
}
