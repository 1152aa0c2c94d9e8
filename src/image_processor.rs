//! Input normalization: decode, flatten transparency, bound the working size.

use crate::error::ConvertError;
use crate::preprocessor::{preprocess, PreprocessOptions};
use crate::ConversionOptions;
use image::imageops::FilterType;
use image::{DynamicImage, RgbImage};
use rgb::RGB8;
use tracing::debug;

/// Pixel storage of a normalized image, row-major from the top-left corner.
#[derive(Debug, Clone, PartialEq)]
pub enum Pixels {
    Gray(Vec<u8>),
    Rgb(Vec<RGB8>),
}

#[derive(Debug, Clone)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Pixels,
}

impl RasterImage {
    pub fn rgb(&self, x: u32, y: u32) -> RGB8 {
        let i = (y * self.width + x) as usize;
        match &self.pixels {
            Pixels::Gray(g) => RGB8::new(g[i], g[i], g[i]),
            Pixels::Rgb(p) => p[i],
        }
    }

    /// Luminance plane of the image (ITU-R 601 weights).
    pub fn luma(&self) -> Vec<u8> {
        match &self.pixels {
            Pixels::Gray(g) => g.clone(),
            Pixels::Rgb(p) => p.iter().map(|&c| luma_of(c)).collect(),
        }
    }

    pub fn is_gray(&self) -> bool {
        matches!(self.pixels, Pixels::Gray(_))
    }
}

pub fn luma_of(c: RGB8) -> u8 {
    ((c.r as u32 * 19595 + c.g as u32 * 38470 + c.b as u32 * 7471 + 0x8000) >> 16) as u8
}

/// Mapping between the processed bitmap, the source image and the output canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geometry {
    /// Dimensions of the decoded source image.
    pub source_width: u32,
    pub source_height: u32,
    /// Dimensions after size bounding.
    pub width: u32,
    pub height: u32,
    /// User-requested output scale factor.
    pub output_scale: f64,
}

impl Geometry {
    /// Factor mapping processed x coordinates back to source coordinates.
    pub fn scale_x(&self) -> f64 {
        self.source_width as f64 / self.width as f64
    }

    pub fn scale_y(&self) -> f64 {
        self.source_height as f64 / self.height as f64
    }

    /// Scale carried by the output group transform.
    pub fn transform(&self) -> (f64, f64) {
        (self.scale_x() * self.output_scale, self.scale_y() * self.output_scale)
    }

    /// Declared canvas size of the produced document.
    pub fn output_size(&self) -> (u32, u32) {
        let (sx, sy) = self.transform();
        (
            (self.width as f64 * sx).round().max(1.0) as u32,
            (self.height as f64 * sy).round().max(1.0) as u32,
        )
    }
}

#[derive(Debug, Clone)]
pub struct Normalized {
    pub image: RasterImage,
    pub geometry: Geometry,
}

pub fn decode(bytes: &[u8]) -> Result<DynamicImage, ConvertError> {
    Ok(image::load_from_memory(bytes)?)
}

pub fn load_image(path: &std::path::Path) -> Result<DynamicImage, ConvertError> {
    let img = image::open(path)?;
    Ok(img)
}

/// Flatten, bound and enhance an image so the classifier can work on it.
pub fn normalize(img: &DynamicImage, options: &ConversionOptions) -> Result<Normalized, ConvertError> {
    let (source_width, source_height) = (img.width(), img.height());
    if source_width == 0 || source_height == 0 {
        return Err(ConvertError::Input("image has zero area".to_string()));
    }

    let luma_source = matches!(
        img.color(),
        image::ColorType::L8 | image::ColorType::La8 | image::ColorType::L16 | image::ColorType::La16
    );

    let mut rgb = flatten_onto_white(img);

    let (width, height) = bounded_size(source_width, source_height, options.max_size);
    if (width, height) != (source_width, source_height) {
        debug!(source_width, source_height, width, height, "downscaling input");
        rgb = image::imageops::resize(&rgb, width, height, FilterType::Lanczos3);
    }

    let rgb = preprocess(&rgb, &PreprocessOptions::from(options));

    let pixels = if luma_source {
        Pixels::Gray(rgb.pixels().map(|p| p[0]).collect())
    } else {
        Pixels::Rgb(rgb.pixels().map(|p| RGB8::new(p[0], p[1], p[2])).collect())
    };

    Ok(Normalized {
        image: RasterImage { width, height, pixels },
        geometry: Geometry {
            source_width,
            source_height,
            width,
            height,
            output_scale: options.scale,
        },
    })
}

/// Composite any alpha channel onto an opaque white canvas.
pub fn flatten_onto_white(img: &DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }
    let rgba = img.to_rgba8();
    let mut out = RgbImage::new(rgba.width(), rgba.height());
    for (src, dst) in rgba.pixels().zip(out.pixels_mut()) {
        let a = src[3] as u32;
        for c in 0..3 {
            dst[c] = ((src[c] as u32 * a + 255 * (255 - a) + 127) / 255) as u8;
        }
    }
    out
}

/// Largest size fitting inside `max_size` x `max_size` with the same aspect ratio.
pub fn bounded_size(width: u32, height: u32, max_size: u32) -> (u32, u32) {
    if width <= max_size && height <= max_size {
        return (width, height);
    }
    let ratio = (max_size as f64 / width as f64).min(max_size as f64 / height as f64);
    let w = ((width as f64 * ratio).round() as u32).clamp(1, max_size);
    let h = ((height as f64 * ratio).round() as u32).clamp(1, max_size);
    (w, h)
}

#[cfg(test)]
mod tests {
    include!("image_processor_tests.rs");
}
