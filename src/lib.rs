//! raster2svg - raster image to SVG conversion engine
//!
//! Images are normalized, binarized into a foreground/background bitmap and
//! then either traced by an external tool (potrace command-line protocol) or
//! rendered in-process.
//!
//! ## Features
//!
//! - **Transparency flattening** and aspect-preserving size bounding
//! - **Monochrome detection** with fixed or mean-luminance thresholds
//! - **Background voting** and colour-distance classification with despeckling
//! - **External tracing** with a bounded subprocess and geometry rescaling
//! - **Fallback renderers**: exact rectangle packing, 2x2 blocks, radial dots
//!
//! ## Example
//!
//! ```rust,no_run
//! use raster2svg::{convert_file, ConversionOptions, Method};
//! use std::path::Path;
//!
//! let options = ConversionOptions {
//!     method: Method::Rectangle,
//!     max_size: 800,
//!     ..Default::default()
//! };
//!
//! let conversion = convert_file(Path::new("input.png"), Path::new("output.svg"), &options)
//!     .expect("Conversion failed");
//! println!("{}", conversion.message);
//! ```

pub mod binarizer;
pub mod classifier;
pub mod error;
pub mod image_processor;
pub mod markup;
pub mod packer;
pub mod pipeline;
pub mod preprocessor;
pub mod renderer;
pub mod svg_generator;
pub mod tracer;

pub use binarizer::BinaryBitmap;
pub use classifier::Classification;
pub use error::ConvertError;
pub use image_processor::{decode, load_image, Geometry, RasterImage};
pub use packer::{pack_rectangles, Rectangle};
pub use pipeline::{normalize_and_classify, Conversion, ConversionResult, Converter, Prepared, Stage};
pub use renderer::{Method, Renderer};
pub use svg_generator::{Shape, VectorDocument};
pub use tracer::ExternalTracer;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Empirical constants of the classifier and despeckler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Max pairwise channel difference (exclusive) for a gray pixel (default: 10)
    pub grayscale_tolerance: u8,
    /// Fraction of gray samples that makes an image monochrome (default: 0.9)
    pub grayscale_ratio: f64,
    /// Sample every Nth pixel for the grayscale test (default: 10)
    pub sample_step: usize,
    /// RGB distance from the background beyond which a pixel is foreground (default: 25)
    pub sensitivity: f64,
    /// Foreground pixels with fewer foreground neighbours are removed (default: 3)
    pub despeckle_remove_below: u8,
    /// Background pixels with more foreground neighbours are filled (default: 5)
    pub despeckle_fill_above: u8,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            grayscale_tolerance: 10,
            grayscale_ratio: 0.9,
            sample_step: 10,
            sensitivity: 25.0,
            despeckle_remove_below: 3,
            despeckle_fill_above: 5,
        }
    }
}

/// Options for image to SVG conversion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionOptions {
    /// Luminance threshold; unset means 140 for monochrome input, 128 otherwise
    pub threshold: Option<u8>,
    /// Renderer used when the external tracer is not used (default: rectangle)
    pub method: Method,
    /// Longest allowed side of the working bitmap (default: 600)
    pub max_size: u32,
    /// Output scale factor applied on top of the source size (default: 1.0)
    pub scale: f64,
    pub enhance_contrast: bool,
    pub sharpen: bool,
    pub denoise: bool,
    /// Derive the threshold from mean luminance (default: false)
    pub adaptive_threshold: bool,
    /// Ask the tracer for smooth curves rather than polygons (default: true)
    pub smooth_curves: bool,
    /// Try the external tracer before the in-process renderers (default: true)
    pub allow_external: bool,
    pub tuning: Tuning,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            threshold: None,
            method: Method::Rectangle,
            max_size: 600,
            scale: 1.0,
            enhance_contrast: false,
            sharpen: false,
            denoise: false,
            adaptive_threshold: false,
            smooth_curves: true,
            allow_external: true,
            tuning: Tuning::default(),
        }
    }
}

impl ConversionOptions {
    pub fn validate(&self) -> Result<(), ConvertError> {
        let invalid = |msg: &str| Err(ConvertError::InvalidOptions(msg.to_string()));
        if self.max_size == 0 {
            return invalid("max_size must be greater than 0");
        }
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return invalid("scale must be a positive number");
        }
        let t = &self.tuning;
        if !(0.0..=1.0).contains(&t.grayscale_ratio) {
            return invalid("grayscale_ratio must be within 0.0-1.0");
        }
        if t.sample_step == 0 {
            return invalid("sample_step must be greater than 0");
        }
        if !t.sensitivity.is_finite() || t.sensitivity < 0.0 {
            return invalid("sensitivity must be a non-negative number");
        }
        if t.despeckle_remove_below > 8 || t.despeckle_fill_above > 8 {
            return invalid("despeckle neighbour counts must be within 0-8");
        }
        Ok(())
    }
}

/// Availability of the external tracer.
#[derive(Debug, Clone, Serialize)]
pub struct TracerStatus {
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program: Option<PathBuf>,
}

/// Probe for the external tracer, trying `extra` before the built-in candidates.
pub fn tracer_status(extra: &[PathBuf]) -> TracerStatus {
    let converter = Converter::detect(ConversionOptions::default(), extra);
    let program = converter.tracer().map(|t| t.program().to_path_buf());
    TracerStatus {
        available: program.is_some(),
        program,
    }
}

/// Convert a decoded image, probing for the external tracer first.
///
/// The probe runs on every call so that a tracer installed or removed between
/// calls is noticed. Use [`Converter`] to probe once and reuse the result.
pub fn convert(image: &image::DynamicImage, options: &ConversionOptions) -> ConversionResult {
    Converter::detect(options.clone(), &[]).convert(image)
}

/// Convert an image file to an SVG file
///
/// # Example
///
/// ```rust,no_run
/// use raster2svg::{convert_file, ConversionOptions};
/// use std::path::Path;
///
/// let options = ConversionOptions::default();
/// convert_file(Path::new("input.png"), Path::new("output.svg"), &options)?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn convert_file(input_path: &Path, output_path: &Path, options: &ConversionOptions) -> ConversionResult {
    Converter::detect(options.clone(), &[]).convert_file(input_path, output_path)
}
