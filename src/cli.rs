use clap::Parser;
use raster2svg::{ConversionOptions, Method};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "raster2svg")]
#[command(about = "Convert a raster image to SVG, tracing with potrace when available")]
#[command(version)]
pub struct Cli {
    /// Input image file
    #[arg(short, long, required_unless_present = "check_tracer")]
    pub input: Option<PathBuf>,

    /// Output SVG file (default: input with .svg extension)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// JSON file with conversion options; flags below override it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Luminance threshold 0-255 (default: 140 monochrome, 128 colour)
    #[arg(short, long)]
    pub threshold: Option<u8>,

    /// Fallback renderer
    #[arg(short, long, value_enum)]
    pub method: Option<Method>,

    /// Longest side of the working bitmap
    #[arg(long)]
    pub max_size: Option<u32>,

    /// Output scale factor
    #[arg(short, long)]
    pub scale: Option<f64>,

    /// Stretch contrast before binarization
    #[arg(long)]
    pub enhance_contrast: bool,

    /// Sharpen before binarization
    #[arg(long)]
    pub sharpen: bool,

    /// Edge-preserving denoise before binarization
    #[arg(long)]
    pub denoise: bool,

    /// Derive the threshold from mean luminance
    #[arg(short, long)]
    pub adaptive: bool,

    /// Ask the tracer for polygons instead of smooth curves
    #[arg(long)]
    pub no_smooth: bool,

    /// Never run the external tracer
    #[arg(long)]
    pub no_external: bool,

    /// Extra tracer executable to try before the built-in locations
    #[arg(long)]
    pub tracer: Vec<PathBuf>,

    /// Print the conversion report as JSON
    #[arg(long)]
    pub json: bool,

    /// Only report whether the external tracer is available
    #[arg(long)]
    pub check_tracer: bool,
}

impl Cli {
    /// Merge flags over `base`.
    pub fn apply(&self, mut base: ConversionOptions) -> ConversionOptions {
        if let Some(t) = self.threshold {
            base.threshold = Some(t);
        }
        if let Some(m) = self.method {
            base.method = m;
        }
        if let Some(m) = self.max_size {
            base.max_size = m;
        }
        if let Some(s) = self.scale {
            base.scale = s;
        }
        base.enhance_contrast |= self.enhance_contrast;
        base.sharpen |= self.sharpen;
        base.denoise |= self.denoise;
        base.adaptive_threshold |= self.adaptive;
        if self.no_smooth {
            base.smooth_curves = false;
        }
        if self.no_external {
            base.allow_external = false;
        }
        base
    }
}
