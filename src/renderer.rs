//! Renderers turning a binary bitmap into vector output.
//!
//! The closed set of strategies is modelled by [`Renderer`]; the three
//! in-process variants are infallible and produce a [`VectorDocument`], the
//! external variant shells out and may fail.

use crate::binarizer::BinaryBitmap;
use crate::error::ConvertError;
use crate::image_processor::Geometry;
use crate::packer::{pack_rectangles, Rectangle};
use crate::svg_generator::{Shape, VectorDocument};
use crate::tracer::ExternalTracer;
use serde::{Deserialize, Serialize};

/// Sampling stride of the radial renderer.
pub const RADIAL_STEP: u32 = 4;
/// Circle radius of the radial renderer, in bitmap pixels.
pub const RADIAL_RADIUS: f64 = 2.0;

/// In-process renderer chosen by the caller for the fallback path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// Exact cover with greedy rectangles
    #[default]
    Rectangle,
    /// Coarse 2x2 blocks ("detailed" style)
    Block,
    /// Circles on a 4px grid ("geometric" style)
    Radial,
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Method::Rectangle => "rectangle",
            Method::Block => "block",
            Method::Radial => "radial",
        };
        f.write_str(name)
    }
}

/// Output of a renderer.
#[derive(Debug, Clone)]
pub enum Artifact {
    Document(VectorDocument),
    Markup(String),
}

impl Artifact {
    pub fn to_svg_string(&self) -> String {
        match self {
            Artifact::Document(doc) => doc.to_svg_string(),
            Artifact::Markup(markup) => markup.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Renderer {
    RectanglePack,
    Block,
    Radial,
    External(ExternalTracer),
}

impl From<Method> for Renderer {
    fn from(method: Method) -> Self {
        match method {
            Method::Rectangle => Renderer::RectanglePack,
            Method::Block => Renderer::Block,
            Method::Radial => Renderer::Radial,
        }
    }
}

impl Renderer {
    pub fn name(&self) -> &'static str {
        match self {
            Renderer::RectanglePack => "rectangle",
            Renderer::Block => "block",
            Renderer::Radial => "radial",
            Renderer::External(_) => "external",
        }
    }

    pub fn render(&self, bitmap: &BinaryBitmap, geometry: &Geometry) -> Result<Artifact, ConvertError> {
        let shapes = match self {
            Renderer::External(tracer) => return tracer.trace(bitmap, geometry).map(Artifact::Markup),
            Renderer::RectanglePack => pack_rectangles(bitmap).into_iter().map(Shape::Rect).collect(),
            Renderer::Block => block_shapes(bitmap),
            Renderer::Radial => radial_shapes(bitmap),
        };
        let (width, height) = geometry.output_size();
        let mut doc = VectorDocument::new(width, height, geometry.transform());
        doc.shapes = shapes;
        Ok(Artifact::Document(doc))
    }
}

/// 2x2 block sampling: a full block where the 2x2 cell is all foreground,
/// otherwise a single pixel for a foreground anchor.
pub fn block_shapes(bitmap: &BinaryBitmap) -> Vec<Shape> {
    let mut shapes = Vec::new();
    for y in (0..bitmap.height).step_by(2) {
        for x in (0..bitmap.width).step_by(2) {
            if !bitmap.get(x, y) {
                continue;
            }
            let full = x + 1 < bitmap.width
                && y + 1 < bitmap.height
                && bitmap.get(x + 1, y)
                && bitmap.get(x, y + 1)
                && bitmap.get(x + 1, y + 1);
            let size = if full { 2 } else { 1 };
            shapes.push(Shape::Rect(Rectangle::new(x, y, size, size)));
        }
    }
    shapes
}

/// Fixed-radius circles centred on foreground samples of a 4px grid.
pub fn radial_shapes(bitmap: &BinaryBitmap) -> Vec<Shape> {
    let mut shapes = Vec::new();
    for y in (0..bitmap.height).step_by(RADIAL_STEP as usize) {
        for x in (0..bitmap.width).step_by(RADIAL_STEP as usize) {
            if bitmap.get(x, y) {
                shapes.push(Shape::Circle {
                    cx: x as f64 + 0.5,
                    cy: y as f64 + 0.5,
                    r: RADIAL_RADIUS,
                });
            }
        }
    }
    shapes
}
