use crate::packer::Rectangle;
use std::path::Path;
use svg::node::element::{Circle, Group, Rectangle as SvgRect};
use svg::Document;

/// A shape in processed-bitmap coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Rect(Rectangle),
    Circle { cx: f64, cy: f64, r: f64 },
}

/// Document produced by the fallback renderers.
///
/// Shapes live in bitmap space; `scale` maps them onto the `width` x `height` canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorDocument {
    pub width: u32,
    pub height: u32,
    pub background: String,
    pub scale: (f64, f64),
    pub shapes: Vec<Shape>,
}

impl VectorDocument {
    pub fn new(width: u32, height: u32, scale: (f64, f64)) -> Self {
        Self {
            width,
            height,
            background: "white".to_string(),
            scale,
            shapes: Vec::new(),
        }
    }

    pub fn to_svg(&self) -> Document {
        let mut group = Group::new().set(
            "transform",
            format!("scale({},{})", fmt_num(self.scale.0), fmt_num(self.scale.1)),
        );
        for shape in &self.shapes {
            group = match shape {
                Shape::Rect(r) => group.add(
                    SvgRect::new()
                        .set("x", r.x)
                        .set("y", r.y)
                        .set("width", r.width)
                        .set("height", r.height)
                        .set("fill", "black"),
                ),
                Shape::Circle { cx, cy, r } => group.add(
                    Circle::new()
                        .set("cx", fmt_num(*cx))
                        .set("cy", fmt_num(*cy))
                        .set("r", fmt_num(*r))
                        .set("fill", "black"),
                ),
            };
        }

        Document::new()
            .set("width", self.width)
            .set("height", self.height)
            .set("viewBox", (0, 0, self.width, self.height))
            .add(
                SvgRect::new()
                    .set("width", self.width)
                    .set("height", self.height)
                    .set("fill", self.background.as_str()),
            )
            .add(group)
    }

    pub fn to_svg_string(&self) -> String {
        self.to_svg().to_string()
    }

    pub fn save(&self, output_path: &Path) -> std::io::Result<()> {
        svg::save(output_path, &self.to_svg())
    }
}

/// Format a number compactly: integers without a fraction, otherwise up to 4 decimals.
pub fn fmt_num(v: f64) -> String {
    if (v - v.round()).abs() < 1e-9 {
        return format!("{}", v.round() as i64);
    }
    let s = format!("{:.4}", v);
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}
