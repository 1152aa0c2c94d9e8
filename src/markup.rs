//! Rewriting the root element of tracer output.
//!
//! The tracer draws in processed-bitmap coordinates. The root `<svg>` element
//! is parsed, its `width`/`height`/`viewBox` are replaced with the output
//! canvas, and the original body is wrapped in a scaling group so the path
//! data itself is never touched.

use crate::error::ConvertError;
use crate::image_processor::Geometry;
use crate::svg_generator::fmt_num;
use std::collections::BTreeMap;
use svg::node::element::tag::Type;
use svg::parser::Event;

/// Tolerance when comparing the declared viewBox with the bitmap size.
const SIZE_TOLERANCE: f64 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub struct ViewBox {
    pub min_x: f64,
    pub min_y: f64,
    pub width: f64,
    pub height: f64,
}

impl std::str::FromStr for ViewBox {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let nums: Vec<f64> = s
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|p| !p.is_empty())
            .map(str::parse)
            .collect::<Result<_, _>>()
            .map_err(|_| malformed(format!("bad viewBox {:?}", s)))?;
        match nums[..] {
            [min_x, min_y, width, height] if width > 0.0 && height > 0.0 => Ok(ViewBox { min_x, min_y, width, height }),
            _ => Err(malformed(format!("bad viewBox {:?}", s))),
        }
    }
}

/// Attributes of the root element plus its byte span in the source text.
#[derive(Debug, Clone)]
pub struct RootElement {
    pub attributes: BTreeMap<String, String>,
    /// Byte offset of `<svg`.
    pub start: usize,
    /// Byte offset just past the closing `>` of the start tag.
    pub end: usize,
    pub self_closing: bool,
    /// Byte offset of the matching `</svg>`, absent for a self-closing root.
    pub close: Option<usize>,
}

/// One tag of the source text, outside comments, declarations and CDATA.
#[derive(Debug, Clone, Copy)]
struct TagSpan<'a> {
    start: usize,
    end: usize,
    name: &'a str,
    closing: bool,
    empty: bool,
}

struct Tags<'a> {
    markup: &'a str,
    pos: usize,
}

impl<'a> Tags<'a> {
    fn new(markup: &'a str, pos: usize) -> Self {
        Self { markup, pos }
    }
}

impl<'a> Iterator for Tags<'a> {
    type Item = TagSpan<'a>;

    fn next(&mut self) -> Option<TagSpan<'a>> {
        let markup = self.markup;
        loop {
            let start = self.pos + markup.get(self.pos..)?.find('<')?;
            let rest = &markup[start..];
            if let Some(body) = rest.strip_prefix("<!--") {
                self.pos = start + 4 + body.find("-->")? + 3;
            } else if rest.starts_with("<![CDATA[") {
                self.pos = start + rest.find("]]>")? + 3;
            } else if rest.starts_with("<?") {
                self.pos = start + rest.find("?>")? + 2;
            } else if rest.starts_with("<!") {
                self.pos = tag_end(markup, start)?;
            } else {
                let end = tag_end(markup, start)?;
                self.pos = end;
                let inner = &markup[start + 1..end - 1];
                let (closing, inner) = match inner.strip_prefix('/') {
                    Some(rest) => (true, rest),
                    None => (false, inner),
                };
                let name_len = inner
                    .find(|c: char| c.is_ascii_whitespace() || c == '/')
                    .unwrap_or(inner.len());
                return Some(TagSpan {
                    start,
                    end,
                    name: &inner[..name_len],
                    closing,
                    empty: inner.trim_end().ends_with('/'),
                });
            }
        }
    }
}

/// Offset just past the `>` closing the tag at `start`, honouring quotes and
/// a DOCTYPE internal subset.
fn tag_end(markup: &str, start: usize) -> Option<usize> {
    let mut quote = None;
    let mut depth = 0usize;
    for (off, &b) in markup.as_bytes()[start..].iter().enumerate() {
        match (quote, b) {
            (Some(q), _) if q == b => quote = None,
            (Some(_), _) => {}
            (None, b'"' | b'\'') => quote = Some(b),
            (None, b'[') => depth += 1,
            (None, b']') => depth = depth.saturating_sub(1),
            (None, b'>') if depth == 0 => return Some(start + off + 1),
            _ => {}
        }
    }
    None
}

fn malformed(msg: String) -> ConvertError {
    ConvertError::ToolFailure(format!("malformed tracer output: {}", msg))
}

/// Locate and parse the root `<svg>` start tag.
pub fn parse_root(markup: &str) -> Result<RootElement, ConvertError> {
    let parser = svg::read(markup).map_err(|e| malformed(e.to_string()))?;
    let mut attributes = None;
    for event in parser {
        match event {
            Event::Tag("svg", Type::Start | Type::Empty, attrs) => {
                attributes = Some(
                    attrs
                        .iter()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect::<BTreeMap<_, _>>(),
                );
                break;
            }
            Event::Error(e) => return Err(malformed(e.to_string())),
            _ => {}
        }
    }
    let attributes = attributes.ok_or_else(|| malformed("no <svg> element".to_string()))?;

    let root = Tags::new(markup, 0)
        .find(|t| t.name == "svg" && !t.closing)
        .ok_or_else(|| malformed("unterminated <svg> tag".to_string()))?;
    let close = if root.empty { None } else { find_close(markup, root.end) };
    Ok(RootElement {
        attributes,
        start: root.start,
        end: root.end,
        self_closing: root.empty,
        close,
    })
}

/// The `</svg>` balancing a root start tag that ends at `from`.
fn find_close(markup: &str, from: usize) -> Option<usize> {
    let mut depth = 1usize;
    for tag in Tags::new(markup, from).filter(|t| t.name == "svg") {
        if tag.closing {
            depth -= 1;
            if depth == 0 {
                return Some(tag.start);
            }
        } else if !tag.empty {
            depth += 1;
        }
    }
    None
}

/// Leading number of a length such as `"120.000000pt"`.
fn parse_length(value: &str) -> Option<f64> {
    let end = value
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-' || c == '+' || c == 'e'))
        .unwrap_or(value.len());
    value[..end].trim().parse().ok()
}

/// Resize tracer output to the output canvas described by `geometry`.
pub fn rescale(markup: &str, geometry: &Geometry) -> Result<String, ConvertError> {
    let root = parse_root(markup)?;
    let attr = |name: &str| {
        root.attributes
            .get(name)
            .ok_or_else(|| malformed(format!("root element has no {}", name)))
    };

    for name in ["width", "height"] {
        parse_length(attr(name)?).ok_or_else(|| malformed(format!("bad {}", name)))?;
    }
    let view_box: ViewBox = attr("viewBox")?.parse()?;
    if (view_box.width - geometry.width as f64).abs() > SIZE_TOLERANCE
        || (view_box.height - geometry.height as f64).abs() > SIZE_TOLERANCE
    {
        return Err(malformed(format!(
            "viewBox {}x{} does not match bitmap {}x{}",
            view_box.width, view_box.height, geometry.width, geometry.height
        )));
    }

    let (out_w, out_h) = geometry.output_size();
    let (sx, sy) = geometry.transform();
    let mut attributes = root.attributes.clone();
    attributes.insert("width".to_string(), out_w.to_string());
    attributes.insert("height".to_string(), out_h.to_string());
    attributes.insert("viewBox".to_string(), format!("0 0 {} {}", out_w, out_h));

    let body = if root.self_closing {
        ""
    } else {
        let close = root.close.ok_or_else(|| malformed("missing </svg>".to_string()))?;
        &markup[root.end..close]
    };

    let mut out = String::with_capacity(markup.len() + 128);
    out.push_str(&markup[..root.start]);
    out.push_str("<svg");
    for (k, v) in &attributes {
        out.push_str(&format!(" {}=\"{}\"", k, v.replace('"', "&quot;")));
    }
    out.push('>');
    out.push_str(&format!(r#"<g transform="scale({},{})">"#, fmt_num(sx), fmt_num(sy)));
    out.push_str(body);
    out.push_str("</g></svg>\n");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const POTRACE_LIKE: &str = r##"<?xml version="1.0" standalone="no"?>
<!DOCTYPE svg PUBLIC "-//W3C//DTD SVG 20010904//EN"
 "http://www.w3.org/TR/2001/REC-SVG-20010904/DTD/svg10.dtd">
<svg version="1.0" xmlns="http://www.w3.org/2000/svg"
 width="20.000000pt" height="10.000000pt" viewBox="0 0 20.000000 10.000000"
 preserveAspectRatio="xMidYMid meet">
<g transform="translate(0.000000,10.000000) scale(0.100000,-0.100000)"
fill="#000000" stroke="none">
<path d="M0 50 l0 -50 100 0 100 0 0 50 0 50 -100 0 -100 0 0 -50z"/>
</g>
</svg>
"##;

    fn geometry(source: (u32, u32), processed: (u32, u32), output_scale: f64) -> Geometry {
        Geometry {
            source_width: source.0,
            source_height: source.1,
            width: processed.0,
            height: processed.1,
            output_scale,
        }
    }

    #[test]
    fn test_parse_root_reads_attributes() {
        let root = parse_root(POTRACE_LIKE).unwrap();
        assert_eq!(root.attributes["width"], "20.000000pt");
        assert_eq!(root.attributes["preserveAspectRatio"], "xMidYMid meet");
        assert!(!root.self_closing);
        assert!(POTRACE_LIKE[root.start..root.end].starts_with("<svg version"));
        assert!(POTRACE_LIKE[root.start..root.end].ends_with("meet\">"));
    }

    #[test]
    fn test_view_box_parsing() {
        let vb: ViewBox = "0 0 20.5,10".parse().unwrap();
        assert_eq!(vb, ViewBox { min_x: 0.0, min_y: 0.0, width: 20.5, height: 10.0 });
        assert!("0 0 20".parse::<ViewBox>().is_err());
        assert!("0 0 0 10".parse::<ViewBox>().is_err());
        assert!("a b c d".parse::<ViewBox>().is_err());
    }

    #[test]
    fn test_rescale_to_source_size() {
        let out = rescale(POTRACE_LIKE, &geometry((40, 20), (20, 10), 1.0)).unwrap();
        assert!(out.contains(r#"width="40""#));
        assert!(out.contains(r#"height="20""#));
        assert!(out.contains(r#"viewBox="0 0 40 20""#));
        assert!(out.contains("<g transform=\"scale(2,2)\">\n<g transform=\"translate"));
        // Path data is carried over untouched.
        assert!(out.contains("M0 50 l0 -50 100 0"));
        assert!(out.starts_with("<?xml"));
        assert!(out.trim_end().ends_with("</g></svg>"));
        assert_eq!(out.matches("<svg").count(), 1);
    }

    #[test]
    fn test_rescale_applies_output_scale() {
        let out = rescale(POTRACE_LIKE, &geometry((20, 10), (20, 10), 1.5)).unwrap();
        assert!(out.contains(r#"width="30""#));
        assert!(out.contains(r#"height="15""#));
        assert!(out.contains(r#"transform="scale(1.5,1.5)""#));
    }

    #[test]
    fn test_rescale_rejects_mismatched_view_box() {
        let err = rescale(POTRACE_LIKE, &geometry((40, 40), (20, 20), 1.0)).unwrap_err();
        assert!(matches!(err, ConvertError::ToolFailure(_)));
    }

    #[test]
    fn test_rescale_rejects_missing_attributes() {
        let markup = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 4 4"></svg>"#;
        assert!(rescale(markup, &geometry((4, 4), (4, 4), 1.0)).is_err());
        assert!(rescale("not svg at all", &geometry((4, 4), (4, 4), 1.0)).is_err());
    }

    #[test]
    fn test_rescale_self_closing_root() {
        let markup = r#"<svg width="4" height="4" viewBox="0 0 4 4"/>"#;
        let out = rescale(markup, &geometry((8, 8), (4, 4), 1.0)).unwrap();
        assert!(out.contains(r#"viewBox="0 0 8 8""#));
        assert!(out.contains(r#"<g transform="scale(2,2)"></g></svg>"#));
    }

    #[test]
    fn test_parse_root_skips_lookalikes() {
        let markup = r#"<svgx/><svg a="x>y" b='1'>body</svg>"#;
        let root = parse_root(markup).unwrap();
        assert_eq!(&markup[root.start..root.end], r#"<svg a="x>y" b='1'>"#);
        assert_eq!(root.close, Some(markup.len() - "</svg>".len()));
    }

    #[test]
    fn test_rescale_ignores_svg_inside_comments() {
        let markup = "<?xml version=\"1.0\"?>\n<!-- generated by <svg tool> -->\n\
            <svg width=\"4\" height=\"4\" viewBox=\"0 0 4 4\"><path d=\"M0 0\"/></svg>\n\
            <!-- trailing </svg> -->\n";
        let out = rescale(markup, &geometry((8, 8), (4, 4), 1.0)).unwrap();
        assert!(out.contains("<!-- generated by <svg tool> -->\n<svg height=\"8\" viewBox=\"0 0 8 8\" width=\"8\">"));
        assert!(out.contains(r#"<g transform="scale(2,2)"><path d="M0 0"/></g></svg>"#));
        assert!(!out.contains(r#"width="4""#));
    }

    #[test]
    fn test_nested_svg_closes_at_root() {
        let markup = r#"<svg width="2" height="2" viewBox="0 0 2 2"><svg></svg><svg/></svg>"#;
        let root = parse_root(markup).unwrap();
        assert_eq!(root.close, Some(markup.len() - "</svg>".len()));
    }

    #[test]
    fn test_parse_length() {
        assert_eq!(parse_length("20.000000pt"), Some(20.0));
        assert_eq!(parse_length("7"), Some(7.0));
        assert_eq!(parse_length("px"), None);
    }
}
