#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::packer::Rectangle;

    fn create_test_document() -> VectorDocument {
        let mut doc = VectorDocument::new(40, 20, (2.0, 2.0));
        doc.shapes.push(Shape::Rect(Rectangle::new(0, 0, 3, 2)));
        doc.shapes.push(Shape::Rect(Rectangle::new(5, 4, 1, 1)));
        doc
    }

    #[test]
    fn test_document_declares_canvas() {
        let svg = create_test_document().to_svg_string();
        assert!(svg.contains("<svg"));
        assert!(svg.contains(r#"width="40""#));
        assert!(svg.contains(r#"height="20""#));
        assert!(svg.contains(r#"viewBox="0 0 40 20""#));
        assert!(svg.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn test_document_has_white_background_and_group_transform() {
        let svg = create_test_document().to_svg_string();
        assert!(svg.contains(r#"fill="white""#));
        assert!(svg.contains(r#"transform="scale(2,2)""#));
    }

    #[test]
    fn test_document_emits_every_rect() {
        let svg = create_test_document().to_svg_string();
        assert_eq!(svg.matches(r#"fill="black""#).count(), 2);
        assert!(svg.contains(r#"x="5""#));
        assert!(svg.contains(r#"y="4""#));
    }

    #[test]
    fn test_document_emits_circles() {
        let mut doc = VectorDocument::new(8, 8, (1.0, 1.0));
        doc.shapes.push(Shape::Circle { cx: 0.5, cy: 4.5, r: 2.0 });
        let svg = doc.to_svg_string();
        assert!(svg.contains("<circle"));
        assert!(svg.contains(r#"cx="0.5""#));
        assert!(svg.contains(r#"cy="4.5""#));
        assert!(svg.contains(r#"r="2""#));
    }

    #[test]
    fn test_empty_document_still_valid() {
        let svg = VectorDocument::new(3, 3, (1.0, 1.0)).to_svg_string();
        assert!(svg.contains(r#"fill="white""#));
        assert!(!svg.contains(r#"fill="black""#));
    }

    #[test]
    fn test_save_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.svg");
        create_test_document().save(&path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains(r#"viewBox="0 0 40 20""#));
    }

    #[test]
    fn test_save_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("doc.svg");
        assert!(create_test_document().save(&path).is_err());
    }

    #[test]
    fn test_fmt_num() {
        assert_eq!(fmt_num(2.0), "2");
        assert_eq!(fmt_num(1.5), "1.5");
        assert_eq!(fmt_num(1.0 / 3.0), "0.3333");
        assert_eq!(fmt_num(-0.25), "-0.25");
    }
}
