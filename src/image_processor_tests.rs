#[cfg(test)]
mod tests {
    use super::super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage, Rgba, RgbaImage};

    fn options(max_size: u32) -> ConversionOptions {
        ConversionOptions {
            max_size,
            ..Default::default()
        }
    }

    #[test]
    fn test_bounded_size_keeps_small_images() {
        assert_eq!(bounded_size(10, 10, 600), (10, 10));
        assert_eq!(bounded_size(600, 20, 600), (600, 20));
    }

    #[test]
    fn test_bounded_size_preserves_aspect_ratio() {
        assert_eq!(bounded_size(10, 10, 5), (5, 5));
        assert_eq!(bounded_size(1200, 600, 600), (600, 300));
        assert_eq!(bounded_size(300, 900, 600), (200, 600));
        assert_eq!(bounded_size(1000, 3, 10), (10, 1));
    }

    #[test]
    fn test_flatten_transparent_pixels_become_white() {
        let mut rgba = RgbaImage::new(2, 1);
        rgba.put_pixel(0, 0, Rgba([0, 0, 0, 0]));
        rgba.put_pixel(1, 0, Rgba([0, 0, 0, 255]));
        let flat = flatten_onto_white(&DynamicImage::ImageRgba8(rgba));
        assert_eq!(flat.get_pixel(0, 0), &Rgb([255, 255, 255]));
        assert_eq!(flat.get_pixel(1, 0), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_flatten_half_alpha_blends() {
        let rgba = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 128]));
        let flat = flatten_onto_white(&DynamicImage::ImageRgba8(rgba));
        let v = flat.get_pixel(0, 0)[0];
        assert!((126..=128).contains(&v), "got {}", v);
    }

    #[test]
    fn test_normalize_downscales_and_records_geometry() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(10, 10, Rgb([200, 10, 10])));
        let normalized = normalize(&img, &options(5)).unwrap();
        assert_eq!((normalized.image.width, normalized.image.height), (5, 5));
        let g = normalized.geometry;
        assert_eq!((g.source_width, g.source_height), (10, 10));
        assert_eq!((g.scale_x(), g.scale_y()), (2.0, 2.0));
        assert_eq!(g.output_size(), (10, 10));
    }

    #[test]
    fn test_normalize_keeps_gray_sources_gray() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(3, 2, Luma([77])));
        let normalized = normalize(&img, &options(600)).unwrap();
        assert_eq!(normalized.image.pixels, Pixels::Gray(vec![77; 6]));
    }

    #[test]
    fn test_normalize_rgb_stays_rgb() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(2, 2, Rgb([1, 2, 3])));
        let normalized = normalize(&img, &options(600)).unwrap();
        assert!(!normalized.image.is_gray());
        assert_eq!(normalized.image.rgb(1, 1), RGB8::new(1, 2, 3));
    }

    #[test]
    fn test_normalize_rejects_empty_image() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(0, 5));
        assert!(matches!(normalize(&img, &options(600)), Err(ConvertError::Input(_))));
    }

    #[test]
    fn test_geometry_output_scale() {
        let g = Geometry {
            source_width: 30,
            source_height: 20,
            width: 15,
            height: 10,
            output_scale: 1.5,
        };
        assert_eq!(g.transform(), (3.0, 3.0));
        assert_eq!(g.output_size(), (45, 30));
    }

    #[test]
    fn test_geometry_rounds_uneven_scale() {
        let g = Geometry {
            source_width: 7,
            source_height: 3,
            width: 3,
            height: 1,
            output_scale: 1.0,
        };
        assert_eq!(g.output_size(), (7, 3));
    }

    #[test]
    fn test_luma_matches_channel_weights() {
        assert_eq!(luma_of(RGB8::new(0, 0, 0)), 0);
        assert_eq!(luma_of(RGB8::new(255, 255, 255)), 255);
        assert_eq!(luma_of(RGB8::new(255, 0, 0)), 76);
        assert_eq!(luma_of(RGB8::new(0, 255, 0)), 150);
    }

    #[test]
    fn test_decode_garbage_is_input_error() {
        assert!(matches!(decode(b"\x00\x01garbage"), Err(ConvertError::Input(_))));
    }
}
