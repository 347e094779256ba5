use editor_core::{
    detect_background_colors, vectorize, vectorize_hq, vectorize_with_colors_hq, Color, ColorRegionPartitioner,
    DetailLevel, FillRule, PathCommand,
};
use geo::Coord;
use image::{Rgb, RgbImage};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn white(width: u32, height: u32) -> RgbImage {
    RgbImage::from_pixel(width, height, Rgb([255, 255, 255]))
}

fn with_black_rect(mut img: RgbImage, x0: u32, y0: u32, x1: u32, y1: u32) -> RgbImage {
    for y in y0..y1 {
        for x in x0..x1 {
            img.put_pixel(x, y, Rgb([0, 0, 0]));
        }
    }
    img
}

#[test]
fn test_white_canvas_vectorizes_to_nothing() {
    for (w, h) in [(1, 1), (17, 5), (64, 48)] {
        let img = white(w, h);
        assert!(vectorize(&img).unwrap().is_empty());
        for level in DetailLevel::ALL {
            assert!(vectorize_hq(&img, level).unwrap().is_empty(), "{level} on {w}x{h}");
        }
    }
}

#[test]
fn test_black_square_gives_one_tight_path() {
    let img = with_black_rect(white(64, 64), 12, 20, 40, 48);
    let doc = vectorize(&img).unwrap();
    assert_eq!(doc.len(), 1);
    assert_eq!((doc.width, doc.height), (64, 64));

    let path = &doc.paths[0];
    let raw_boundary = 2 * (28 + 28) - 4;
    assert!(path.vertices().len() <= raw_boundary);
    assert!(matches!(path.commands.last(), Some(PathCommand::Close)));

    let rect = doc.bounding_box().unwrap();
    assert!((rect.min().x - 12.0).abs() <= 1.0);
    assert!((rect.min().y - 20.0).abs() <= 1.0);
    assert!((rect.max().x - 40.0).abs() <= 1.0);
    assert!((rect.max().y - 48.0).abs() <= 1.0);
}

#[test]
fn test_ultra_preserves_corners() {
    let img = with_black_rect(white(64, 64), 16, 16, 48, 40);
    let doc = vectorize_hq(&img, DetailLevel::Ultra).unwrap();
    assert_eq!(doc.len(), 1);

    let vertices = doc.paths[0].vertices();
    let perimeter = 2.0 * (31.0 + 23.0);
    let epsilon = DetailLevel::Ultra.params().epsilon_factor * perimeter;
    for corner in [(16.0, 16.0), (47.0, 16.0), (47.0, 39.0), (16.0, 39.0)] {
        let closest = vertices
            .iter()
            .map(|v: &Coord<f64>| ((v.x - corner.0).powi(2) + (v.y - corner.1).powi(2)).sqrt())
            .fold(f64::INFINITY, f64::min);
        assert!(closest <= epsilon, "corner {corner:?} off by {closest}");
    }
}

#[test]
fn test_partition_counts_flat_blocks() {
    let palette = [[250, 250, 250], [200, 20, 20], [20, 20, 200], [20, 160, 20]];
    // Four 24x24 quadrants
    let img = RgbImage::from_fn(48, 48, |x, y| Rgb(palette[((y / 24) * 2 + x / 24) as usize]));

    let regions = ColorRegionPartitioner::default().partition(
        &img,
        6,
        DetailLevel::Medium,
        &mut StdRng::seed_from_u64(7),
    );
    assert_eq!(regions.len(), 4);
    for region in &regions {
        let area = region.pixel_area();
        assert!((area - 576.0).abs() <= 576.0 * 0.05, "{} area {area}", region.color);
    }
}

#[test]
fn test_black_frame_vectorizes() {
    let img = RgbImage::from_fn(100, 100, |x, y| {
        let inside = (6..94).contains(&x) && (6..94).contains(&y);
        if inside {
            Rgb([255, 255, 255])
        } else {
            Rgb([0, 0, 0])
        }
    });

    assert_eq!(vectorize(&img).unwrap().len(), 1);
    let doc = vectorize_hq(&img, DetailLevel::High).unwrap();
    assert_eq!(doc.len(), 1);
    assert_eq!(doc.paths[0].subpath_count(), 2);
    assert_eq!(doc.paths[0].fill_rule, FillRule::EvenOdd);
}

#[test]
fn test_partition_nested_and_edge_spanning() {
    let bg = [235, 235, 235];
    let band = [30, 120, 30];
    let ring = [200, 40, 40];
    let core = [40, 40, 200];
    // A band across the full width, and a ring with a core inside it below
    let img = RgbImage::from_fn(120, 90, |x, y| {
        let in_ring = (30..90).contains(&x) && (40..84).contains(&y);
        let in_core = (50..70).contains(&x) && (54..70).contains(&y);
        Rgb(if y < 20 {
            band
        } else if in_core {
            core
        } else if in_ring {
            ring
        } else {
            bg
        })
    });

    let regions = ColorRegionPartitioner::default().partition(
        &img,
        8,
        DetailLevel::High,
        &mut StdRng::seed_from_u64(3),
    );
    assert_eq!(regions.len(), 4);

    let expected = [
        (bg, 120.0 * 70.0 - 60.0 * 44.0),
        (band, 120.0 * 20.0),
        (ring, 60.0 * 44.0 - 20.0 * 16.0),
        (core, 20.0 * 16.0),
    ];
    for (color, pixels) in expected {
        let region = regions
            .iter()
            .find(|r| r.color == Color::from(color))
            .unwrap_or_else(|| panic!("missing {color:?}"));
        assert_eq!(region.shapes.len(), 1, "{color:?}");
        let area = region.pixel_area();
        assert!((area - pixels).abs() <= pixels * 0.02 + 4.0, "{color:?} area {area}, expected {pixels}");
    }

    let doc = vectorize_with_colors_hq(&img, 8, DetailLevel::High).unwrap();
    assert_eq!(doc.len(), 4);
    let ring_path = doc.paths.iter().find(|p| p.fill == Color::from(ring)).unwrap();
    assert_eq!(ring_path.subpath_count(), 2);
}

#[test]
fn test_partition_dark_background() {
    let img = RgbImage::from_fn(64, 64, |x, y| {
        let window = (16..48).contains(&x) && (16..48).contains(&y);
        if window {
            Rgb([250, 250, 250])
        } else {
            Rgb([10, 10, 10])
        }
    });
    let regions = ColorRegionPartitioner::default().partition(
        &img,
        3,
        DetailLevel::Medium,
        &mut StdRng::seed_from_u64(11),
    );
    assert_eq!(regions.len(), 2);
    let dark = regions.iter().find(|r| r.color == Color::new(10, 10, 10)).unwrap();
    let light = regions.iter().find(|r| r.color == Color::new(250, 250, 250)).unwrap();
    assert!((dark.pixel_area() - 3072.0).abs() <= 3072.0 * 0.02 + 4.0, "{}", dark.pixel_area());
    assert!((light.pixel_area() - 1024.0).abs() <= 1024.0 * 0.02 + 4.0, "{}", light.pixel_area());
}

#[test]
fn test_colored_document_uses_region_colors() {
    let img = with_black_rect(white(40, 40), 10, 10, 30, 30);
    let doc = vectorize_with_colors_hq(&img, 4, DetailLevel::High).unwrap();
    let fills: Vec<Color> = doc.paths.iter().map(|p| p.fill).collect();
    assert!(fills.contains(&Color::WHITE));
    assert!(fills.contains(&Color::BLACK));
}

#[test]
fn test_detection_is_repeatable() {
    let img = RgbImage::from_fn(120, 90, |x, y| {
        let n = ((x * 7 + y * 13) % 23) as u8;
        if x < 60 {
            Rgb([230 + n / 2, 230, 225])
        } else {
            Rgb([40, 60 + n, 180])
        }
    });
    let first = detect_background_colors(&img, 4).unwrap();
    let second = detect_background_colors(&img, 4).unwrap();
    assert_eq!(first, second);
    assert!(!first.is_empty());
}
