use editor_core::simplify::douglas_peucker_closed;
use editor_core::{detect_background_colors_with_rng, remove_color_background, Color};
use geo::Coord;
use image::{Rgb, RgbImage};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Random image drawn from a small random palette so colors repeat.
fn random_image(width: u32, height: u32, palette_size: usize, seed: u64) -> RgbImage {
    let mut rng = StdRng::seed_from_u64(seed);
    let palette: Vec<[u8; 3]> = (0..palette_size).map(|_| rng.gen()).collect();
    RgbImage::from_fn(width, height, |_, _| Rgb(palette[rng.gen_range(0..palette.len())]))
}

fn removed(img: &RgbImage, target: Color, tolerance: f64) -> Vec<bool> {
    remove_color_background(img, target, tolerance)
        .unwrap()
        .pixels()
        .map(|p| p[3] == 0)
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn coverage_is_bounded(
        width in 1u32..48,
        height in 1u32..48,
        palette in 1usize..40,
        seed in any::<u64>(),
        n in 1usize..8,
    ) {
        let img = random_image(width, height, palette, seed);
        let candidates = detect_background_colors_with_rng(&img, n, &mut StdRng::seed_from_u64(seed)).unwrap();
        prop_assert!(candidates.len() <= n);

        let mut sum = 0.0;
        for c in &candidates {
            prop_assert!((0.0..=100.0 + 1e-9).contains(&c.coverage));
            sum += c.coverage;
        }
        prop_assert!(sum <= 100.0 + 1e-9);
    }

    #[test]
    fn zero_tolerance_removes_exact_matches_only(
        width in 1u32..24,
        height in 1u32..24,
        palette in 1usize..6,
        seed in any::<u64>(),
    ) {
        let img = random_image(width, height, palette, seed);
        let target = Color::from(*img.get_pixel(0, 0));
        let mask = removed(&img, target, 0.0);
        for (p, gone) in img.pixels().zip(mask) {
            prop_assert_eq!(gone, Color::from(*p) == target);
        }
    }

    #[test]
    fn removal_grows_with_tolerance(
        seed in any::<u64>(),
        target in any::<[u8; 3]>(),
        low in 0.0f64..100.0,
        extra in 0.0f64..100.0,
    ) {
        let img = random_image(16, 16, 32, seed);
        let target = Color::from(target);
        let small = removed(&img, target, low);
        let large = removed(&img, target, low + extra);
        for (a, b) in small.iter().zip(&large) {
            prop_assert!(!a || *b);
        }
    }

    #[test]
    fn simplification_keeps_a_subset(
        points in prop::collection::vec((0i32..50, 0i32..50), 3..60),
        epsilon in 0.0f64..5.0,
    ) {
        let ring: Vec<Coord<f64>> = points.iter().map(|&(x, y)| Coord { x: x as f64, y: y as f64 }).collect();
        let simplified = douglas_peucker_closed(&ring, epsilon);
        prop_assert!(simplified.len() <= ring.len());
        for v in &simplified {
            prop_assert!(ring.contains(v));
        }
    }
}
