// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property tests for coverage classification and clipping.

use habitat_geometry::{
    Coverage, Ring, box_coverage_percent, calculate_intersection, make_box, make_sphere,
    random_point_in_ring, sphere_coverage_of_box, within_sphere,
};
use kurbo::{Point, Rect, Shape};
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

proptest! {
    #[test]
    fn coverage_bands_are_total(percent in -10.0_f64..10.0) {
        let band = Coverage::from_percent(percent);
        let expected = if percent >= 1.0 {
            Coverage::Full
        } else if percent >= 0.5 {
            Coverage::Over50Percent
        } else if percent > 0.0 {
            Coverage::Partial
        } else {
            Coverage::Null
        };
        prop_assert_eq!(band, expected);
    }

    #[test]
    fn coverage_is_monotone(a in 0.0_f64..2.0, b in 0.0_f64..2.0) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(Coverage::from_percent(lo) <= Coverage::from_percent(hi));
    }

    #[test]
    fn box_intersection_area_matches_overlap(
        ax in -5.0_f64..5.0, ay in -5.0_f64..5.0, aw in 0.5_f64..5.0, ah in 0.5_f64..5.0,
        bx in -5.0_f64..5.0, by in -5.0_f64..5.0, bw in 0.5_f64..5.0, bh in 0.5_f64..5.0,
    ) {
        let a = Rect::new(ax, ay, ax + aw, ay + ah);
        let b = Rect::new(bx, by, bx + bw, by + bh);
        let overlap = a.intersect(b);
        let expected = overlap.width().max(0.0) * overlap.height().max(0.0);
        let got = calculate_intersection(&Ring::from_rect(a), &Ring::from_rect(b))
            .expect("boxes are convex")
            .map(|ring| ring.area().abs())
            .unwrap_or(0.0);
        prop_assert!((got - expected).abs() < 1e-9, "got {got}, expected {expected}");
    }

    #[test]
    fn box_coverage_stays_in_unit_range(
        x in 0_u32..8, y in 0_u32..8,
        cx in 0.0_f64..8.0, cy in 0.0_f64..8.0, r in 0.1_f64..6.0,
    ) {
        let cell = make_box([x, y], 1.0, true);
        let percent = box_coverage_percent(cell, &make_sphere(Point::new(cx, cy), r));
        prop_assert!((0.0..=1.0 + 1e-9).contains(&percent));
    }

    #[test]
    fn exact_sphere_classification_agrees_with_corners(
        x in 0_u32..8, y in 0_u32..8,
        cx in 0.0_f64..8.0, cy in 0.0_f64..8.0, r in 0.1_f64..6.0,
    ) {
        let cell = make_box([x, y], 1.0, true);
        let center = Point::new(cx, cy);
        let coverage = sphere_coverage_of_box(cell, center, r);
        let center_of_cell = cell.center();
        if coverage == Coverage::Null {
            prop_assert!(!within_sphere(center_of_cell, center, r));
        }
        if coverage == Coverage::Full {
            prop_assert!(within_sphere(center_of_cell, center, r));
        }
    }

    #[test]
    fn sampled_points_fall_inside(seed in 0_u64..1_000, r in 0.5_f64..20.0) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let sphere = make_sphere(Point::new(r, r), r);
        let p = random_point_in_ring(&sphere, &mut rng).expect("sphere has area");
        prop_assert!(sphere.contains(p));
    }
}
