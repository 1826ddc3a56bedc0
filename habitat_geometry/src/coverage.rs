// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Coverage classification: how much of one region another region overlaps.

use kurbo::{Point, Rect, Shape};

use crate::clip::{calculate_intersection, intersect_with_box};
use crate::error::GeometryError;
use crate::ring::Ring;

/// Four-way classification of how much of a region is overlapped.
///
/// The variants are ordered, so `coverage >= Coverage::Partial` reads as
/// "touched at all".
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Coverage {
    /// No overlap.
    Null,
    /// Some overlap, under half.
    Partial,
    /// At least half, not all.
    Over50Percent,
    /// Complete overlap.
    Full,
}

impl Coverage {
    /// Classify a coverage ratio.
    ///
    /// `percent >= 1.0` is [`Full`](Self::Full), `[0.5, 1.0)` is
    /// [`Over50Percent`](Self::Over50Percent), `(0.0, 0.5)` is
    /// [`Partial`](Self::Partial) and everything else, NaN included, is
    /// [`Null`](Self::Null).
    pub fn from_percent(percent: f64) -> Self {
        if percent >= 1.0 {
            Self::Full
        } else if percent >= 0.5 {
            Self::Over50Percent
        } else if percent > 0.0 {
            Self::Partial
        } else {
            Self::Null
        }
    }

    /// True for anything but [`Null`](Self::Null).
    pub fn is_covered(self) -> bool {
        self != Self::Null
    }
}

/// Fraction of `first` covered by `second`.
///
/// With `apply_intersection` this is `area(first ∩ second) / area(first)`;
/// without it the overlap is assumed and the ratio is `area(second) / area(first)`.
/// Empty or zero-area operands yield `0.0`.
pub fn calculate_first_coverage_percent_by_second(
    first: &Ring,
    second: &Ring,
    apply_intersection: bool,
) -> Result<f64, GeometryError> {
    if first.is_degenerate() || second.is_empty() {
        return Ok(0.0);
    }
    let first_area = first.area().abs();
    let covered = if apply_intersection {
        match calculate_intersection(first, second)? {
            Some(intersection) => intersection.area().abs(),
            None => return Ok(0.0),
        }
    } else {
        second.area().abs()
    };
    Ok(covered / first_area)
}

/// [`Coverage`] of `first` by `second`.
pub fn check_first_coverage_level_by_second(
    first: &Ring,
    second: &Ring,
    apply_intersection: bool,
) -> Result<Coverage, GeometryError> {
    calculate_first_coverage_percent_by_second(first, second, apply_intersection)
        .map(Coverage::from_percent)
}

/// Fraction of the box `cell` covered by `zone`.
///
/// Same as [`calculate_first_coverage_percent_by_second`] with the box as the
/// first operand, but infallible since a box is always a valid clip region.
pub fn box_coverage_percent(cell: Rect, zone: &Ring) -> f64 {
    let cell_area = cell.area().abs();
    if cell_area <= crate::DEGENERATE_AREA {
        return 0.0;
    }
    intersect_with_box(zone, cell)
        .map(|intersection| intersection.area().abs() / cell_area)
        .unwrap_or(0.0)
}

/// [`Coverage`] of the box `cell` by `zone`.
pub fn box_coverage_level(cell: Rect, zone: &Ring) -> Coverage {
    Coverage::from_percent(box_coverage_percent(cell, zone))
}

/// True when `point` lies within `radius` of `center`, boundary included.
pub fn within_sphere(point: Point, center: Point, radius: f64) -> bool {
    point.distance_squared(center) <= radius * radius
}

/// True when every corner of `area` lies within the circle.
pub fn sphere_covers_box(area: Rect, center: Point, radius: f64) -> bool {
    [
        Point::new(area.x0, area.y0),
        Point::new(area.x1, area.y0),
        Point::new(area.x1, area.y1),
        Point::new(area.x0, area.y1),
    ]
    .into_iter()
    .all(|corner| within_sphere(corner, center, radius))
}

/// Exact classification of a box against a true circle.
///
/// Returns [`Coverage::Null`] when the closest point of the box is farther than
/// `radius`, [`Coverage::Full`] when every corner is inside, and
/// [`Coverage::Partial`] otherwise. [`Coverage::Over50Percent`] is never
/// produced; callers that need the ratio use [`box_coverage_percent`] against
/// [`make_sphere`](crate::make_sphere).
pub fn sphere_coverage_of_box(area: Rect, center: Point, radius: f64) -> Coverage {
    let nearest = Point::new(
        center.x.clamp(area.x0.min(area.x1), area.x0.max(area.x1)),
        center.y.clamp(area.y0.min(area.y1), area.y0.max(area.y1)),
    );
    if !within_sphere(nearest, center, radius) {
        Coverage::Null
    } else if sphere_covers_box(area, center, radius) {
        Coverage::Full
    } else {
        Coverage::Partial
    }
}
