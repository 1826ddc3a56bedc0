// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Uniform random points inside boxes and rings.

use kurbo::{Point, Rect, Shape};
use rand::Rng;

use crate::error::GeometryError;
use crate::ring::{DEGENERATE_AREA, Ring};

/// Rejection sampling gives up after this many misses.
pub const SAMPLING_ATTEMPTS: usize = 1 << 16;

/// Uniform random point inside `rect`.
pub fn random_point_in_box<R: Rng + ?Sized>(rect: Rect, rng: &mut R) -> Result<Point, GeometryError> {
    let rect = rect.abs();
    if rect.area() <= DEGENERATE_AREA {
        return Err(GeometryError::DegenerateShape("box has no area"));
    }
    Ok(Point::new(
        rng.gen_range(rect.x0..rect.x1),
        rng.gen_range(rect.y0..rect.y1),
    ))
}

/// Uniform random point inside `ring`, by rejection against its bounding box.
///
/// Zero-area rings fail immediately. Rings so thin that [`SAMPLING_ATTEMPTS`]
/// draws all miss fail with [`GeometryError::SamplingExhausted`].
pub fn random_point_in_ring<R: Rng + ?Sized>(ring: &Ring, rng: &mut R) -> Result<Point, GeometryError> {
    if ring.is_degenerate() {
        return Err(GeometryError::DegenerateShape("ring has no area"));
    }
    let bounds = ring.bounding_box();
    for _ in 0..SAMPLING_ATTEMPTS {
        let candidate = random_point_in_box(bounds, rng)?;
        if within_polygon(candidate, ring) {
            return Ok(candidate);
        }
    }
    Err(GeometryError::SamplingExhausted(SAMPLING_ATTEMPTS))
}

/// True when `point` lies strictly inside `ring` by the non-zero rule.
pub fn within_polygon(point: Point, ring: &Ring) -> bool {
    ring.contains(point)
}
