// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Polygon intersection by Sutherland–Hodgman clipping.

use alloc::vec::Vec;

use kurbo::{Point, Rect, Shape};

use crate::error::GeometryError;
use crate::ring::{DEGENERATE_AREA, Ring, cross};

/// Intersection of two rings.
///
/// Returns `Ok(None)` when the rings are disjoint or only touch along a
/// boundary. At least one operand must be convex; every ring produced by
/// [`make_box`](crate::make_box) and [`make_sphere`](crate::make_sphere) is.
pub fn calculate_intersection(a: &Ring, b: &Ring) -> Result<Option<Ring>, GeometryError> {
    if a.is_empty() || b.is_empty() {
        return Ok(None);
    }
    if !boxes_overlap(a.bounding_box(), b.bounding_box()) {
        return Ok(None);
    }
    let (subject, clip) = if b.is_convex() {
        (a, b)
    } else if a.is_convex() {
        (b, a)
    } else {
        return Err(GeometryError::NonConvexClip);
    };
    Ok(clip_by_convex(subject.points(), clip))
}

/// Intersection of a ring with an axis-aligned box.
///
/// Boxes are convex, so this cannot fail.
pub fn intersect_with_box(ring: &Ring, rect: Rect) -> Option<Ring> {
    if ring.is_empty() || !boxes_overlap(ring.bounding_box(), rect) {
        return None;
    }
    clip_by_convex(ring.points(), &Ring::from_rect(rect))
}

/// Interiors overlap; shared edges do not count.
fn boxes_overlap(a: Rect, b: Rect) -> bool {
    a.x0 < b.x1 && b.x0 < a.x1 && a.y0 < b.y1 && b.y0 < a.y1
}

fn clip_by_convex(subject: &[Point], clip: &Ring) -> Option<Ring> {
    let clip = if clip.is_ccw() {
        clip.points().to_vec()
    } else {
        let mut reversed = clip.points().to_vec();
        reversed.reverse();
        reversed
    };

    let mut output: Vec<Point> = subject.to_vec();
    let n = clip.len();
    for i in 0..n {
        if output.is_empty() {
            break;
        }
        let a = clip[i];
        let b = clip[(i + 1) % n];
        let input = core::mem::take(&mut output);
        let len = input.len();
        for j in 0..len {
            let current = input[j];
            let previous = input[(j + len - 1) % len];
            let current_in = cross(b - a, current - a) >= 0.0;
            let previous_in = cross(b - a, previous - a) >= 0.0;
            if current_in {
                if !previous_in {
                    output.push(edge_crossing(previous, current, a, b));
                }
                output.push(current);
            } else if previous_in {
                output.push(edge_crossing(previous, current, a, b));
            }
        }
    }

    let ring = Ring::new(output);
    if ring.is_empty() || ring.area().abs() <= DEGENERATE_AREA {
        None
    } else {
        Some(ring)
    }
}

/// Point where segment `p`–`q` crosses the infinite line through `a`–`b`.
fn edge_crossing(p: Point, q: Point, a: Point, b: Point) -> Point {
    let dp = cross(b - a, p - a);
    let dq = cross(b - a, q - a);
    let denom = dp - dq;
    if denom == 0.0 {
        return q;
    }
    p.lerp(q, dp / denom)
}
