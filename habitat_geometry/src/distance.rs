// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Distances between points, rings and polylines.

use kurbo::{Line, ParamCurve, ParamCurveNearest, Point, Shape};

use crate::ring::Ring;

const NEAREST_ACCURACY: f64 = 1e-9;

/// Distance from `point` to the nearest point of `ring`; zero inside.
///
/// Returns `None` for an empty ring.
pub fn distance_to_ring(point: Point, ring: &Ring) -> Option<f64> {
    if ring.is_empty() {
        return None;
    }
    if ring.contains(point) {
        return Some(0.0);
    }
    closest_point_on_ring(point, ring).map(|nearest| nearest.distance(point))
}

/// Closest boundary point of `ring` to `point`.
///
/// Points already inside the ring are returned unchanged.
pub fn closest_point_on_ring(point: Point, ring: &Ring) -> Option<Point> {
    if ring.is_empty() {
        return None;
    }
    if ring.contains(point) {
        return Some(point);
    }
    ring.edges()
        .map(|(a, b)| {
            let line = Line::new(a, b);
            let nearest = line.nearest(point, NEAREST_ACCURACY);
            (nearest.distance_sq, line.eval(nearest.t))
        })
        .min_by(|l, r| l.0.total_cmp(&r.0))
        .map(|(_, p)| p)
}

/// Point at `distance` along the polyline through `points`.
///
/// Distances past the end clamp to the last vertex; negative distances clamp
/// to the first.
pub fn point_along_polyline(points: &[Point], distance: f64) -> Option<Point> {
    let first = *points.first()?;
    if distance <= 0.0 {
        return Some(first);
    }
    let mut remaining = distance;
    for segment in points.windows(2) {
        let length = segment[0].distance(segment[1]);
        if remaining <= length {
            if length == 0.0 {
                return Some(segment[1]);
            }
            return Some(segment[0].lerp(segment[1], remaining / length));
        }
        remaining -= length;
    }
    points.last().copied()
}

/// Length of the polyline through `points`.
pub fn polyline_length(points: &[Point]) -> f64 {
    points.windows(2).map(|s| s[0].distance(s[1])).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Rect;

    #[test]
    fn inside_is_zero() {
        let ring = Ring::from_rect(Rect::new(0.0, 0.0, 4.0, 4.0));
        assert_eq!(distance_to_ring(Point::new(1.0, 1.0), &ring), Some(0.0));
    }

    #[test]
    fn outside_measures_to_nearest_edge() {
        let ring = Ring::from_rect(Rect::new(0.0, 0.0, 4.0, 4.0));
        let d = distance_to_ring(Point::new(7.0, 2.0), &ring).expect("non-empty");
        assert!((d - 3.0).abs() < 1e-9);
        let corner = distance_to_ring(Point::new(7.0, 8.0), &ring).expect("non-empty");
        assert!((corner - 5.0).abs() < 1e-9);
        let nearest = closest_point_on_ring(Point::new(7.0, 2.0), &ring).expect("non-empty");
        assert!(nearest.distance(Point::new(4.0, 2.0)) < 1e-9);
    }

    #[test]
    fn walks_along_polyline() {
        let path = [
            Point::new(0.0, 0.0),
            Point::new(3.0, 0.0),
            Point::new(3.0, 4.0),
        ];
        assert_eq!(point_along_polyline(&path, 0.0), Some(Point::new(0.0, 0.0)));
        let mid = point_along_polyline(&path, 5.0).expect("non-empty");
        assert!(mid.distance(Point::new(3.0, 2.0)) < 1e-12);
        assert_eq!(point_along_polyline(&path, 100.0), Some(Point::new(3.0, 4.0)));
        assert_eq!(point_along_polyline(&[], 1.0), None);
        assert!((polyline_length(&path) - 7.0).abs() < 1e-12);
    }
}
