// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Closed polygon rings and the primitive constructors built on them.

use alloc::vec::Vec;
use core::f64::consts::TAU;

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use kurbo::{PathEl, Point, Rect, Shape, Vec2};

/// Number of vertices used to approximate a circle by [`make_sphere`].
pub const POINTS_PER_CIRCLE: usize = 45;

/// Amount removed from the upper corner of a box by [`make_box`] when epsilon is applied.
///
/// Adjacent cells share an edge; shrinking the far corner keeps that edge owned by one cell.
pub const BOX_EPSILON: f64 = 1e-9;

/// Areas at or below this value are treated as zero.
pub const DEGENERATE_AREA: f64 = 1e-12;

/// A closed simple polygon.
///
/// The closing edge from the last vertex back to the first is implicit; a
/// repeated closing vertex passed to [`Ring::new`] is dropped.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Ring {
    points: Vec<Point>,
}

impl Ring {
    /// Create a ring from its vertices.
    pub fn new(mut points: Vec<Point>) -> Self {
        if points.len() > 1 && points.first() == points.last() {
            points.pop();
        }
        Self { points }
    }

    /// Counter-clockwise ring covering `rect`.
    pub fn from_rect(rect: Rect) -> Self {
        let rect = rect.abs();
        Self {
            points: alloc::vec![
                Point::new(rect.x0, rect.y0),
                Point::new(rect.x1, rect.y0),
                Point::new(rect.x1, rect.y1),
                Point::new(rect.x0, rect.y1),
            ],
        }
    }

    /// Vertices in order, without the closing vertex.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Number of vertices.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True when the ring cannot enclose any area (fewer than three vertices).
    pub fn is_empty(&self) -> bool {
        self.points.len() < 3
    }

    /// True when the enclosed area is at or below [`DEGENERATE_AREA`].
    pub fn is_degenerate(&self) -> bool {
        self.is_empty() || self.area().abs() <= DEGENERATE_AREA
    }

    /// Iterate the edges of the ring, closing edge included.
    pub fn edges(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        let n = self.points.len();
        (0..n).map(move |i| (self.points[i], self.points[(i + 1) % n]))
    }

    /// True when the vertices wind counter-clockwise in a y-up frame.
    pub fn is_ccw(&self) -> bool {
        self.area() > 0.0
    }

    /// Return the ring with counter-clockwise orientation.
    pub fn into_ccw(mut self) -> Self {
        if self.area() < 0.0 {
            self.points.reverse();
        }
        self
    }

    /// True when every turn has the same sign. Collinear vertices are allowed.
    pub fn is_convex(&self) -> bool {
        if self.is_empty() {
            return false;
        }
        let n = self.points.len();
        let mut sign = 0.0_f64;
        for i in 0..n {
            let a = self.points[i];
            let b = self.points[(i + 1) % n];
            let c = self.points[(i + 2) % n];
            let turn = cross(b - a, c - b);
            if turn.abs() <= DEGENERATE_AREA {
                continue;
            }
            if sign == 0.0 {
                sign = turn.signum();
            } else if turn.signum() != sign {
                return false;
            }
        }
        true
    }

    /// Translate every vertex by `offset`.
    pub fn translated(&self, offset: Vec2) -> Self {
        Self {
            points: self.points.iter().map(|p| *p + offset).collect(),
        }
    }
}

#[inline]
pub(crate) fn cross(a: Vec2, b: Vec2) -> f64 {
    a.x * b.y - a.y * b.x
}

/// Path elements of a [`Ring`].
#[derive(Clone, Debug)]
pub struct RingPathElements<'a> {
    points: &'a [Point],
    next: usize,
}

impl Iterator for RingPathElements<'_> {
    type Item = PathEl;

    fn next(&mut self) -> Option<PathEl> {
        let i = self.next;
        if self.points.is_empty() || i > self.points.len() {
            return None;
        }
        self.next += 1;
        Some(match i {
            0 => PathEl::MoveTo(self.points[0]),
            i if i == self.points.len() => PathEl::ClosePath,
            i => PathEl::LineTo(self.points[i]),
        })
    }
}

impl Shape for Ring {
    type PathElementsIter<'iter> = RingPathElements<'iter>;

    fn path_elements(&self, _tolerance: f64) -> RingPathElements<'_> {
        RingPathElements {
            points: &self.points,
            next: 0,
        }
    }

    /// Signed shoelace area; positive for counter-clockwise rings.
    fn area(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        0.5 * self
            .edges()
            .map(|(a, b)| a.x * b.y - b.x * a.y)
            .sum::<f64>()
    }

    fn perimeter(&self, _accuracy: f64) -> f64 {
        self.edges().map(|(a, b)| a.distance(b)).sum()
    }

    fn winding(&self, pt: Point) -> i32 {
        let mut winding = 0;
        for (a, b) in self.edges() {
            let side = cross(b - a, pt - a);
            if a.y <= pt.y {
                if b.y > pt.y && side > 0.0 {
                    winding += 1;
                }
            } else if b.y <= pt.y && side < 0.0 {
                winding -= 1;
            }
        }
        winding
    }

    fn bounding_box(&self) -> Rect {
        let mut it = self.points.iter();
        let Some(first) = it.next() else {
            return Rect::ZERO;
        };
        it.fold(Rect::from_points(*first, *first), |acc, p| {
            acc.union_pt(*p)
        })
    }
}

/// Axis-aligned box for the cell at integer `position` with edge length `size`.
///
/// The minimum corner is `position * size`. With `apply_epsilon` the maximum
/// corner is pulled in by [`BOX_EPSILON`], so a shared edge belongs only to the
/// cell that starts on it.
pub fn make_box(position: [u32; 2], size: f64, apply_epsilon: bool) -> Rect {
    let x0 = f64::from(position[0]) * size;
    let y0 = f64::from(position[1]) * size;
    let extent = if apply_epsilon {
        size - BOX_EPSILON
    } else {
        size
    };
    Rect::new(x0, y0, x0 + extent, y0 + extent)
}

/// Polygonal approximation of the circle of `radius` around `center`.
///
/// Vertices lie on the circle, so the polygon is slightly smaller than the
/// true disk.
pub fn make_sphere(center: Point, radius: f64) -> Ring {
    let step = TAU / POINTS_PER_CIRCLE as f64;
    let points = (0..POINTS_PER_CIRCLE)
        .map(|i| {
            let angle = step * i as f64;
            Point::new(
                center.x + radius * angle.cos(),
                center.y + radius * angle.sin(),
            )
        })
        .collect();
    Ring { points }
}
