// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=habitat_geometry --heading-base-level=0

//! Habitat Geometry: the planar geometry kernel behind habitat trees.
//!
//! This crate holds the pure, stateless operations a spatial terrain index needs
//! to turn shaped regions of influence into per-cell decisions. It is built on
//! [`kurbo`] and keeps no state of its own.
//!
//! ## Shapes
//!
//! - [`Ring`]: a closed simple polygon. It implements [`kurbo::Shape`], so
//!   area, winding and bounding boxes come from the usual trait.
//! - [`make_box`]: the axis-aligned box of a cell, optionally pulled in by
//!   [`BOX_EPSILON`] so that neighbouring cells do not share an edge.
//! - [`make_sphere`]: a [`POINTS_PER_CIRCLE`]-vertex polygon standing in for a
//!   circle. All coverage math on spheres inherits this approximation.
//!
//! ## Coverage
//!
//! [`Coverage`] is the single four-way policy used wherever overlap is
//! tested: `Null`, `Partial`, `Over50Percent`, `Full`, with breakpoints at
//! `0`, `0.5` and `1`. [`calculate_first_coverage_percent_by_second`] and
//! [`check_first_coverage_level_by_second`] compute it for two rings;
//! [`box_coverage_level`] is the cell-box specialization.
//! [`sphere_coverage_of_box`] classifies a box against an exact circle.
//!
//! ## Intersection
//!
//! [`calculate_intersection`] clips with Sutherland–Hodgman, which requires one
//! convex operand. Boxes and spheres always qualify; two concave rings are
//! rejected with [`GeometryError::NonConvexClip`].
//!
//! ## Sampling
//!
//! [`random_point_in_box`] and [`random_point_in_ring`] draw uniform points
//! from any [`rand::Rng`]. Zero-area input fails fast with
//! [`GeometryError::DegenerateShape`] rather than looping.
//!
//! ## Distances
//!
//! [`distance_to_ring`], [`closest_point_on_ring`] and
//! [`point_along_polyline`] cover the remaining queries movement code asks.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod clip;
mod coverage;
mod distance;
mod error;
mod ring;
mod sample;

pub use clip::{calculate_intersection, intersect_with_box};
pub use coverage::{
    Coverage, box_coverage_level, box_coverage_percent, calculate_first_coverage_percent_by_second,
    check_first_coverage_level_by_second, sphere_coverage_of_box, sphere_covers_box, within_sphere,
};
pub use distance::{closest_point_on_ring, distance_to_ring, point_along_polyline, polyline_length};
pub use error::GeometryError;
pub use ring::{
    BOX_EPSILON, DEGENERATE_AREA, POINTS_PER_CIRCLE, Ring, RingPathElements, make_box, make_sphere,
};
pub use sample::{SAMPLING_ATTEMPTS, random_point_in_box, random_point_in_ring, within_polygon};
