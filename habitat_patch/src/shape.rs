// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Patch shapes: a closed set of influence-zone generators.

use core::fmt;

use habitat_geometry::{Coverage, Ring, box_coverage_level, make_sphere, random_point_in_box};
use kurbo::{Point, Rect};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::PatchError;

/// Spatial extent patches are resolved against.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorldFrame {
    /// World bounds; the minimum corner is usually the origin.
    pub bounds: Rect,
}

impl WorldFrame {
    /// Frame spanning `[0, width) x [0, height)`.
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            bounds: Rect::new(0.0, 0.0, width, height),
        }
    }
}

/// Declarative shape description, as found in configuration files.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ShapeConfig {
    /// Covers the whole world.
    Homogeneous,
    /// Bell-shaped influence around a fixed center.
    Gaussian {
        /// Center coordinates, one per axis.
        center: Vec<f64>,
        /// Standard deviation of the bell.
        sigma: f64,
        /// Zone radius in multiples of `sigma`.
        #[serde(default = "default_cutoff")]
        cutoff: f64,
    },
    /// Disk approximated by a polygon.
    Spherical {
        /// Center coordinates, one per axis.
        center: Vec<f64>,
        /// Disk radius.
        radius: f64,
    },
    /// Axis-aligned box.
    Cubic {
        /// Minimum corner, one value per axis.
        bottom_left_corner: Vec<f64>,
        /// Maximum corner, one value per axis.
        top_right_corner: Vec<f64>,
    },
    /// Gaussian whose center is drawn uniformly inside the world.
    RandomGaussian {
        /// Standard deviation of the bell.
        sigma: f64,
        /// Zone radius in multiples of `sigma`.
        #[serde(default = "default_cutoff")]
        cutoff: f64,
    },
}

/// Default zone radius of gaussian shapes, in standard deviations.
pub const DEFAULT_GAUSSIAN_CUTOFF: f64 = 3.0;

fn default_cutoff() -> f64 {
    DEFAULT_GAUSSIAN_CUTOFF
}

/// Variant-specific parameters of a [`PatchShape`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ShapeKind {
    /// Whole world; coverage is always full.
    Homogeneous,
    /// Bell around `center`.
    Gaussian {
        /// Peak location.
        center: Point,
        /// Standard deviation.
        sigma: f64,
        /// Zone radius in standard deviations.
        cutoff: f64,
    },
    /// Disk.
    Spherical {
        /// Disk center.
        center: Point,
        /// Disk radius.
        radius: f64,
    },
    /// Box between two corners.
    Cubic {
        /// Minimum corner.
        bottom_left: Point,
        /// Maximum corner.
        top_right: Point,
    },
    /// Bell around a randomly drawn center.
    RandomGaussian {
        /// Drawn peak location.
        center: Point,
        /// Standard deviation.
        sigma: f64,
        /// Zone radius in standard deviations.
        cutoff: f64,
    },
}

/// A shape with its precomputed influence zone.
///
/// The zone and description are fixed at construction.
#[derive(Clone, Debug, PartialEq)]
pub struct PatchShape {
    kind: ShapeKind,
    zone: Ring,
    description: String,
}

impl PatchShape {
    /// Shape covering the whole `frame`.
    pub fn homogeneous(frame: &WorldFrame) -> Self {
        Self::with_kind(ShapeKind::Homogeneous, Ring::from_rect(frame.bounds))
    }

    /// Disk of `radius` around `center`.
    pub fn spherical(center: Point, radius: f64) -> Result<Self, PatchError> {
        check_positive("radius", radius)?;
        Ok(Self::with_kind(
            ShapeKind::Spherical { center, radius },
            make_sphere(center, radius),
        ))
    }

    /// Box between `bottom_left` and `top_right`.
    pub fn cubic(bottom_left: Point, top_right: Point) -> Result<Self, PatchError> {
        if !(bottom_left.x < top_right.x && bottom_left.y < top_right.y) {
            return Err(PatchError::InvalidShape(format!(
                "cubic corners must be ordered and span an area, got {bottom_left:?} and {top_right:?}"
            )));
        }
        Ok(Self::with_kind(
            ShapeKind::Cubic {
                bottom_left,
                top_right,
            },
            Ring::from_rect(Rect::from_points(bottom_left, top_right)),
        ))
    }

    /// Gaussian bell around `center`, cut off at `cutoff * sigma`.
    pub fn gaussian(center: Point, sigma: f64, cutoff: f64) -> Result<Self, PatchError> {
        check_positive("sigma", sigma)?;
        check_positive("cutoff", cutoff)?;
        Ok(Self::with_kind(
            ShapeKind::Gaussian {
                center,
                sigma,
                cutoff,
            },
            make_sphere(center, sigma * cutoff),
        ))
    }

    /// Gaussian bell whose center is drawn uniformly inside `frame`.
    pub fn random_gaussian<R: Rng + ?Sized>(
        frame: &WorldFrame,
        sigma: f64,
        cutoff: f64,
        rng: &mut R,
    ) -> Result<Self, PatchError> {
        check_positive("sigma", sigma)?;
        check_positive("cutoff", cutoff)?;
        let center = random_point_in_box(frame.bounds, rng)?;
        Ok(Self::with_kind(
            ShapeKind::RandomGaussian {
                center,
                sigma,
                cutoff,
            },
            make_sphere(center, sigma * cutoff),
        ))
    }

    /// Build a shape from its configuration, dispatching on the `type` tag.
    pub fn from_config<R: Rng + ?Sized>(
        config: &ShapeConfig,
        frame: &WorldFrame,
        rng: &mut R,
    ) -> Result<Self, PatchError> {
        match config {
            ShapeConfig::Homogeneous => Ok(Self::homogeneous(frame)),
            ShapeConfig::Gaussian {
                center,
                sigma,
                cutoff,
            } => Self::gaussian(point_from("center", center)?, *sigma, *cutoff),
            ShapeConfig::Spherical { center, radius } => {
                Self::spherical(point_from("center", center)?, *radius)
            }
            ShapeConfig::Cubic {
                bottom_left_corner,
                top_right_corner,
            } => Self::cubic(
                point_from("bottom_left_corner", bottom_left_corner)?,
                point_from("top_right_corner", top_right_corner)?,
            ),
            ShapeConfig::RandomGaussian { sigma, cutoff } => {
                Self::random_gaussian(frame, *sigma, *cutoff, rng)
            }
        }
    }

    fn with_kind(kind: ShapeKind, zone: Ring) -> Self {
        let description = describe(&kind);
        Self {
            kind,
            zone,
            description,
        }
    }

    /// Variant parameters.
    pub fn kind(&self) -> &ShapeKind {
        &self.kind
    }

    /// The influence zone.
    pub fn influence_zone(&self) -> &Ring {
        &self.zone
    }

    /// Human-readable description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// How much of `cell_bounds` this shape covers.
    ///
    /// Homogeneous shapes cover everything. Every other shape intersects the
    /// cell box with its influence zone.
    pub fn check_coverage(&self, cell_bounds: Rect) -> Coverage {
        match self.kind {
            ShapeKind::Homogeneous => Coverage::Full,
            _ => box_coverage_level(cell_bounds, &self.zone),
        }
    }

    /// Multiplier applied to scalar payloads at `point`.
    ///
    /// Gaussian shapes fall off with distance from their center; every other
    /// shape is uniform.
    pub fn intensity_at(&self, point: Point) -> f64 {
        match self.kind {
            ShapeKind::Gaussian { center, sigma, .. }
            | ShapeKind::RandomGaussian { center, sigma, .. } => {
                let d2 = point.distance_squared(center);
                (-d2 / (2.0 * sigma * sigma)).exp()
            }
            _ => 1.0,
        }
    }
}

impl fmt::Display for PatchShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

fn describe(kind: &ShapeKind) -> String {
    match kind {
        ShapeKind::Homogeneous => "homogeneous over the whole world".to_owned(),
        ShapeKind::Gaussian {
            center,
            sigma,
            cutoff,
        } => format!(
            "gaussian at ({}, {}) with sigma {sigma} cut at {cutoff} sigma",
            center.x, center.y
        ),
        ShapeKind::Spherical { center, radius } => format!(
            "spherical at ({}, {}) with radius {radius}",
            center.x, center.y
        ),
        ShapeKind::Cubic {
            bottom_left,
            top_right,
        } => format!(
            "cubic from ({}, {}) to ({}, {})",
            bottom_left.x, bottom_left.y, top_right.x, top_right.y
        ),
        ShapeKind::RandomGaussian {
            center,
            sigma,
            cutoff,
        } => format!(
            "random gaussian drawn at ({}, {}) with sigma {sigma} cut at {cutoff} sigma",
            center.x, center.y
        ),
    }
}

fn check_positive(name: &str, value: f64) -> Result<(), PatchError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(PatchError::InvalidShape(format!(
            "{name} must be positive and finite, got {value}"
        )))
    }
}

fn point_from(name: &str, values: &[f64]) -> Result<Point, PatchError> {
    match values {
        [x, y] if x.is_finite() && y.is_finite() => Ok(Point::new(*x, *y)),
        [_, _] => Err(PatchError::InvalidShape(format!(
            "{name} must hold finite coordinates"
        ))),
        _ => Err(PatchError::InvalidShape(format!(
            "{name} must hold exactly 2 coordinates, got {}",
            values.len()
        ))),
    }
}
