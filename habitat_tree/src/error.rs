// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use habitat_geometry::GeometryError;
use habitat_patch::{Channel, PatchError};
use kurbo::Point;
use thiserror::Error;

use crate::coord::CellCoord;
use crate::types::{AnimalId, CellId};

/// Failures reported by the terrain tree.
#[derive(Debug, Error)]
pub enum TreeError {
    /// The world dimensions cannot form a tree.
    #[error("invalid layout: {0}")]
    InvalidLayout(String),
    /// The capacity-per-depth table does not fit the layout.
    #[error("invalid capacity table: {0}")]
    CapacityTable(String),
    /// A species registration makes no sense for this layout.
    #[error("invalid species configuration: {0}")]
    InvalidSpecies(String),
    /// The species, or the instar within it, has not been registered.
    #[error("unknown species: {0}")]
    UnknownSpecies(String),
    /// The world configuration document is malformed.
    #[error("invalid world configuration: {0}")]
    Json(#[from] serde_json::Error),
    /// A patch could not be built.
    #[error(transparent)]
    Patch(#[from] PatchError),
    /// The geometry kernel rejected an input.
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    /// Neighbour searches need a distance of at least one.
    #[error("search distance must be at least 1")]
    InvalidSearchDistance,
    /// A point outside the world.
    #[error("point {0:?} lies outside the world")]
    OutOfBounds(Point),
    /// A coordinate outside the map at its depth, or deeper than the map.
    #[error("coordinate {0} lies outside the map")]
    CoordOutOfBounds(CellCoord),
    /// The handle refers to a cell that no longer exists, usually a promoted leaf.
    #[error("stale cell handle {0:?}")]
    StaleCell(CellId),
    /// The operation needs a leaf.
    #[error("cell {0} is a branch")]
    NotALeaf(CellCoord),
    /// No animal with this id lives in the tree.
    #[error("unknown animal {0:?}")]
    UnknownAnimal(AnimalId),
    /// Animals cannot be placed on obstacles.
    #[error("cell {0} is an obstacle")]
    ObstacleCell(CellCoord),
    /// The position does not fall inside the target cell.
    #[error("position {position:?} lies outside cell {cell}")]
    PositionOutsideCell {
        /// Offending position.
        position: Point,
        /// Target cell.
        cell: CellCoord,
    },
    /// The patch payload does not match the requested channel.
    #[error("expected a {expected} patch, got a {found} patch")]
    ChannelMismatch {
        /// Channel the caller asked for.
        expected: Channel,
        /// Channel of the patch.
        found: Channel,
    },
}
