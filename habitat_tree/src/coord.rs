// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cell coordinates and the fixed geometry of a tree.

use core::fmt;

use habitat_geometry::make_box;
use kurbo::{Point, Rect};

use crate::error::TreeError;

/// Number of spatial axes.
pub const DIMENSIONS: usize = 2;

/// Children of every branch: one per orthant.
pub const CHILDREN_PER_BRANCH: usize = 1 << DIMENSIONS;

/// Integer position of a cell at a given depth.
///
/// Depth 0 is the root. At depth `d` each axis holds `2^d` cells.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellCoord {
    depth: u32,
    axis: [u32; DIMENSIONS],
}

impl CellCoord {
    /// The root cell.
    pub const ROOT: Self = Self {
        depth: 0,
        axis: [0; DIMENSIONS],
    };

    /// A coordinate; bounds are checked by the tree, not here.
    pub const fn new(axis: [u32; DIMENSIONS], depth: u32) -> Self {
        Self { depth, axis }
    }

    /// Per-axis position.
    pub const fn axis(&self) -> [u32; DIMENSIONS] {
        self.axis
    }

    /// Depth in the tree.
    pub const fn depth(&self) -> u32 {
        self.depth
    }

    /// The cell one level up, or `None` at the root.
    pub fn parent(&self) -> Option<Self> {
        self.ancestor_at(self.depth.checked_sub(1)?)
    }

    /// The cell at `depth` that contains this one.
    pub fn ancestor_at(&self, depth: u32) -> Option<Self> {
        let shift = self.depth.checked_sub(depth)?;
        Some(Self {
            depth,
            axis: self.axis.map(|a| a >> shift),
        })
    }

    /// True when this cell is `ancestor` or lies inside it.
    pub fn is_within(&self, ancestor: &Self) -> bool {
        self.ancestor_at(ancestor.depth).as_ref() == Some(ancestor)
    }

    /// Child in orthant `index`; bit `i` of the index selects the upper half of axis `i`.
    pub fn child(&self, index: usize) -> Self {
        let mut axis = self.axis;
        for (i, a) in axis.iter_mut().enumerate() {
            *a = (*a << 1) | u32::from((index >> i) & 1 == 1);
        }
        Self {
            depth: self.depth + 1,
            axis,
        }
    }

    /// All children in orthant order.
    pub fn children(&self) -> [Self; CHILDREN_PER_BRANCH] {
        core::array::from_fn(|i| self.child(i))
    }

    /// Orthant index of the child of `self` on the way to `descendant`.
    pub fn child_index_toward(&self, descendant: &Self) -> Option<usize> {
        if descendant.depth <= self.depth || !descendant.is_within(self) {
            return None;
        }
        let shift = descendant.depth - self.depth - 1;
        Some(
            descendant
                .axis
                .iter()
                .enumerate()
                .map(|(i, a)| (((a >> shift) & 1) as usize) << i)
                .sum(),
        )
    }

    /// Sum of per-axis distances to a cell at the same depth.
    pub fn manhattan_distance(&self, other: &Self) -> Option<u32> {
        (self.depth == other.depth).then(|| {
            self.axis
                .iter()
                .zip(other.axis)
                .map(|(a, b)| a.abs_diff(b))
                .sum()
        })
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})@{}", self.axis[0], self.axis[1], self.depth)
    }
}

/// Fixed geometry of a tree: cells per axis, finest cell size, depth.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TreeLayout {
    number_of_cells_per_axis: u32,
    min_cell_size: f64,
    map_depth: u32,
}

impl TreeLayout {
    /// Layout for a square world of `number_of_cells_per_axis` finest cells per axis.
    ///
    /// The cell count must be a power of two so every depth tiles the world
    /// exactly. `map_depth` is `log2(number_of_cells_per_axis) + 1`.
    pub fn new(number_of_cells_per_axis: u32, min_cell_size: f64) -> Result<Self, TreeError> {
        if !number_of_cells_per_axis.is_power_of_two() {
            return Err(TreeError::InvalidLayout(format!(
                "cells per axis must be a power of two, got {number_of_cells_per_axis}"
            )));
        }
        if !min_cell_size.is_finite() || min_cell_size <= 0.0 {
            return Err(TreeError::InvalidLayout(format!(
                "min cell size must be positive, got {min_cell_size}"
            )));
        }
        Ok(Self {
            number_of_cells_per_axis,
            min_cell_size,
            map_depth: number_of_cells_per_axis.trailing_zeros() + 1,
        })
    }

    /// Finest cells per axis.
    pub fn number_of_cells_per_axis(&self) -> u32 {
        self.number_of_cells_per_axis
    }

    /// Side of a finest cell.
    pub fn min_cell_size(&self) -> f64 {
        self.min_cell_size
    }

    /// Number of levels, root included.
    pub fn map_depth(&self) -> u32 {
        self.map_depth
    }

    /// Depth of the finest cells.
    pub fn finest_depth(&self) -> u32 {
        self.map_depth - 1
    }

    /// Cells per axis at `depth`.
    pub fn axis_size(&self, depth: u32) -> u32 {
        1 << depth.min(self.finest_depth())
    }

    /// Side of a cell at `depth`.
    pub fn cell_size(&self, depth: u32) -> f64 {
        let cells = self.number_of_cells_per_axis >> depth.min(self.finest_depth());
        self.min_cell_size * f64::from(cells)
    }

    /// Side of the world.
    pub fn world_size(&self) -> f64 {
        self.cell_size(0)
    }

    /// The world square.
    pub fn world_bounds(&self) -> Rect {
        let size = self.world_size();
        Rect::new(0.0, 0.0, size, size)
    }

    /// True when `point` lies in the world, upper edges included.
    pub fn contains_point(&self, point: Point) -> bool {
        let size = self.world_size();
        (0.0..=size).contains(&point.x) && (0.0..=size).contains(&point.y)
    }

    /// True when `coord` names a cell of this layout.
    pub fn contains_coord(&self, coord: &CellCoord) -> bool {
        coord.depth < self.map_depth
            && coord
                .axis
                .iter()
                .all(|&a| a < self.axis_size(coord.depth))
    }

    /// Coordinate of the cell at `depth` containing `point`.
    ///
    /// Points on the upper world edge map to the last cell.
    pub fn obtain_point_map(&self, point: Point, depth: u32) -> Result<CellCoord, TreeError> {
        if !self.contains_point(point) {
            return Err(TreeError::OutOfBounds(point));
        }
        if depth >= self.map_depth {
            return Err(TreeError::CoordOutOfBounds(CellCoord::new(
                [0; DIMENSIONS],
                depth,
            )));
        }
        let size = self.cell_size(depth);
        let last = self.axis_size(depth) - 1;
        let index = |v: f64| -> u32 {
            #[allow(
                clippy::cast_possible_truncation,
                clippy::cast_sign_loss,
                reason = "v is non-negative and bounded by the world size."
            )]
            let cell = (v / size).floor() as u32;
            cell.min(last)
        };
        Ok(CellCoord::new([index(point.x), index(point.y)], depth))
    }

    /// Nominal or epsilon-shrunk box of a cell.
    pub fn make_box(&self, coord: &CellCoord, apply_epsilon: bool) -> Rect {
        make_box(coord.axis, self.cell_size(coord.depth), apply_epsilon)
    }

    /// Area used for coverage tests.
    pub fn effective_area(&self, coord: &CellCoord) -> Rect {
        self.make_box(coord, true)
    }

    /// Centre of a cell.
    pub fn cell_center(&self, coord: &CellCoord) -> Point {
        self.make_box(coord, false).center()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_depth_counts_levels() {
        let layout = TreeLayout::new(8, 1.0).expect("power of two");
        assert_eq!(layout.map_depth(), 4);
        assert_eq!(layout.finest_depth(), 3);
        assert_eq!(layout.cell_size(0), 8.0);
        assert_eq!(layout.cell_size(3), 1.0);
        assert_eq!(layout.axis_size(2), 4);
        assert_eq!(TreeLayout::new(1, 2.0).expect("single cell").map_depth(), 1);
    }

    #[test]
    fn rejects_bad_layouts() {
        assert!(matches!(
            TreeLayout::new(6, 1.0),
            Err(TreeError::InvalidLayout(_))
        ));
        assert!(matches!(
            TreeLayout::new(0, 1.0),
            Err(TreeError::InvalidLayout(_))
        ));
        assert!(matches!(
            TreeLayout::new(4, 0.0),
            Err(TreeError::InvalidLayout(_))
        ));
    }

    #[test]
    fn child_index_matches_child() {
        let parent = CellCoord::new([1, 2], 2);
        for (i, child) in parent.children().iter().enumerate() {
            assert_eq!(parent.child_index_toward(child), Some(i));
            assert_eq!(child.parent(), Some(parent));
        }
        let grandchild = parent.child(3).child(0);
        assert_eq!(parent.child_index_toward(&grandchild), Some(3));
        assert_eq!(parent.child_index_toward(&parent), None);
        assert_eq!(CellCoord::ROOT.parent(), None);
    }

    #[test]
    fn point_map_clamps_upper_edge() {
        let layout = TreeLayout::new(8, 0.5).expect("power of two");
        let coord = layout
            .obtain_point_map(Point::new(4.0, 0.0), 3)
            .expect("in bounds");
        assert_eq!(coord, CellCoord::new([7, 0], 3));
        let coord = layout
            .obtain_point_map(Point::new(1.2, 2.7), 2)
            .expect("in bounds");
        assert_eq!(coord, CellCoord::new([1, 2], 2));
        assert!(matches!(
            layout.obtain_point_map(Point::new(-0.1, 1.0), 1),
            Err(TreeError::OutOfBounds(_))
        ));
    }

    #[test]
    fn contains_coord_checks_depth_and_axis() {
        let layout = TreeLayout::new(4, 1.0).expect("power of two");
        assert!(layout.contains_coord(&CellCoord::new([3, 3], 2)));
        assert!(!layout.contains_coord(&CellCoord::new([4, 0], 2)));
        assert!(!layout.contains_coord(&CellCoord::new([0, 0], 3)));
    }

    #[test]
    fn manhattan_distance_needs_same_depth() {
        let a = CellCoord::new([1, 1], 2);
        assert_eq!(a.manhattan_distance(&CellCoord::new([3, 0], 2)), Some(3));
        assert_eq!(a.manhattan_distance(&CellCoord::new([0, 0], 1)), None);
    }
}
