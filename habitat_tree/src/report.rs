// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Summary of what one patch application changed.

use habitat_patch::Channel;
use kurbo::Rect;

use crate::coord::CellCoord;

/// Cells written by [`crate::TerrainTree::apply_patch`].
#[derive(Clone, Debug, PartialEq)]
pub struct ApplicationReport {
    /// Channel the patch wrote to.
    pub channel: Channel,
    /// Priority of the patch.
    pub priority: usize,
    /// Leaves whose channel value changed, in visit order.
    pub written: Vec<CellCoord>,
    /// Effective areas of the written leaves.
    pub dirty_rects: Vec<Rect>,
    /// Leaves the patch reached, written or not.
    pub leaves_reached: usize,
    /// Resource writes refused because the leaf is an obstacle.
    pub refused: usize,
}

impl ApplicationReport {
    pub(crate) fn new(channel: Channel, priority: usize) -> Self {
        Self {
            channel,
            priority,
            written: Vec::new(),
            dirty_rects: Vec::new(),
            leaves_reached: 0,
            refused: 0,
        }
    }

    /// True when no cell changed.
    pub fn is_empty(&self) -> bool {
        self.written.is_empty()
    }

    /// Returns the union of all dirty rects.
    pub fn union_rect(&self) -> Option<Rect> {
        let mut it = self.dirty_rects.iter().copied();
        let first = it.next()?;
        Some(it.fold(first, |acc, r| acc.union(r)))
    }
}
