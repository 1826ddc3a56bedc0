// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Disjoint subtree blocks for read-only fan-out.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::tree::TerrainTree;
use crate::types::CellId;

impl TerrainTree {
    /// Roots of the disjoint subtrees at `depth`.
    ///
    /// Cells at `depth`, plus any leaf shallower than `depth`, in depth-first
    /// order. Together their subtrees hold every leaf exactly once.
    pub fn blocks(&self, depth: u32) -> Vec<CellId> {
        let mut out = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let cell = self.node(id);
            match cell.children() {
                Some(children) if cell.coord.depth() < depth => {
                    stack.extend(children.iter().rev().copied());
                }
                _ => out.push(id),
            }
        }
        out
    }

    /// Run `f` on every block at `depth`, one after the other.
    pub fn map_blocks<R, F>(&self, depth: u32, f: F) -> Vec<R>
    where
        F: Fn(&Self, CellId) -> R,
    {
        self.blocks(depth).into_iter().map(|id| f(self, id)).collect()
    }

    /// Run `f` on every block at `depth` on the rayon pool.
    ///
    /// Results come back in block order.
    #[cfg(feature = "parallel")]
    pub fn par_map_blocks<R, F>(&self, depth: u32, f: F) -> Vec<R>
    where
        R: Send,
        F: Fn(&Self, CellId) -> R + Sync + Send,
    {
        self.blocks(depth)
            .into_par_iter()
            .map(|id| f(self, id))
            .collect()
    }
}
