// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Leaf to branch promotion.

use tracing::debug;

use crate::cell::{Cell, CellBody, LeafBody};
use crate::coord::CHILDREN_PER_BRANCH;
use crate::element::CellElement;
use crate::tree::TerrainTree;
use crate::types::CellId;

impl TerrainTree {
    /// Replace a leaf by a branch of fresh leaves at the same coordinate.
    ///
    /// Children split the leaf's resources evenly, inherit its moisture
    /// source, copy its obstacle and habitat state with their priorities, and
    /// take over its animals by position. The leaf's id goes stale. Branches
    /// and leaves at the finest depth are returned unchanged.
    pub(crate) fn promote(&mut self, leaf_id: CellId) -> CellId {
        if self.node(leaf_id).coord.depth() >= self.layout.finest_depth() {
            return leaf_id;
        }
        let Some(mut leaf) = self.node_mut(leaf_id).leaf_mut().map(core::mem::take) else {
            return leaf_id;
        };
        let Cell {
            coord,
            parent,
            moisture,
            obstacle,
            habitat,
            ..
        } = self.release(leaf_id);

        let branch = self.install_branch(leaf_id, coord, parent);
        let children = coord.children().map(|child_coord| {
            let resources = leaf
                .resources
                .iter()
                .map(|r| {
                    CellElement::with_priority(
                        r.value().split(CHILDREN_PER_BRANCH),
                        r.patch_priority(),
                    )
                })
                .collect();
            let mut cell = self.blank_cell(
                child_coord,
                Some(branch),
                CellBody::Leaf(LeafBody {
                    resources,
                    ..LeafBody::default()
                }),
            );
            cell.moisture =
                CellElement::with_priority(moisture.value().inherited(), moisture.patch_priority());
            cell.obstacle = obstacle.clone();
            cell.habitat = habitat.clone();
            self.alloc(cell)
        });

        let residents = leaf.occupancy.take_all();
        let moved = residents.len();
        for (key, animal) in residents {
            let index = self
                .animals
                .get(&animal)
                .and_then(|record| {
                    self.layout
                        .obtain_point_map(record.position, coord.depth() + 1)
                        .ok()
                })
                .and_then(|child| coord.child_index_toward(&child))
                .unwrap_or(0);
            let child = children[index];
            if let Some(leaf) = self.node_mut(child).leaf_mut() {
                leaf.occupancy.insert(key, animal);
            }
            if let Some(record) = self.animals.get_mut(&animal) {
                record.cell = child;
            }
        }

        self.set_children(branch, children);
        self.refresh_branch(branch, None);
        debug!(%coord, animals = moved, "promoted leaf to branch");
        branch
    }
}
