// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Animal registry and occupancy maintenance.

use habitat_patch::{AnimalSpeciesId, Instar};
use kurbo::Point;
use tracing::{trace, warn};

use crate::error::TreeError;
use crate::tree::TerrainTree;
use crate::types::{AnimalId, AnimalKey, CellId};

/// An animal about to enter the tree.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NewAnimal {
    /// Classification.
    pub key: AnimalKey,
    /// Position in world coordinates.
    pub position: Point,
}

/// An animal known to the tree.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnimalRecord {
    /// Identifier.
    pub id: AnimalId,
    /// Classification.
    pub key: AnimalKey,
    /// Position in world coordinates.
    pub position: Point,
    /// Leaf the animal is filed in.
    pub cell: CellId,
}

/// Result of filing an animal into a leaf.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The animal now lives in this leaf.
    Inserted(CellId),
    /// The leaf was too coarse for the animal's species, or full, and has
    /// been promoted; retry against this child.
    ///
    /// The animal is not filed anywhere until the retry succeeds.
    NeedsPromotion(CellId),
}

impl TerrainTree {
    /// Cell depth that animals of `species` at `instar` are filed at, at least.
    pub fn max_depth_for(&self, species: AnimalSpeciesId, instar: Instar) -> Result<u32, TreeError> {
        let depths = self
            .animal_species
            .get(&species)
            .ok_or_else(|| TreeError::UnknownSpecies(format!("species {species} is not registered")))?;
        let depth = depths.get(instar.index()).ok_or_else(|| {
            TreeError::UnknownSpecies(format!("species {species} has no instar {instar}"))
        })?;
        Ok((*depth).min(self.layout.finest_depth()))
    }

    /// Add an animal, refining the tree down to its species' depth.
    ///
    /// Leaves coarser than that depth, and full leaves above the finest
    /// depth, are promoted on the way down. Where the tree is already finer,
    /// the animal goes to the leaf holding its position, and queries on the
    /// coarser cell still see it.
    pub fn insert_animal(&mut self, animal: NewAnimal) -> Result<AnimalId, TreeError> {
        self.max_depth_for(animal.key.species, animal.key.instar)?;
        if !self.layout.contains_point(animal.position) {
            return Err(TreeError::OutOfBounds(animal.position));
        }
        let id = AnimalId(self.next_animal_id);
        self.animals.insert(
            id,
            AnimalRecord {
                id,
                key: animal.key,
                position: animal.position,
                cell: self.root,
            },
        );
        match self.place(id) {
            Ok(_) => {
                self.next_animal_id += 1;
                Ok(id)
            }
            Err(err) => {
                self.animals.remove(&id);
                Err(err)
            }
        }
    }

    /// File a known animal into `cell`.
    ///
    /// If the leaf is shallower than the animal's species depth, or is at
    /// capacity above the finest depth, it is promoted and
    /// [`InsertOutcome::NeedsPromotion`] names the child to retry with. A full
    /// leaf at the finest depth accepts the animal over capacity.
    pub fn insert_animal_at(&mut self, cell: CellId, id: AnimalId) -> Result<InsertOutcome, TreeError> {
        let record = *self.animals.get(&id).ok_or(TreeError::UnknownAnimal(id))?;
        let target = self.checked(cell)?;
        let coord = target.coord;
        if !target.is_leaf() {
            return Err(TreeError::NotALeaf(coord));
        }
        if self.layout.obtain_point_map(record.position, coord.depth())? != coord {
            return Err(TreeError::PositionOutsideCell {
                position: record.position,
                cell: coord,
            });
        }
        if target.obstacle.value().obstacle {
            return Err(TreeError::ObstacleCell(coord));
        }
        let max_depth = self.max_depth_for(record.key.species, record.key.instar)?;

        self.detach(id);
        let count = self.node(cell).leaf().map_or(0, |leaf| leaf.occupancy.len());
        let capacity = self.capacity(coord.depth());
        let finest = coord.depth() >= self.layout.finest_depth();
        if coord.depth() < max_depth || (count >= capacity && !finest) {
            let branch = self.promote(cell);
            let child_coord = self
                .layout
                .obtain_point_map(record.position, coord.depth() + 1)?;
            return Ok(InsertOutcome::NeedsPromotion(self.get_cell(branch, child_coord)?));
        }
        if count >= capacity {
            warn!(%coord, count, capacity, species = %record.key.species, "leaf over capacity");
        }
        if let Some(leaf) = self.node_mut(cell).leaf_mut() {
            leaf.occupancy.insert(record.key, id);
        }
        if let Some(record) = self.animals.get_mut(&id) {
            record.cell = cell;
        }
        trace!(?id, %coord, "filed animal");
        Ok(InsertOutcome::Inserted(cell))
    }

    /// Remove an animal from the tree.
    pub fn erase_animal(&mut self, id: AnimalId) -> Result<AnimalRecord, TreeError> {
        if !self.animals.contains_key(&id) {
            return Err(TreeError::UnknownAnimal(id));
        }
        self.detach(id);
        self.animals.remove(&id).ok_or(TreeError::UnknownAnimal(id))
    }

    /// Move an animal to `position`, refiling it in the matching leaf.
    ///
    /// On failure the animal stays where it was.
    pub fn migrate_animal_to(&mut self, id: AnimalId, position: Point) -> Result<CellId, TreeError> {
        if !self.layout.contains_point(position) {
            return Err(TreeError::OutOfBounds(position));
        }
        let record = self.animals.get_mut(&id).ok_or(TreeError::UnknownAnimal(id))?;
        let previous = record.position;
        record.position = position;
        match self.place(id) {
            Ok(cell) => Ok(cell),
            Err(err) => {
                if let Some(record) = self.animals.get_mut(&id) {
                    record.position = previous;
                }
                if !self.is_filed(id) {
                    self.place(id)?;
                }
                Err(err)
            }
        }
    }

    /// Reclassify an animal in place, e.g. after moulting.
    ///
    /// The animal keeps its leaf; a new species depth applies from its next
    /// migration.
    pub fn set_animal_key(&mut self, id: AnimalId, key: AnimalKey) -> Result<(), TreeError> {
        let cell = self.animals.get(&id).ok_or(TreeError::UnknownAnimal(id))?.cell;
        self.max_depth_for(key.species, key.instar)?;
        if !self.is_alive(cell) {
            return Err(TreeError::StaleCell(cell));
        }
        self.detach(id);
        if let Some(record) = self.animals.get_mut(&id) {
            record.key = key;
        }
        if let Some(leaf) = self.node_mut(cell).leaf_mut() {
            leaf.occupancy.insert(key, id);
        }
        Ok(())
    }

    /// An animal's record.
    pub fn animal(&self, id: AnimalId) -> Option<&AnimalRecord> {
        self.animals.get(&id)
    }

    /// Number of animals in the tree.
    pub fn animal_count(&self) -> usize {
        self.animals.len()
    }

    /// Every animal record, in no particular order.
    pub fn animals(&self) -> impl Iterator<Item = &AnimalRecord> + '_ {
        self.animals.values()
    }

    /// Descend from the root and file, retrying through promotions.
    fn place(&mut self, id: AnimalId) -> Result<CellId, TreeError> {
        let position = self
            .animals
            .get(&id)
            .ok_or(TreeError::UnknownAnimal(id))?
            .position;
        let mut cell = self.leaf_at(position)?;
        loop {
            match self.insert_animal_at(cell, id)? {
                InsertOutcome::Inserted(cell) => return Ok(cell),
                InsertOutcome::NeedsPromotion(child) => cell = child,
            }
        }
    }

    /// Take an animal out of its leaf's container; the record stays.
    fn detach(&mut self, id: AnimalId) -> bool {
        let Some(record) = self.animals.get(&id) else {
            return false;
        };
        let (cell, key) = (record.cell, record.key);
        if !self.is_alive(cell) {
            return false;
        }
        self.node_mut(cell)
            .leaf_mut()
            .is_some_and(|leaf| leaf.occupancy.remove(&key, id))
    }

    fn is_filed(&self, id: AnimalId) -> bool {
        self.animals.get(&id).is_some_and(|record| {
            self.is_alive(record.cell)
                && self
                    .node(record.cell)
                    .leaf()
                    .is_some_and(|leaf| leaf.occupancy.contains(&record.key, id))
        })
    }
}
