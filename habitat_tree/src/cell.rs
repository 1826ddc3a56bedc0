// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Arena cells: shared channel state plus a leaf or branch body.

use std::collections::BTreeMap;

use habitat_patch::AnimalSpeciesId;
use kurbo::Rect;
use smallvec::SmallVec;

use crate::coord::{CHILDREN_PER_BRANCH, CellCoord};
use crate::element::{
    CellElement, HabitatDomainStatus, MoistureInfo, ObstacleFlag, Resource, ResourceSummary,
};
use crate::query::SearchParams;
use crate::types::{AnimalId, AnimalKey, CellId};

#[derive(Clone, Debug)]
pub(crate) struct Cell {
    pub(crate) generation: u32,
    pub(crate) coord: CellCoord,
    pub(crate) parent: Option<CellId>,
    pub(crate) effective_area: Rect,
    pub(crate) moisture: CellElement<MoistureInfo>,
    pub(crate) obstacle: CellElement<ObstacleFlag>,
    pub(crate) habitat: CellElement<HabitatDomainStatus>,
    pub(crate) body: CellBody,
}

#[derive(Clone, Debug)]
pub(crate) enum CellBody {
    Leaf(LeafBody),
    Branch(BranchBody),
}

#[derive(Clone, Debug, Default)]
pub(crate) struct LeafBody {
    /// One slot per registered resource species, in registration order.
    pub(crate) resources: Vec<CellElement<Resource>>,
    pub(crate) occupancy: Occupancy,
}

#[derive(Clone, Debug)]
pub(crate) struct BranchBody {
    pub(crate) children: [CellId; CHILDREN_PER_BRANCH],
    pub(crate) resources: Vec<CellElement<ResourceSummary>>,
}

impl Cell {
    pub(crate) fn is_leaf(&self) -> bool {
        matches!(self.body, CellBody::Leaf(_))
    }

    pub(crate) fn children(&self) -> Option<&[CellId; CHILDREN_PER_BRANCH]> {
        match &self.body {
            CellBody::Branch(branch) => Some(&branch.children),
            CellBody::Leaf(_) => None,
        }
    }

    pub(crate) fn leaf(&self) -> Option<&LeafBody> {
        match &self.body {
            CellBody::Leaf(leaf) => Some(leaf),
            CellBody::Branch(_) => None,
        }
    }

    pub(crate) fn leaf_mut(&mut self) -> Option<&mut LeafBody> {
        match &mut self.body {
            CellBody::Leaf(leaf) => Some(leaf),
            CellBody::Branch(_) => None,
        }
    }

    /// Obstacle leaves, and branches whose every leaf is an obstacle.
    pub(crate) fn is_impassable(&self) -> bool {
        let flag = self.obstacle.value();
        if self.is_leaf() {
            flag.obstacle
        } else {
            flag.full_obstacle
        }
    }

    /// Biomass and capacity of resource slot `slot`.
    pub(crate) fn resource_totals(&self, slot: usize) -> Option<ResourceSummary> {
        match &self.body {
            CellBody::Leaf(leaf) => leaf
                .resources
                .get(slot)
                .map(|r| ResourceSummary::of(r.value())),
            CellBody::Branch(branch) => branch.resources.get(slot).map(|r| *r.value()),
        }
    }

    pub(crate) fn resource_priority(&self, slot: usize) -> usize {
        match &self.body {
            CellBody::Leaf(leaf) => leaf.resources.get(slot).map(CellElement::patch_priority),
            CellBody::Branch(branch) => branch
                .resources
                .get(slot)
                .map(CellElement::patch_priority),
        }
        .unwrap_or(0)
    }
}

/// Animals filed in a leaf, grouped by classification.
///
/// Iteration follows key order, then insertion order within a key.
#[derive(Clone, Debug, Default)]
pub(crate) struct Occupancy {
    by_key: BTreeMap<AnimalKey, SmallVec<[AnimalId; 4]>>,
    len: usize,
}

impl Occupancy {
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn insert(&mut self, key: AnimalKey, id: AnimalId) {
        self.by_key.entry(key).or_default().push(id);
        self.len += 1;
    }

    pub(crate) fn remove(&mut self, key: &AnimalKey, id: AnimalId) -> bool {
        let Some(ids) = self.by_key.get_mut(key) else {
            return false;
        };
        let Some(pos) = ids.iter().position(|&other| other == id) else {
            return false;
        };
        ids.remove(pos);
        if ids.is_empty() {
            self.by_key.remove(key);
        }
        self.len -= 1;
        true
    }

    pub(crate) fn contains(&self, key: &AnimalKey, id: AnimalId) -> bool {
        self.by_key.get(key).is_some_and(|ids| ids.contains(&id))
    }

    /// Population per species.
    pub(crate) fn species_counts(&self) -> impl Iterator<Item = (AnimalSpeciesId, usize)> + '_ {
        self.by_key.iter().map(|(key, ids)| (key.species, ids.len()))
    }

    pub(crate) fn matching<'a>(
        &'a self,
        params: &'a SearchParams,
    ) -> impl Iterator<Item = (&'a AnimalKey, AnimalId)> + 'a {
        self.by_key
            .iter()
            .filter(|(key, _)| params.matches(key))
            .flat_map(|(key, ids)| ids.iter().map(move |&id| (key, id)))
    }

    pub(crate) fn take_all(&mut self) -> Vec<(AnimalKey, AnimalId)> {
        self.len = 0;
        core::mem::take(&mut self.by_key)
            .into_iter()
            .flat_map(|(key, ids)| ids.into_iter().map(move |id| (key, id)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Gender;
    use habitat_patch::Instar;

    #[test]
    fn occupancy_insert_remove_and_take() {
        let key = AnimalKey::active(AnimalSpeciesId(0), Instar(0), Gender::Female);
        let other = AnimalKey::active(AnimalSpeciesId(1), Instar(0), Gender::Male);
        let mut occupancy = Occupancy::default();
        occupancy.insert(key, AnimalId(1));
        occupancy.insert(other, AnimalId(2));
        occupancy.insert(key, AnimalId(3));
        assert_eq!(occupancy.len(), 3);
        assert!(!occupancy.remove(&other, AnimalId(1)));
        assert!(occupancy.contains(&key, AnimalId(3)));
        assert!(occupancy.remove(&key, AnimalId(1)));
        assert_eq!(occupancy.len(), 2);

        let only_first = SearchParams::new().with_species([AnimalSpeciesId(0)]);
        let ids: Vec<AnimalId> = occupancy.matching(&only_first).map(|(_, id)| id).collect();
        assert_eq!(ids, [AnimalId(3)]);

        let all = occupancy.take_all();
        assert_eq!(all.len(), 2);
        assert_eq!(occupancy.len(), 0);
    }
}
