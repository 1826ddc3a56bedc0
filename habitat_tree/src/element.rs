// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-channel cell state and the rules that combine children into a branch.

use hashbrown::HashMap;
use habitat_patch::{AnimalSpeciesId, HabitatDomainSource, Instar, ResourceSource, ResourceSpeciesId};
use smallvec::SmallVec;

use crate::types::MoistureSourceId;

/// A channel value tagged with the priority of the patch that wrote it.
///
/// Every channel starts at priority 0, so any patch with a positive priority
/// can write an untouched cell.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CellElement<T> {
    value: T,
    patch_priority: usize,
}

impl<T> CellElement<T> {
    /// An unwritten element.
    pub fn new(value: T) -> Self {
        Self {
            value,
            patch_priority: 0,
        }
    }

    pub(crate) fn with_priority(value: T, patch_priority: usize) -> Self {
        Self {
            value,
            patch_priority,
        }
    }

    /// Stored value.
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Priority of the last accepted write.
    pub fn patch_priority(&self) -> usize {
        self.patch_priority
    }

    /// True when a patch of `priority` may overwrite this element.
    pub fn can_apply(&self, priority: usize) -> bool {
        priority > self.patch_priority
    }

    /// Replace the value if `priority` is strictly higher than the stored one.
    pub fn try_apply(&mut self, value: T, priority: usize) -> bool {
        self.try_update(priority, |stored| *stored = value)
    }

    /// Edit the value in place if `priority` is strictly higher than the stored one.
    pub fn try_update(&mut self, priority: usize, update: impl FnOnce(&mut T)) -> bool {
        if !self.can_apply(priority) {
            return false;
        }
        update(&mut self.value);
        self.patch_priority = priority;
        true
    }

    pub(crate) fn value_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

pub(crate) fn max_priority<'a, T: 'a>(children: impl IntoIterator<Item = &'a CellElement<T>>) -> usize {
    children
        .into_iter()
        .map(CellElement::patch_priority)
        .max()
        .unwrap_or(0)
}

/// Obstacle state of a cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ObstacleFlag {
    /// Leaf: blocked. Branch: a strict majority of children are blocked.
    pub obstacle: bool,
    /// Every leaf below is blocked.
    pub full_obstacle: bool,
}

impl ObstacleFlag {
    /// State of a leaf.
    pub fn leaf(obstacle: bool) -> Self {
        Self {
            obstacle,
            full_obstacle: obstacle,
        }
    }

    pub(crate) fn aggregate(children: &[Self]) -> Self {
        let blocked = children.iter().filter(|c| c.obstacle).count();
        Self {
            obstacle: 2 * blocked > children.len(),
            full_obstacle: !children.is_empty() && children.iter().all(|c| c.full_obstacle),
        }
    }
}

/// Which moisture source governs a cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MoistureInfo {
    /// No moisture patch has reached the cell.
    #[default]
    Null,
    /// Written directly by a patch covering this cell.
    Source(MoistureSourceId),
    /// Pushed down from an ancestor or inherited through promotion.
    Inherited(MoistureSourceId),
    /// Branch whose children disagree.
    Mixed,
}

impl MoistureInfo {
    /// Governing source, if there is exactly one.
    pub fn source_id(&self) -> Option<MoistureSourceId> {
        match *self {
            Self::Source(id) | Self::Inherited(id) => Some(id),
            Self::Null | Self::Mixed => None,
        }
    }

    pub(crate) fn inherited(&self) -> Self {
        match self.source_id() {
            Some(id) => Self::Inherited(id),
            None => *self,
        }
    }

    pub(crate) fn aggregate(children: &[Self]) -> Self {
        let Some((first, rest)) = children.split_first() else {
            return Self::Null;
        };
        if children.iter().all(|c| *c == Self::Null) {
            return Self::Null;
        }
        match first.source_id() {
            Some(id) if rest.iter().all(|c| c.source_id() == Some(id)) => Self::Source(id),
            _ => Self::Mixed,
        }
    }
}

/// Per-species, per-instar habitability of a cell.
///
/// Unknown species and instars are habitable.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HabitatDomainStatus {
    species: HashMap<AnimalSpeciesId, SmallVec<[bool; 8]>>,
}

impl HabitatDomainStatus {
    /// True when `species` at `instar` may live here.
    pub fn is_inhabitable(&self, species: AnimalSpeciesId, instar: Instar) -> bool {
        self.species
            .get(&species)
            .and_then(|instars| instars.get(instar.index()))
            .copied()
            .unwrap_or(true)
    }

    pub(crate) fn register_species(&mut self, species: AnimalSpeciesId, instars: usize) {
        let slots = self.species.entry(species).or_default();
        if slots.len() < instars {
            slots.resize(instars, true);
        }
    }

    /// Make `source` the whole story: every slot it does not list reads
    /// habitable again.
    pub(crate) fn replace_with(&mut self, source: &HabitatDomainSource) {
        for slots in self.species.values_mut() {
            slots.iter_mut().for_each(|slot| *slot = true);
        }
        for entry in &source.entries {
            let slots = self.species.entry(entry.species).or_default();
            if entry.instars.is_empty() {
                slots.iter_mut().for_each(|slot| *slot = entry.inhabitable);
                continue;
            }
            for instar in &entry.instars {
                if slots.len() <= instar.index() {
                    slots.resize(instar.index() + 1, true);
                }
                slots[instar.index()] = entry.inhabitable;
            }
        }
    }

    pub(crate) fn aggregate(children: &[&Self]) -> Self {
        let mut species: HashMap<AnimalSpeciesId, SmallVec<[bool; 8]>> = HashMap::new();
        for child in children {
            for (id, slots) in &child.species {
                let merged = species.entry(*id).or_default();
                if merged.len() < slots.len() {
                    merged.resize(slots.len(), false);
                }
            }
        }
        for (id, merged) in &mut species {
            for (index, slot) in merged.iter_mut().enumerate() {
                let instar = Instar(u32::try_from(index).unwrap_or(u32::MAX));
                let habitable = children
                    .iter()
                    .filter(|c| c.is_inhabitable(*id, instar))
                    .count();
                *slot = 2 * habitable > children.len();
            }
        }
        Self { species }
    }
}

/// Biomass of one resource species in a leaf.
#[derive(Clone, Debug, PartialEq)]
pub struct Resource {
    species: ResourceSpeciesId,
    biomass: f64,
    capacity: f64,
    edible_fraction: f64,
    minimum_edible_biomass: f64,
}

impl Resource {
    /// No biomass and no room for any.
    pub fn empty(species: ResourceSpeciesId) -> Self {
        Self {
            species,
            biomass: 0.0,
            capacity: 0.0,
            edible_fraction: 1.0,
            minimum_edible_biomass: 0.0,
        }
    }

    /// Resource written by `source` over `area`, scaled by the patch `intensity`.
    pub fn from_source(source: &ResourceSource, area: f64, intensity: f64) -> Self {
        let capacity = source.max_capacity_density * area * intensity;
        Self {
            species: source.resource_species,
            biomass: capacity * source.initial_biomass_fraction,
            capacity,
            edible_fraction: source.edible_fraction,
            minimum_edible_biomass: source.minimum_edible_biomass,
        }
    }

    /// Species.
    pub fn species(&self) -> ResourceSpeciesId {
        self.species
    }

    /// Current biomass.
    pub fn biomass(&self) -> f64 {
        self.biomass
    }

    /// Carrying capacity.
    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    /// Biomass animals can eat right now.
    pub fn edible_biomass(&self) -> f64 {
        (self.biomass - self.minimum_edible_biomass).max(0.0) * self.edible_fraction
    }

    /// Set the biomass, clamped to `[0, capacity]`.
    pub fn set_biomass(&mut self, biomass: f64) {
        self.biomass = biomass.clamp(0.0, self.capacity);
    }

    pub(crate) fn split(&self, parts: usize) -> Self {
        let parts = parts as f64;
        Self {
            biomass: self.biomass / parts,
            capacity: self.capacity / parts,
            minimum_edible_biomass: self.minimum_edible_biomass / parts,
            ..self.clone()
        }
    }
}

/// Summed resource state of a branch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResourceSummary {
    /// Species.
    pub species: ResourceSpeciesId,
    /// Total biomass below.
    pub biomass: f64,
    /// Total capacity below.
    pub capacity: f64,
}

impl ResourceSummary {
    /// Nothing below.
    pub fn empty(species: ResourceSpeciesId) -> Self {
        Self {
            species,
            biomass: 0.0,
            capacity: 0.0,
        }
    }

    pub(crate) fn of(resource: &Resource) -> Self {
        Self {
            species: resource.species,
            biomass: resource.biomass,
            capacity: resource.capacity,
        }
    }

    pub(crate) fn aggregate(species: ResourceSpeciesId, children: &[Self]) -> Self {
        children.iter().fold(Self::empty(species), |acc, c| Self {
            species,
            biomass: acc.biomass + c.biomass,
            capacity: acc.capacity + c.capacity,
        })
    }
}
