// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable cell summaries and world-wide totals.

use core::fmt;
use std::collections::BTreeMap;

use habitat_patch::{AnimalSpeciesId, ResourceSpeciesId};

use crate::coord::CellCoord;
use crate::element::{MoistureInfo, ObstacleFlag, ResourceSummary};
use crate::error::TreeError;
use crate::tree::TerrainTree;
use crate::types::CellId;

/// Climate of a cell at the current simulation step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MoistureReading {
    /// Temperature in degrees Celsius.
    pub temperature: f64,
    /// Relative humidity.
    pub moisture: f64,
    /// Biomass bound per unit area.
    pub max_resource_capacity_density: f64,
    /// Predators do not hunt here.
    pub in_enemy_free_space: bool,
    /// Competitors do not forage here.
    pub in_competitor_free_space: bool,
}

impl MoistureReading {
    fn mean(readings: &[Self]) -> Option<Self> {
        if readings.is_empty() {
            return None;
        }
        let n = readings.len() as f64;
        let sum = |f: fn(&Self) -> f64| readings.iter().map(f).sum::<f64>() / n;
        Some(Self {
            temperature: sum(|r| r.temperature),
            moisture: sum(|r| r.moisture),
            max_resource_capacity_density: sum(|r| r.max_resource_capacity_density),
            in_enemy_free_space: readings.iter().all(|r| r.in_enemy_free_space),
            in_competitor_free_space: readings.iter().all(|r| r.in_competitor_free_space),
        })
    }
}

/// Snapshot of one cell.
#[derive(Clone, Debug, PartialEq)]
pub struct CellSummary {
    /// Handle.
    pub id: CellId,
    /// Coordinate.
    pub coord: CellCoord,
    /// True for leaves.
    pub is_leaf: bool,
    /// Obstacle state.
    pub obstacle: ObstacleFlag,
    /// Climate, `None` where no moisture patch reached.
    pub moisture: Option<MoistureReading>,
    /// One entry per registered resource species.
    pub resources: Vec<ResourceSummary>,
    /// Animals in the cell or below.
    pub animals: usize,
}

impl fmt::Display for CellSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} {}",
            if self.is_leaf { "leaf" } else { "branch" },
            self.coord
        )?;
        writeln!(
            f,
            "  obstacle: {} (full: {})",
            self.obstacle.obstacle, self.obstacle.full_obstacle
        )?;
        match &self.moisture {
            Some(m) => writeln!(
                f,
                "  moisture: {:.2} C, {:.2} RH, capacity density {:.3}",
                m.temperature, m.moisture, m.max_resource_capacity_density
            )?,
            None => writeln!(f, "  moisture: none")?,
        }
        for r in &self.resources {
            writeln!(
                f,
                "  {}: {:.3} / {:.3}",
                r.species, r.biomass, r.capacity
            )?;
        }
        write!(f, "  animals: {}", self.animals)
    }
}

/// Biomass per resource species and population per animal species.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WorldTotals {
    /// Biomass per species, in registration order.
    pub resource_biomass: Vec<(ResourceSpeciesId, f64)>,
    /// Population per species.
    pub animal_population: BTreeMap<AnimalSpeciesId, usize>,
    /// Leaves that contributed.
    pub leaves_visited: usize,
}

impl WorldTotals {
    fn zeroed(species: &[ResourceSpeciesId]) -> Self {
        Self {
            resource_biomass: species.iter().map(|&s| (s, 0.0)).collect(),
            ..Self::default()
        }
    }

    /// Add another partial total into this one.
    pub fn merge(&mut self, other: &Self) {
        for &(species, biomass) in &other.resource_biomass {
            match self.resource_biomass.iter_mut().find(|(s, _)| *s == species) {
                Some((_, total)) => *total += biomass,
                None => self.resource_biomass.push((species, biomass)),
            }
        }
        for (&species, &count) in &other.animal_population {
            *self.animal_population.entry(species).or_default() += count;
        }
        self.leaves_visited += other.leaves_visited;
    }

    /// Biomass of `species`, zero if unknown.
    pub fn biomass_of(&self, species: ResourceSpeciesId) -> f64 {
        self.resource_biomass
            .iter()
            .find(|(s, _)| *s == species)
            .map_or(0.0, |(_, biomass)| *biomass)
    }

    /// Population of `species`, zero if unknown.
    pub fn population_of(&self, species: AnimalSpeciesId) -> usize {
        self.animal_population.get(&species).copied().unwrap_or(0)
    }
}

impl TerrainTree {
    /// Climate of a cell; branches with mixed sources average their children.
    pub fn moisture_reading(&self, id: CellId) -> Option<MoistureReading> {
        if !self.is_alive(id) {
            return None;
        }
        let cell = self.node(id);
        match *cell.moisture.value() {
            MoistureInfo::Null => None,
            MoistureInfo::Source(source) | MoistureInfo::Inherited(source) => {
                let source = self.moisture_source(source)?;
                Some(MoistureReading {
                    temperature: source.temperature(),
                    moisture: source.moisture(),
                    max_resource_capacity_density: source.max_resource_capacity_density,
                    in_enemy_free_space: source.in_enemy_free_space,
                    in_competitor_free_space: source.in_competitor_free_space,
                })
            }
            MoistureInfo::Mixed => {
                let readings: Vec<_> = cell
                    .children()
                    .into_iter()
                    .flatten()
                    .filter_map(|&child| self.moisture_reading(child))
                    .collect();
                MoistureReading::mean(&readings)
            }
        }
    }

    /// Snapshot of a live cell.
    pub fn cell_summary(&self, id: CellId) -> Result<CellSummary, TreeError> {
        let view = self.cell(id).ok_or(TreeError::StaleCell(id))?;
        let cell = self.node(id);
        Ok(CellSummary {
            id,
            coord: cell.coord,
            is_leaf: cell.is_leaf(),
            obstacle: *cell.obstacle.value(),
            moisture: self.moisture_reading(id),
            resources: (0..self.resource_species.len())
                .filter_map(|slot| cell.resource_totals(slot))
                .collect(),
            animals: view.animal_count(),
        })
    }

    /// Multi-line description of a live cell.
    pub fn print_cell(&self, id: CellId) -> Result<String, TreeError> {
        Ok(self.cell_summary(id)?.to_string())
    }

    /// Snapshot of every leaf, depth first.
    pub fn leaf_summaries(&self) -> Vec<CellSummary> {
        self.leaves()
            .filter_map(|leaf| self.cell_summary(leaf).ok())
            .collect()
    }

    /// Total biomass per resource species and population per animal species.
    ///
    /// Every leaf is visited exactly once. With the `parallel` feature the
    /// tree is split into disjoint blocks summed on the rayon pool.
    pub fn obtain_world_resource_biomass_and_animals_population(&self) -> WorldTotals {
        let depth = self.layout.finest_depth().min(2);
        #[cfg(feature = "parallel")]
        let partials = self.par_map_blocks(depth, Self::subtree_totals);
        #[cfg(not(feature = "parallel"))]
        let partials = self.map_blocks(depth, Self::subtree_totals);

        let mut totals = WorldTotals::zeroed(&self.resource_species);
        for partial in &partials {
            totals.merge(partial);
        }
        totals
    }

    /// Totals of the leaves below `id`.
    pub(crate) fn subtree_totals(&self, id: CellId) -> WorldTotals {
        let mut totals = WorldTotals::zeroed(&self.resource_species);
        for leaf_id in self.leaves_under(id) {
            let Some(leaf) = self.node(leaf_id).leaf() else {
                continue;
            };
            for (slot, resource) in leaf.resources.iter().enumerate() {
                if let Some((_, total)) = totals.resource_biomass.get_mut(slot) {
                    *total += resource.value().biomass();
                }
            }
            for (species, count) in leaf.occupancy.species_counts() {
                *totals.animal_population.entry(species).or_default() += count;
            }
            totals.leaves_visited += 1;
        }
        totals
    }
}
