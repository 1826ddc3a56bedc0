// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! World configuration documents and building a tree from them.

use habitat_patch::{
    AnimalSpeciesId, Channel, Patch, PatchConfig, PatchPriorityQueue, ResourceSpeciesId,
    WorldFrame,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::coord::TreeLayout;
use crate::error::TreeError;
use crate::tree::TerrainTree;

/// One animal species and the cell depth each of its instars is filed at.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimalSpeciesConfig {
    /// Species.
    pub species: AnimalSpeciesId,
    /// Cell depth each instar is filed at.
    pub cell_depth_per_instar: Vec<u32>,
}

/// Everything needed to build a populated-ready world.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorldConfig {
    /// Cells per axis at the finest depth; a power of two.
    pub number_of_cells_per_axis: u32,
    /// Side length of a finest cell.
    pub min_cell_size: f64,
    /// Depth of the uniform grid built up front.
    #[serde(default)]
    pub initial_depth: u32,
    /// Leaf capacity per depth; missing depths are unlimited.
    #[serde(default)]
    pub capacity_per_depth: Vec<usize>,
    /// Resource species registered before any patch.
    #[serde(default)]
    pub resource_species: Vec<ResourceSpeciesId>,
    /// Animal species.
    #[serde(default)]
    pub animal_species: Vec<AnimalSpeciesConfig>,
    /// Patches of every channel.
    #[serde(default)]
    pub patches: Vec<PatchConfig>,
}

impl WorldConfig {
    /// Parse and validate a JSON world description.
    pub fn from_json_str(json: &str) -> Result<Self, TreeError> {
        let config: Self = serde_json::from_str(json)?;
        config.layout()?;
        Ok(config)
    }

    /// Layout described by this configuration.
    pub fn layout(&self) -> Result<TreeLayout, TreeError> {
        TreeLayout::new(self.number_of_cells_per_axis, self.min_cell_size)
    }
}

/// Channels in the order their patches are applied.
const CHANNEL_ORDER: [Channel; 4] = [
    Channel::Obstacle,
    Channel::Moisture,
    Channel::HabitatDomain,
    Channel::Resource,
];

impl TerrainTree {
    /// Build a tree from a configuration and apply all of its patches.
    ///
    /// Patches are grouped by channel and each group is applied in ascending
    /// priority, so the highest priority wins every overlap. Obstacles go
    /// first so resource patches see them. `rng` places random gaussian
    /// patches.
    pub fn from_config<R: Rng + ?Sized>(
        config: &WorldConfig,
        rng: &mut R,
    ) -> Result<Self, TreeError> {
        let layout = config.layout()?;
        let size = layout.world_size();
        let mut tree = Self::new(layout);
        tree.set_capacity_per_depth(config.capacity_per_depth.clone())?;
        tree.subdivide_to(config.initial_depth)?;
        for &species in &config.resource_species {
            tree.register_resource_species(species);
        }
        for animal in &config.animal_species {
            tree.register_animal_species(animal.species, animal.cell_depth_per_instar.clone())?;
        }

        let frame = WorldFrame::new(size, size);
        let patches = config
            .patches
            .iter()
            .map(|patch| Patch::from_config(patch, &frame, rng))
            .collect::<Result<Vec<_>, _>>()?;

        let mut written = 0;
        for channel in CHANNEL_ORDER {
            let mut queue = PatchPriorityQueue::new();
            queue.extend(patches.iter().filter(|p| p.channel() == channel).cloned());
            written += tree
                .apply_queue(queue)
                .iter()
                .map(|report| report.written.len())
                .sum::<usize>();
        }
        info!(
            cells = tree.cell_count(),
            leaves = tree.leaves().count(),
            patches = patches.len(),
            written,
            "built world"
        );
        Ok(tree)
    }
}
