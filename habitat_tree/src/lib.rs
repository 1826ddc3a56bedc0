// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=habitat_tree --heading-base-level=0

//! Habitat Tree: an adaptive region tree holding terrain state for agent simulations.
//!
//! A [`TerrainTree`] partitions a square world into cells addressed by
//! [`CellCoord`] (per-axis index plus depth). Every cell carries four
//! channels of environmental state: moisture, resource biomass, obstacles and
//! habitat domain. Leaves also hold the animals that live in them.
//!
//! - Patches from [`habitat_patch`] are resolved top-down into per-cell writes.
//!   A cell accepts a write only when the patch priority is strictly higher
//!   than the stored one, so the outcome does not depend on application order.
//! - Leaves coarser than an inserted animal's species depth are promoted to
//!   branches of four fresh leaves.
//! - Radius and neighbour queries serve movement and predation code.
//!
//! ## Cells and handles
//!
//! Cells live in an arena and are addressed by generational [`CellId`]s.
//! Promotion retires a leaf's id; using it afterwards yields
//! [`TreeError::StaleCell`]. [`CellRef`] is a read-only view of a live cell.
//! Branch channels are aggregates of their children:
//!
//! - resources are summed,
//! - obstacle and habitat status are decided by strict majority,
//! - moisture is the children's common source, or [`MoistureInfo::Mixed`].
//!
//! ## Applying patches
//!
//! - [`TerrainTree::apply_patch`] writes any channel and returns an [`ApplicationReport`].
//! - [`TerrainTree::apply_obstacle_patch`], [`TerrainTree::apply_moisture_patch`],
//!   [`TerrainTree::apply_resource_patch`] and [`TerrainTree::apply_habitat_domain_patch`]
//!   check the channel first.
//! - [`TerrainTree::apply_queue`] drains a [`habitat_patch::PatchPriorityQueue`].
//! - [`TerrainTree::from_config`] builds and fills a world from a [`WorldConfig`].
//!
//! ## Animals
//!
//! [`TerrainTree::insert_animal`] files a [`NewAnimal`] at its species'
//! depth, promoting coarser leaves on the way down.
//! [`TerrainTree::migrate_animal_to`], [`TerrainTree::set_animal_key`] and
//! [`TerrainTree::erase_animal`] keep occupancy current.
//!
//! ## Queries
//!
//! - [`TerrainTree::get_edibles_on_radius`]: animals and resource biomass within a circle.
//! - [`TerrainTree::get_manhattan_neighbours`]: cells within a per-axis step distance.
//! - [`TerrainTree::animals_in_cell`]: animals below a cell matching [`SearchParams`].
//! - [`TerrainTree::obtain_world_resource_biomass_and_animals_population`]: world totals.
//!
//! ## Example
//!
//! ```rust
//! use habitat_patch::{
//!     AnimalSpeciesId, Instar, Patch, PatchShape, PatchSource, ResourceSource,
//!     ResourceSpeciesId, WorldFrame,
//! };
//! use habitat_tree::{
//!     AnimalKey, EdibleSearchParams, Gender, NewAnimal, SearchParams, TerrainTree, TreeLayout,
//! };
//! use kurbo::Point;
//!
//! let mut tree = TerrainTree::new(TreeLayout::new(8, 1.0).unwrap());
//! tree.subdivide_to(2).unwrap();
//!
//! let grass = ResourceSpeciesId(0);
//! tree.apply_patch(&Patch::new(
//!     PatchShape::homogeneous(&WorldFrame::new(8.0, 8.0)),
//!     1,
//!     PatchSource::Resource(ResourceSource::new(grass, 1.0)),
//! ));
//!
//! let beetle = AnimalSpeciesId(0);
//! tree.register_animal_species(beetle, vec![3]).unwrap();
//! let id = tree
//!     .insert_animal(NewAnimal {
//!         key: AnimalKey::active(beetle, Instar(0), Gender::Female),
//!         position: Point::new(2.5, 2.5),
//!     })
//!     .unwrap();
//!
//! let params = EdibleSearchParams::new()
//!     .with_animals(SearchParams::new().with_species([beetle]))
//!     .with_resources([grass]);
//! let found = tree.get_edibles_on_radius(Point::new(3.0, 3.0), 1.0, &params);
//! assert_eq!(found.animals, [id]);
//! assert!(!found.resources.is_empty());
//! ```
//!
//! ## Features
//!
//! - `parallel` (default): [`TerrainTree::par_map_blocks`] and parallel world
//!   totals on the rayon thread pool.

mod animal;
mod apply;
mod cell;
mod config;
mod coord;
mod element;
mod error;
mod parallel;
mod promote;
mod query;
mod report;
mod summary;
mod tree;
mod types;

pub use animal::{AnimalRecord, InsertOutcome, NewAnimal};
pub use config::{AnimalSpeciesConfig, WorldConfig};
pub use coord::{CHILDREN_PER_BRANCH, CellCoord, DIMENSIONS, TreeLayout};
pub use element::{
    CellElement, HabitatDomainStatus, MoistureInfo, ObstacleFlag, Resource, ResourceSummary,
};
pub use error::TreeError;
pub use query::{EdibleSearchParams, EdibleSearchResult, ResourceHit, SearchParams};
pub use report::ApplicationReport;
pub use summary::{CellSummary, MoistureReading, WorldTotals};
pub use tree::{CellRef, TerrainTree};
pub use types::{
    AnimalId, AnimalKey, CellId, Gender, Genders, LifeStage, LifeStages, MoistureSourceId,
};
