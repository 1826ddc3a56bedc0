// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=habitat_patch --heading-base-level=0

//! Habitat Patch: shaped, prioritized modifiers of terrain state.
//!
//! A [`Patch`] pairs a [`PatchShape`] (where) with a [`PatchSource`] (what) and
//! a priority (who wins). Terrain trees resolve patches into per-cell writes;
//! this crate only describes them.
//!
//! ## Shapes
//!
//! [`PatchShape`] is a closed set of variants, see [`ShapeKind`]:
//! homogeneous, gaussian, spherical, cubic and random gaussian. Each
//! precomputes its influence zone once and answers
//! [`PatchShape::check_coverage`] for any cell box. Gaussian variants also
//! scale scalar payloads through [`PatchShape::intensity_at`].
//!
//! ## Channels
//!
//! [`PatchSource`] carries one of four payloads: [`MoistureSource`],
//! [`ResourceSource`], [`ObstacleSource`] or [`HabitatDomainSource`].
//!
//! ## Priority
//!
//! A stored value is replaced only by a strictly higher priority. The
//! [`PatchPriorityQueue`] drains patches lowest priority first, so the
//! highest-priority patch covering a cell is the last one to touch it.
//!
//! ## Configuration
//!
//! [`PatchConfig`] is the serde form of a patch:
//!
//! ```rust
//! use habitat_patch::{Channel, Patch, PatchConfig, WorldFrame};
//! use rand::SeedableRng;
//!
//! let config = PatchConfig::from_json_str(
//!     r#"{
//!         "priority": 3,
//!         "shape": {"type": "spherical", "center": [2.0, 2.0], "radius": 2.0},
//!         "source": {"channel": "obstacle"}
//!     }"#,
//! )
//! .unwrap();
//! let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(0);
//! let patch = Patch::from_config(&config, &WorldFrame::new(8.0, 8.0), &mut rng).unwrap();
//! assert_eq!(patch.channel(), Channel::Obstacle);
//! ```

mod error;
mod ids;
mod patch;
mod shape;
mod source;

pub use error::PatchError;
pub use ids::{AnimalSpeciesId, Instar, ResourceSpeciesId};
pub use patch::{Patch, PatchConfig, PatchPriorityQueue, compare_patch};
pub use shape::{DEFAULT_GAUSSIAN_CUTOFF, PatchShape, ShapeConfig, ShapeKind, WorldFrame};
pub use source::{
    Channel, CycleDynamics, HabitatDomainEntry, HabitatDomainSource, MoistureSource,
    ObstacleSource, PatchSource, ResourceSource,
};
