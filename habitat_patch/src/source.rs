// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Channel payloads carried by patches.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::error::PatchError;
use crate::ids::{AnimalSpeciesId, Instar, ResourceSpeciesId};

/// The environmental channel a patch writes to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Channel {
    /// Temperature and relative humidity.
    Moisture,
    /// Biomass of one resource species.
    Resource,
    /// Impassable terrain.
    Obstacle,
    /// Per-species, per-instar habitability.
    HabitatDomain,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Moisture => "moisture",
            Self::Resource => "resource",
            Self::Obstacle => "obstacle",
            Self::HabitatDomain => "habitat domain",
        })
    }
}

/// A value that steps through a fixed cycle, wrapping at the end.
///
/// Deserializing checks the values like [`CycleDynamics::new`] and starts at
/// the first one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CycleValues", into = "CycleValues")]
pub struct CycleDynamics {
    values: Vec<f64>,
    position: usize,
}

/// Serialized form of [`CycleDynamics`].
#[derive(Serialize, Deserialize)]
struct CycleValues {
    values: Vec<f64>,
}

impl TryFrom<CycleValues> for CycleDynamics {
    type Error = PatchError;

    fn try_from(raw: CycleValues) -> Result<Self, Self::Error> {
        Self::new(raw.values)
    }
}

impl From<CycleDynamics> for CycleValues {
    fn from(cycle: CycleDynamics) -> Self {
        Self {
            values: cycle.values,
        }
    }
}

impl CycleDynamics {
    /// Cycle through `values`, starting at the first.
    pub fn new(values: Vec<f64>) -> Result<Self, PatchError> {
        let cycle = Self {
            values,
            position: 0,
        };
        cycle.validate()?;
        Ok(cycle)
    }

    /// A cycle that never changes.
    pub fn constant(value: f64) -> Self {
        Self {
            values: vec![value],
            position: 0,
        }
    }

    fn validate(&self) -> Result<(), PatchError> {
        if self.values.is_empty() {
            return Err(PatchError::InvalidSource(
                "cycle dynamics need at least one value".into(),
            ));
        }
        if self.values.iter().any(|v| !v.is_finite()) {
            return Err(PatchError::InvalidSource(
                "cycle dynamics values must be finite".into(),
            ));
        }
        Ok(())
    }

    /// The value at the current step.
    pub fn current(&self) -> f64 {
        self.values[self.position % self.values.len()]
    }

    /// Move to the next step.
    pub fn advance(&mut self) {
        self.position = (self.position + 1) % self.values.len();
    }
}

/// Moisture payload: climate of a region.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MoistureSource {
    /// Temperature in degrees Celsius, per step.
    pub temperature: CycleDynamics,
    /// Relative humidity in `[0, 1]`, per step.
    pub relative_humidity: CycleDynamics,
    /// Upper bound on resource biomass per unit area under this climate.
    pub max_resource_capacity_density: f64,
    /// Predators do not hunt here.
    #[serde(default)]
    pub in_enemy_free_space: bool,
    /// Competitors do not forage here.
    #[serde(default)]
    pub in_competitor_free_space: bool,
}

impl MoistureSource {
    /// Current temperature.
    pub fn temperature(&self) -> f64 {
        self.temperature.current()
    }

    /// Current relative humidity.
    pub fn moisture(&self) -> f64 {
        self.relative_humidity.current()
    }

    /// Advance both climate cycles by one simulation step.
    pub fn update(&mut self) {
        self.temperature.advance();
        self.relative_humidity.advance();
    }

    pub(crate) fn validate(&self) -> Result<(), PatchError> {
        self.temperature.validate()?;
        self.relative_humidity.validate()?;
        if self.max_resource_capacity_density.is_nan() || self.max_resource_capacity_density < 0.0 {
            return Err(PatchError::InvalidSource(format!(
                "max_resource_capacity_density must be non-negative, got {}",
                self.max_resource_capacity_density
            )));
        }
        Ok(())
    }
}

/// Resource payload: how much biomass of one species a region can hold.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResourceSource {
    /// Species the biomass belongs to.
    pub resource_species: ResourceSpeciesId,
    /// Carrying capacity per unit area.
    pub max_capacity_density: f64,
    /// Share of the capacity present when the patch is applied.
    #[serde(default = "one")]
    pub initial_biomass_fraction: f64,
    /// Share of the biomass animals can eat.
    #[serde(default = "one")]
    pub edible_fraction: f64,
    /// Biomass below which nothing is edible.
    #[serde(default)]
    pub minimum_edible_biomass: f64,
}

fn one() -> f64 {
    1.0
}

fn yes() -> bool {
    true
}

impl ResourceSource {
    /// Full-capacity, fully edible resource.
    pub fn new(resource_species: ResourceSpeciesId, max_capacity_density: f64) -> Self {
        Self {
            resource_species,
            max_capacity_density,
            initial_biomass_fraction: 1.0,
            edible_fraction: 1.0,
            minimum_edible_biomass: 0.0,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), PatchError> {
        if self.max_capacity_density.is_nan() || self.max_capacity_density < 0.0 {
            return Err(PatchError::InvalidSource(format!(
                "max_capacity_density must be non-negative, got {}",
                self.max_capacity_density
            )));
        }
        for (name, value) in [
            ("initial_biomass_fraction", self.initial_biomass_fraction),
            ("edible_fraction", self.edible_fraction),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(PatchError::InvalidSource(format!(
                    "{name} must lie in [0, 1], got {value}"
                )));
            }
        }
        if self.minimum_edible_biomass.is_nan() || self.minimum_edible_biomass < 0.0 {
            return Err(PatchError::InvalidSource(
                "minimum_edible_biomass must be non-negative".into(),
            ));
        }
        Ok(())
    }
}

/// Obstacle payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObstacleSource {
    /// `false` clears obstacles under the patch.
    #[serde(default = "yes")]
    pub obstacle: bool,
}

impl Default for ObstacleSource {
    fn default() -> Self {
        Self { obstacle: true }
    }
}

/// One line of a habitat-domain payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HabitatDomainEntry {
    /// Species the line applies to.
    pub species: AnimalSpeciesId,
    /// Instars the line applies to; empty means every instar.
    #[serde(default)]
    pub instars: Vec<Instar>,
    /// Whether the species may live under the patch.
    pub inhabitable: bool,
}

impl HabitatDomainEntry {
    /// True when this line covers `instar`.
    pub fn covers(&self, instar: Instar) -> bool {
        self.instars.is_empty() || self.instars.contains(&instar)
    }
}

/// Habitat-domain payload.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HabitatDomainSource {
    /// Lines applied in order.
    pub entries: Vec<HabitatDomainEntry>,
}

/// The payload of a patch, one variant per channel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "channel", rename_all = "snake_case")]
pub enum PatchSource {
    /// See [`MoistureSource`].
    Moisture(MoistureSource),
    /// See [`ResourceSource`].
    Resource(ResourceSource),
    /// See [`ObstacleSource`].
    Obstacle(ObstacleSource),
    /// See [`HabitatDomainSource`].
    HabitatDomain(HabitatDomainSource),
}

impl PatchSource {
    /// Channel this payload writes to.
    pub fn channel(&self) -> Channel {
        match self {
            Self::Moisture(_) => Channel::Moisture,
            Self::Resource(_) => Channel::Resource,
            Self::Obstacle(_) => Channel::Obstacle,
            Self::HabitatDomain(_) => Channel::HabitatDomain,
        }
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), PatchError> {
        match self {
            Self::Moisture(source) => source.validate(),
            Self::Resource(source) => source.validate(),
            Self::Obstacle(_) | Self::HabitatDomain(_) => Ok(()),
        }
    }
}
