// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public identifier and classification types.

use habitat_patch::{AnimalSpeciesId, Instar};
use serde::{Deserialize, Serialize};

/// Identifier for a cell in the tree (generational).
///
/// Promotion retires the leaf's identifier; lookups with it then fail with
/// [`TreeError::StaleCell`](crate::TreeError::StaleCell) instead of reaching
/// whatever reused the slot.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct CellId(pub(crate) u32, pub(crate) u32);

impl CellId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }
}

/// Identifier of an animal, unique within one tree.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnimalId(pub u64);

/// Index of a registered moisture source.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct MoistureSourceId(pub(crate) u32);

impl MoistureSourceId {
    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }
}

/// Life stage of an animal.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[expect(missing_docs, reason = "variant names are self-describing")]
pub enum LifeStage {
    Unborn,
    Active,
    Starved,
    Predated,
    Reproducing,
    Pupa,
    Satiated,
    Handling,
    Diapause,
    Background,
    Senesced,
    Shocked,
}

impl LifeStage {
    /// Every life stage.
    pub const ALL: [Self; 12] = [
        Self::Unborn,
        Self::Active,
        Self::Starved,
        Self::Predated,
        Self::Reproducing,
        Self::Pupa,
        Self::Satiated,
        Self::Handling,
        Self::Diapause,
        Self::Background,
        Self::Senesced,
        Self::Shocked,
    ];

    /// The matching single-member set.
    pub const fn flag(self) -> LifeStages {
        LifeStages::from_bits_truncate(1 << self as u16)
    }
}

bitflags::bitflags! {
    /// A set of life stages, used as a search filter.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct LifeStages: u16 {
        /// Not yet hatched.
        const UNBORN = 1 << 0;
        /// Foraging normally.
        const ACTIVE = 1 << 1;
        /// Died of starvation.
        const STARVED = 1 << 2;
        /// Eaten.
        const PREDATED = 1 << 3;
        /// Producing offspring.
        const REPRODUCING = 1 << 4;
        /// Pupating.
        const PUPA = 1 << 5;
        /// Full, not foraging.
        const SATIATED = 1 << 6;
        /// Handling prey.
        const HANDLING = 1 << 7;
        /// Dormant.
        const DIAPAUSE = 1 << 8;
        /// Background mortality.
        const BACKGROUND = 1 << 9;
        /// Died of old age.
        const SENESCED = 1 << 10;
        /// Killed by environmental shock.
        const SHOCKED = 1 << 11;
    }
}

/// Sex of an animal.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[expect(missing_docs, reason = "variant names are self-describing")]
pub enum Gender {
    Male,
    Female,
    Hermaphrodite,
}

impl Gender {
    /// The matching single-member set.
    pub const fn flag(self) -> Genders {
        match self {
            Self::Male => Genders::MALE,
            Self::Female => Genders::FEMALE,
            Self::Hermaphrodite => Genders::HERMAPHRODITE,
        }
    }
}

bitflags::bitflags! {
    /// A set of genders, used as a search filter.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Genders: u8 {
        /// Male.
        const MALE = 1 << 0;
        /// Female.
        const FEMALE = 1 << 1;
        /// Hermaphrodite.
        const HERMAPHRODITE = 1 << 2;
    }
}

/// Classification under which an animal is filed inside its leaf.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AnimalKey {
    /// Current life stage.
    pub life_stage: LifeStage,
    /// Species.
    pub species: AnimalSpeciesId,
    /// Developmental stage within the species.
    pub instar: Instar,
    /// Sex.
    pub gender: Gender,
}

impl AnimalKey {
    /// Active animal of `species` at `instar`.
    pub fn active(species: AnimalSpeciesId, instar: Instar, gender: Gender) -> Self {
        Self {
            life_stage: LifeStage::Active,
            species,
            instar,
            gender,
        }
    }
}
