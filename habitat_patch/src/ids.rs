// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Species and developmental-stage identifiers shared by patches and cells.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of an animal species.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnimalSpeciesId(pub u32);

/// Identifier of a resource (edible biomass) species.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceSpeciesId(pub u32);

/// Zero-based developmental stage of an animal.
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Instar(pub u32);

impl Instar {
    /// Position of this instar in instar-indexed tables.
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for AnimalSpeciesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "animal#{}", self.0)
    }
}

impl fmt::Display for ResourceSpeciesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "resource#{}", self.0)
    }
}

impl fmt::Display for Instar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "instar {}", self.0 + 1)
    }
}
