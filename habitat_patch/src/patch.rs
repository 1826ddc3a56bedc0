// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Prioritized patches and the queue that orders their application.

use core::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use habitat_geometry::Coverage;
use kurbo::Rect;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::PatchError;
use crate::shape::{PatchShape, ShapeConfig, WorldFrame};
use crate::source::{Channel, PatchSource};

/// A shaped, prioritized modifier for one channel of terrain state.
#[derive(Clone, Debug, PartialEq)]
pub struct Patch {
    shape: PatchShape,
    priority: usize,
    source: PatchSource,
}

impl Patch {
    /// Combine a shape, a priority and a payload.
    pub fn new(shape: PatchShape, priority: usize, source: PatchSource) -> Self {
        Self {
            shape,
            priority,
            source,
        }
    }

    /// Build a patch from its configuration.
    pub fn from_config<R: Rng + ?Sized>(
        config: &PatchConfig,
        frame: &WorldFrame,
        rng: &mut R,
    ) -> Result<Self, PatchError> {
        config.source.validate()?;
        let shape = PatchShape::from_config(&config.shape, frame, rng)?;
        debug!(
            channel = %config.source.channel(),
            priority = config.priority,
            shape = shape.description(),
            "built patch"
        );
        Ok(Self::new(shape, config.priority, config.source.clone()))
    }

    /// Shape of the patch.
    pub fn shape(&self) -> &PatchShape {
        &self.shape
    }

    /// Priority; higher wins.
    pub fn priority(&self) -> usize {
        self.priority
    }

    /// Payload.
    pub fn source(&self) -> &PatchSource {
        &self.source
    }

    /// Channel written by this patch.
    pub fn channel(&self) -> Channel {
        self.source.channel()
    }

    /// Coverage of `cell_bounds` by the patch shape.
    pub fn check_coverage(&self, cell_bounds: Rect) -> Coverage {
        self.shape.check_coverage(cell_bounds)
    }
}

/// Order patches by priority alone.
pub fn compare_patch(lhs: &Patch, rhs: &Patch) -> Ordering {
    lhs.priority.cmp(&rhs.priority)
}

/// Configuration of one patch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PatchConfig {
    /// Priority; higher wins.
    pub priority: usize,
    /// Shape description.
    pub shape: ShapeConfig,
    /// Payload.
    pub source: PatchSource,
}

impl PatchConfig {
    /// Parse one patch from JSON.
    pub fn from_json_str(json: &str) -> Result<Self, PatchError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse a JSON array of patches.
    pub fn list_from_json_str(json: &str) -> Result<Vec<Self>, PatchError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[derive(Debug)]
struct Queued {
    priority: usize,
    sequence: u64,
    patch: Patch,
}

impl PartialEq for Queued {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Queued {}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Queued {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then(self.sequence.cmp(&other.sequence))
    }
}

/// Patches waiting to be applied, drained lowest priority first.
///
/// Draining in ascending order makes the highest-priority patch the last
/// writer. Equal priorities drain in insertion order.
#[derive(Debug, Default)]
pub struct PatchPriorityQueue {
    heap: BinaryHeap<Reverse<Queued>>,
    next_sequence: u64,
}

impl PatchPriorityQueue {
    /// Empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a patch.
    pub fn push(&mut self, patch: Patch) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.heap.push(Reverse(Queued {
            priority: patch.priority(),
            sequence,
            patch,
        }));
    }

    /// Remove and return the lowest-priority patch.
    pub fn pop_lowest(&mut self) -> Option<Patch> {
        self.heap.pop().map(|Reverse(queued)| queued.patch)
    }

    /// The highest-priority patch, which will be applied last.
    pub fn peek_highest(&self) -> Option<&Patch> {
        self.heap
            .iter()
            .map(|Reverse(queued)| queued)
            .max()
            .map(|queued| &queued.patch)
    }

    /// Number of queued patches.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// True when nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Drain into a vector in application order.
    pub fn into_ascending(mut self) -> Vec<Patch> {
        let mut out = Vec::with_capacity(self.len());
        while let Some(patch) = self.pop_lowest() {
            out.push(patch);
        }
        out
    }
}

impl Extend<Patch> for PatchPriorityQueue {
    fn extend<T: IntoIterator<Item = Patch>>(&mut self, iter: T) {
        for patch in iter {
            self.push(patch);
        }
    }
}

impl FromIterator<Patch> for PatchPriorityQueue {
    fn from_iter<T: IntoIterator<Item = Patch>>(iter: T) -> Self {
        let mut queue = Self::new();
        queue.extend(iter);
        queue
    }
}
