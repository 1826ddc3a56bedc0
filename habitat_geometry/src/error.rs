// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use thiserror::Error;

/// Failures reported by the geometry kernel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum GeometryError {
    /// The shape has no usable area (zero-area box, collinear ring, fewer than three vertices).
    #[error("degenerate shape: {0}")]
    DegenerateShape(&'static str),
    /// Rejection sampling used its whole attempt budget without a hit.
    #[error("no sample landed inside the shape after {0} attempts")]
    SamplingExhausted(usize),
    /// Clipping needs at least one convex operand.
    #[error("cannot intersect two non-convex rings")]
    NonConvexClip,
}
