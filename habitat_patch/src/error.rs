// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use habitat_geometry::GeometryError;
use thiserror::Error;

/// Configuration failures while building patches.
#[derive(Debug, Error)]
pub enum PatchError {
    /// Malformed JSON, an unknown `type` or `channel` tag, or a field of the wrong kind.
    #[error("invalid patch configuration: {0}")]
    Json(#[from] serde_json::Error),
    /// Shape parameters that parse but make no geometric sense.
    #[error("invalid patch shape: {0}")]
    InvalidShape(String),
    /// Payload parameters outside their valid range.
    #[error("invalid patch source: {0}")]
    InvalidSource(String),
    /// The geometry kernel rejected the shape.
    #[error(transparent)]
    Geometry(#[from] GeometryError),
}
