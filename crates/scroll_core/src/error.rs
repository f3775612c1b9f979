//! Error kinds shared across the engine.
//!
//! None of these are fatal to the render loop: callers log the error through
//! `tracing` and carry on with the previous state (see the per-module docs
//! for the exact recovery behavior).

use std::path::PathBuf;

use thiserror::Error;

/// Engine-wide error type.
#[derive(Debug, Error)]
pub enum ScrollError {
  /// The uv least-squares system is singular; the fragment cannot be
  /// flattened and the surface view refuses to render it.
  #[error("degenerate uv chart: least-squares denominator is zero")]
  DegenerateUv,

  /// A Delaunay pass failed (collinear points, too few points). The edit
  /// keeps the previous triangles.
  #[error("triangulation failed: {0}")]
  TriangulationFailed(String),

  /// The demand list was longer than the atlas can hold; it was truncated
  /// and a follow-up frame is expected.
  #[error("demand list exceeds atlas capacity: {requested} keys, {cap} usable slots")]
  AtlasCapExceeded { requested: usize, cap: usize },

  /// A chunk read came back with missing voxels; the slot is hidden from the
  /// shader and retried on a later frame.
  #[error("chunk data provisional: {misses} voxels missing")]
  ChunkProvisional { misses: u64 },

  /// An edit tried to place a vertex onto an st position already taken.
  #[error("a vertex already exists at st ({0}, {1})")]
  DuplicateVertex(f32, f32),

  /// An edit referenced a vertex that does not exist.
  #[error("vertex index {index} out of range (len {len})")]
  IndexOutOfRange { index: usize, len: usize },

  /// A structurally malformed fragment file.
  #[error("{}: line {line}: {msg}", path.display())]
  FileParseError {
    path: PathBuf,
    line: usize,
    msg: String,
  },

  #[error(transparent)]
  Io(#[from] std::io::Error),

  #[error(transparent)]
  Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ScrollError>;
