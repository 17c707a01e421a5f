//! Error kinds surfaced by the octree, the dispatch protocol and configuration.
//!
//! Nothing here is fatal to a running body. Sampling errors are recovered
//! into the solid sentinel, stitching and dispatch errors skip one frame's
//! update, and only construction-time errors are returned to the caller.

use thiserror::Error;

use crate::dispatch::{KernelKind, RequestHandle};
use crate::octree::{Face, NodeId};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum VoxelError {
  /// A field coordinate fell outside the sampled grid.
  #[error("sample ({x}, {y}, {z}) is outside a field of {samples_per_axis} samples per axis")]
  OutOfRangeSample {
    x: i64,
    y: i64,
    z: i64,
    samples_per_axis: u32,
  },

  /// An enabled transition cell did not register all four finer neighbours.
  #[error("transition cell {direction:?} on node {node:?} has {filled} of 4 adjacent nodes")]
  IncompleteTransitionCell {
    node: NodeId,
    direction: Face,
    filled: u8,
  },

  /// The compute backend cannot run a kernel the submission needs.
  #[error("compute kernel {0:?} is unavailable")]
  ComputeKernelUnavailable(KernelKind),

  /// A result arrived after its receiver was released.
  #[error("result for {0:?} arrived after its receiver was released")]
  StaleCallback(RequestHandle),

  #[error("invalid configuration: {0}")]
  InvalidConfig(String),

  #[error("buffer holds {actual} values, expected {expected}")]
  FieldSizeMismatch { expected: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, VoxelError>;
