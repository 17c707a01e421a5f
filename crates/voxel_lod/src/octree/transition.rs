//! TransitionCell - seam bookkeeping for one face of a visible node.
//!
//! When the nodes across a face are exactly one level deeper, the coarse
//! node records them here, one per quadrant of the shared face:
//!
//! ```text
//!   tangent v
//!      ▲
//!      │ ┌─────┬─────┐
//!      │ │  2  │  3  │
//!      │ ├─────┼─────┤
//!      │ │  0  │  1  │
//!      │ └─────┴─────┘
//!      └──────────────▶ tangent u
//! ```
//!
//! Only a cell with all four quadrants filled may be handed to stitching.

use super::{Face, NodeId};
use crate::constants::TRANSITION_QUADRANTS;
use crate::error::{Result, VoxelError};

/// Finer neighbours registered across one face.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct TransitionCell {
  pub direction: Face,
  pub enabled: bool,
  /// Number of filled quadrant slots (0..=4).
  pub adjacent_node_index: u8,
  pub adjacent_nodes: [Option<NodeId>; TRANSITION_QUADRANTS],
}

impl TransitionCell {
  pub fn new(direction: Face) -> Self {
    Self {
      direction,
      enabled: false,
      adjacent_node_index: 0,
      adjacent_nodes: [None; TRANSITION_QUADRANTS],
    }
  }

  /// Disable and forget all attached nodes.
  pub fn clear(&mut self) {
    *self = Self::new(self.direction);
  }

  /// Attach `node` at `quadrant`, enabling the cell.
  ///
  /// Re-attaching the same node is ignored. Returns false if the quadrant
  /// already holds a different node or is out of range.
  pub fn attach(&mut self, quadrant: usize, node: NodeId) -> bool {
    self.enabled = true;
    let Some(slot) = self.adjacent_nodes.get_mut(quadrant) else {
      return false;
    };
    match slot {
      Some(existing) => *existing == node,
      None => {
        *slot = Some(node);
        self.adjacent_node_index += 1;
        true
      }
    }
  }

  #[inline]
  pub fn is_complete(&self) -> bool {
    self.adjacent_node_index as usize == TRANSITION_QUADRANTS
  }

  /// The four stitch partners of an enabled cell.
  ///
  /// `Ok(None)` for a disabled cell; `IncompleteTransitionCell` when the
  /// cell is enabled but some quadrant is missing.
  pub fn stitch_partners(&self, owner: NodeId) -> Result<Option<[NodeId; TRANSITION_QUADRANTS]>> {
    if !self.enabled {
      return Ok(None);
    }
    let incomplete = || VoxelError::IncompleteTransitionCell {
      node: owner,
      direction: self.direction,
      filled: self.adjacent_node_index,
    };
    if !self.is_complete() {
      return Err(incomplete());
    }
    let mut out = [owner; TRANSITION_QUADRANTS];
    for (slot, node) in out.iter_mut().zip(self.adjacent_nodes) {
      *slot = node.ok_or_else(incomplete)?;
    }
    Ok(Some(out))
  }
}

#[cfg(test)]
#[path = "transition_test.rs"]
mod transition_test;
