//! 2:1 balancing of the visible set.
//!
//! Face-adjacent visible nodes may differ by at most one level. A node with
//! a neighbour two or more levels deeper is replaced by its descendants one
//! level shallower than that neighbour; a neighbour exactly one level deeper
//! is recorded in the node's transition cell for that face.
//!
//! ```text
//!   before                      after
//!   ┌───────────┬──┬──┐         ┌─────┬─────┬──┬──┐
//!   │           │  │  │         │     │     │  │  │
//!   │           ├──┼──┤         │     │     ├──┼──┤
//!   │  depth 3  │  │  │   ──▶   ├─────┼─────┤  │  │
//!   │           ├──┼──┤         │     │     ├──┼──┤
//!   │           │  │  │         │  4  │  4  │ 5│ 5│
//!   └───────────┴──┴──┘         └─────┴─────┴──┴──┘
//! ```
//!
//! # Passes
//!
//! Each pass clears the transition cells of the visible nodes, then visits
//! them in order. A replacement restarts the pass; a pass without one is the
//! fixed point. Re-running on a balanced set reproduces the same set and the
//! same cells.

use smallvec::SmallVec;

use super::{Aabb, Face, NodeId, Octree, OctreeNode};

/// Counters from one balancing run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BalanceStats {
  /// Passes over the visible set, including the final clean pass.
  pub passes: usize,
  /// Nodes replaced by deeper descendants.
  pub rebalanced_nodes: usize,
  /// Enabled transition cells after the last pass.
  pub transition_cells: usize,
  /// Enabled transition cells with fewer than four partners.
  pub incomplete_cells: usize,
}

/// True when `b` sits directly across `face` of `a`.
#[inline]
pub fn are_adjacent(a: &Aabb, b: &Aabb, face: Face) -> bool {
  a.touches_across(b, face)
}

/// Quadrant of `adjacent` on the shared face of `node`.
///
/// Bit 0 is set when the adjacent center lies above the node center on the
/// first tangent axis, bit 1 on the second.
pub fn adjacency_index(node: &OctreeNode, adjacent: &OctreeNode, face: Face) -> usize {
  let (u, v) = face.tangent_axes();
  let a = adjacent.bounds.center();
  let n = node.bounds.center();
  (a[u] > n[u]) as usize | (((a[v] > n[v]) as usize) << 1)
}

impl Octree {
  /// Enforce the 2:1 invariant on `visible`, in place.
  #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "octree::balance"))]
  pub fn balance_visible_nodes(&mut self, visible: &mut Vec<NodeId>) -> BalanceStats {
    let mut stats = BalanceStats::default();

    loop {
      stats.passes += 1;
      self.set_visible_set(visible);
      for id in visible.iter() {
        for cell in &mut self.nodes[id.index()].transition_cells {
          cell.clear();
        }
      }

      let mut replaced = false;
      for i in 0..visible.len() {
        let id = visible[i];
        let depth = self.node(id).depth;
        let mut max_diff = 0i64;
        let mut finer: SmallVec<[(Face, NodeId); 24]> = SmallVec::new();

        for face in Face::ALL {
          for adjacent in self.visible_across(id, face) {
            let diff = self.node(adjacent).depth as i64 - depth as i64;
            max_diff = max_diff.max(diff);
            if diff == 1 {
              finer.push((face, adjacent));
            }
          }
        }

        if max_diff >= 2 {
          let target = depth + max_diff as u32 - 1;
          let descendants = self.descendants_at(id, target);
          log::trace!(
            "rebalancing {:?}: depth {} -> {} ({} nodes)",
            id,
            depth,
            target,
            descendants.len()
          );
          visible.splice(i..=i, descendants);
          stats.rebalanced_nodes += 1;
          replaced = true;
          break;
        }

        for (face, adjacent) in finer {
          let quadrant = adjacency_index(self.node(id), self.node(adjacent), face);
          let cell = &mut self.nodes[id.index()].transition_cells[face.index()];
          if !cell.attach(quadrant, adjacent) {
            log::debug!(
              "{:?} quadrant {} on {:?} already holds another node",
              id,
              quadrant,
              face
            );
          }
        }
      }

      if !replaced {
        break;
      }
    }

    for id in visible.iter() {
      for cell in self.node(*id).transition_cells() {
        if cell.enabled {
          stats.transition_cells += 1;
          if !cell.is_complete() {
            stats.incomplete_cells += 1;
          }
        }
      }
    }
    stats
  }

  /// Visible nodes directly across `face` of `id`.
  ///
  /// Candidates come from the neighbour link: the neighbour itself, its
  /// nearest visible ancestor, or its visible descendants touching the face.
  pub fn visible_across(&self, id: NodeId, face: Face) -> SmallVec<[NodeId; 8]> {
    let mut out = SmallVec::new();
    let Some(neighbor) = self.node(id).neighbor(face) else {
      return out;
    };
    let bounds = self.node(id).bounds;

    let mut cursor = Some(neighbor);
    while let Some(candidate) = cursor {
      let node = self.node(candidate);
      if node.is_visible {
        if are_adjacent(&bounds, &node.bounds, face) {
          out.push(candidate);
        }
        return out;
      }
      cursor = node.parent;
    }

    let mut stack: SmallVec<[NodeId; 16]> = self
      .node(neighbor)
      .children()
      .map(|children| SmallVec::from_slice(&children))
      .unwrap_or_default();
    while let Some(candidate) = stack.pop() {
      let node = self.node(candidate);
      if !are_adjacent(&bounds, &node.bounds, face) {
        continue;
      }
      if node.is_visible {
        out.push(candidate);
      } else if let Some(children) = node.children() {
        stack.extend(children);
      }
    }
    out
  }

  /// Descendants of `id` at `depth`, subdividing leaves on the way.
  fn descendants_at(&mut self, id: NodeId, depth: u32) -> Vec<NodeId> {
    let mut level = vec![id];
    for _ in self.node(id).depth..depth {
      let mut next = Vec::with_capacity(level.len() * 8);
      for node in level {
        match self.subdivide(node) {
          Some(children) => next.extend(children),
          None => next.push(node),
        }
      }
      level = next;
    }
    level
  }
}

#[cfg(test)]
#[path = "balance_test.rs"]
mod balance_test;
