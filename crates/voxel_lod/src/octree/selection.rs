//! Distance-based LOD selection.
//!
//! A node is shown whole when the viewer is at least
//! `base_lod_distance / 2^depth` from its center, or when it is a leaf.
//! Otherwise its eight children are considered in octant order.

use glam::Vec3;

use super::{NodeId, Octree};

impl Octree {
  /// Choose the visible cover of the volume for `viewpoint`.
  ///
  /// Every node is reset invisible first. The result is in depth-first
  /// octant order and every returned node is marked visible.
  #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "octree::select"))]
  pub fn select_visible_nodes(&mut self, viewpoint: Vec3) -> Vec<NodeId> {
    for node in &mut self.nodes {
      node.is_visible = false;
    }

    let mut visible = Vec::new();
    let mut stack = vec![self.root];
    while let Some(id) = stack.pop() {
      let node = &self.nodes[id.index()];
      let distance = viewpoint.distance(node.bounds.center());
      match node.children() {
        Some(children) if distance < self.config.visible_distance(node.depth) => {
          stack.extend(children.into_iter().rev());
        }
        _ => visible.push(id),
      }
    }

    for id in &visible {
      self.nodes[id.index()].is_visible = true;
    }
    visible
  }

  /// Currently visible nodes, in arena order.
  pub fn visible_nodes(&self) -> Vec<NodeId> {
    self.node_ids().filter(|id| self.node(*id).is_visible).collect()
  }

  /// Make exactly `visible` visible.
  pub(crate) fn set_visible_set(&mut self, visible: &[NodeId]) {
    for node in &mut self.nodes {
      node.is_visible = false;
    }
    for id in visible {
      if let Some(node) = self.nodes.get_mut(id.index()) {
        node.is_visible = true;
      }
    }
  }
}

#[cfg(test)]
#[path = "selection_test.rs"]
mod selection_test;
