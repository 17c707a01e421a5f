//! Snapshotting visible nodes into a compute submission.
//!
//! # Phases
//!
//! ```text
//!   1. sync       resample stale nodes from the global field
//!   2. select     nodes whose mesh is missing, whose field is dirty or
//!                 whose transition layout changed
//!   3. partners   coarse nodes stitched against a node from phase 2
//!   4. snapshot   copy fields (shared between jobs), clear dirty flags
//! ```

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use smallvec::SmallVec;

use super::kernel::{FieldSnapshot, KernelKind, KernelSet, NodeJob, TransitionJob};
use crate::constants::TRANSITION_QUADRANTS;
use crate::octree::{Face, NodeId, Octree};

/// Complete transition cells of one node, by face.
type Stitches = SmallVec<[(Face, [NodeId; TRANSITION_QUADRANTS]); 6]>;

/// Node jobs built for one tick.
#[derive(Clone, Debug, Default)]
pub struct DispatchBatch {
  pub frame: u64,
  pub jobs: Vec<NodeJob>,
  /// Enabled transition cells left out because a quadrant was missing.
  pub skipped_cells: usize,
}

impl DispatchBatch {
  /// Build jobs for every visible node that needs a new mesh.
  pub fn build(tree: &mut Octree, visible: &[NodeId], frame: u64) -> Self {
    Self::build_excluding(tree, visible, frame, &HashSet::new())
  }

  /// As [`build`](Self::build), but nodes in `in_flight` are only rebuilt
  /// when their field changed since they were submitted.
  #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "dispatch::build_batch"))]
  pub fn build_excluding(
    tree: &mut Octree,
    visible: &[NodeId],
    frame: u64,
    in_flight: &HashSet<NodeId>,
  ) -> Self {
    // =========================================================================
    // Phase 1: Resample nodes touched by edits
    // =========================================================================
    tree.sync_stale_nodes();

    // =========================================================================
    // Phase 2: Select nodes needing work
    // =========================================================================
    let mut skipped_cells = 0;
    let mut layouts: Vec<(NodeId, Stitches, u64)> = Vec::with_capacity(visible.len());
    for &id in visible {
      let node = tree.node(id);
      let mut stitches = Stitches::new();
      for cell in node.transition_cells() {
        match cell.stitch_partners(id) {
          Ok(Some(partners)) => stitches.push((cell.direction, partners)),
          Ok(None) => {}
          Err(err) => {
            log::warn!("{}", err);
            skipped_cells += 1;
          }
        }
      }
      let signature = layout_signature(&stitches);
      layouts.push((id, stitches, signature));
    }

    // An in-flight node's result is still coming unless its field moved on.
    let blocked =
      |id: NodeId, tree: &Octree| in_flight.contains(&id) && !tree.node(id).field().is_dirty();
    let mut selected: HashSet<NodeId> = HashSet::new();
    for (id, _, signature) in &layouts {
      let node = tree.node(*id);
      let needs_work = node.mesh().is_none()
        || node.field().is_dirty()
        || node.mesh_signature != Some(*signature);
      if needs_work && !blocked(*id, tree) {
        selected.insert(*id);
      }
    }

    // =========================================================================
    // Phase 3: Coarse nodes stitched against rebuilt nodes
    // =========================================================================
    let rebuilt: HashSet<NodeId> = selected
      .iter()
      .copied()
      .filter(|id| tree.node(*id).field().is_dirty())
      .collect();
    for (id, stitches, _) in &layouts {
      if selected.contains(id) || blocked(*id, tree) {
        continue;
      }
      let touches_rebuilt = stitches
        .iter()
        .any(|(_, partners)| partners.iter().any(|p| rebuilt.contains(p)));
      if touches_rebuilt {
        selected.insert(*id);
      }
    }

    // =========================================================================
    // Phase 4: Snapshot
    // =========================================================================
    let iso_level = tree.config().iso_level;
    let mut snapshots: HashMap<NodeId, Arc<FieldSnapshot>> = HashMap::new();
    let mut jobs = Vec::with_capacity(selected.len());
    for (id, stitches, signature) in layouts {
      if !selected.contains(&id) {
        continue;
      }
      let snapshot = snapshot_of(tree, &mut snapshots, id);
      let transitions = stitches
        .iter()
        .map(|(face, partners)| TransitionJob {
          face: *face,
          partners: partners.map(|p| snapshot_of(tree, &mut snapshots, p)),
        })
        .collect();
      jobs.push(NodeJob {
        snapshot,
        iso_level,
        transitions,
        frame,
        signature,
      });
    }
    for job in &jobs {
      tree.nodes[job.node().index()].field.clear_dirty();
    }

    if !jobs.is_empty() {
      log::trace!(
        "frame {}: {} node jobs, {} snapshots",
        frame,
        jobs.len(),
        snapshots.len()
      );
    }
    Self {
      frame,
      jobs,
      skipped_cells,
    }
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.jobs.is_empty()
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.jobs.len()
  }

  /// Nodes the batch rebuilds, in job order.
  pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
    self.jobs.iter().map(NodeJob::node)
  }

  /// Union of the kernels every job needs.
  pub fn required_kernels(&self) -> KernelSet {
    let mut kinds = KernelSet::new();
    for job in &self.jobs {
      for kind in job.required_kernels() {
        if !kinds.contains(&kind) {
          kinds.push(kind);
        }
      }
    }
    kinds
  }

  /// True when any job carries a transition slab.
  pub fn has_stitches(&self) -> bool {
    self.required_kernels().contains(&KernelKind::TransvoxelStitch)
  }
}

fn snapshot_of(
  tree: &Octree,
  cache: &mut HashMap<NodeId, Arc<FieldSnapshot>>,
  id: NodeId,
) -> Arc<FieldSnapshot> {
  Arc::clone(cache.entry(id).or_insert_with(|| {
    let node = tree.node(id);
    Arc::new(FieldSnapshot {
      node: id,
      depth: node.depth,
      origin: node.bounds.min,
      voxel_size: tree.config().node_voxel_size(node.depth),
      field: node.field().clone(),
    })
  }))
}

/// Hash of the faces and partners a mesh is stitched against.
pub(crate) fn layout_signature(stitches: &[(Face, [NodeId; TRANSITION_QUADRANTS])]) -> u64 {
  let mut hasher = DefaultHasher::new();
  stitches.len().hash(&mut hasher);
  for (face, partners) in stitches {
    face.hash(&mut hasher);
    partners.hash(&mut hasher);
  }
  hasher.finish()
}

#[cfg(test)]
#[path = "batch_test.rs"]
mod batch_test;
