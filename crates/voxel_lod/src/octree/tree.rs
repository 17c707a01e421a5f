//! Octree - node arena plus the global finest-resolution field.
//!
//! # Layout
//!
//! ```text
//!   nodes: [root, c0..c7, c0.0..c0.7, ...]   (append-only arena)
//!
//!   global field: (voxels_per_axis * 2^max_depth + 1)^3 samples
//!   node at depth d samples it with stride 2^(max_depth - d):
//!
//!     depth 0  ●───────●───────●        stride 4
//!     depth 1  ●───●───●───●───●        stride 2
//!     depth 2  ●─●─●─●─●─●─●─●─●        stride 1
//! ```
//!
//! Coarse samples sit exactly on fine samples, so two nodes sharing a face
//! agree on every sample of that face at any depth.

use std::collections::HashMap;

use glam::{IVec3, UVec3, Vec3};

use super::{Face, NodeId, OctreeNode, TerrainConfig};
use crate::constants::{coord_to_index, octant_offset, samples_per_axis};
use crate::error::Result;
use crate::field::ScalarField;
use crate::types::MeshHandle;

/// Arena octree over a deformable scalar field.
#[derive(Clone, Debug)]
pub struct Octree {
  pub(crate) config: TerrainConfig,
  pub(crate) nodes: Vec<OctreeNode>,
  pub(crate) root: NodeId,
  /// Base and delta layers at the finest resolution.
  pub(crate) field: ScalarField,
  pub(crate) dirty: bool,
}

impl Octree {
  /// Build the static tree, subdivided everywhere down to `max_depth`.
  #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "octree::build"))]
  pub fn new(config: TerrainConfig) -> Result<Self> {
    config.validate()?;
    let field = ScalarField::new(config.finest_voxels_per_axis());
    let mut tree = Self::with_root(config, field);

    let mut stack = vec![tree.root];
    while let Some(id) = stack.pop() {
      if tree.nodes[id.index()].depth < tree.config.max_depth {
        stack.extend(tree.split(id));
      }
    }

    tree.assign_neighbors();
    tree.resample_all();
    Ok(tree)
  }

  /// Build from finest-resolution base buffers.
  ///
  /// Subdivision stops early wherever a node's region holds a single
  /// material, so leaves end up at mixed depths.
  #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "octree::from_buffers"))]
  pub fn from_buffers(config: TerrainConfig, iso: Vec<f32>, types: Vec<u32>) -> Result<Self> {
    config.validate()?;
    let field = ScalarField::with_base(config.finest_voxels_per_axis(), iso, types)?;
    let mut tree = Self::with_root(config, field);

    let mut stack = vec![tree.root];
    while let Some(id) = stack.pop() {
      let node = &tree.nodes[id.index()];
      if node.depth < tree.config.max_depth && !tree.region_is_homogeneous(node) {
        stack.extend(tree.split(id));
      }
    }

    tree.assign_neighbors();
    tree.resample_all();
    log::debug!(
      "built octree from buffers: {} nodes, {} leaves",
      tree.nodes.len(),
      tree.leaf_count()
    );
    Ok(tree)
  }

  fn with_root(config: TerrainConfig, field: ScalarField) -> Self {
    let root = OctreeNode::new(
      config.world_bounds(),
      0,
      None,
      0,
      UVec3::ZERO,
      config.voxels_per_axis,
    );
    Self {
      config,
      nodes: vec![root],
      root: NodeId::from_index(0),
      field,
      dirty: false,
    }
  }

  // ===========================================================================
  // Accessors
  // ===========================================================================

  pub fn config(&self) -> &TerrainConfig {
    &self.config
  }

  pub fn root(&self) -> NodeId {
    self.root
  }

  #[inline]
  pub fn node(&self, id: NodeId) -> &OctreeNode {
    &self.nodes[id.index()]
  }

  pub fn node_count(&self) -> usize {
    self.nodes.len()
  }

  /// All node ids in arena order.
  pub fn node_ids(&self) -> impl Iterator<Item = NodeId> {
    (0..self.nodes.len()).map(NodeId::from_index)
  }

  /// The global finest-resolution field.
  pub fn field(&self) -> &ScalarField {
    &self.field
  }

  /// True after an edit until stale nodes are resampled.
  pub fn is_dirty(&self) -> bool {
    self.dirty
  }

  /// Number of leaves reachable from the root.
  pub fn leaf_count(&self) -> usize {
    let mut count = 0;
    let mut stack = vec![self.root];
    while let Some(id) = stack.pop() {
      match self.node(id).children() {
        Some(children) => stack.extend(children),
        None => count += 1,
      }
    }
    count
  }

  /// Effective value of the global field, or the solid sentinel outside it.
  #[inline]
  pub fn sampled_value(&self, coord: IVec3) -> f32 {
    self.field.sampled_value(coord)
  }

  /// World position to (fractional) finest-grid coordinates.
  #[inline]
  pub fn world_to_grid(&self, world: Vec3) -> Vec3 {
    (world - self.config.world_bounds().min) / self.config.voxel_size()
  }

  #[inline]
  pub fn grid_to_world(&self, grid: Vec3) -> Vec3 {
    self.config.world_bounds().min + grid * self.config.voxel_size()
  }

  /// True when `ancestor` is `id` or lies on its parent chain.
  pub fn is_ancestor_or_self(&self, ancestor: NodeId, mut id: NodeId) -> bool {
    loop {
      if id == ancestor {
        return true;
      }
      match self.node(id).parent {
        Some(parent) => id = parent,
        None => return false,
      }
    }
  }

  // ===========================================================================
  // Structure
  // ===========================================================================

  /// Split a leaf into 8 children, appending them to the arena.
  ///
  /// Returns the existing children for a non-leaf and `None` at `max_depth`.
  pub fn subdivide(&mut self, id: NodeId) -> Option<[NodeId; 8]> {
    if let Some(children) = self.node(id).children() {
      return Some(children);
    }
    if self.node(id).depth >= self.config.max_depth {
      return None;
    }
    let children = self.split(id);
    for child in children {
      self.resample_node(child, true);
    }
    self.assign_neighbors();
    Some(children)
  }

  fn split(&mut self, id: NodeId) -> [NodeId; 8] {
    let parent = &self.nodes[id.index()];
    let depth = parent.depth + 1;
    let bounds = parent.bounds;
    let origin = parent.grid_origin;
    // Finest-grid samples spanned by one child.
    let child_span = self.config.voxels_per_axis * self.config.stride(depth);

    let first = self.nodes.len();
    for octant in 0..8 {
      let offset = octant_offset(octant).as_uvec3() * child_span;
      self.nodes.push(OctreeNode::new(
        bounds.octant(octant),
        depth,
        Some(id),
        octant as u8,
        origin + offset,
        self.config.voxels_per_axis,
      ));
    }

    let children: [NodeId; 8] = std::array::from_fn(|i| NodeId::from_index(first + i));
    self.nodes[id.index()].children = children.map(Some);
    children
  }

  /// Rewire every neighbour link from the root down.
  ///
  /// A link points at the same-depth node across the face when it exists,
  /// otherwise at the deepest coarser node covering that face.
  pub(crate) fn assign_neighbors(&mut self) {
    self.nodes[self.root.index()].neighbors = [None; 6];
    // Parents always precede their children in the arena.
    for index in 0..self.nodes.len() {
      let Some(children) = self.nodes[index].children() else {
        continue;
      };
      let parent_neighbors = self.nodes[index].neighbors;
      let parent_depth = self.nodes[index].depth;

      for (octant, child) in children.into_iter().enumerate() {
        let mut links = [None; 6];
        for face in Face::ALL {
          let bit = face.octant_bit();
          let on_far_side = (octant & bit != 0) == face.is_positive();
          links[face.index()] = if !on_far_side {
            Some(children[octant ^ bit])
          } else {
            parent_neighbors[face.index()].map(|outer| {
              let outer_node = &self.nodes[outer.index()];
              match outer_node.child(octant ^ bit) {
                Some(mirror) if outer_node.depth == parent_depth => mirror,
                _ => outer,
              }
            })
          };
        }
        self.nodes[child.index()].neighbors = links;
      }
    }
  }

  fn region_is_homogeneous(&self, node: &OctreeNode) -> bool {
    let span = (self.config.voxels_per_axis * self.config.stride(node.depth)) as usize;
    let s = self.field.samples_per_axis();
    let o = node.grid_origin.as_usvec();
    let first = self.field.sampled_type_at(coord_to_index(o[0], o[1], o[2], s));
    for z in o[2]..=o[2] + span {
      for y in o[1]..=o[1] + span {
        for x in o[0]..=o[0] + span {
          if self.field.sampled_type_at(coord_to_index(x, y, z, s)) != first {
            return false;
          }
        }
      }
    }
    true
  }

  // ===========================================================================
  // Node field resampling
  // ===========================================================================

  /// Replace the global base layers and resample every node.
  pub fn set_base_field(&mut self, iso: Vec<f32>, types: Vec<u32>) -> Result<()> {
    self.field.set_base(iso, types)?;
    self.resample_all();
    self.dirty = true;
    Ok(())
  }

  fn resample_all(&mut self) {
    for index in 0..self.nodes.len() {
      self.resample_node(NodeId::from_index(index), true);
    }
  }

  /// Resample nodes touched by edits since the last call.
  ///
  /// Returns the number of nodes refreshed.
  #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "octree::sync_stale"))]
  pub fn sync_stale_nodes(&mut self) -> usize {
    let stale: Vec<NodeId> = self
      .node_ids()
      .filter(|id| self.node(*id).stale)
      .collect();
    for id in &stale {
      self.resample_node(*id, false);
    }
    self.dirty = false;
    stale.len()
  }

  /// Point-sample the global field into a node's field.
  ///
  /// With `include_base`, base types are recomputed as the most common type
  /// in each stride window; otherwise only the delta layers are refreshed.
  fn resample_node(&mut self, id: NodeId, include_base: bool) {
    let stride = self.config.stride(self.nodes[id.index()].depth) as usize;
    let s = samples_per_axis(self.config.voxels_per_axis);
    let global = &self.field;
    let gs = global.samples_per_axis();
    let node = &mut self.nodes[id.index()];
    let o = node.grid_origin.as_usvec();

    for z in 0..s {
      for y in 0..s {
        for x in 0..s {
          let (gx, gy, gz) = (o[0] + x * stride, o[1] + y * stride, o[2] + z * stride);
          let gi = coord_to_index(gx, gy, gz, gs);
          let li = coord_to_index(x, y, z, s);
          let base_type = if include_base {
            dominant_type(global, [gx, gy, gz], stride)
          } else {
            node.field.type_base()[li]
          };
          node.field.write_sample(
            li,
            (global.iso_base()[gi], base_type),
            (global.iso_delta()[gi], global.type_delta()[gi]),
          );
        }
      }
    }
    node.stale = false;
  }

  /// Mark every node whose grid region overlaps `[lo, hi]` stale.
  pub(crate) fn mark_region_stale(&mut self, lo: UVec3, hi: UVec3) {
    let mut stack = vec![self.root];
    while let Some(id) = stack.pop() {
      let node = &self.nodes[id.index()];
      let span = self.config.voxels_per_axis * self.config.stride(node.depth);
      let n_lo = node.grid_origin;
      let n_hi = n_lo + UVec3::splat(span);
      if n_lo.cmpgt(hi).any() || n_hi.cmplt(lo).any() {
        continue;
      }
      if let Some(children) = node.children() {
        stack.extend(children);
      }
      self.nodes[id.index()].stale = true;
    }
    self.dirty = true;
  }

  // ===========================================================================
  // Mesh state (driving timeline only)
  // ===========================================================================

  /// Flag node fields for resubmission after a rejected submission.
  pub(crate) fn mark_fields_dirty(&mut self, ids: &[NodeId]) {
    for id in ids {
      if let Some(node) = self.nodes.get_mut(id.index()) {
        node.field.mark_dirty();
      }
    }
  }

  pub(crate) fn install_mesh(&mut self, id: NodeId, mesh: MeshHandle, signature: u64) {
    if let Some(node) = self.nodes.get_mut(id.index()) {
      node.mesh = Some(mesh);
      node.mesh_signature = Some(signature);
    }
  }

  /// Visible nodes' current meshes, keyed by id.
  pub fn visible_meshes(&self) -> HashMap<NodeId, MeshHandle> {
    self
      .node_ids()
      .filter_map(|id| {
        let node = self.node(id);
        node
          .is_visible
          .then(|| node.mesh.clone())
          .flatten()
          .map(|mesh| (id, mesh))
      })
      .collect()
  }
}

/// Most common type in the `stride`-wide window starting at `start`.
/// Ties go to the lower id.
fn dominant_type(field: &ScalarField, start: [usize; 3], stride: usize) -> u32 {
  let s = field.samples_per_axis();
  let first = field.type_base()[coord_to_index(start[0], start[1], start[2], s)];
  if stride == 1 {
    return first;
  }
  let end = |axis: usize| (start[axis] + stride).min(s);
  let mut counts: HashMap<u32, u32> = HashMap::new();
  for z in start[2]..end(2) {
    for y in start[1]..end(1) {
      for x in start[0]..end(0) {
        *counts.entry(field.type_base()[coord_to_index(x, y, z, s)]).or_default() += 1;
      }
    }
  }
  counts
    .into_iter()
    .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
    .map(|(ty, _)| ty)
    .unwrap_or(first)
}

trait AsUsizeVec {
  fn as_usvec(self) -> [usize; 3];
}

impl AsUsizeVec for UVec3 {
  #[inline]
  fn as_usvec(self) -> [usize; 3] {
    [self.x as usize, self.y as usize, self.z as usize]
  }
}

#[cfg(test)]
#[path = "tree_test.rs"]
mod tree_test;
