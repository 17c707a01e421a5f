//! Arena node records for the LOD octree.
//!
//! Nodes are addressed by [`NodeId`], an index into the owning
//! [`Octree`](super::Octree) arena. A node owns its eight children; its
//! neighbour and transition links are plain ids used for lookups only.

use glam::{UVec3, Vec3};

use super::{Aabb, TransitionCell};
use crate::field::ScalarField;
use crate::types::MeshHandle;

/// Index of a node in the octree arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct NodeId(u32);

impl NodeId {
  #[inline]
  pub(crate) fn from_index(index: usize) -> Self {
    Self(index as u32)
  }

  #[inline]
  pub fn index(self) -> usize {
    self.0 as usize
  }
}

/// The six face directions, in arena order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
#[repr(u8)]
pub enum Face {
  PosX = 0,
  NegX = 1,
  PosY = 2,
  NegY = 3,
  PosZ = 4,
  NegZ = 5,
}

impl Face {
  pub const ALL: [Face; 6] = [
    Face::PosX,
    Face::NegX,
    Face::PosY,
    Face::NegY,
    Face::PosZ,
    Face::NegZ,
  ];

  #[inline]
  pub fn index(self) -> usize {
    self as usize
  }

  pub fn from_index(index: usize) -> Option<Face> {
    Self::ALL.get(index).copied()
  }

  /// Normal axis: 0 = X, 1 = Y, 2 = Z.
  #[inline]
  pub fn axis(self) -> usize {
    self as usize / 2
  }

  #[inline]
  pub fn is_positive(self) -> bool {
    self as usize % 2 == 0
  }

  #[inline]
  pub fn opposite(self) -> Face {
    Self::ALL[self as usize ^ 1]
  }

  /// The two axes spanning the face, lower axis first.
  #[inline]
  pub fn tangent_axes(self) -> (usize, usize) {
    match self.axis() {
      0 => (1, 2),
      1 => (0, 2),
      _ => (0, 1),
    }
  }

  pub fn normal(self) -> Vec3 {
    let mut n = Vec3::ZERO;
    n[self.axis()] = if self.is_positive() { 1.0 } else { -1.0 };
    n
  }

  /// Octant bit for this face's axis.
  #[inline]
  pub(crate) fn octant_bit(self) -> usize {
    1 << self.axis()
  }
}

/// One block of the spatial partition.
#[derive(Clone, Debug)]
pub struct OctreeNode {
  /// World-space bounds.
  pub bounds: Aabb,
  /// Depth below the root (root = 0).
  pub depth: u32,
  pub parent: Option<NodeId>,
  /// Octant of this node inside its parent (0 for the root).
  pub octant: u8,
  pub(crate) children: [Option<NodeId>; 8],
  pub(crate) neighbors: [Option<NodeId>; 6],
  pub(crate) is_visible: bool,
  pub(crate) field: ScalarField,
  pub(crate) transition_cells: [TransitionCell; 6],
  /// Min corner in finest-resolution sample coordinates.
  pub(crate) grid_origin: UVec3,
  /// Field needs resampling from the octree's global field.
  pub(crate) stale: bool,
  pub(crate) mesh: Option<MeshHandle>,
  pub(crate) mesh_signature: Option<u64>,
}

impl OctreeNode {
  pub(crate) fn new(
    bounds: Aabb,
    depth: u32,
    parent: Option<NodeId>,
    octant: u8,
    grid_origin: UVec3,
    voxels_per_axis: u32,
  ) -> Self {
    Self {
      bounds,
      depth,
      parent,
      octant,
      children: [None; 8],
      neighbors: [None; 6],
      is_visible: false,
      field: ScalarField::new(voxels_per_axis),
      transition_cells: Face::ALL.map(TransitionCell::new),
      grid_origin,
      stale: true,
      mesh: None,
      mesh_signature: None,
    }
  }

  /// A node is a leaf iff it has no children.
  #[inline]
  pub fn is_leaf(&self) -> bool {
    self.children.iter().all(Option::is_none)
  }

  #[inline]
  pub fn is_visible(&self) -> bool {
    self.is_visible
  }

  #[inline]
  pub fn child(&self, octant: usize) -> Option<NodeId> {
    self.children.get(octant).copied().flatten()
  }

  /// All eight children, or `None` for a leaf.
  pub fn children(&self) -> Option<[NodeId; 8]> {
    let mut out = [NodeId(0); 8];
    for (slot, child) in out.iter_mut().zip(self.children) {
      *slot = child?;
    }
    Some(out)
  }

  #[inline]
  pub fn neighbor(&self, face: Face) -> Option<NodeId> {
    self.neighbors[face.index()]
  }

  #[inline]
  pub fn field(&self) -> &ScalarField {
    &self.field
  }

  #[inline]
  pub fn transition_cell(&self, face: Face) -> &TransitionCell {
    &self.transition_cells[face.index()]
  }

  pub fn transition_cells(&self) -> &[TransitionCell; 6] {
    &self.transition_cells
  }

  pub fn grid_origin(&self) -> UVec3 {
    self.grid_origin
  }

  /// Current mesh, if a result has been delivered for this node.
  pub fn mesh(&self) -> Option<&MeshHandle> {
    self.mesh.as_ref()
  }
}

#[cfg(test)]
#[path = "node_test.rs"]
mod node_test;
