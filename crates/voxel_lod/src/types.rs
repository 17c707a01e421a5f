//! Mesh and hit-test data types exchanged with kernels and the renderer.

use std::sync::Arc;

use glam::Vec3;
use smallvec::SmallVec;

use crate::dispatch::NodeMeshOutput;
use crate::octree::{Face, NodeId};

/// Axis-aligned bounding box of mesh vertices.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MinMaxAABB {
  pub min: [f32; 3],
  pub max: [f32; 3],
}

impl MinMaxAABB {
  /// Create AABB with inverted extents (ready for encapsulation).
  pub fn empty() -> Self {
    Self {
      min: [f32::INFINITY; 3],
      max: [f32::NEG_INFINITY; 3],
    }
  }

  pub fn new(min: [f32; 3], max: [f32; 3]) -> Self {
    Self { min, max }
  }

  /// Expand AABB to include a point.
  #[inline]
  pub fn encapsulate(&mut self, point: [f32; 3]) {
    for i in 0..3 {
      self.min[i] = self.min[i].min(point[i]);
      self.max[i] = self.max[i].max(point[i]);
    }
  }

  /// Check if AABB is valid (min <= max on all axes).
  pub fn is_valid(&self) -> bool {
    self.min[0] <= self.max[0] && self.min[1] <= self.max[1] && self.min[2] <= self.max[2]
  }
}

impl Default for MinMaxAABB {
  fn default() -> Self {
    Self::empty()
  }
}

/// Flat surface buffers as a kernel writes them, before validation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawMeshBuffers {
  pub positions: Vec<[f32; 3]>,
  pub normals: Vec<[f32; 3]>,
  /// Material type per vertex.
  pub types: Vec<u32>,
  /// Triangle indices (3 per triangle).
  pub indices: Vec<u32>,
}

impl RawMeshBuffers {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_empty(&self) -> bool {
    self.indices.is_empty()
  }

  pub fn triangle_count(&self) -> usize {
    self.indices.len() / 3
  }

  /// Append one unshared triangle.
  pub fn push_triangle(&mut self, positions: [Vec3; 3], normals: [Vec3; 3], types: [u32; 3]) {
    let base = self.positions.len() as u32;
    for k in 0..3 {
      self.positions.push(positions[k].to_array());
      self.normals.push(normals[k].to_array());
      self.types.push(types[k]);
    }
    self.indices.extend_from_slice(&[base, base + 1, base + 2]);
  }
}

/// Validated surface buffers, ready for a renderer.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshBuffers {
  pub positions: Vec<[f32; 3]>,
  pub normals: Vec<[f32; 3]>,
  pub types: Vec<u32>,
  pub indices: Vec<u32>,
  /// Bounding box encompassing all referenced vertices.
  pub bounds: MinMaxAABB,
}

impl MeshBuffers {
  /// Consume kernel output, dropping degenerate triangles.
  ///
  /// A triangle is dropped when an index repeats, points past the vertex
  /// buffer, or its corners are coincident. Returns the mesh and the number
  /// of triangles dropped.
  pub fn from_raw(raw: RawMeshBuffers) -> (Self, usize) {
    let RawMeshBuffers {
      positions,
      mut normals,
      mut types,
      indices,
    } = raw;
    let n = positions.len();
    normals.resize(n, [0.0, 1.0, 0.0]);
    types.resize(n, 0);

    let mut kept = Vec::with_capacity(indices.len());
    let mut bounds = MinMaxAABB::empty();
    // A trailing partial triangle counts once.
    let mut dropped = usize::from(indices.len() % 3 != 0);
    for tri in indices.chunks_exact(3) {
      let (a, b, c) = (tri[0], tri[1], tri[2]);
      if !is_valid_triangle(&positions, a, b, c) {
        dropped += 1;
        continue;
      }
      for &i in tri {
        bounds.encapsulate(positions[i as usize]);
      }
      kept.extend_from_slice(tri);
    }

    if dropped > 0 {
      log::debug!("dropped {} degenerate triangles from kernel output", dropped);
    }

    (
      Self {
        positions,
        normals,
        types,
        indices: kept,
        bounds,
      },
      dropped,
    )
  }

  pub fn is_empty(&self) -> bool {
    self.indices.is_empty()
  }

  pub fn vertex_count(&self) -> usize {
    self.positions.len()
  }

  pub fn triangle_count(&self) -> usize {
    self.indices.len() / 3
  }
}

fn is_valid_triangle(positions: &[[f32; 3]], a: u32, b: u32, c: u32) -> bool {
  let n = positions.len() as u32;
  if a >= n || b >= n || c >= n || a == b || b == c || a == c {
    return false;
  }
  let [pa, pb, pc] = [a, b, c].map(|i| Vec3::from_array(positions[i as usize]));
  (pb - pa).cross(pc - pa).length_squared() > 1e-12
}

/// Surface of one node: its regular cells plus one stitch strip per
/// transition face.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NodeMesh {
  pub regular: MeshBuffers,
  pub transitions: SmallVec<[(Face, MeshBuffers); 6]>,
  /// Triangles rejected while consuming kernel output.
  pub degenerate_dropped: usize,
}

impl NodeMesh {
  /// Validate kernel output for one node.
  pub fn from_output(output: NodeMeshOutput) -> Self {
    let (regular, mut dropped) = MeshBuffers::from_raw(output.regular);
    let transitions = output
      .transitions
      .into_iter()
      .map(|(face, raw)| {
        let (mesh, strip_dropped) = MeshBuffers::from_raw(raw);
        dropped += strip_dropped;
        (face, mesh)
      })
      .collect();
    Self {
      regular,
      transitions,
      degenerate_dropped: dropped,
    }
  }

  pub fn triangle_count(&self) -> usize {
    self.regular.triangle_count()
      + self
        .transitions
        .iter()
        .map(|(_, mesh)| mesh.triangle_count())
        .sum::<usize>()
  }
}

/// Shared, immutable mesh handed to the renderer.
pub type MeshHandle = Arc<NodeMesh>;

/// Per-node entry of the renderer's LOD set.
#[derive(Clone, Debug)]
pub struct RenderNode {
  pub id: NodeId,
  pub depth: u32,
  pub bounds: crate::octree::Aabb,
  /// Latest delivered mesh, if any.
  pub mesh: Option<MeshHandle>,
}

/// Result of a successful raycast.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HitPoint {
  /// World-space hit location.
  pub position: Vec3,
  /// Distance from the ray start.
  pub distance: f32,
  /// Surface normal facing the ray origin.
  pub normal: Vec3,
}

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;
