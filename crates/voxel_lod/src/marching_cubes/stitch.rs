//! Transition slabs between a coarse node and its four finer neighbours.
//!
//! The coarse node drops its outermost cell layer on the stitched face and
//! this slab takes its place. On the tangent axes the slab runs at the fine
//! resolution; along the normal it is one coarse cell deep.
//!
//! ```text
//!   positive face, seen along a tangent axis
//!
//!          inner layer         face layer
//!   coarse ●───────────────────● fine partner samples
//!          ○ (interpolated)    ●
//!          ●───────────────────●
//!          n = v - 1           n = v
//! ```
//!
//! The face layer comes straight from the partners, so the slab matches the
//! fine meshes sample for sample. The inner layer repeats the coarse samples
//! and linearly interpolates the in-between positions, which keeps the
//! crossings on coarse edges where the regular mesh puts them.

use glam::{UVec3, Vec3};

use super::{extract, SampleGrid};
use crate::constants::{coord_to_index, samples_per_axis, TRANSITION_QUADRANTS};
use crate::field::ScalarField;
use crate::octree::Face;
use crate::types::RawMeshBuffers;

/// Everything the slab for one face is built from.
#[derive(Clone, Copy, Debug)]
pub struct StitchInput<'a> {
  pub face: Face,
  pub voxels_per_axis: u32,
  /// World position of the coarse node's sample (0, 0, 0).
  pub origin: Vec3,
  /// Coarse voxel size.
  pub voxel_size: f32,
  /// Effective coarse samples.
  pub coarse_iso: &'a [f32],
  pub coarse_types: &'a [u32],
  /// Finer neighbours in quadrant order.
  pub partners: [&'a ScalarField; TRANSITION_QUADRANTS],
}

/// Sample buffers and placement of a transition slab.
#[derive(Clone, Debug, PartialEq)]
pub struct TransitionSlab {
  pub iso: Vec<f32>,
  pub types: Vec<u32>,
  pub cells: UVec3,
  pub origin: Vec3,
  pub spacing: Vec3,
}

impl TransitionSlab {
  pub fn grid(&self) -> SampleGrid<'_> {
    SampleGrid {
      iso: &self.iso,
      types: &self.types,
      cells: self.cells,
      origin: self.origin,
      spacing: self.spacing,
    }
  }
}

/// Build the slab for `input.face`.
///
/// Returns `None` when the partner fields do not share the coarse
/// resolution.
pub fn transition_slab(input: &StitchInput<'_>) -> Option<TransitionSlab> {
  let v = input.voxels_per_axis as usize;
  let s = samples_per_axis(input.voxels_per_axis);
  if input.coarse_iso.len() != s * s * s || input.coarse_types.len() != s * s * s {
    return None;
  }
  if v == 0 || input.partners.iter().any(|p| p.voxels_per_axis() != input.voxels_per_axis) {
    return None;
  }

  let n = input.face.axis();
  let (u, w) = input.face.tangent_axes();
  let positive = input.face.is_positive();

  // Coarse layer next to the face, and the partners' own face layer.
  let inner_n = if positive { v - 1 } else { 1 };
  let face_n = if positive { 0 } else { v };

  let mut cells = UVec3::ZERO;
  cells[n] = 1;
  cells[u] = 2 * v as u32;
  cells[w] = 2 * v as u32;
  let dims = cells + UVec3::ONE;

  let mut spacing = Vec3::splat(input.voxel_size * 0.5);
  spacing[n] = input.voxel_size;
  let mut origin = input.origin;
  if positive {
    origin[n] += inner_n as f32 * input.voxel_size;
  }

  let coarse = |a: usize, b: usize| -> (f32, u32) {
    let mut c = [0usize; 3];
    c[n] = inner_n;
    c[u] = a;
    c[w] = b;
    let idx = coord_to_index(c[0], c[1], c[2], s);
    (input.coarse_iso[idx], input.coarse_types[idx])
  };

  let inner = |a: usize, b: usize| -> (f32, u32) {
    let (a0, a1) = (a / 2, (a + 1) / 2);
    let (b0, b1) = (b / 2, (b + 1) / 2);
    let sum = coarse(a0, b0).0 + coarse(a1, b0).0 + coarse(a0, b1).0 + coarse(a1, b1).0;
    let value = sum * 0.25;
    (value, coarse(a0, b0).1)
  };

  let fine = |a: usize, b: usize| -> (f32, u32) {
    let qa = usize::from(a >= v);
    let qb = usize::from(b >= v);
    let partner = input.partners[qa | (qb << 1)];
    let mut c = [0usize; 3];
    c[n] = face_n;
    c[u] = a - qa * v;
    c[w] = b - qb * v;
    let idx = coord_to_index(c[0], c[1], c[2], s);
    (partner.sampled_value_at(idx), partner.sampled_type_at(idx))
  };

  let total = (dims.x * dims.y * dims.z) as usize;
  let mut iso = Vec::with_capacity(total);
  let mut types = Vec::with_capacity(total);
  for z in 0..dims.z as usize {
    for y in 0..dims.y as usize {
      for x in 0..dims.x as usize {
        let c = [x, y, z];
        let on_face = (c[n] == 1) == positive;
        let (value, ty) = if on_face {
          fine(c[u], c[w])
        } else {
          inner(c[u], c[w])
        };
        iso.push(value);
        types.push(ty);
      }
    }
  }

  Some(TransitionSlab {
    iso,
    types,
    cells,
    origin,
    spacing,
  })
}

/// Polygonise the transition slab for one face.
#[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "marching_cubes::stitch"))]
pub fn stitch_face(input: &StitchInput<'_>, iso_level: f32) -> RawMeshBuffers {
  match transition_slab(input) {
    Some(slab) => extract(&slab.grid(), iso_level, [false; 6]),
    None => {
      log::warn!(
        "transition slab for {:?} skipped: partner resolution mismatch",
        input.face
      );
      RawMeshBuffers::new()
    }
  }
}

#[cfg(test)]
#[path = "stitch_test.rs"]
mod stitch_test;
