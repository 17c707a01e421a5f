//! Grid layout constants shared by the field, the octree and the kernels.
//!
//! # Field Layout
//!
//! A block with `v` voxels per axis stores `s = v + 1` samples per axis so
//! that neighbouring blocks share their boundary samples.
//!
//! ```text
//!   sample:  0     1     2    ...   v-1    v
//!            │─────│─────│── ... ───│─────│
//!            └──────────── v voxels ──────┘
//!
//!   index = x + s * (y + s * z)      (X fastest, Z slowest)
//! ```
//!
//! # Coordinate System
//!
//! ```text
//!         +Y
//!          │
//!          │
//!          └───────── +X
//!         /
//!        +Z
//!
//! Child octants (bit 0 = +X, bit 1 = +Y, bit 2 = +Z):
//!   0 = (-,-,-)    4 = (-,-,+)
//!   1 = (+,-,-)    5 = (+,-,+)
//!   2 = (-,+,-)    6 = (-,+,+)
//!   3 = (+,+,-)    7 = (+,+,+)
//! ```

use glam::Vec3;

/// Value returned for any coordinate outside the sampled grid (solid).
pub const SOLID_SENTINEL: f32 = 1.0;

/// Surface threshold used when none is configured.
pub const DEFAULT_ISO_LEVEL: f32 = 0.5;

/// Deepest tree the finest-resolution field is allowed to address.
pub const MAX_SUPPORTED_DEPTH: u32 = 8;

/// Largest global field, in samples, a body may allocate (512 finest voxels
/// per axis fits; 1024 does not).
pub const MAX_FIELD_SAMPLES: u64 = 1 << 28;

/// Number of finer neighbours a complete transition cell references.
pub const TRANSITION_QUADRANTS: usize = 4;

/// Relative tolerance for face-contact tests (fraction of the smaller box).
pub const ADJACENCY_EPSILON: f32 = 1e-4;

/// Type id for empty space.
pub const AIR: u32 = 0;

/// Samples per axis for a block of `voxels_per_axis` voxels.
#[inline(always)]
pub const fn samples_per_axis(voxels_per_axis: u32) -> usize {
  voxels_per_axis as usize + 1
}

/// Total samples stored for a block of `voxels_per_axis` voxels.
#[inline(always)]
pub const fn sample_count(voxels_per_axis: u32) -> usize {
  let s = samples_per_axis(voxels_per_axis);
  s * s * s
}

/// Convert 3D sample coordinates to a linear index (X fastest).
#[inline(always)]
pub const fn coord_to_index(x: usize, y: usize, z: usize, samples_per_axis: usize) -> usize {
  x + samples_per_axis * (y + samples_per_axis * z)
}

/// Convert a linear index back to 3D sample coordinates.
#[inline(always)]
pub const fn index_to_coord(idx: usize, samples_per_axis: usize) -> (usize, usize, usize) {
  let x = idx % samples_per_axis;
  let y = (idx / samples_per_axis) % samples_per_axis;
  let z = idx / (samples_per_axis * samples_per_axis);
  (x, y, z)
}

/// Unit offset of child octant `i` from its parent's min corner, in half-sizes.
#[inline(always)]
pub fn octant_offset(octant: usize) -> Vec3 {
  Vec3::new(
    (octant & 1) as f32,
    ((octant >> 1) & 1) as f32,
    ((octant >> 2) & 1) as f32,
  )
}

#[cfg(test)]
#[path = "constants_test.rs"]
mod constants_test;
