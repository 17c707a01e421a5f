//! Gradient normals for iso fields where solid is high.
//!
//! The surface normal points from solid (1) towards air (0), so it is the
//! negated, normalized field gradient.

use glam::{IVec3, Vec3};

use super::CORNER_OFFSETS;

/// Central-difference gradient at a sample, one-sided at the grid border.
///
/// `sample` must return the value at any coordinate inside `[0, max]`.
pub fn central_difference(sample: impl Fn(IVec3) -> f32, coord: IVec3, max: IVec3) -> Vec3 {
  let mut g = Vec3::ZERO;
  for axis in 0..3 {
    let mut step = IVec3::ZERO;
    step[axis] = 1;
    let lo = if coord[axis] > 0 { coord - step } else { coord };
    let hi = if coord[axis] < max[axis] { coord + step } else { coord };
    let span = (hi[axis] - lo[axis]) as f32;
    if span > 0.0 {
      g[axis] = (sample(hi) - sample(lo)) / span;
    }
  }
  g
}

/// Gradient of a single cell from its 8 corners (difference of opposite
/// face sums).
pub fn cell_gradient(values: &[f32; 8]) -> Vec3 {
  let mut g = Vec3::ZERO;
  for (corner, value) in values.iter().enumerate() {
    for axis in 0..3 {
      let sign = if CORNER_OFFSETS[corner][axis] == 1 { 1.0 } else { -1.0 };
      g[axis] += sign * value;
    }
  }
  g * 0.25
}

/// Outward surface normal for a gradient, or `fallback` when it vanishes.
#[inline]
pub fn surface_normal(gradient: Vec3, fallback: Vec3) -> Vec3 {
  let len_sq = gradient.length_squared();
  if len_sq < 1e-12 {
    return fallback;
  }
  -gradient * len_sq.sqrt().recip()
}
