//! Scalar field blocks: iso and material samples with an edit overlay.
//!
//! Every block stores a base layer (generated once) and a delta layer
//! (sculpting). The effective iso value is `clamp(base + delta, 0, 1)`; the
//! effective type is the painted delta type when non-zero, otherwise the
//! base type.

use glam::IVec3;

use crate::constants::{coord_to_index, sample_count, samples_per_axis, SOLID_SENTINEL};
use crate::error::{Result, VoxelError};

/// Iso/type samples for one block, plus the edit overlay and a dirty flag.
#[derive(Clone, Debug, PartialEq)]
pub struct ScalarField {
  voxels_per_axis: u32,
  iso_base: Vec<f32>,
  iso_delta: Vec<f32>,
  type_base: Vec<u32>,
  type_delta: Vec<u32>,
  dirty: bool,
}

impl ScalarField {
  /// Allocate a zeroed field for `voxels_per_axis` voxels per axis.
  pub fn new(voxels_per_axis: u32) -> Self {
    let n = sample_count(voxels_per_axis);
    Self {
      voxels_per_axis,
      iso_base: vec![0.0; n],
      iso_delta: vec![0.0; n],
      type_base: vec![0; n],
      type_delta: vec![0; n],
      dirty: false,
    }
  }

  /// Build a field from base buffers. Deltas start at zero.
  pub fn with_base(voxels_per_axis: u32, iso: Vec<f32>, types: Vec<u32>) -> Result<Self> {
    let mut field = Self::new(voxels_per_axis);
    field.set_base(iso, types)?;
    Ok(field)
  }

  #[inline]
  pub fn voxels_per_axis(&self) -> u32 {
    self.voxels_per_axis
  }

  #[inline]
  pub fn samples_per_axis(&self) -> usize {
    samples_per_axis(self.voxels_per_axis)
  }

  /// Number of samples stored in each layer.
  #[inline]
  pub fn len(&self) -> usize {
    self.iso_base.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.iso_base.is_empty()
  }

  /// Change capacity. All layers are reallocated and zeroed.
  pub fn resize(&mut self, voxels_per_axis: u32) {
    *self = Self::new(voxels_per_axis);
    self.dirty = true;
  }

  /// Zero every layer in place.
  pub fn reset(&mut self) {
    self.iso_base.fill(0.0);
    self.iso_delta.fill(0.0);
    self.type_base.fill(0);
    self.type_delta.fill(0);
    self.dirty = true;
  }

  /// Replace the base layers. Both buffers must hold exactly `len()` values.
  pub fn set_base(&mut self, iso: Vec<f32>, types: Vec<u32>) -> Result<()> {
    let expected = self.len();
    for actual in [iso.len(), types.len()] {
      if actual != expected {
        return Err(VoxelError::FieldSizeMismatch { expected, actual });
      }
    }
    self.iso_base = iso;
    self.type_base = types;
    self.dirty = true;
    Ok(())
  }

  /// Checked linear index for a sample coordinate.
  pub fn index(&self, coord: IVec3) -> Result<usize> {
    let s = self.samples_per_axis();
    let in_range = |v: i32| v >= 0 && (v as usize) < s;
    if in_range(coord.x) && in_range(coord.y) && in_range(coord.z) {
      Ok(coord_to_index(coord.x as usize, coord.y as usize, coord.z as usize, s))
    } else {
      Err(VoxelError::OutOfRangeSample {
        x: coord.x as i64,
        y: coord.y as i64,
        z: coord.z as i64,
        samples_per_axis: s as u32,
      })
    }
  }

  /// Effective iso value, or the solid sentinel outside the grid.
  #[inline]
  pub fn sampled_value(&self, coord: IVec3) -> f32 {
    match self.index(coord) {
      Ok(idx) => self.sampled_value_at(idx),
      Err(_) => SOLID_SENTINEL,
    }
  }

  #[inline]
  pub fn sampled_value_at(&self, idx: usize) -> f32 {
    (self.iso_base[idx] + self.iso_delta[idx]).clamp(0.0, 1.0)
  }

  #[inline]
  pub fn sampled_type_at(&self, idx: usize) -> u32 {
    match self.type_delta[idx] {
      0 => self.type_base[idx],
      painted => painted,
    }
  }

  pub fn iso_base(&self) -> &[f32] {
    &self.iso_base
  }

  pub fn iso_delta(&self) -> &[f32] {
    &self.iso_delta
  }

  pub fn type_base(&self) -> &[u32] {
    &self.type_base
  }

  pub fn type_delta(&self) -> &[u32] {
    &self.type_delta
  }

  /// Move the effective iso value at `idx` by `amount`, clamped to `[0, 1]`.
  ///
  /// Returns true (and marks the field dirty) only when the value changed.
  pub fn offset_delta(&mut self, idx: usize, amount: f32) -> bool {
    let base = self.iso_base[idx];
    let current = self.sampled_value_at(idx);
    let target = (current + amount).clamp(0.0, 1.0);
    if target == current {
      return false;
    }
    self.iso_delta[idx] = target - base;
    self.dirty = true;
    true
  }

  /// Paint a material override at `idx`. Zero clears the override.
  pub fn paint_type(&mut self, idx: usize, material: u32) -> bool {
    if self.type_delta[idx] == material {
      return false;
    }
    self.type_delta[idx] = material;
    self.dirty = true;
    true
  }

  /// Zero both delta layers. Returns true if anything changed.
  pub fn clear_delta(&mut self) -> bool {
    let any =
      self.iso_delta.iter().any(|d| *d != 0.0) || self.type_delta.iter().any(|t| *t != 0);
    if any {
      self.iso_delta.fill(0.0);
      self.type_delta.fill(0);
      self.dirty = true;
    }
    any
  }

  /// Overwrite one sample in both layers, marking dirty on change.
  pub(crate) fn write_sample(&mut self, idx: usize, base: (f32, u32), delta: (f32, u32)) {
    let changed = self.iso_base[idx] != base.0
      || self.type_base[idx] != base.1
      || self.iso_delta[idx] != delta.0
      || self.type_delta[idx] != delta.1;
    if changed {
      self.iso_base[idx] = base.0;
      self.type_base[idx] = base.1;
      self.iso_delta[idx] = delta.0;
      self.type_delta[idx] = delta.1;
      self.dirty = true;
    }
  }

  #[inline]
  pub fn is_dirty(&self) -> bool {
    self.dirty
  }

  pub fn mark_dirty(&mut self) {
    self.dirty = true;
  }

  /// Clear the dirty flag once the field has been handed to compute.
  pub fn clear_dirty(&mut self) {
    self.dirty = false;
  }

  /// Effective iso values for every sample.
  pub fn effective_iso(&self) -> Vec<f32> {
    (0..self.len()).map(|i| self.sampled_value_at(i)).collect()
  }

  /// Effective types for every sample.
  pub fn effective_types(&self) -> Vec<u32> {
    (0..self.len()).map(|i| self.sampled_type_at(i)).collect()
  }

  /// True when every sample carries the same effective type.
  pub fn is_homogeneous_type(&self) -> bool {
    let Some(first) = (!self.is_empty()).then(|| self.sampled_type_at(0)) else {
      return true;
    };
    (1..self.len()).all(|i| self.sampled_type_at(i) == first)
  }
}

#[cfg(test)]
#[path = "field_test.rs"]
mod field_test;
