//! TerrainConfig - construction parameters and world coordinate mapping.

use glam::Vec3;

use super::Aabb;
use crate::constants::{DEFAULT_ISO_LEVEL, MAX_FIELD_SAMPLES, MAX_SUPPORTED_DEPTH};
use crate::error::{Result, VoxelError};
use crate::generator::GeneratorParams;

/// Construction parameters for a voxel body.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
  feature = "serde",
  derive(serde::Serialize, serde::Deserialize),
  serde(default)
)]
pub struct TerrainConfig {
  /// Surface threshold in `[0, 1]`.
  pub iso_level: f32,

  /// World size of the root node.
  pub scale: f32,

  /// Voxels per axis in every node's field.
  pub voxels_per_axis: u32,

  /// Deepest level of the tree (root = 0).
  pub max_depth: u32,

  /// World-space center of the root node.
  pub world_position: Vec3,

  /// Viewer distance at which the root is shown whole.
  /// visible_distance(depth) = base_lod_distance / 2^depth
  pub base_lod_distance: f32,

  /// Dispatch requests allowed in flight at once.
  pub max_in_flight: usize,

  /// Procedural base field.
  pub generator: GeneratorParams,
}

impl TerrainConfig {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_iso_level(mut self, iso_level: f32) -> Self {
    self.iso_level = iso_level;
    self
  }

  pub fn with_scale(mut self, scale: f32) -> Self {
    self.scale = scale;
    self
  }

  pub fn with_voxels_per_axis(mut self, voxels_per_axis: u32) -> Self {
    self.voxels_per_axis = voxels_per_axis;
    self
  }

  pub fn with_max_depth(mut self, max_depth: u32) -> Self {
    self.max_depth = max_depth;
    self
  }

  pub fn with_world_position(mut self, world_position: Vec3) -> Self {
    self.world_position = world_position;
    self
  }

  pub fn with_base_lod_distance(mut self, distance: f32) -> Self {
    self.base_lod_distance = distance;
    self
  }

  pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
    self.max_in_flight = max_in_flight;
    self
  }

  pub fn with_generator(mut self, generator: GeneratorParams) -> Self {
    self.generator = generator;
    self
  }

  /// Reject parameters the octree cannot represent.
  pub fn validate(&self) -> Result<()> {
    let fail = |msg: String| Err(VoxelError::InvalidConfig(msg));
    if self.voxels_per_axis == 0 {
      return fail("voxels_per_axis must be at least 1".into());
    }
    if self.max_depth > MAX_SUPPORTED_DEPTH {
      return fail(format!(
        "max_depth {} exceeds the supported {}",
        self.max_depth, MAX_SUPPORTED_DEPTH
      ));
    }
    match self.global_sample_count() {
      Some(samples) if samples <= MAX_FIELD_SAMPLES => {}
      _ => {
        return fail(format!(
          "{} voxels per axis at depth {} needs more than {} field samples",
          self.voxels_per_axis, self.max_depth, MAX_FIELD_SAMPLES
        ))
      }
    }
    if !(self.scale > 0.0) || !self.scale.is_finite() {
      return fail(format!("scale must be positive, got {}", self.scale));
    }
    if !(self.iso_level > 0.0 && self.iso_level < 1.0) {
      return fail(format!("iso_level must lie in (0, 1), got {}", self.iso_level));
    }
    if !(self.base_lod_distance > 0.0) {
      return fail(format!(
        "base_lod_distance must be positive, got {}",
        self.base_lod_distance
      ));
    }
    if self.max_in_flight == 0 {
      return fail("max_in_flight must be at least 1".into());
    }
    Ok(())
  }

  /// Voxels per axis of the global field (`voxels_per_axis * 2^max_depth`).
  ///
  /// Only meaningful for a validated config.
  #[inline]
  pub fn finest_voxels_per_axis(&self) -> u32 {
    self.voxels_per_axis << self.max_depth
  }

  /// Samples in the global field, or `None` if the count overflows `u64`.
  pub fn global_sample_count(&self) -> Option<u64> {
    let finest = u64::from(self.voxels_per_axis).checked_mul(1u64.checked_shl(self.max_depth)?)?;
    let s = finest.checked_add(1)?;
    s.checked_mul(s)?.checked_mul(s)
  }

  /// World size of one finest-resolution voxel.
  #[inline]
  pub fn voxel_size(&self) -> f32 {
    self.scale / self.finest_voxels_per_axis() as f32
  }

  /// World size of one voxel in a node at `depth`.
  #[inline]
  pub fn node_voxel_size(&self, depth: u32) -> f32 {
    self.voxel_size() * (1u32 << (self.max_depth - depth.min(self.max_depth))) as f32
  }

  /// Finest-grid samples between adjacent samples of a node at `depth`.
  #[inline]
  pub fn stride(&self, depth: u32) -> u32 {
    1 << (self.max_depth - depth.min(self.max_depth))
  }

  /// Viewer distance at which a node at `depth` is shown without refining.
  #[inline]
  pub fn visible_distance(&self, depth: u32) -> f32 {
    self.base_lod_distance / (1u64 << depth) as f32
  }

  /// World-space bounds of the whole body.
  pub fn world_bounds(&self) -> Aabb {
    Aabb::from_center_half_extents(self.world_position, Vec3::splat(self.scale * 0.5))
  }
}

impl Default for TerrainConfig {
  fn default() -> Self {
    let scale = 400.0;
    Self {
      iso_level: DEFAULT_ISO_LEVEL,
      scale,
      voxels_per_axis: 8,
      max_depth: 4,
      world_position: Vec3::ZERO,
      base_lod_distance: scale * 2.0,
      max_in_flight: 2,
      generator: GeneratorParams::default(),
    }
  }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
