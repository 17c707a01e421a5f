use super::*;

// =========================================================================
// Batch 3: TerrainConfig Tests - Coordinate Math
// =========================================================================

/// Defaults describe a ±200 body at the origin.
#[test]
fn test_default_bounds() {
  let config = TerrainConfig::default();
  let bounds = config.world_bounds();
  assert_eq!(bounds.min, Vec3::splat(-200.0));
  assert_eq!(bounds.max, Vec3::splat(200.0));
  assert!(config.validate().is_ok());
}

#[test]
fn test_finest_resolution() {
  let config = TerrainConfig::default()
    .with_voxels_per_axis(4)
    .with_max_depth(3)
    .with_scale(32.0);
  assert_eq!(config.finest_voxels_per_axis(), 32);
  assert_eq!(config.voxel_size(), 1.0);
}

/// Node voxel size doubles per level toward the root.
#[test]
fn test_node_voxel_size_per_depth() {
  let config = TerrainConfig::default()
    .with_voxels_per_axis(4)
    .with_max_depth(3)
    .with_scale(32.0);
  assert_eq!(config.node_voxel_size(3), 1.0);
  assert_eq!(config.node_voxel_size(2), 2.0);
  assert_eq!(config.node_voxel_size(0), 8.0);
  assert_eq!(config.stride(0), 8);
  assert_eq!(config.stride(3), 1);
}

/// visible_distance halves per depth level.
#[test]
fn test_visible_distance_halves() {
  let config = TerrainConfig::default().with_base_lod_distance(1000.0);
  assert_eq!(config.visible_distance(0), 1000.0);
  assert_eq!(config.visible_distance(1), 500.0);
  assert_eq!(config.visible_distance(4), 62.5);
}

// =========================================================================
// Batch 4: Validation
// =========================================================================

#[test]
fn test_validate_rejects_bad_values() {
  let base = TerrainConfig::default();
  let cases = [
    base.clone().with_voxels_per_axis(0),
    base.clone().with_max_depth(MAX_SUPPORTED_DEPTH + 1),
    base.clone().with_scale(0.0),
    base.clone().with_scale(f32::NAN),
    base.clone().with_iso_level(1.0),
    base.clone().with_iso_level(0.0),
    base.clone().with_base_lod_distance(-1.0),
    base.clone().with_max_in_flight(0),
    base.clone().with_voxels_per_axis(64).with_max_depth(8),
    base.clone().with_voxels_per_axis(16).with_max_depth(8),
  ];
  for config in cases {
    assert!(
      matches!(config.validate(), Err(VoxelError::InvalidConfig(_))),
      "{:?} should be rejected",
      config
    );
  }
}

/// A resolution whose shift wraps `u32` must not slip past the size check.
#[test]
fn test_validate_rejects_wrapping_resolution() {
  let config = TerrainConfig::default()
    .with_voxels_per_axis(1 << 29)
    .with_max_depth(3);
  assert_eq!(config.finest_voxels_per_axis(), 0);
  assert!(config.global_sample_count().is_none());
  assert!(matches!(config.validate(), Err(VoxelError::InvalidConfig(_))));

  let huge = TerrainConfig::default()
    .with_voxels_per_axis(u32::MAX)
    .with_max_depth(MAX_SUPPORTED_DEPTH);
  assert!(huge.global_sample_count().is_none());
  assert!(matches!(huge.validate(), Err(VoxelError::InvalidConfig(_))));
}

#[test]
fn test_global_sample_count_limit() {
  let fits = TerrainConfig::default().with_voxels_per_axis(64).with_max_depth(3);
  assert_eq!(fits.global_sample_count(), Some(513 * 513 * 513));
  assert!(fits.validate().is_ok());

  let too_big = TerrainConfig::default().with_voxels_per_axis(128).with_max_depth(3);
  assert!(too_big.global_sample_count().unwrap() > MAX_FIELD_SAMPLES);
  assert!(too_big.validate().is_err());
}
