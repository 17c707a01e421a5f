use glam::IVec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::*;
use crate::octree::TerrainConfig;

/// 8 finest voxels per axis, one world unit each, spanning [-4, 4].
fn small_tree() -> Octree {
  let config = TerrainConfig::default()
    .with_scale(8.0)
    .with_voxels_per_axis(2)
    .with_max_depth(2)
    .with_base_lod_distance(16.0);
  Octree::new(config).unwrap()
}

fn every_sample(tree: &Octree) -> impl Iterator<Item = IVec3> {
  let s = tree.field().samples_per_axis() as i32;
  (0..s).flat_map(move |z| (0..s).flat_map(move |y| (0..s).map(move |x| IVec3::new(x, y, z))))
}

// =========================================================================
// Batch 1: Single strokes
// =========================================================================

/// Radius 2, influence 1 at a sample: the center saturates and nothing
/// beyond the radius moves.
#[test]
fn test_radius_two_stroke_at_leaf_center() {
  let mut tree = small_tree();
  let center = IVec3::splat(4);
  let changed = tree.apply_deformation_at_position(Vec3::ZERO, 2.0, 1.0, true);
  assert!(changed > 0);

  assert_eq!(tree.sampled_value(center), 1.0);
  for coord in every_sample(&tree) {
    let d = (coord - center).as_vec3().length();
    if d > 2.0 {
      assert_eq!(tree.sampled_value(coord), 0.0, "sample {:?} moved", coord);
    }
  }
}

#[test]
fn test_falloff_is_quadratic() {
  let mut tree = small_tree();
  tree.apply_deformation_at_position(Vec3::ZERO, 2.0, 0.8, true);
  // One voxel from the center: t = 0.5, weight = 0.8 * 0.25.
  let v = tree.sampled_value(IVec3::new(5, 4, 4));
  assert!((v - 0.2).abs() < 1e-6);
}

#[test]
fn test_subtractive_lowers_values() {
  let mut tree = small_tree();
  let n = tree.field().len();
  tree.set_base_field(vec![1.0; n], vec![1; n]).unwrap();
  tree.apply_deformation_at_position(Vec3::ZERO, 2.0, 1.0, false);
  assert_eq!(tree.sampled_value(IVec3::splat(4)), 0.0);
  assert_eq!(tree.field().iso_base()[0], 1.0);
}

#[test]
fn test_noop_strokes() {
  let mut tree = small_tree();
  assert_eq!(tree.apply_deformation_at_position(Vec3::ZERO, 0.0, 1.0, true), 0);
  assert_eq!(tree.apply_deformation_at_position(Vec3::ZERO, -1.0, 1.0, true), 0);
  assert_eq!(tree.apply_deformation_at_position(Vec3::ZERO, 2.0, 0.0, true), 0);
  // Far outside the volume.
  assert_eq!(
    tree.apply_deformation_at_position(Vec3::splat(100.0), 2.0, 1.0, true),
    0
  );
  assert!(!tree.is_dirty());
}

/// Digging into empty space changes nothing and marks nothing stale.
#[test]
fn test_saturated_stroke_is_clean() {
  let mut tree = small_tree();
  assert_eq!(tree.apply_deformation_at_position(Vec3::ZERO, 2.0, 1.0, false), 0);
  assert!(!tree.is_dirty());
  assert!(tree.node_ids().all(|id| !tree.node(id).stale));
}

#[test]
fn test_brush_paints_material() {
  let mut tree = small_tree();
  let brush = Brush::additive(1.5, 1.0).with_material(7);
  tree.apply_brush(Vec3::ZERO, &brush);

  let s = tree.field().samples_per_axis();
  let idx = crate::constants::coord_to_index(4, 4, 4, s);
  assert_eq!(tree.field().sampled_type_at(idx), 7);
  // Subtractive strokes never paint.
  let mut dig = Brush::subtractive(1.5, 1.0);
  dig.material = Some(9);
  tree.apply_brush(Vec3::ZERO, &dig);
  assert_eq!(tree.field().sampled_type_at(idx), 7);
}

#[test]
fn test_clear_deformation_restores_base() {
  let mut tree = small_tree();
  tree.apply_deformation_at_position(Vec3::ZERO, 2.0, 1.0, true);
  tree.sync_stale_nodes();
  tree.clear_deformation();
  assert!(tree.is_dirty());
  assert!(tree.node(tree.root()).stale);
  assert!(every_sample(&tree).all(|c| tree.sampled_value(c) == 0.0));
}

// =========================================================================
// Batch 2: Randomized properties
// =========================================================================

/// Any stroke sequence keeps every effective value inside [0, 1].
#[test]
fn test_random_strokes_stay_clamped() {
  let mut rng = StdRng::seed_from_u64(0x5eed);
  let mut tree = small_tree();
  for _ in 0..200 {
    let pos = Vec3::new(
      rng.random_range(-5.0..5.0),
      rng.random_range(-5.0..5.0),
      rng.random_range(-5.0..5.0),
    );
    let radius = rng.random_range(0.5..3.0);
    let influence = rng.random_range(0.0..2.0);
    tree.apply_deformation_at_position(pos, radius, influence, rng.random_bool(0.5));
  }
  for coord in every_sample(&tree) {
    let v = tree.sampled_value(coord);
    assert!((0.0..=1.0).contains(&v));
  }
}

/// A stroke never touches samples farther than ceil(r) from its center.
#[test]
fn test_random_strokes_are_local() {
  let mut rng = StdRng::seed_from_u64(42);
  for _ in 0..50 {
    let mut tree = small_tree();
    let pos = Vec3::new(
      rng.random_range(-4.0..4.0),
      rng.random_range(-4.0..4.0),
      rng.random_range(-4.0..4.0),
    );
    let radius = rng.random_range(0.5..2.5);
    tree.apply_deformation_at_position(pos, radius, 1.0, true);

    let p = tree.world_to_grid(pos);
    let limit = (radius / tree.config().voxel_size()).ceil();
    for coord in every_sample(&tree) {
      if tree.sampled_value(coord) != 0.0 {
        assert!(coord.as_vec3().distance(p) <= limit);
      }
    }
  }
}
