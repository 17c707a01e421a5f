use super::*;
use crate::octree::TerrainConfig;

/// 8 voxels per axis, one world unit each, spanning [-4, 4].
fn small_tree() -> Octree {
  let config = TerrainConfig::default()
    .with_scale(8.0)
    .with_voxels_per_axis(2)
    .with_max_depth(2)
    .with_base_lod_distance(16.0);
  Octree::new(config).unwrap()
}

fn filled_tree(value: f32) -> Octree {
  let mut tree = small_tree();
  let n = tree.field().len();
  tree.set_base_field(vec![value; n], vec![1; n]).unwrap();
  tree
}

/// Solid for grid y <= 3, so the surface sits at grid y 3.5 (world -0.5).
fn ground_tree() -> Octree {
  let mut tree = small_tree();
  let s = tree.field().samples_per_axis();
  let mut iso = Vec::with_capacity(s * s * s);
  for _z in 0..s {
    for y in 0..s {
      for _x in 0..s {
        iso.push(if y <= 3 { 1.0 } else { 0.0 });
      }
    }
  }
  let types = vec![1; iso.len()];
  tree.set_base_field(iso, types).unwrap();
  tree
}

// =========================================================================
// Batch 1: Homogeneous fields
// =========================================================================

/// A ray entering a fully solid body hits the boundary plane.
#[test]
fn test_solid_field_hits_boundary() {
  let tree = filled_tree(1.0);
  let hit = tree
    .raycast_to_voxel_body(Vec3::new(-10.0, 0.3, 0.2), Vec3::new(10.0, 0.3, 0.2))
    .expect("solid body must be hit");
  assert!((hit.position.x + 4.0).abs() < 1e-4);
  assert!((hit.distance - 6.0).abs() < 1e-4);
  assert_eq!(hit.normal, Vec3::NEG_X);
}

#[test]
fn test_empty_field_has_no_hit() {
  let tree = filled_tree(0.0);
  assert!(tree
    .raycast_to_voxel_body(Vec3::new(-10.0, 0.3, 0.2), Vec3::new(10.0, 0.3, 0.2))
    .is_none());
}

#[test]
fn test_segment_missing_bounds() {
  let tree = filled_tree(1.0);
  assert!(tree
    .raycast_to_voxel_body(Vec3::new(-10.0, 20.0, 0.0), Vec3::new(10.0, 20.0, 0.0))
    .is_none());
}

#[test]
fn test_start_inside_solid_hits_at_start() {
  let tree = filled_tree(1.0);
  let hit = tree
    .raycast_to_voxel_body(Vec3::new(0.5, 0.5, 0.5), Vec3::new(3.0, 0.5, 0.5))
    .unwrap();
  assert!(hit.distance.abs() < 1e-5);
  assert!((hit.position - Vec3::splat(0.5)).length() < 1e-5);
}

#[test]
fn test_segment_ending_before_body() {
  let tree = filled_tree(1.0);
  assert!(tree
    .raycast_to_voxel_body(Vec3::new(-10.0, 0.0, 0.0), Vec3::new(-5.0, 0.0, 0.0))
    .is_none());
}

// =========================================================================
// Batch 2: Surface crossings
// =========================================================================

#[test]
fn test_vertical_ray_hits_ground() {
  let tree = ground_tree();
  let hit = tree
    .raycast_to_voxel_body(Vec3::new(0.3, 10.0, 0.2), Vec3::new(0.3, -10.0, 0.2))
    .unwrap();
  assert!((hit.position.y + 0.5).abs() < 1e-4, "hit at {:?}", hit.position);
  assert!((hit.distance - 10.5).abs() < 1e-3);
  assert!(hit.normal.y > 0.99);
}

/// A diagonal ray crosses the tangent axes between planes of the dominant
/// axis; the hit must still land on the surface and on the segment.
#[test]
fn test_diagonal_ray_hits_ground() {
  let tree = ground_tree();
  let start = Vec3::new(-3.7, 3.0, -2.9);
  let end = Vec3::new(3.1, -3.5, 2.2);
  let hit = tree.raycast_to_voxel_body(start, end).unwrap();

  assert!((hit.position.y + 0.5).abs() < 1e-3, "hit at {:?}", hit.position);
  let t = hit.distance / (end - start).length();
  assert!((start + (end - start) * t - hit.position).length() < 1e-3);
  // Normal faces back towards the ray origin.
  assert!(hit.normal.dot(end - start) < 0.0);
}

#[test]
fn test_ray_from_below_hits_underside_first() {
  let tree = ground_tree();
  // Enters through the bottom face, which is solid ground.
  let hit = tree
    .raycast_to_voxel_body(Vec3::new(0.3, -10.0, 0.2), Vec3::new(0.3, 10.0, 0.2))
    .unwrap();
  assert!((hit.position.y + 4.0).abs() < 1e-4);
  assert_eq!(hit.normal, Vec3::NEG_Y);
}

/// Entering through a side face below the surface, inside a cell the
/// surface also crosses, still counts as entering solid ground.
#[test]
fn test_side_entry_below_surface_hits_boundary() {
  let tree = ground_tree();
  for y in [-1.5, -0.75] {
    let hit = tree
      .raycast_to_voxel_body(Vec3::new(-10.0, y, 0.3), Vec3::new(10.0, y, 0.3))
      .unwrap_or_else(|| panic!("ray at y {} passed through the ground", y));
    assert!((hit.position.x + 4.0).abs() < 1e-4, "hit at {:?}", hit.position);
    assert!((hit.distance - 6.0).abs() < 1e-4);
    assert_eq!(hit.normal, Vec3::NEG_X);
  }

  // Just above the surface the ray crosses in air.
  assert!(tree
    .raycast_to_voxel_body(Vec3::new(-10.0, -0.25, 0.3), Vec3::new(10.0, -0.25, 0.3))
    .is_none());
}

#[test]
fn test_dug_tunnel_lets_ray_through() {
  let mut tree = ground_tree();
  let start = Vec3::new(0.5, 10.0, 0.5);
  let end = Vec3::new(0.5, -10.0, 0.5);
  let before = tree.raycast_to_voxel_body(start, end).unwrap();

  for y in [-0.5, -1.5, -2.5] {
    tree.apply_deformation_at_position(Vec3::new(0.5, y, 0.5), 2.0, 1.0, false);
  }
  let after = tree.raycast_to_voxel_body(start, end).unwrap();
  assert!(after.distance > before.distance + 1.0);
}

#[test]
fn test_plane_steps_cover_segment() {
  let steps = plane_steps(0.5, 3.5);
  assert_eq!(steps.len(), 4);
  assert_eq!(steps[0].0, 0.0);
  assert_eq!(steps[3].1, 1.0);
  for w in steps.windows(2) {
    assert_eq!(w[0].1, w[1].0);
  }

  let backwards = plane_steps(3.5, 0.5);
  assert_eq!(backwards.len(), 4);
  assert!(backwards.windows(2).all(|w| w[0].1 <= w[1].1));
  assert_eq!(plane_steps(1.2, 1.2), vec![(0.0, 1.0)]);
}
