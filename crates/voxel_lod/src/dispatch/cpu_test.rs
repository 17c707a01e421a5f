use std::collections::HashSet;
use std::sync::Arc;

use glam::Vec3;

use super::*;
use crate::constants::sample_count;
use crate::dispatch::{DispatchBatch, DispatchOrchestrator, LivenessToken, TransitionJob};
use crate::generator::GeneratorParams;
use crate::octree::{Face, NodeId, Octree, TerrainConfig};
use crate::types::{NodeMesh, RawMeshBuffers};

const RADIUS: f32 = 2.5;

/// Body of size 8 centered at the origin holding a sphere of `RADIUS`.
fn sphere_tree(voxels_per_axis: u32, max_depth: u32) -> Octree {
  let config = TerrainConfig::default()
    .with_scale(8.0)
    .with_voxels_per_axis(voxels_per_axis)
    .with_max_depth(max_depth)
    .with_base_lod_distance(8.0);
  let v = config.finest_voxels_per_axis();
  let s = v as usize + 1;
  let mut tree = Octree::new(config).unwrap();

  let mut iso = Vec::with_capacity(sample_count(v));
  for z in 0..s {
    for y in 0..s {
      for x in 0..s {
        let p = tree.grid_to_world(Vec3::new(x as f32, y as f32, z as f32));
        iso.push((0.5 + (RADIUS - p.length()) * 0.25).clamp(0.0, 1.0));
      }
    }
  }
  let types = iso.iter().map(|v| u32::from(*v >= 0.5)).collect();
  tree.set_base_field(iso, types).unwrap();
  tree
}

fn assert_on_sphere(mesh: &RawMeshBuffers, tolerance: f32) {
  for (p, n) in mesh.positions.iter().zip(&mesh.normals) {
    let (p, n) = (Vec3::from(*p), Vec3::from(*n));
    assert!(
      (p.length() - RADIUS).abs() < tolerance,
      "vertex {:?} at distance {}",
      p,
      p.length()
    );
    assert!(n.dot(p) > 0.0, "normal {:?} at {:?} points inward", n, p);
  }
}

fn wait_for<T>(region: &mut Readback<T>) -> Option<T> {
  for _ in 0..2000 {
    if let Some(value) = region.take() {
      return Some(value);
    }
    std::thread::sleep(std::time::Duration::from_millis(1));
  }
  None
}

// =========================================================================
// Batch 1: Kernels
// =========================================================================

#[test]
fn test_sphere_surface_per_node() {
  let mut tree = sphere_tree(4, 1);
  let visible = tree.node(tree.root()).children().unwrap().to_vec();
  let batch = DispatchBatch::build(&mut tree, &visible, 0);
  assert_eq!(batch.len(), 8);

  for job in &batch.jobs {
    let output = run_node_job(job);
    assert_eq!(output.node, job.node());
    assert!(output.regular.triangle_count() > 0);
    assert!(output.transitions.is_empty());
    assert_on_sphere(&output.regular, 0.3);
  }
}

/// Deltas are folded in before extraction.
#[test]
fn test_deformation_kernel_applies_deltas() {
  let mut tree = sphere_tree(4, 1);
  let visible = tree.node(tree.root()).children().unwrap().to_vec();
  tree.apply_deformation_at_position(Vec3::ZERO, 6.0, 1.0, false);
  let batch = DispatchBatch::build(&mut tree, &visible, 0);
  let triangles: usize = batch
    .jobs
    .iter()
    .map(|job| run_node_job(job).regular.triangle_count())
    .sum();
  assert_eq!(triangles, 0);
}

#[test]
fn test_stitched_node_emits_strips() {
  let mut tree = sphere_tree(2, 2);
  let coarse = tree.node(tree.root()).child(0).unwrap();
  let mut visible = vec![coarse];
  for octant in 1..8 {
    let node = tree.node(tree.root()).child(octant).unwrap();
    visible.extend(tree.node(node).children().unwrap());
  }
  tree.balance_visible_nodes(&mut visible);
  let batch = DispatchBatch::build(&mut tree, &visible, 0);
  let job = batch.jobs.iter().find(|job| job.node() == coarse).unwrap();

  let output = run_node_job(job);
  let faces: Vec<Face> = output.transitions.iter().map(|(face, _)| *face).collect();
  assert_eq!(faces, vec![Face::PosX, Face::PosY, Face::PosZ]);
  let strip_triangles: usize = output
    .transitions
    .iter()
    .map(|(_, mesh)| mesh.triangle_count())
    .sum();
  assert!(strip_triangles > 0);
  for (_, strip) in &output.transitions {
    assert_on_sphere(strip, 0.5);
  }
  assert_on_sphere(&output.regular, 0.5);
}

// =========================================================================
// Batch 2: Backend
// =========================================================================

#[test]
fn test_disabled_kernel_is_reported() {
  let backend = CpuComputeBackend::new().without_kernel(KernelKind::TransvoxelStitch);
  assert!(!backend.supports(KernelKind::TransvoxelStitch));
  assert!(backend.supports(KernelKind::MarchingCubes));

  let mut tree = sphere_tree(4, 1);
  let visible = tree.node(tree.root()).children().unwrap().to_vec();
  let batch = DispatchBatch::build(&mut tree, &visible, 0);
  let mut job = batch.jobs[0].clone();
  assert!(backend.extract_node(job.clone()).is_ok());

  let partner = Arc::clone(&job.snapshot);
  job.transitions.push(TransitionJob {
    face: Face::PosX,
    partners: [partner.clone(), partner.clone(), partner.clone(), partner],
  });
  assert_eq!(
    backend.extract_node(job).unwrap_err(),
    VoxelError::ComputeKernelUnavailable(KernelKind::TransvoxelStitch)
  );
}

#[test]
fn test_generate_field_on_pool() {
  let backend = CpuComputeBackend::new();
  let request = GeneratorRequest {
    params: GeneratorParams::default(),
    voxels_per_axis: 4,
    scale: 400.0,
    iso_level: 0.5,
  };
  let mut region = backend.generate_field(request).unwrap();
  let field = wait_for(&mut region).unwrap();
  assert_eq!(field.iso.len(), 125);
  assert_eq!(field.types.len(), 125);
}

/// Full round trip: batch, CPU kernels on rayon, poll, validated meshes.
#[test]
fn test_orchestrated_sphere_round_trip() {
  let mut tree = sphere_tree(4, 1);
  let visible = tree.node(tree.root()).children().unwrap().to_vec();
  let batch = DispatchBatch::build(&mut tree, &visible, 3);

  let mut orchestrator = DispatchOrchestrator::new(Arc::new(CpuComputeBackend::new()));
  let token = LivenessToken::new();
  let (tx, rx) = crossbeam_channel::unbounded();
  orchestrator
    .submit_batch(batch, token.probe(), move |result| tx.send(result).unwrap())
    .unwrap();

  let mut delivered = None;
  for _ in 0..2000 {
    orchestrator.poll();
    if let Ok(result) = rx.try_recv() {
      delivered = Some(result);
      break;
    }
    std::thread::sleep(std::time::Duration::from_millis(1));
  }
  let result = delivered.expect("batch was never delivered");
  assert_eq!(result.frame, 3);

  let nodes: HashSet<NodeId> = result.outputs.iter().map(|o| o.node).collect();
  assert_eq!(nodes, visible.iter().copied().collect());
  let triangles: usize = result
    .outputs
    .into_iter()
    .map(|output| NodeMesh::from_output(output).triangle_count())
    .sum();
  assert!(triangles > 0);
}
