//! Compute collaborator contract: kernel kinds, job descriptors, outputs.

use std::sync::Arc;

use glam::Vec3;
use smallvec::SmallVec;

use super::readback::Readback;
use crate::error::Result;
use crate::field::ScalarField;
use crate::generator::{GeneratedField, GeneratorRequest};
use crate::octree::{Face, NodeId};
use crate::types::RawMeshBuffers;

/// Kernels a backend may provide.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum KernelKind {
  NoiseGeneration,
  BiomeClassification,
  Deformation,
  MarchingCubes,
  TransvoxelStitch,
}

impl KernelKind {
  pub const ALL: [KernelKind; 5] = [
    KernelKind::NoiseGeneration,
    KernelKind::BiomeClassification,
    KernelKind::Deformation,
    KernelKind::MarchingCubes,
    KernelKind::TransvoxelStitch,
  ];

  /// Kernels a generation request runs, in order.
  pub const GENERATION: [KernelKind; 2] = [
    KernelKind::NoiseGeneration,
    KernelKind::BiomeClassification,
  ];
}

/// Kernels needed by a set of jobs.
pub type KernelSet = SmallVec<[KernelKind; 3]>;

/// A node's field copied out of the tree at submission time.
#[derive(Clone, Debug)]
pub struct FieldSnapshot {
  pub node: NodeId,
  pub depth: u32,
  /// World position of sample (0, 0, 0).
  pub origin: Vec3,
  pub voxel_size: f32,
  pub field: ScalarField,
}

/// One transition slab: the coarse node's face plus its four partners.
#[derive(Clone, Debug)]
pub struct TransitionJob {
  pub face: Face,
  /// Partner snapshots in quadrant order.
  pub partners: [Arc<FieldSnapshot>; 4],
}

/// Work for one visible node: deformation, marching cubes, then stitches.
#[derive(Clone, Debug)]
pub struct NodeJob {
  pub snapshot: Arc<FieldSnapshot>,
  pub iso_level: f32,
  pub transitions: SmallVec<[TransitionJob; 6]>,
  /// Driver tick the job was built on.
  pub frame: u64,
  /// Transition layout the mesh is built for.
  pub signature: u64,
}

impl NodeJob {
  #[inline]
  pub fn node(&self) -> NodeId {
    self.snapshot.node
  }

  /// Kernels this job runs, in execution order.
  pub fn required_kernels(&self) -> KernelSet {
    let mut kinds: KernelSet = SmallVec::new();
    kinds.push(KernelKind::Deformation);
    kinds.push(KernelKind::MarchingCubes);
    if !self.transitions.is_empty() {
      kinds.push(KernelKind::TransvoxelStitch);
    }
    kinds
  }
}

/// Raw kernel output for one node.
#[derive(Clone, Debug)]
pub struct NodeMeshOutput {
  pub node: NodeId,
  pub frame: u64,
  pub signature: u64,
  pub regular: RawMeshBuffers,
  pub transitions: SmallVec<[(Face, RawMeshBuffers); 6]>,
}

/// Executes kernels off the driving timeline.
///
/// Each call returns a readback region that the backend completes once the
/// work is done. Calls must not block on the work itself.
pub trait ComputeBackend: Send + Sync {
  fn supports(&self, kind: KernelKind) -> bool;

  /// Noise then biome classification over the whole body.
  fn generate_field(&self, request: GeneratorRequest) -> Result<Readback<GeneratedField>>;

  /// Deformation, marching cubes, then one stitch per transition job.
  fn extract_node(&self, job: NodeJob) -> Result<Readback<NodeMeshOutput>>;
}
