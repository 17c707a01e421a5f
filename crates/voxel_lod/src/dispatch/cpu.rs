//! CPU reference backend: every kernel on the rayon pool.

use smallvec::SmallVec;

use super::kernel::{ComputeBackend, KernelKind, NodeJob, NodeMeshOutput};
use super::readback::Readback;
use crate::error::{Result, VoxelError};
use crate::generator::{GeneratedField, GeneratorRequest, PlanetGenerator};
use crate::marching_cubes::{extract, stitch_face, FaceSkip, SampleGrid, StitchInput};
use crate::threading::TaskExecutor;

/// Runs kernels through a [`TaskExecutor`]. Kernels can be switched off to
/// exercise the unavailable-kernel path.
#[derive(Clone, Debug, Default)]
pub struct CpuComputeBackend {
  executor: TaskExecutor,
  disabled: SmallVec<[KernelKind; 5]>,
}

impl CpuComputeBackend {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_executor(executor: TaskExecutor) -> Self {
    Self {
      executor,
      disabled: SmallVec::new(),
    }
  }

  /// Report `kind` as unsupported.
  pub fn without_kernel(mut self, kind: KernelKind) -> Self {
    if !self.disabled.contains(&kind) {
      self.disabled.push(kind);
    }
    self
  }

  pub fn executor(&self) -> &TaskExecutor {
    &self.executor
  }

  fn require(&self, kinds: &[KernelKind]) -> Result<()> {
    match kinds.iter().find(|kind| !self.supports(**kind)) {
      Some(kind) => Err(VoxelError::ComputeKernelUnavailable(*kind)),
      None => Ok(()),
    }
  }
}

impl ComputeBackend for CpuComputeBackend {
  fn supports(&self, kind: KernelKind) -> bool {
    !self.disabled.contains(&kind)
  }

  fn generate_field(&self, request: GeneratorRequest) -> Result<Readback<GeneratedField>> {
    self.require(&KernelKind::GENERATION)?;
    Ok(self.executor.spawn(move || {
      // Generators are built on the worker; voronoi state is not shareable.
      PlanetGenerator::new(request.params.clone()).generate(&request)
    }))
  }

  fn extract_node(&self, job: NodeJob) -> Result<Readback<NodeMeshOutput>> {
    self.require(&job.required_kernels())?;
    Ok(self.executor.spawn(move || run_node_job(&job)))
  }
}

/// Deformation, marching cubes, then each stitch, on the calling thread.
#[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "cpu::node_job"))]
pub fn run_node_job(job: &NodeJob) -> NodeMeshOutput {
  let snapshot = &job.snapshot;
  let v = snapshot.field.voxels_per_axis();

  // Deformation: fold the delta layers into effective samples.
  let iso = snapshot.field.effective_iso();
  let types = snapshot.field.effective_types();

  let mut skip: FaceSkip = [false; 6];
  for transition in &job.transitions {
    skip[transition.face.index()] = true;
  }
  let grid = SampleGrid::cubic(&iso, &types, v, snapshot.origin, snapshot.voxel_size);
  let regular = extract(&grid, job.iso_level, skip);

  let transitions = job
    .transitions
    .iter()
    .map(|transition| {
      let input = StitchInput {
        face: transition.face,
        voxels_per_axis: v,
        origin: snapshot.origin,
        voxel_size: snapshot.voxel_size,
        coarse_iso: &iso,
        coarse_types: &types,
        partners: [
          &transition.partners[0].field,
          &transition.partners[1].field,
          &transition.partners[2].field,
          &transition.partners[3].field,
        ],
      };
      (transition.face, stitch_face(&input, job.iso_level))
    })
    .collect();

  NodeMeshOutput {
    node: snapshot.node,
    frame: job.frame,
    signature: job.signature,
    regular,
    transitions,
  }
}

#[cfg(test)]
#[path = "cpu_test.rs"]
mod cpu_test;
