//! Test backend whose readback regions are completed by hand.

use std::sync::Mutex;

use super::kernel::{ComputeBackend, KernelKind, NodeJob, NodeMeshOutput};
use super::readback::{readback, Readback, ReadbackWriter};
use crate::error::{Result, VoxelError};
use crate::generator::{GeneratedField, GeneratorRequest};

/// Records every submission and keeps the writers for the test to complete.
#[derive(Default)]
pub struct ManualBackend {
  pub disabled: Vec<KernelKind>,
  pub node_writers: Mutex<Vec<(NodeJob, ReadbackWriter<NodeMeshOutput>)>>,
  pub field_writers: Mutex<Vec<(GeneratorRequest, ReadbackWriter<GeneratedField>)>>,
}

impl ManualBackend {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn without(kind: KernelKind) -> Self {
    Self {
      disabled: vec![kind],
      ..Self::default()
    }
  }

  pub fn submitted_jobs(&self) -> usize {
    self.node_writers.lock().unwrap().len()
  }

  /// Complete the oldest outstanding node job with an empty mesh.
  pub fn complete_next(&self) -> bool {
    let mut writers = self.node_writers.lock().unwrap();
    if writers.is_empty() {
      return false;
    }
    let (job, writer) = writers.remove(0);
    writer.complete(empty_output(&job));
    true
  }

  /// Complete every outstanding node job with an empty mesh.
  pub fn complete_all(&self) -> usize {
    let mut count = 0;
    while self.complete_next() {
      count += 1;
    }
    count
  }

  /// Complete the `count` most recently submitted node jobs, newest first.
  pub fn complete_latest(&self, count: usize) -> usize {
    let mut writers = self.node_writers.lock().unwrap();
    let mut completed = 0;
    while completed < count {
      let Some((job, writer)) = writers.pop() else {
        break;
      };
      writer.complete(empty_output(&job));
      completed += 1;
    }
    completed
  }

  pub fn complete_generation(&self, field: GeneratedField) -> bool {
    let mut writers = self.field_writers.lock().unwrap();
    if writers.is_empty() {
      return false;
    }
    let (_, writer) = writers.remove(0);
    writer.complete(field);
    true
  }
}

pub fn empty_output(job: &NodeJob) -> NodeMeshOutput {
  NodeMeshOutput {
    node: job.node(),
    frame: job.frame,
    signature: job.signature,
    regular: Default::default(),
    transitions: job
      .transitions
      .iter()
      .map(|t| (t.face, Default::default()))
      .collect(),
  }
}

impl ComputeBackend for ManualBackend {
  fn supports(&self, kind: KernelKind) -> bool {
    !self.disabled.contains(&kind)
  }

  fn generate_field(&self, request: GeneratorRequest) -> Result<Readback<GeneratedField>> {
    if let Some(kind) = KernelKind::GENERATION.into_iter().find(|k| !self.supports(*k)) {
      return Err(VoxelError::ComputeKernelUnavailable(kind));
    }
    let (writer, region) = readback();
    self.field_writers.lock().unwrap().push((request, writer));
    Ok(region)
  }

  fn extract_node(&self, job: NodeJob) -> Result<Readback<NodeMeshOutput>> {
    let (writer, region) = readback();
    self.node_writers.lock().unwrap().push((job, writer));
    Ok(region)
  }
}
