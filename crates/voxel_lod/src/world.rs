//! VoxelBody - per-body driver on the driving timeline.
//!
//! Each body owns its octree, its dispatch orchestrator and a command queue.
//! Multiple bodies can exist independently and share one compute backend.
//!
//! # Tick
//!
//! ```text
//!   1. commands    drain the queue (edits, toggles, regeneration)
//!   2. poll        deliver finished requests, install meshes
//!   3. select      visible set for the viewpoint, then 2:1 balance
//!   4. submit      generation if requested, mesh batch if under the cap
//! ```
//!
//! Results come back through callbacks that only send into the body's inbox,
//! so nothing on the compute side ever touches the tree.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use glam::Vec3;
use smallvec::SmallVec;
use web_time::Instant;

use crate::dispatch::{
  BatchResult, ComputeBackend, DispatchBatch, DispatchOrchestrator, LivenessToken, RequestHandle,
};
use crate::error::Result;
use crate::generator::{GeneratedField, GeneratorRequest};
use crate::metrics::{elapsed_us, BodyMetrics};
use crate::octree::{Aabb, Brush, Face, NodeId, Octree, TerrainConfig};
use crate::types::{HitPoint, NodeMesh, RenderNode};

// =============================================================================
// BodyId - unique identifier
// =============================================================================

/// Atomic counter for generating unique BodyIds.
static BODY_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Opaque body identifier.
///
/// Generated atomically - guaranteed unique within process lifetime.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct BodyId(u64);

impl BodyId {
  /// Generate a new unique BodyId.
  pub fn new() -> Self {
    Self(BODY_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
  }

  /// Get the raw ID value.
  pub fn raw(&self) -> u64 {
    self.0
  }
}

impl Default for BodyId {
  fn default() -> Self {
    Self::new()
  }
}

// =============================================================================
// Commands
// =============================================================================

/// Input consumed once per tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BodyCommand {
  /// Sculpt at a world-space position.
  Deform { position: Vec3, brush: Brush },
  /// When disabled the visible set stops following the viewpoint.
  SetLodEnabled(bool),
  SetDebugVisualization(bool),
  /// Regenerate the base field. Edits are kept.
  RegenerateBase,
}

/// Outline of one visible node for debug drawing.
#[derive(Clone, Debug, PartialEq)]
pub struct DebugBox {
  pub id: NodeId,
  pub bounds: Aabb,
  pub depth: u32,
  /// Faces carrying an enabled transition cell.
  pub transition_faces: SmallVec<[Face; 6]>,
}

/// What one tick did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickSummary {
  pub frame: u64,
  pub commands: usize,
  pub installed_meshes: usize,
  pub submitted_jobs: usize,
}

enum Delivery {
  Meshes(BatchResult),
  BaseField(GeneratedField),
}

// =============================================================================
// VoxelBody
// =============================================================================

/// A deformable voxel body driven one tick at a time.
pub struct VoxelBody {
  /// Unique body identifier.
  pub id: BodyId,
  tree: Octree,
  orchestrator: DispatchOrchestrator,
  /// Revokes every outstanding request when the body is dropped.
  token: LivenessToken,
  inbox_tx: Sender<Delivery>,
  inbox_rx: Receiver<Delivery>,
  commands: VecDeque<BodyCommand>,
  visible: Vec<NodeId>,
  /// Frame of the newest submission per node; older results are ignored.
  submitted: HashMap<NodeId, u64>,
  generation: Option<RequestHandle>,
  needs_generation: bool,
  has_base: bool,
  lod_enabled: bool,
  debug_visualization: bool,
  frame: u64,
  metrics: BodyMetrics,
}

impl VoxelBody {
  /// Build the static tree; the base field is generated on the first tick.
  ///
  /// Meshing waits until the generated field arrives.
  pub fn new(config: TerrainConfig, backend: Arc<dyn ComputeBackend>) -> Result<Self> {
    let tree = Octree::new(config)?;
    let mut body = Self::from_tree(tree, backend);
    body.needs_generation = true;
    body.has_base = false;
    Ok(body)
  }

  /// Drive an already populated tree.
  pub fn from_tree(tree: Octree, backend: Arc<dyn ComputeBackend>) -> Self {
    let (inbox_tx, inbox_rx) = crossbeam_channel::unbounded();
    Self {
      id: BodyId::new(),
      tree,
      orchestrator: DispatchOrchestrator::new(backend),
      token: LivenessToken::new(),
      inbox_tx,
      inbox_rx,
      commands: VecDeque::new(),
      visible: Vec::new(),
      submitted: HashMap::new(),
      generation: None,
      needs_generation: false,
      has_base: true,
      lod_enabled: true,
      debug_visualization: false,
      frame: 0,
      metrics: BodyMetrics::new(),
    }
  }

  pub fn tree(&self) -> &Octree {
    &self.tree
  }

  pub fn config(&self) -> &TerrainConfig {
    self.tree.config()
  }

  pub fn metrics(&self) -> &BodyMetrics {
    &self.metrics
  }

  pub fn frame(&self) -> u64 {
    self.frame
  }

  pub fn lod_enabled(&self) -> bool {
    self.lod_enabled
  }

  pub fn debug_visualization(&self) -> bool {
    self.debug_visualization
  }

  /// True once a base field is installed.
  pub fn has_base(&self) -> bool {
    self.has_base
  }

  pub fn pending_requests(&self) -> usize {
    self.orchestrator.pending_count()
  }

  /// Queue a command for the next tick.
  pub fn queue(&mut self, command: BodyCommand) {
    self.commands.push_back(command);
  }

  /// First surface hit along `start..end`.
  pub fn raycast(&self, start: Vec3, end: Vec3) -> Option<HitPoint> {
    self.tree.raycast_to_voxel_body(start, end)
  }

  // ===========================================================================
  // Tick
  // ===========================================================================

  /// Advance one frame for a viewer at `viewpoint`. Never blocks.
  #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "body::tick"))]
  pub fn tick(&mut self, viewpoint: Vec3) -> TickSummary {
    self.frame += 1;
    let commands = self.drain_commands();

    let poll = self.orchestrator.poll();
    self.metrics.record_poll(&poll);
    let installed_meshes = self.install_deliveries();

    if self.lod_enabled || self.visible.is_empty() {
      self.update_lod_set(viewpoint);
    }

    self.submit_generation();
    let submitted_jobs = self.submit_meshes();
    self.metrics.pending_requests = self.orchestrator.pending_count() as u32;

    TickSummary {
      frame: self.frame,
      commands,
      installed_meshes,
      submitted_jobs,
    }
  }

  fn drain_commands(&mut self) -> usize {
    let mut count = 0;
    while let Some(command) = self.commands.pop_front() {
      count += 1;
      match command {
        BodyCommand::Deform { position, brush } => {
          self.tree.apply_brush(position, &brush);
        }
        BodyCommand::SetLodEnabled(enabled) => self.lod_enabled = enabled,
        BodyCommand::SetDebugVisualization(enabled) => self.debug_visualization = enabled,
        BodyCommand::RegenerateBase => self.needs_generation = true,
      }
    }
    count
  }

  fn install_deliveries(&mut self) -> usize {
    let mut installed = 0;
    while let Ok(delivery) = self.inbox_rx.try_recv() {
      match delivery {
        Delivery::Meshes(result) => {
          let latency = self.frame.saturating_sub(result.frame);
          let mut degenerate = 0;
          for output in result.outputs {
            let newest = self.submitted.get(&output.node).copied().unwrap_or(0);
            if output.frame < newest {
              log::trace!("{:?}: ignoring mesh from frame {}", output.node, output.frame);
              continue;
            }
            let (node, signature) = (output.node, output.signature);
            let mesh = NodeMesh::from_output(output);
            degenerate += mesh.degenerate_dropped;
            self.tree.install_mesh(node, Arc::new(mesh), signature);
            installed += 1;
          }
          self.metrics.record_delivery(latency, degenerate);
        }
        Delivery::BaseField(field) => {
          self.generation = None;
          match self.tree.set_base_field(field.iso, field.types) {
            Ok(()) => self.has_base = true,
            Err(err) => log::warn!("body {:?}: generated field rejected: {}", self.id, err),
          }
        }
      }
    }
    installed
  }

  fn update_lod_set(&mut self, viewpoint: Vec3) {
    let start = Instant::now();
    let mut visible = self.tree.select_visible_nodes(viewpoint);
    self.metrics.record_select_timing(elapsed_us(start));

    let start = Instant::now();
    let stats = self.tree.balance_visible_nodes(&mut visible);
    self.metrics.record_balance(&stats, elapsed_us(start));
    self.metrics.record_lod_set(&self.tree, &visible);
    self.visible = visible;
  }

  fn submit_generation(&mut self) {
    if !self.needs_generation || self.generation.is_some() {
      return;
    }
    let config = self.tree.config();
    let request = GeneratorRequest {
      params: config.generator.clone(),
      voxels_per_axis: config.finest_voxels_per_axis(),
      scale: config.scale,
      iso_level: config.iso_level,
    };
    let tx = self.inbox_tx.clone();
    let submitted = self
      .orchestrator
      .submit_generation(request, self.token.probe(), move |field| {
        let _ = tx.send(Delivery::BaseField(field));
      });
    match submitted {
      Ok(handle) => {
        self.generation = Some(handle);
        self.needs_generation = false;
      }
      Err(err) => {
        log::debug!("body {:?}: generation not submitted: {}", self.id, err);
        self.metrics.record_dropped_submission();
      }
    }
  }

  fn submit_meshes(&mut self) -> usize {
    if !self.has_base || self.orchestrator.pending_count() >= self.tree.config().max_in_flight {
      return 0;
    }

    let in_flight = self.orchestrator.in_flight_nodes();
    let batch =
      DispatchBatch::build_excluding(&mut self.tree, &self.visible, self.frame, &in_flight);
    if batch.is_empty() {
      return 0;
    }

    let nodes: Vec<NodeId> = batch.nodes().collect();
    let tx = self.inbox_tx.clone();
    let submitted = self
      .orchestrator
      .submit_batch(batch, self.token.probe(), move |result| {
        let _ = tx.send(Delivery::Meshes(result));
      });
    match submitted {
      Ok(_) => {
        for id in &nodes {
          self.submitted.insert(*id, self.frame);
        }
        nodes.len()
      }
      Err(err) => {
        log::debug!("body {:?}: mesh batch not submitted: {}", self.id, err);
        // Snapshotting cleared the dirty flags; restore them so the edits
        // are picked up by the next submission.
        self.tree.mark_fields_dirty(&nodes);
        self.metrics.record_dropped_submission();
        0
      }
    }
  }

  // ===========================================================================
  // Renderer
  // ===========================================================================

  /// Visible nodes with their latest mesh, in selection order.
  pub fn current_lod_set(&self) -> Vec<RenderNode> {
    self
      .visible
      .iter()
      .map(|&id| {
        let node = self.tree.node(id);
        RenderNode {
          id,
          depth: node.depth,
          bounds: node.bounds,
          mesh: node.mesh().cloned(),
        }
      })
      .collect()
  }

  /// Node outlines and transition faces; empty unless debug drawing is on.
  pub fn debug_overlay(&self) -> Vec<DebugBox> {
    if !self.debug_visualization {
      return Vec::new();
    }
    self
      .visible
      .iter()
      .map(|&id| {
        let node = self.tree.node(id);
        DebugBox {
          id,
          bounds: node.bounds,
          depth: node.depth,
          transition_faces: node
            .transition_cells()
            .iter()
            .filter(|cell| cell.enabled)
            .map(|cell| cell.direction)
            .collect(),
        }
      })
      .collect()
  }
}

impl Drop for VoxelBody {
  fn drop(&mut self) {
    let pending = self.orchestrator.pending_count();
    if pending > 0 {
      log::debug!("body {:?} dropped with {} requests in flight", self.id, pending);
    }
    self.token.revoke();
  }
}

#[cfg(test)]
#[path = "world_test.rs"]
mod world_test;
