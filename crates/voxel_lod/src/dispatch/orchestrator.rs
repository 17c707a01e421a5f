//! Request lifecycle: submit, poll until ready, deliver exactly once.
//!
//! ```text
//!   submit ─▶ Submitted ─poll─▶ Polling ─all regions ready─▶ Ready
//!                                ▲   │                         │
//!                                └───┘ some pending            ▼
//!                                              probe alive ─▶ Delivered
//!                                              probe dead  ─▶ discarded
//! ```
//!
//! A request whose regions never complete stays in Polling, and its regions
//! stay reserved.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use super::batch::DispatchBatch;
use super::kernel::{ComputeBackend, KernelKind, NodeMeshOutput};
use super::readback::Readback;
use crate::error::{Result, VoxelError};
use crate::generator::{GeneratedField, GeneratorRequest};
use crate::octree::NodeId;

/// Identifies one submission.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct RequestHandle(u64);

impl RequestHandle {
  pub fn raw(self) -> u64 {
    self.0
  }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RequestState {
  Submitted,
  Polling,
  Ready,
  /// Handed to its callback or discarded; no longer tracked.
  Delivered,
}

// =============================================================================
// Liveness
// =============================================================================

/// Held by the receiver of results. Dropping it revokes every probe.
#[derive(Debug)]
pub struct LivenessToken {
  alive: Arc<AtomicBool>,
}

impl LivenessToken {
  pub fn new() -> Self {
    Self {
      alive: Arc::new(AtomicBool::new(true)),
    }
  }

  pub fn probe(&self) -> LivenessProbe {
    LivenessProbe {
      alive: Arc::downgrade(&self.alive),
    }
  }

  pub fn revoke(&self) {
    self.alive.store(false, Ordering::Release);
  }

  pub fn is_alive(&self) -> bool {
    self.alive.load(Ordering::Acquire)
  }
}

impl Default for LivenessToken {
  fn default() -> Self {
    Self::new()
  }
}

impl Drop for LivenessToken {
  fn drop(&mut self) {
    self.revoke();
  }
}

/// Carried by a request; checked right before delivery.
#[derive(Clone, Debug)]
pub struct LivenessProbe {
  alive: Weak<AtomicBool>,
}

impl LivenessProbe {
  pub fn is_alive(&self) -> bool {
    self
      .alive
      .upgrade()
      .is_some_and(|alive| alive.load(Ordering::Acquire))
  }
}

// =============================================================================
// Pending work
// =============================================================================

/// Results of one batch, in job order.
#[derive(Debug)]
pub struct BatchResult {
  pub frame: u64,
  pub outputs: Vec<NodeMeshOutput>,
}

type Callback<T> = Box<dyn FnOnce(Vec<T>) + Send>;

trait PendingWork: Send {
  /// (ready regions, total regions)
  fn readiness(&mut self) -> (usize, usize);
  fn deliver(&mut self);
  fn discard(&mut self);
}

struct Request<T> {
  regions: Vec<Readback<T>>,
  callback: Option<Callback<T>>,
}

impl<T: Send> PendingWork for Request<T> {
  fn readiness(&mut self) -> (usize, usize) {
    let ready = self.regions.iter_mut().map(|r| usize::from(r.is_ready())).sum();
    (ready, self.regions.len())
  }

  fn deliver(&mut self) {
    let values: Vec<T> = self.regions.iter_mut().filter_map(Readback::take).collect();
    if let Some(callback) = self.callback.take() {
      callback(values);
    }
  }

  fn discard(&mut self) {
    for region in &mut self.regions {
      drop(region.take());
    }
    self.callback = None;
  }
}

struct Entry {
  state: RequestState,
  probe: LivenessProbe,
  nodes: Vec<NodeId>,
  work: Box<dyn PendingWork>,
}

/// Counts from one [`DispatchOrchestrator::poll`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PollStats {
  pub delivered: usize,
  pub discarded: usize,
  pub pending: usize,
}

// =============================================================================
// Orchestrator
// =============================================================================

/// Owns in-flight requests on the driving timeline.
pub struct DispatchOrchestrator {
  backend: Arc<dyn ComputeBackend>,
  pending: BTreeMap<RequestHandle, Entry>,
  next_handle: u64,
}

impl DispatchOrchestrator {
  pub fn new(backend: Arc<dyn ComputeBackend>) -> Self {
    Self {
      backend,
      pending: BTreeMap::new(),
      next_handle: 0,
    }
  }

  pub fn backend(&self) -> &Arc<dyn ComputeBackend> {
    &self.backend
  }

  fn check_kernels(&self, kinds: &[KernelKind]) -> Result<()> {
    match kinds.iter().find(|kind| !self.backend.supports(**kind)) {
      Some(kind) => {
        let err = VoxelError::ComputeKernelUnavailable(*kind);
        log::warn!("submission dropped: {}", err);
        Err(err)
      }
      None => Ok(()),
    }
  }

  fn enqueue(
    &mut self,
    probe: LivenessProbe,
    nodes: Vec<NodeId>,
    work: Box<dyn PendingWork>,
  ) -> RequestHandle {
    let handle = RequestHandle(self.next_handle);
    self.next_handle += 1;
    self.pending.insert(
      handle,
      Entry {
        state: RequestState::Submitted,
        probe,
        nodes,
        work,
      },
    );
    handle
  }

  /// Submit one readback region per node job.
  ///
  /// Nothing is queued when the backend lacks a kernel the batch needs.
  #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "dispatch::submit"))]
  pub fn submit_batch<F>(
    &mut self,
    batch: DispatchBatch,
    probe: LivenessProbe,
    on_done: F,
  ) -> Result<RequestHandle>
  where
    F: FnOnce(BatchResult) + Send + 'static,
  {
    self.check_kernels(&batch.required_kernels())?;

    let frame = batch.frame;
    let nodes: Vec<NodeId> = batch.nodes().collect();
    let mut regions = Vec::with_capacity(batch.jobs.len());
    for job in batch.jobs {
      regions.push(self.backend.extract_node(job)?);
    }

    let callback: Callback<NodeMeshOutput> =
      Box::new(move |outputs| on_done(BatchResult { frame, outputs }));
    let work = Request {
      regions,
      callback: Some(callback),
    };
    let handle = self.enqueue(probe, nodes, Box::new(work));
    log::trace!("submitted {:?} for frame {}", handle, frame);
    Ok(handle)
  }

  /// Submit a whole-body generation as a single region.
  pub fn submit_generation<F>(
    &mut self,
    request: GeneratorRequest,
    probe: LivenessProbe,
    on_done: F,
  ) -> Result<RequestHandle>
  where
    F: FnOnce(GeneratedField) + Send + 'static,
  {
    self.check_kernels(&KernelKind::GENERATION)?;
    let region = self.backend.generate_field(request)?;

    let callback: Callback<GeneratedField> = Box::new(move |mut fields| {
      on_done(fields.pop().unwrap_or_default());
    });
    let work = Request {
      regions: vec![region],
      callback: Some(callback),
    };
    Ok(self.enqueue(probe, Vec::new(), Box::new(work)))
  }

  /// Advance every request. Never blocks.
  ///
  /// Callbacks run here, on the caller's thread.
  #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "dispatch::poll"))]
  pub fn poll(&mut self) -> PollStats {
    let mut stats = PollStats::default();
    let mut finished = Vec::new();

    for (handle, entry) in self.pending.iter_mut() {
      if entry.state == RequestState::Submitted {
        entry.state = RequestState::Polling;
      }
      let (ready, total) = entry.work.readiness();
      if ready < total {
        log::trace!("{:?}: {}/{} regions ready", handle, ready, total);
        continue;
      }

      entry.state = RequestState::Ready;
      if entry.probe.is_alive() {
        entry.work.deliver();
        stats.delivered += 1;
      } else {
        log::debug!("{}", VoxelError::StaleCallback(*handle));
        entry.work.discard();
        stats.discarded += 1;
      }
      entry.state = RequestState::Delivered;
      finished.push(*handle);
    }

    for handle in finished {
      self.pending.remove(&handle);
    }
    stats.pending = self.pending.len();
    stats
  }

  /// `None` for a handle this orchestrator never issued.
  pub fn state(&self, handle: RequestHandle) -> Option<RequestState> {
    match self.pending.get(&handle) {
      Some(entry) => Some(entry.state),
      None if handle.0 < self.next_handle => Some(RequestState::Delivered),
      None => None,
    }
  }

  pub fn pending_count(&self) -> usize {
    self.pending.len()
  }

  /// Nodes with a mesh request still outstanding.
  pub fn in_flight_nodes(&self) -> HashSet<NodeId> {
    self
      .pending
      .values()
      .flat_map(|entry| entry.nodes.iter().copied())
      .collect()
  }
}

#[cfg(test)]
#[path = "orchestrator_test.rs"]
mod orchestrator_test;
