use std::sync::atomic::AtomicUsize;

use super::*;
use crate::dispatch::test_utils::ManualBackend;
use crate::generator::GeneratorParams;
use crate::octree::{Octree, TerrainConfig};

fn tree_and_nodes() -> (Octree, Vec<NodeId>) {
  let config = TerrainConfig::default()
    .with_scale(8.0)
    .with_voxels_per_axis(2)
    .with_max_depth(1)
    .with_base_lod_distance(8.0);
  let tree = Octree::new(config).unwrap();
  let visible = tree.node(tree.root()).children().unwrap().to_vec();
  (tree, visible)
}

fn batch() -> DispatchBatch {
  let (mut tree, visible) = tree_and_nodes();
  DispatchBatch::build(&mut tree, &visible, 5)
}

fn setup(backend: ManualBackend) -> (Arc<ManualBackend>, DispatchOrchestrator) {
  let backend = Arc::new(backend);
  let orchestrator = DispatchOrchestrator::new(backend.clone());
  (backend, orchestrator)
}

/// Counts callback invocations and records the delivered output count.
fn counter() -> (Arc<AtomicUsize>, Arc<AtomicUsize>) {
  (Arc::new(AtomicUsize::new(0)), Arc::new(AtomicUsize::new(0)))
}

// =========================================================================
// Batch 1: Delivery
// =========================================================================

#[test]
fn test_delivers_exactly_once() {
  let (backend, mut orchestrator) = setup(ManualBackend::new());
  let token = LivenessToken::new();
  let (calls, outputs) = counter();
  let (c, o) = (calls.clone(), outputs.clone());
  let handle = orchestrator
    .submit_batch(batch(), token.probe(), move |result| {
      assert_eq!(result.frame, 5);
      c.fetch_add(1, Ordering::SeqCst);
      o.store(result.outputs.len(), Ordering::SeqCst);
    })
    .unwrap();
  assert_eq!(orchestrator.state(handle), Some(RequestState::Submitted));
  assert_eq!(backend.submitted_jobs(), 8);

  let stats = orchestrator.poll();
  assert_eq!(stats.delivered, 0);
  assert_eq!(stats.pending, 1);
  assert_eq!(orchestrator.state(handle), Some(RequestState::Polling));

  assert_eq!(backend.complete_all(), 8);
  let stats = orchestrator.poll();
  assert_eq!(stats.delivered, 1);
  assert_eq!(stats.pending, 0);
  assert_eq!(calls.load(Ordering::SeqCst), 1);
  assert_eq!(outputs.load(Ordering::SeqCst), 8);
  assert_eq!(orchestrator.state(handle), Some(RequestState::Delivered));

  for _ in 0..3 {
    assert_eq!(orchestrator.poll(), PollStats::default());
  }
  assert_eq!(calls.load(Ordering::SeqCst), 1);
}

/// Seven of eight regions ready is still pending.
#[test]
fn test_partial_readiness_does_not_deliver() {
  let (backend, mut orchestrator) = setup(ManualBackend::new());
  let token = LivenessToken::new();
  let (calls, _) = counter();
  let c = calls.clone();
  let handle = orchestrator
    .submit_batch(batch(), token.probe(), move |_| {
      c.fetch_add(1, Ordering::SeqCst);
    })
    .unwrap();

  for _ in 0..7 {
    assert!(backend.complete_next());
  }
  for _ in 0..4 {
    let stats = orchestrator.poll();
    assert_eq!(stats.delivered, 0);
    assert_eq!(stats.pending, 1);
  }
  assert_eq!(orchestrator.state(handle), Some(RequestState::Polling));
  assert_eq!(calls.load(Ordering::SeqCst), 0);

  backend.complete_next();
  assert_eq!(orchestrator.poll().delivered, 1);
  assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_outputs_follow_job_order() {
  let (backend, mut orchestrator) = setup(ManualBackend::new());
  let token = LivenessToken::new();
  let batch = batch();
  let expected: Vec<NodeId> = batch.nodes().collect();
  let (tx, rx) = crossbeam_channel::unbounded();
  orchestrator
    .submit_batch(batch, token.probe(), move |result| {
      let order: Vec<NodeId> = result.outputs.iter().map(|o| o.node).collect();
      tx.send(order).unwrap();
    })
    .unwrap();
  backend.complete_all();
  orchestrator.poll();
  assert_eq!(rx.try_recv().unwrap(), expected);
}

// =========================================================================
// Batch 2: Liveness
// =========================================================================

#[test]
fn test_dropped_token_discards_result() {
  let (backend, mut orchestrator) = setup(ManualBackend::new());
  let token = LivenessToken::new();
  let (calls, _) = counter();
  let c = calls.clone();
  let handle = orchestrator
    .submit_batch(batch(), token.probe(), move |_| {
      c.fetch_add(1, Ordering::SeqCst);
    })
    .unwrap();
  drop(token);

  backend.complete_all();
  let stats = orchestrator.poll();
  assert_eq!(stats.discarded, 1);
  assert_eq!(stats.delivered, 0);
  assert_eq!(calls.load(Ordering::SeqCst), 0);
  assert_eq!(orchestrator.state(handle), Some(RequestState::Delivered));
  assert_eq!(orchestrator.pending_count(), 0);
}

#[test]
fn test_revoked_token_kills_probes() {
  let token = LivenessToken::new();
  let probe = token.probe();
  assert!(probe.is_alive());
  token.revoke();
  assert!(!probe.is_alive());
  assert!(!token.is_alive());
}

// =========================================================================
// Batch 3: Unavailable kernels
// =========================================================================

#[test]
fn test_unavailable_kernel_queues_nothing() {
  let (backend, mut orchestrator) = setup(ManualBackend::without(KernelKind::MarchingCubes));
  let token = LivenessToken::new();
  let err = orchestrator
    .submit_batch(batch(), token.probe(), |_| panic!("must not deliver"))
    .unwrap_err();
  assert_eq!(err, VoxelError::ComputeKernelUnavailable(KernelKind::MarchingCubes));
  assert_eq!(backend.submitted_jobs(), 0);
  assert_eq!(orchestrator.pending_count(), 0);
  assert_eq!(orchestrator.poll(), PollStats::default());
}

/// A batch without stitches does not need the stitch kernel.
#[test]
fn test_stitch_kernel_only_needed_for_stitches() {
  let (_, mut orchestrator) = setup(ManualBackend::without(KernelKind::TransvoxelStitch));
  let token = LivenessToken::new();
  let batch = batch();
  assert!(!batch.has_stitches());
  assert!(orchestrator.submit_batch(batch, token.probe(), |_| {}).is_ok());
}

// =========================================================================
// Batch 4: Generation and bookkeeping
// =========================================================================

#[test]
fn test_generation_is_a_single_region() {
  let (backend, mut orchestrator) = setup(ManualBackend::new());
  let token = LivenessToken::new();
  let (tx, rx) = crossbeam_channel::unbounded();
  let request = GeneratorRequest {
    params: GeneratorParams::default(),
    voxels_per_axis: 1,
    scale: 2.0,
    iso_level: 0.5,
  };
  orchestrator
    .submit_generation(request, token.probe(), move |field| tx.send(field).unwrap())
    .unwrap();
  assert_eq!(orchestrator.poll().pending, 1);

  let field = GeneratedField {
    iso: vec![1.0; 8],
    types: vec![2; 8],
  };
  assert!(backend.complete_generation(field.clone()));
  assert_eq!(orchestrator.poll().delivered, 1);
  assert_eq!(rx.try_recv().unwrap(), field);
}

#[test]
fn test_generation_needs_both_kernels() {
  let (_, mut orchestrator) = setup(ManualBackend::without(KernelKind::BiomeClassification));
  let token = LivenessToken::new();
  let request = GeneratorRequest {
    params: GeneratorParams::default(),
    voxels_per_axis: 1,
    scale: 2.0,
    iso_level: 0.5,
  };
  let err = orchestrator
    .submit_generation(request, token.probe(), |_| {})
    .unwrap_err();
  assert_eq!(
    err,
    VoxelError::ComputeKernelUnavailable(KernelKind::BiomeClassification)
  );
}

#[test]
fn test_unknown_handle_has_no_state() {
  let (_, orchestrator) = setup(ManualBackend::new());
  assert_eq!(orchestrator.state(RequestHandle(3)), None);
}

#[test]
fn test_in_flight_nodes_until_delivery() {
  let (backend, mut orchestrator) = setup(ManualBackend::new());
  let token = LivenessToken::new();
  let batch = batch();
  let nodes: HashSet<NodeId> = batch.nodes().collect();
  orchestrator.submit_batch(batch, token.probe(), |_| {}).unwrap();
  assert_eq!(orchestrator.in_flight_nodes(), nodes);

  backend.complete_all();
  orchestrator.poll();
  assert!(orchestrator.in_flight_nodes().is_empty());
}
