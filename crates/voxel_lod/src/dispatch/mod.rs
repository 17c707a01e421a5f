//! Asynchronous compute dispatch.
//!
//! # Flow
//!
//! ```text
//! ┌───────────────┐  build   ┌───────────────┐  submit  ┌──────────────────┐
//! │ Octree        │ ───────▶ │ DispatchBatch │ ───────▶ │ ComputeBackend   │
//! │ visible nodes │          │ node jobs +   │          │ one readback     │
//! └───────────────┘          │ snapshots     │          │ region per job   │
//!                            └───────────────┘          └──────────────────┘
//!                                                                │
//!                            ┌───────────────┐   poll            │
//!                            │ callback      │ ◀─────────────────┘
//!                            │ (driver tick) │   all regions ready
//!                            └───────────────┘
//! ```
//!
//! The driving timeline owns the tree and the orchestrator. The compute
//! timeline only ever sees snapshots moved into jobs.

pub mod batch;
pub mod cpu;
pub mod kernel;
pub mod orchestrator;
pub mod readback;

#[cfg(test)]
pub(crate) mod test_utils;

pub use batch::DispatchBatch;
pub use cpu::{run_node_job, CpuComputeBackend};
pub use kernel::{
  ComputeBackend, FieldSnapshot, KernelKind, KernelSet, NodeJob, NodeMeshOutput, TransitionJob,
};
pub use orchestrator::{
  BatchResult, DispatchOrchestrator, LivenessProbe, LivenessToken, PollStats, RequestHandle,
  RequestState,
};
pub use readback::{readback, Readback, ReadbackWriter};
