//! voxel_lod - Deformable level-of-detail voxel bodies
//!
//! This crate maintains an octree of uniformly sampled scalar-field blocks
//! over a planet-like body, picks which blocks to show for a viewpoint, keeps
//! face-adjacent blocks within one level of each other, and feeds surface
//! extraction through an asynchronous compute/readback protocol.
//!
//! # Features
//!
//! - **Delta-field sculpting**: additive and subtractive brushes on a delta
//!   layer over a generated base field
//! - **2:1 Balancing**: depth mismatches fixed by subdivision, with
//!   transition cells recording where fine meets coarse
//! - **Dispatch Orchestration**: snapshot, submit, poll until ready, deliver
//!   exactly once, discard when the receiver is gone
//! - **CPU Reference Backend**: marching cubes and transition stitching on
//!   the rayon pool
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use voxel_lod::{BodyCommand, Brush, CpuComputeBackend, TerrainConfig, VoxelBody};
//!
//! let backend = Arc::new(CpuComputeBackend::new());
//! let mut body = VoxelBody::new(TerrainConfig::default(), backend)?;
//!
//! body.queue(BodyCommand::Deform {
//!     position: glam::Vec3::new(0.0, 150.0, 0.0),
//!     brush: Brush::subtractive(10.0, 0.5),
//! });
//! body.tick(camera_position);
//!
//! for node in body.current_lod_set() {
//!     println!("{:?} depth {} meshed {}", node.id, node.depth, node.mesh.is_some());
//! }
//! ```

pub mod constants;
pub mod edge_table;
pub mod error;
pub mod field;
pub mod types;

// Re-export commonly used items
pub use constants::{coord_to_index, index_to_coord, sample_count, samples_per_axis, AIR};
pub use error::{Result, VoxelError};
pub use field::ScalarField;
pub use types::{HitPoint, MeshBuffers, MeshHandle, NodeMesh, RawMeshBuffers, RenderNode};

// Marching cubes and transition stitching
pub mod marching_cubes;

// Octree: selection, balancing, deformation, raycast
pub mod octree;
pub use octree::{Aabb, BalanceStats, Brush, BrushMode, Face, NodeId, Octree, TerrainConfig};

// Compute dispatch and backends
pub mod dispatch;
pub use dispatch::{
  ComputeBackend, CpuComputeBackend, DispatchBatch, DispatchOrchestrator, KernelKind,
  LivenessToken, RequestHandle,
};

// Procedural base field
pub mod generator;
pub use generator::{GeneratorParams, PlanetGenerator, ORE};

// Cross-platform threading abstraction
pub mod threading;
pub use threading::TaskExecutor;

pub mod metrics;
pub use metrics::{BodyMetrics, RollingWindow};

// Per-body driver
pub mod world;
pub use world::{BodyCommand, BodyId, DebugBox, TickSummary, VoxelBody};
