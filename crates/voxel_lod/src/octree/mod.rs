//! Arena octree for a deformable voxel body.
//!
//! The tree owns a global scalar field at the finest resolution; every node
//! keeps a point-sampled copy of its region at its own resolution.
//!
//! # Depth Convention
//!
//! Depth 0 = root (coarsest), `max_depth` = finest.
//!
//! ```text
//! Node Size  = scale / 2^depth
//! Voxel Size = scale / (voxels_per_axis * 2^depth)
//! ```
//!
//! # Module Structure
//!
//! - [`bounds`]: `Aabb` - box math, face contact, segment clipping
//! - [`config`]: `TerrainConfig` - construction parameters and coordinate math
//! - [`node`]: `OctreeNode`, `NodeId`, `Face` - arena records
//! - [`transition`]: `TransitionCell` - seam bookkeeping per face
//! - [`tree`]: `Octree` - construction, neighbour wiring, node resampling
//! - [`deformation`]: brush edits on the delta layer
//! - [`raycast`]: segment hit-testing against the surface
//! - [`selection`]: distance-based visible set
//! - [`balance`]: 2:1 adjacency invariant and transition cells

pub mod balance;
pub mod bounds;
pub mod config;
pub mod deformation;
pub mod node;
pub mod raycast;
pub mod selection;
pub mod transition;
pub mod tree;

// Re-exports
pub use balance::{adjacency_index, are_adjacent, BalanceStats};
pub use bounds::Aabb;
pub use config::TerrainConfig;
pub use deformation::{Brush, BrushMode};
pub use node::{Face, NodeId, OctreeNode};
pub use transition::TransitionCell;
pub use tree::Octree;
