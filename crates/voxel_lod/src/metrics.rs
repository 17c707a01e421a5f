//! Engine-agnostic statistics for a voxel body.
//!
//! # Usage
//!
//! ```ignore
//! let start = web_time::Instant::now();
//! let mut visible = tree.select_visible_nodes(viewpoint);
//! metrics.record_select_timing(elapsed_us(start));
//!
//! let stats = tree.balance_visible_nodes(&mut visible);
//! metrics.record_balance(&stats, elapsed_us(start));
//! ```

use std::collections::VecDeque;

use web_time::Instant;

use crate::constants::MAX_SUPPORTED_DEPTH;
use crate::dispatch::PollStats;
use crate::octree::{BalanceStats, NodeId, Octree};

/// Microseconds since `start`.
#[inline]
pub fn elapsed_us(start: Instant) -> u64 {
  start.elapsed().as_micros() as u64
}

/// Rolling window for storing recent values (e.g., timing history).
#[derive(Debug, Clone)]
pub struct RollingWindow<T> {
  buffer: VecDeque<T>,
  capacity: usize,
}

impl<T> RollingWindow<T> {
  /// Create a new rolling window with the given capacity.
  pub fn new(capacity: usize) -> Self {
    Self {
      buffer: VecDeque::with_capacity(capacity),
      capacity: capacity.max(1),
    }
  }

  /// Push a new value, evicting the oldest if at capacity.
  pub fn push(&mut self, value: T) {
    if self.buffer.len() >= self.capacity {
      self.buffer.pop_front();
    }
    self.buffer.push_back(value);
  }

  pub fn len(&self) -> usize {
    self.buffer.len()
  }

  pub fn is_empty(&self) -> bool {
    self.buffer.is_empty()
  }

  pub fn clear(&mut self) {
    self.buffer.clear();
  }

  /// Iterate over values (oldest to newest).
  pub fn iter(&self) -> impl Iterator<Item = &T> {
    self.buffer.iter()
  }

  /// Get the most recent value.
  pub fn last(&self) -> Option<&T> {
    self.buffer.back()
  }
}

impl<T: Copy + Default + std::ops::Add<Output = T>> RollingWindow<T> {
  /// Compute the sum of all values.
  pub fn sum(&self) -> T {
    self.buffer.iter().copied().fold(T::default(), |acc, x| acc + x)
  }
}

impl RollingWindow<u64> {
  /// Compute the average of all values.
  pub fn average(&self) -> f64 {
    if self.buffer.is_empty() {
      0.0
    } else {
      self.sum() as f64 / self.buffer.len() as f64
    }
  }

  /// Get min and max values.
  pub fn min_max(&self) -> Option<(u64, u64)> {
    let min = *self.buffer.iter().min()?;
    let max = *self.buffer.iter().max()?;
    Some((min, max))
  }
}

impl Default for RollingWindow<u64> {
  fn default() -> Self {
    Self::new(128) // ~2 seconds of ticks at 60fps
  }
}

const DEPTH_SLOTS: usize = MAX_SUPPORTED_DEPTH as usize + 1;

/// Per-body statistics, updated by the driver each tick.
#[derive(Debug, Clone, Default)]
pub struct BodyMetrics {
  // LOD set
  /// Number of currently visible nodes.
  pub visible_nodes: u32,
  /// Visible nodes at each depth (index = depth).
  pub nodes_per_depth: [u32; DEPTH_SLOTS],

  // Balancing
  pub transition_cells: u32,
  pub incomplete_cells: u32,
  pub rebalanced_nodes: u32,

  // Dispatch
  pub pending_requests: u32,
  /// Batches handed to their callback this session.
  pub delivered: u64,
  /// Results discarded because their receiver was gone.
  pub stale: u64,
  /// Submissions rejected by the backend.
  pub dropped_submissions: u64,
  /// Triangles removed while consuming kernel output.
  pub degenerate_triangles: u64,
  /// Ticks between building a batch and installing its meshes.
  pub delivery_latency_ticks: RollingWindow<u64>,

  // Timing
  pub select_timings: RollingWindow<u64>,
  pub balance_timings: RollingWindow<u64>,
  pub last_select_us: u64,
  pub last_balance_us: u64,
}

impl BodyMetrics {
  pub fn new() -> Self {
    Self::default()
  }

  /// Reset per-tick values. Session counters are kept.
  pub fn reset(&mut self) {
    self.visible_nodes = 0;
    self.nodes_per_depth.fill(0);
    self.transition_cells = 0;
    self.incomplete_cells = 0;
    self.rebalanced_nodes = 0;
    self.pending_requests = 0;
    self.delivery_latency_ticks.clear();
    self.select_timings.clear();
    self.balance_timings.clear();
    self.last_select_us = 0;
    self.last_balance_us = 0;
  }

  /// Histogram of the visible set.
  pub fn record_lod_set(&mut self, tree: &Octree, visible: &[NodeId]) {
    self.nodes_per_depth.fill(0);
    for id in visible {
      let depth = (tree.node(*id).depth as usize).min(DEPTH_SLOTS - 1);
      self.nodes_per_depth[depth] += 1;
    }
    self.visible_nodes = visible.len() as u32;
  }

  pub fn record_select_timing(&mut self, timing_us: u64) {
    self.select_timings.push(timing_us);
    self.last_select_us = timing_us;
  }

  pub fn record_balance(&mut self, stats: &BalanceStats, timing_us: u64) {
    self.transition_cells = stats.transition_cells as u32;
    self.incomplete_cells = stats.incomplete_cells as u32;
    self.rebalanced_nodes = stats.rebalanced_nodes as u32;
    self.balance_timings.push(timing_us);
    self.last_balance_us = timing_us;
  }

  pub fn record_poll(&mut self, stats: &PollStats) {
    self.delivered += stats.delivered as u64;
    self.stale += stats.discarded as u64;
    self.pending_requests = stats.pending as u32;
  }

  pub fn record_dropped_submission(&mut self) {
    self.dropped_submissions += 1;
  }

  /// One installed batch: its age in ticks and the triangles it lost.
  pub fn record_delivery(&mut self, latency_ticks: u64, degenerate: usize) {
    self.delivery_latency_ticks.push(latency_ticks);
    self.degenerate_triangles += degenerate as u64;
  }

  /// Deepest depth with a visible node.
  pub fn deepest_visible(&self) -> Option<usize> {
    self.nodes_per_depth.iter().rposition(|count| *count > 0)
  }
}
