//! Cross-platform threading abstraction using rayon.
//!
//! Uses `rayon::spawn` as the unified threading solution:
//! - Native: rayon's thread pool (std::thread based)
//! - wasm32-unknown-unknown: wasm-bindgen-rayon (Web Workers)
//! - wasm32-unknown-emscripten: rayon via pthreads (Web Workers)
//!
//! Results come back through a [`Readback`] region, so the caller polls
//! without ever blocking:
//!
//! ```ignore
//! let executor = TaskExecutor::new();
//! let mut region = executor.spawn(move || expensive_computation());
//!
//! // Each tick
//! if let Some(result) = region.take() {
//!     // Use result
//! }
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::dispatch::readback::{readback, Readback};

/// Fire-and-forget work submission on rayon's pool.
#[derive(Clone, Debug, Default)]
pub struct TaskExecutor {
  /// Tasks queued or running.
  in_flight: Arc<AtomicUsize>,
}

impl TaskExecutor {
  /// Create an executor on rayon's global pool.
  ///
  /// Use `rayon::ThreadPoolBuilder` before the first spawn to size the pool.
  pub fn new() -> Self {
    Self::default()
  }

  /// Spawn a task (non-blocking). The result lands in the returned region.
  pub fn spawn<F, T>(&self, work: F) -> Readback<T>
  where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
  {
    let (writer, region) = readback();
    let in_flight = Arc::clone(&self.in_flight);
    in_flight.fetch_add(1, Ordering::AcqRel);

    rayon::spawn(move || {
      let result = work();
      in_flight.fetch_sub(1, Ordering::AcqRel);
      writer.complete(result);
    });

    region
  }

  /// Number of worker threads in rayon's pool.
  pub fn num_threads(&self) -> usize {
    rayon::current_num_threads()
  }

  /// Number of tasks currently queued or running.
  pub fn pending_count(&self) -> usize {
    self.in_flight.load(Ordering::Acquire)
  }
}

// =============================================================================
// Tests
// =============================================================================
