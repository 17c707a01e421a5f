//! Readback regions: one value written once by compute, polled by the driver.
//!
//! ```text
//!   compute timeline                driving timeline
//!   ReadbackWriter::complete(v) ──▶ [ bounded(1) ] ──▶ Readback::is_ready()
//!                                                       Readback::take()
//! ```
//!
//! Dropping the writer without completing leaves the region pending forever.

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};

/// Create a connected writer/reader pair.
pub fn readback<T>() -> (ReadbackWriter<T>, Readback<T>) {
  let (tx, rx) = bounded(1);
  (
    ReadbackWriter { tx },
    Readback {
      rx,
      slot: None,
      taken: false,
    },
  )
}

/// Compute-side half. Consumed by `complete`, so a region is written once.
#[derive(Debug)]
pub struct ReadbackWriter<T> {
  tx: Sender<T>,
}

impl<T> ReadbackWriter<T> {
  /// Publish the value. A reader that was already dropped is ignored.
  pub fn complete(self, value: T) {
    let _ = self.tx.try_send(value);
  }
}

/// Driver-side half.
#[derive(Debug)]
pub struct Readback<T> {
  rx: Receiver<T>,
  slot: Option<T>,
  taken: bool,
}

impl<T> Readback<T> {
  /// Non-blocking readiness check. Moves an arrived value into the slot.
  pub fn is_ready(&mut self) -> bool {
    if self.taken {
      return false;
    }
    if self.slot.is_none() {
      match self.rx.try_recv() {
        Ok(value) => self.slot = Some(value),
        Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => {}
      }
    }
    self.slot.is_some()
  }

  /// Take the value. Returns `Some` at most once.
  pub fn take(&mut self) -> Option<T> {
    if !self.is_ready() {
      return None;
    }
    self.taken = true;
    self.slot.take()
  }

  /// True once the value has been taken.
  pub fn is_taken(&self) -> bool {
    self.taken
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_pending_until_completed() {
    let (writer, mut reader) = readback::<u32>();
    assert!(!reader.is_ready());
    assert_eq!(reader.take(), None);
    writer.complete(7);
    assert!(reader.is_ready());
    assert!(reader.is_ready());
    assert_eq!(reader.take(), Some(7));
  }

  #[test]
  fn test_take_is_single_shot() {
    let (writer, mut reader) = readback::<&str>();
    writer.complete("mesh");
    assert_eq!(reader.take(), Some("mesh"));
    assert!(reader.is_taken());
    assert!(!reader.is_ready());
    assert_eq!(reader.take(), None);
  }

  /// A writer dropped without completing never makes the region ready.
  #[test]
  fn test_dropped_writer_stays_pending() {
    let (writer, mut reader) = readback::<u32>();
    drop(writer);
    for _ in 0..3 {
      assert!(!reader.is_ready());
    }
  }

  #[test]
  fn test_complete_after_reader_dropped() {
    let (writer, reader) = readback::<Vec<u8>>();
    drop(reader);
    writer.complete(vec![1, 2, 3]);
  }

  #[test]
  fn test_complete_from_worker_thread() {
    let (writer, mut reader) = readback::<u64>();
    std::thread::spawn(move || writer.complete(99))
      .join()
      .unwrap();
    assert_eq!(reader.take(), Some(99));
  }
}
