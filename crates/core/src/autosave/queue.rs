//! Single-slot save queue.
//!
//! Guarantees at most one write in flight per dialog while never dropping
//! the latest edit: snapshots offered during a write overwrite one pending
//! slot, and completing a write immediately drains that slot.

/// Observable state of a [`SaveQueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    Idle,
    Saving,
}

/// Pending-write buffer with an in-flight guard.
#[derive(Debug)]
pub struct SaveQueue<T> {
    pending: Option<T>,
    in_flight: bool,
}

impl<T> SaveQueue<T> {
    pub fn new() -> Self {
        Self {
            pending: None,
            in_flight: false,
        }
    }

    pub fn state(&self) -> QueueState {
        if self.in_flight {
            QueueState::Saving
        } else {
            QueueState::Idle
        }
    }

    /// Offer a snapshot for saving.
    ///
    /// Returns the snapshot back when the caller should write it now
    /// (`Idle -> Saving`). While saving, the snapshot replaces whatever was
    /// pending and `None` is returned.
    pub fn offer(&mut self, item: T) -> Option<T> {
        if self.in_flight {
            self.pending = Some(item);
            None
        } else {
            self.in_flight = true;
            Some(item)
        }
    }

    /// Mark the in-flight write finished (success or failure).
    ///
    /// Returns the pending snapshot, if any, which the caller must write
    /// next; the queue stays `Saving`. Otherwise the queue becomes `Idle`.
    pub fn complete(&mut self) -> Option<T> {
        match self.pending.take() {
            Some(next) => Some(next),
            None => {
                self.in_flight = false;
                None
            }
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Drop the pending snapshot without touching the in-flight guard.
    pub fn discard_pending(&mut self) -> Option<T> {
        self.pending.take()
    }
}

impl<T> Default for SaveQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
