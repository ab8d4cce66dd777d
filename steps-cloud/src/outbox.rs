//! Queue of booking changes made while offline.
//!
//! Changes are kept in the order they were made and stay queued until the
//! service acknowledged them. An upload that fails or is cancelled leaves the
//! queue untouched.

use crate::types::BookingChange;
use std::collections::HashSet;
use uuid::Uuid;

/// Pending local changes awaiting upload.
pub struct Outbox {
    pending: Vec<BookingChange>,
}

impl Outbox {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    /// Queues a change.
    pub fn push(&mut self, change: BookingChange) {
        self.pending.push(change);
    }

    /// Copy of the queue to send. The queue itself is left as is.
    pub fn batch(&self) -> Vec<BookingChange> {
        self.pending.clone()
    }

    /// Drops the changes of an uploaded batch. Changes queued after the batch
    /// was taken remain. Returns how many were removed.
    pub fn acknowledge(&mut self, batch: &[BookingChange]) -> usize {
        let sent: HashSet<Uuid> = batch.iter().map(|c| c.change_id).collect();
        let before = self.pending.len();
        self.pending.retain(|c| !sent.contains(&c.change_id));
        before - self.pending.len()
    }

    /// Pending changes, oldest first.
    pub fn pending(&self) -> &[BookingChange] {
        &self.pending
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl Default for Outbox {
    fn default() -> Self {
        Self::new()
    }
}
