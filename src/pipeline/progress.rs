//! Per-field progress counter shared by the workers of one field

use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::info;

#[derive(Debug)]
pub struct FieldProgress {
    field: String,
    total: usize,
    completed: AtomicUsize,
}

impl FieldProgress {
    pub fn new(field: impl Into<String>, total: usize) -> Self {
        Self {
            field: field.into(),
            total,
            completed: AtomicUsize::new(0),
        }
    }

    /// Mark one file finished, successfully or not. Returns the new count.
    pub fn complete(&self) -> usize {
        self.complete_many(1)
    }

    pub fn complete_many(&self, n: usize) -> usize {
        if n == 0 {
            return self.completed();
        }
        let completed = self.completed.fetch_add(n, Ordering::Relaxed) + n;
        info!(
            field = %self.field,
            completed,
            total = self.total,
            "Progress {}/{}",
            completed,
            self.total
        );
        completed
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn is_done(&self) -> bool {
        self.completed() >= self.total
    }
}
