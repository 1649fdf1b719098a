//! Timer queue for `setTimeout` / `setInterval`
//!
//! Timers registered while a page loads are fired afterwards, in due order,
//! by the worker that owns the page.

use std::time::{Duration, Instant};

/// A pending timer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerEntry {
    pub id: u32,
    /// Source evaluated when the timer fires; empty for function callbacks,
    /// which the engine holds by id
    pub callback: String,
    pub delay_ms: u64,
    pub interval: bool,
    /// Milliseconds after the queue's epoch at which the timer is due
    pub due_ms: u64,
}

/// Timers of one page, ordered by due time then registration
#[derive(Debug)]
pub struct TimerQueue {
    epoch: Instant,
    next_id: u32,
    pending: Vec<TimerEntry>,
    /// Timer whose callback is running, and whether it cleared itself
    firing: Option<(u32, bool)>,
}

impl Default for TimerQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerQueue {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
            next_id: 1,
            pending: Vec::new(),
            firing: None,
        }
    }

    /// Register a timer and return its id
    pub fn schedule(&mut self, callback: String, delay_ms: u64, interval: bool) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        let due_ms = self.elapsed_ms() + delay_ms;
        self.pending.push(TimerEntry {
            id,
            callback,
            delay_ms,
            interval,
            due_ms,
        });
        id
    }

    /// Put an interval back for its next tick
    ///
    /// An interval that cleared itself from inside its own callback is dropped.
    pub fn reschedule(&mut self, mut entry: TimerEntry) {
        if self.firing == Some((entry.id, true)) {
            return;
        }
        entry.due_ms += entry.delay_ms.max(1);
        self.pending.push(entry);
    }

    pub fn clear(&mut self, id: u32) {
        self.pending.retain(|t| t.id != id);
        if let Some((firing, cleared)) = self.firing.as_mut() {
            if *firing == id {
                *cleared = true;
            }
        }
    }

    /// Remove and return the timer that is due first
    pub fn pop_next(&mut self) -> Option<TimerEntry> {
        let index = self
            .pending
            .iter()
            .enumerate()
            .min_by_key(|(_, t)| (t.due_ms, t.id))
            .map(|(i, _)| i)?;
        let entry = self.pending.swap_remove(index);
        self.firing = Some((entry.id, false));
        Some(entry)
    }

    /// Instant at which `entry` is due
    pub fn deadline(&self, entry: &TimerEntry) -> Instant {
        self.epoch + Duration::from_millis(entry.due_ms)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn elapsed_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }
}
