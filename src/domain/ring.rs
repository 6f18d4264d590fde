// Bounded FIFO log of recent game events.

use crate::domain::events::GameEvent;
use std::collections::VecDeque;

/// Fixed-capacity event log; pushing past capacity evicts the oldest entry.
#[derive(Debug, Clone)]
pub struct EventRing {
    entries: VecDeque<GameEvent>,
    capacity: usize,
}

impl EventRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.max(1)),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, event: GameEvent) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(event);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy-out in insertion order, oldest first.
    pub fn to_vec(&self) -> Vec<GameEvent> {
        self.entries.iter().cloned().collect()
    }

    /// Copy-out newest first, capped at `limit`.
    pub fn recent(&self, limit: usize) -> Vec<GameEvent> {
        self.entries.iter().rev().take(limit).cloned().collect()
    }
}
