//! Completion ledger
//!
//! Delivery is at-least-once, so the same unit can finish more than once.
//! The ledger keeps the first terminal outcome per [`UnitId`]; later ones
//! are discarded and callers are handed the recorded outcome instead.
//!
//! The ledger is bounded. Once `capacity` outcomes are held, recording a new
//! unit evicts the oldest one, and a redelivery of an evicted unit runs again.

use crate::config::DEFAULT_LEDGER_CAPACITY;
use crate::error::PipelineError;
use crate::unit::{StageOutput, UnitId};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::VecDeque;

/// Terminal outcome of a unit
pub type UnitOutcome = Result<StageOutput, PipelineError>;

/// Result of recording a completion
#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    /// First completion; this outcome is now authoritative
    First(UnitOutcome),
    /// Unit already completed; holds the earlier outcome
    Duplicate(UnitOutcome),
}

impl Recorded {
    /// Authoritative outcome
    #[inline]
    #[must_use]
    pub fn into_outcome(self) -> UnitOutcome {
        match self {
            Recorded::First(o) | Recorded::Duplicate(o) => o,
        }
    }

    /// Whether the completion was discarded
    #[inline]
    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Recorded::Duplicate(_))
    }
}

/// First-completion-wins map of unit outcomes
#[derive(Debug)]
pub struct CompletionLedger {
    entries: DashMap<UnitId, UnitOutcome>,
    // insertion order, oldest first
    order: parking_lot::Mutex<VecDeque<UnitId>>,
    capacity: usize,
}

impl Default for CompletionLedger {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_LEDGER_CAPACITY)
    }
}

impl CompletionLedger {
    /// Create empty ledger with the default capacity
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create empty ledger holding at most `capacity` outcomes (minimum 1)
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            order: parking_lot::Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    /// Maximum outcomes held
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Record a terminal outcome unless one exists
    pub fn record(&self, id: UnitId, outcome: UnitOutcome) -> Recorded {
        match self.entries.entry(id) {
            Entry::Occupied(existing) => return Recorded::Duplicate(existing.get().clone()),
            Entry::Vacant(slot) => {
                slot.insert(outcome.clone());
            }
        }
        // shard guard is released before the order lock is taken
        self.admit(id);
        Recorded::First(outcome)
    }

    fn admit(&self, id: UnitId) {
        let mut order = self.order.lock();
        order.push_back(id);
        while order.len() > self.capacity {
            let Some(oldest) = order.pop_front() else { break };
            self.entries.remove(&oldest);
            tracing::trace!(unit_id = %oldest, "ledger.evicted");
        }
    }

    /// Outcome recorded for a unit
    #[must_use]
    pub fn get(&self, id: &UnitId) -> Option<UnitOutcome> {
        self.entries.get(id).map(|e| e.value().clone())
    }

    /// Whether a unit has completed
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &UnitId) -> bool {
        self.entries.contains_key(id)
    }

    /// Number of completed units
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has completed
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
