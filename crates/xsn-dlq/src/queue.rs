// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded FIFO dead-letter store.

use crate::router::Router;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use xsn_core::{Clock, Event, MachineId};

/// Default DLQ capacity per `spec.md` §6 (`dlqCapacity`).
pub const DEFAULT_CAPACITY: usize = 10_000;

/// Why an envelope ended up in the dead-letter queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    MailboxOverflow,
    StateTimeout,
    TransitionTimeout,
    ActionTimeout,
    UnrecoveredError,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FailureKind::MailboxOverflow => "mailbox_overflow",
            FailureKind::StateTimeout => "state_timeout",
            FailureKind::TransitionTimeout => "transition_timeout",
            FailureKind::ActionTimeout => "action_timeout",
            FailureKind::UnrecoveredError => "unrecovered_error",
        };
        f.write_str(s)
    }
}

/// One dead-lettered envelope, per `spec.md` §4.6.
#[derive(Debug, Clone)]
pub struct DeadLetterEntry {
    pub from: Option<MachineId>,
    pub to: MachineId,
    pub event: Event,
    pub failure_kind: FailureKind,
    pub error: Option<String>,
    pub observed_at_ms: u64,
}

/// A bounded, thread-safe FIFO of dead-lettered envelopes. Pushing past
/// capacity drops the oldest entry and increments `dropped_oldest`
/// (testable property 10).
pub struct DeadLetterQueue<C: Clock> {
    capacity: usize,
    clock: C,
    entries: Mutex<VecDeque<DeadLetterEntry>>,
    dropped_oldest: AtomicU64,
}

impl<C: Clock> DeadLetterQueue<C> {
    pub fn new(capacity: usize, clock: C) -> Self {
        Self { capacity: capacity.max(1), clock, entries: Mutex::new(VecDeque::new()), dropped_oldest: AtomicU64::new(0) }
    }

    pub fn push(&self, from: Option<MachineId>, to: MachineId, event: Event, kind: FailureKind, error: Option<String>) {
        let entry = DeadLetterEntry {
            from,
            to,
            event,
            failure_kind: kind,
            error,
            observed_at_ms: self.clock.epoch_ms(),
        };
        let mut entries = self.entries.lock();
        if entries.len() >= self.capacity {
            entries.pop_front();
            let total = self.dropped_oldest.fetch_add(1, Ordering::Relaxed) + 1;
            tracing::warn!(dropped_total = total, "dead-letter queue full, dropping oldest entry");
        }
        entries.push_back(entry);
    }

    pub fn try_dequeue(&self) -> Option<DeadLetterEntry> {
        self.entries.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dropped_oldest(&self) -> u64 {
        self.dropped_oldest.load(Ordering::Relaxed)
    }

    /// Re-enter routing for up to `n` entries. No duplicate suppression —
    /// callers with idempotency needs must add a `correlation_id` check
    /// themselves (`spec.md` §4.6).
    pub async fn reprocess(&self, n: usize, router: &dyn Router) -> usize {
        let mut reprocessed = 0;
        for _ in 0..n {
            let Some(entry) = self.try_dequeue() else { break };
            match router.route(entry.from.clone(), entry.to.clone(), entry.event.clone()).await {
                Ok(()) => reprocessed += 1,
                Err(err) => {
                    tracing::warn!(error = %err, to = %entry.to, "dlq reprocess failed, re-enqueueing entry");
                    self.entries.lock().push_back(entry);
                }
            }
        }
        reprocessed
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
