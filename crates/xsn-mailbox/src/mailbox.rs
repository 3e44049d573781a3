// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A bounded, FIFO, single-consumer mailbox for one machine.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Notify};
use tokio_util::sync::CancellationToken;
use xsn_core::Event;

/// Default mailbox capacity per `spec.md` §6 (`mailboxCapacity`).
pub const DEFAULT_CAPACITY: usize = 10_000;

/// What happens when a mailbox is full and a new event arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Back-pressure the sender until space frees up.
    Wait,
    /// Drop the newly arriving event and record the drop.
    DropNewest,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MailboxError {
    #[error("mailbox is closed")]
    Closed,
    #[error("mailbox is full and overflow policy is dropNewest")]
    Full,
    #[error("send cancelled before enqueue")]
    Cancelled,
}

/// The sending half. Cheaply `Clone`-able; many producers may hold one
/// (the orchestrator enqueuing external sends, a bus forwarding a
/// deferred send from another machine).
#[derive(Clone)]
pub struct MailboxSender {
    tx: mpsc::Sender<Event>,
    policy: OverflowPolicy,
    shutdown: CancellationToken,
    notify: Arc<Notify>,
    dropped_newest: Arc<AtomicU64>,
}

impl MailboxSender {
    /// Enqueue an event per the mailbox's overflow policy. Cancellation
    /// observed before enqueue returns `Cancelled`; cancellation racing
    /// with an in-flight `Wait` send is resolved in favor of whichever
    /// completes first (`spec.md` §5 — best-effort after enqueue starts).
    pub async fn send(&self, event: Event) -> Result<(), MailboxError> {
        if self.shutdown.is_cancelled() {
            return Err(MailboxError::Cancelled);
        }
        match self.policy {
            OverflowPolicy::Wait => {
                tokio::select! {
                    biased;
                    _ = self.shutdown.cancelled() => Err(MailboxError::Cancelled),
                    result = self.tx.send(event) => {
                        result.map_err(|_| MailboxError::Closed)?;
                        self.notify.notify_one();
                        Ok(())
                    }
                }
            }
            OverflowPolicy::DropNewest => self.try_send_drop_newest(event),
        }
    }

    /// Non-blocking enqueue, used internally by `DropNewest` and exposed
    /// for buses that forward a deferred send without wanting to await.
    pub fn try_send(&self, event: Event) -> Result<(), MailboxError> {
        match self.tx.try_send(event) {
            Ok(()) => {
                self.notify.notify_one();
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(_)) => Err(MailboxError::Full),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(MailboxError::Closed),
        }
    }

    fn try_send_drop_newest(&self, event: Event) -> Result<(), MailboxError> {
        match self.try_send(event) {
            Ok(()) => Ok(()),
            Err(MailboxError::Full) => {
                let total = self.dropped_newest.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::warn!(dropped_total = total, "mailbox full, dropping newest event");
                Err(MailboxError::Full)
            }
            Err(other) => Err(other),
        }
    }

    /// Count of events dropped under `DropNewest` since construction.
    pub fn dropped_newest(&self) -> u64 {
        self.dropped_newest.load(Ordering::Relaxed)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// The receiving half. Structurally single-consumer: the inner
/// `mpsc::Receiver` is taken exactly once via [`MailboxReceiver::take`];
/// a second call is a programmer bug, not a runtime condition, so it
/// panics rather than returning an error.
pub struct MailboxReceiver {
    rx: Option<mpsc::Receiver<Event>>,
    dropped_newest: Arc<AtomicU64>,
}

impl MailboxReceiver {
    /// Take the inner receiver for exclusive use by the owning bus.
    ///
    /// # Panics
    /// Panics if called more than once on the same mailbox.
    #[allow(clippy::expect_used)]
    pub fn take(&mut self) -> mpsc::Receiver<Event> {
        self.rx.take().expect("mailbox receiver already taken by another consumer")
    }

    pub fn dropped_newest(&self) -> u64 {
        self.dropped_newest.load(Ordering::Relaxed)
    }
}

/// Construct a bound mailbox pair. `notify` is shared across every
/// mailbox a single `EventBus` owns so the bus can wait on "any slot has
/// data" with one `Notify` rather than polling each mailbox in turn.
pub fn channel(
    capacity: usize,
    policy: OverflowPolicy,
    shutdown: CancellationToken,
    notify: Arc<Notify>,
) -> (MailboxSender, MailboxReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let dropped_newest = Arc::new(AtomicU64::new(0));
    (
        MailboxSender { tx, policy, shutdown, notify, dropped_newest: dropped_newest.clone() },
        MailboxReceiver { rx: Some(rx), dropped_newest },
    )
}

/// Convenience handle bundling both halves for callers that don't need
/// to split them across threads immediately.
pub struct Mailbox;

impl Mailbox {
    pub fn bounded(
        capacity: usize,
        policy: OverflowPolicy,
        shutdown: CancellationToken,
        notify: Arc<Notify>,
    ) -> (MailboxSender, MailboxReceiver) {
        channel(capacity, policy, shutdown, notify)
    }
}
