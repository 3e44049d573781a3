// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One machine's mailbox receiver + interpreter, as owned by an
//! `EventBus`.

use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use xsn_core::{Clock, Event, TimerId};
use xsn_interpreter::Interpreter;
use xsn_mailbox::MailboxSender;

/// Adapts a [`MailboxSender`] to the interpreter's `SelfSink` seam, so
/// invoked services and activities can re-enqueue their outcome into
/// their own machine's mailbox without the interpreter knowing anything
/// about mailboxes.
pub struct MailboxSink(pub MailboxSender);

impl xsn_interpreter::SelfSink for MailboxSink {
    fn enqueue(&self, event: Event) {
        if let Err(err) = self.0.try_send(event) {
            tracing::warn!(error = %err, "failed to re-enqueue internally synthesized event");
        }
    }
}

/// A bus-owned machine: its receiver, its interpreter, a sender back
/// into its own mailbox (used to reinject fired `after` timers), and the
/// live timer tasks it has scheduled.
pub struct BusSlot<Ctx, C: Clock> {
    pub rx: mpsc::Receiver<Event>,
    pub interpreter: Interpreter<Ctx, C>,
    pub self_sender: MailboxSender,
    pub timer_handles: HashMap<TimerId, JoinHandle<()>>,
}

impl<Ctx, C: Clock> BusSlot<Ctx, C> {
    pub fn new(rx: mpsc::Receiver<Event>, interpreter: Interpreter<Ctx, C>, self_sender: MailboxSender) -> Self {
        Self { rx, interpreter, self_sender, timer_handles: HashMap::new() }
    }
}
