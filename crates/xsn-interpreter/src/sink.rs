// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The handle an interpreter uses to re-enqueue an internally synthesized
//! event (a fired timer, a completed invoke, a finished activity) back
//! into its own mailbox.
//!
//! Invoked services and activities run as detached `tokio` tasks so a
//! slow one only suspends the machine that owns it, never the bus
//! running other machines (`spec.md` §5). Each task needs a way to post
//! its outcome back without reaching into the interpreter directly —
//! this trait is that seam. `xsn-bus` implements it by wrapping a
//! mailbox sender.

use xsn_core::Event;

/// Re-enqueues an event into the owning machine's own mailbox.
pub trait SelfSink: Send + Sync {
    fn enqueue(&self, event: Event);
}

/// A `SelfSink` that drops every event, for interpreter unit tests that
/// don't exercise invoked services or activities.
pub struct NullSink;

impl SelfSink for NullSink {
    fn enqueue(&self, _event: Event) {}
}
