// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! xsn-bus: one cooperative worker owning a fixed set of machines
//! (`spec.md` §4.3). Drains mailboxes round-robin, applies events to
//! interpreters, and flushes deferred sends only after each dispatch
//! returns — the deadlock-avoidance invariant the whole stack relies on.

mod deferred;
mod event_bus;
mod slot;

pub use deferred::DeferredSink;
pub use event_bus::{BusError, DispatchObserver, DispatchOutcome, EventBus};
pub use slot::{BusSlot, MailboxSink};
