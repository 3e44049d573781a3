// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! xsn-core: the shared data model for the XStateNet interpreter,
//! event bus, orchestrator, timeout-protection and dead-letter crates —
//! machine definitions, live configuration, events, effects, ids, and
//! the `Clock` abstraction everything downstream builds deadlines on.

pub mod macros;

pub mod clock;
pub mod configuration;
pub mod definition;
pub mod effect;
pub mod error;
pub mod event;
pub mod id;
pub mod ids;
pub mod refs;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, SystemClock};
pub use configuration::{Configuration, ConfigurationSnapshot};
pub use definition::{HistoryType, MachineDefinition, StateId, StateKind, StateNode, Transition};
pub use effect::Effect;
pub use error::DefinitionError;
pub use event::{Event, EventName};
pub use id::{short, IdBuf};
pub use ids::{ActivityId, CorrelationId, DlqEntryId, InvokeId, MachineId, SubscriptionId, TimerId};
pub use refs::{ActionRef, ActivityRef, DelayRef, GuardRef, ServiceRef};
