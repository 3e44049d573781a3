// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! xsn-timeout: the composable deadline layer (`spec.md` §4.5) — per-state
//! residency limits, per-transition send deadlines, and per-action
//! execution limits, all feeding an adaptive-timeout learner and a shared
//! dead-letter queue. Every deadline here is advisory until a caller
//! opts in; none of it changes what the interpreter itself does.

mod adaptive;
mod action_resolver;
mod config;
mod error;
mod send;
mod state_timeout;

pub use adaptive::{AdaptiveStats, AdaptiveTimer};
pub use action_resolver::TimeoutResolver;
pub use config::TimeoutConfig;
pub use error::TimeoutError;
pub use send::{send_with_transition_timeout, TimeoutSender};
pub use state_timeout::{StateTimeoutEntry, StateTimeoutSupervisor, StateTimeoutWatch};
