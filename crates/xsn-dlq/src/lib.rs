// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! xsn-dlq: the bounded dead-letter queue (`spec.md` §4.6). Every event
//! that fails delivery or processing — mailbox overflow, a transition
//! timeout, an unrecovered action error — lands here with enough context
//! to diagnose and optionally reprocess it.

mod queue;
mod router;

pub use queue::{DeadLetterEntry, DeadLetterQueue, FailureKind};
pub use router::{RouteError, Router};
