// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The seam a bus uses to hand a deferred send to whatever owns
//! cross-machine routing (the orchestrator in production).
//!
//! Per `spec.md` §4.3 and §9, a deferred send is collected during a
//! dispatch but only ever delivered here, strictly after that dispatch's
//! entry/exit/transition actions have all returned — never synchronously
//! inside action code. That ordering is enforced by construction: the
//! bus only calls `deliver` from its main loop, after `Interpreter::dispatch`
//! has already resolved.

use async_trait::async_trait;
use xsn_core::{Event, MachineId};

/// Routes one deferred send to its target, which may live on this bus or
/// another one entirely — the sink doesn't care which.
#[async_trait]
pub trait DeferredSink: Send + Sync {
    async fn deliver(&self, from: Option<MachineId>, to: MachineId, event: Event);
}
