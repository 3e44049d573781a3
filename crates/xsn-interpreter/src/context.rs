// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The opaque parameter handed to guards and actions.
//!
//! Per the "orchestrated context" design note, an action's only
//! core-defined capability beyond reading/writing the host's own context
//! data is `request_send`, whose effect is collected here and flushed by
//! the bus only after the enclosing dispatch completes — never invoked
//! synchronously. This is the core deadlock-avoidance mechanism.

use xsn_core::{Event, MachineId};

/// Read-only view handed to guard evaluation.
pub struct GuardContext<'a, Ctx> {
    pub data: &'a Ctx,
    pub machine_id: &'a MachineId,
}

/// Mutable view handed to entry/exit/transition action execution.
pub struct ActionContext<'a, Ctx> {
    pub data: &'a mut Ctx,
    pub machine_id: &'a MachineId,
    deferred: Vec<(MachineId, MachineId, Event)>,
}

impl<'a, Ctx> ActionContext<'a, Ctx> {
    pub fn new(data: &'a mut Ctx, machine_id: &'a MachineId) -> Self {
        Self { data, machine_id, deferred: Vec::new() }
    }

    /// Request a cross-machine send. Collected, not delivered — the owning
    /// bus routes it only after this dispatch's actions all return.
    pub fn request_send(&mut self, to: MachineId, event: Event) {
        self.deferred.push((self.machine_id.clone(), to, event));
    }

    pub fn into_deferred_sends(self) -> Vec<(MachineId, MachineId, Event)> {
        self.deferred
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
