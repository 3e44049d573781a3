// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Effects represent side effects a dispatch needs the bus to perform,
//! after the dispatch that produced them has returned.

use crate::event::Event;
use crate::ids::{ActivityId, InvokeId, MachineId, TimerId};
use crate::refs::{ActivityRef, DelayRef, ServiceRef};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Side effects produced by a `Start`/`Dispatch`/`Stop` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Effect {
    /// Emit an event back into the owning machine's own mailbox
    /// (used for internally synthesized events such as `after(...)`).
    Emit { event: Event },

    /// Start an `after` delay timer.
    StartTimer { id: TimerId, delay: DelayRef, duration: Duration },

    /// Cancel a previously started delay timer.
    CancelTimer { id: TimerId },

    /// Start an invoked service.
    StartService { id: InvokeId, service: ServiceRef, input: serde_json::Value },

    /// Cancel a running invoked service.
    CancelService { id: InvokeId },

    /// Start a background activity.
    StartActivity { id: ActivityId, activity: ActivityRef },

    /// Cancel a running background activity.
    CancelActivity { id: ActivityId },

    /// A cross-machine send requested by an action, to be routed by the
    /// bus only after the enclosing dispatch completes.
    DeferredSend {
        from: Option<MachineId>,
        to: MachineId,
        event: Event,
    },

    /// Route an envelope straight to the dead-letter queue (used when the
    /// timeout wrapper or the interpreter itself gives up on an event).
    DeadLetter { event: Event, reason: String },
}

impl Effect {
    /// Effect name for log spans (e.g. "start_timer", "deferred_send").
    pub fn name(&self) -> &'static str {
        match self {
            Effect::Emit { .. } => "emit",
            Effect::StartTimer { .. } => "start_timer",
            Effect::CancelTimer { .. } => "cancel_timer",
            Effect::StartService { .. } => "start_service",
            Effect::CancelService { .. } => "cancel_service",
            Effect::StartActivity { .. } => "start_activity",
            Effect::CancelActivity { .. } => "cancel_activity",
            Effect::DeferredSend { .. } => "deferred_send",
            Effect::DeadLetter { .. } => "dead_letter",
        }
    }

    /// Key-value pairs for structured logging.
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        match self {
            Effect::Emit { event } => vec![("event", event.log_summary())],
            Effect::StartTimer { id, delay, duration } => vec![
                ("timer_id", id.to_string()),
                ("delay", delay.to_string()),
                ("duration_ms", duration.as_millis().to_string()),
            ],
            Effect::CancelTimer { id } => vec![("timer_id", id.to_string())],
            Effect::StartService { id, service, .. } => {
                vec![("invoke_id", id.to_string()), ("service", service.to_string())]
            }
            Effect::CancelService { id } => vec![("invoke_id", id.to_string())],
            Effect::StartActivity { id, activity } => {
                vec![("activity_id", id.to_string()), ("activity", activity.to_string())]
            }
            Effect::CancelActivity { id } => vec![("activity_id", id.to_string())],
            Effect::DeferredSend { from, to, event } => {
                let mut fields =
                    vec![("to", to.to_string()), ("event", event.log_summary())];
                if let Some(f) = from {
                    fields.insert(0, ("from", f.to_string()));
                }
                fields
            }
            Effect::DeadLetter { event, reason } => {
                vec![("event", event.log_summary()), ("reason", reason.clone())]
            }
        }
    }

    /// Whether to log both 'started' and 'completed', or just 'executed',
    /// to keep hot-path effects (timers, emits) from flooding the log.
    pub fn verbose(&self) -> bool {
        !matches!(self, Effect::Emit { .. } | Effect::StartTimer { .. } | Effect::CancelTimer { .. })
    }
}

#[cfg(test)]
#[path = "effect_tests.rs"]
mod tests;
