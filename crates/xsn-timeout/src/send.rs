// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transition-timeout enforcement (`spec.md` §4.5, scenario S6): a thin
//! wrapper over `Orchestrator::send_event_async` that turns a
//! `SendStatus::TimedOut` into a dead-lettered `FailureKind::TransitionTimeout`
//! entry and feeds successful round-trip latencies into the adaptive
//! learner. The orchestrator itself already owns the wait/timeout
//! machinery (`spec.md` §4.2) — this layer only decides *how long* to
//! wait and *what to do* once the wait fails.

use crate::adaptive::AdaptiveTimer;
use crate::config::TimeoutConfig;
use std::sync::Arc;
use std::time::{Duration, Instant};
use xsn_core::{Clock, Event, MachineId};
use xsn_dlq::{DeadLetterQueue, FailureKind};
use xsn_orchestrator::{Orchestrator, SendResult, SendStatus};

/// Picks a transition deadline for `to`/`event` and escalates a timed-out
/// send to the dead-letter queue, optionally feeding the adaptive timer.
pub struct TimeoutSender<Ctx, C: Clock> {
    orchestrator: Arc<Orchestrator<Ctx, C>>,
    config: Arc<TimeoutConfig>,
    adaptive: Arc<AdaptiveTimer>,
    dlq: Option<Arc<DeadLetterQueue<C>>>,
}

impl<Ctx: Send + Sync + 'static, C: Clock> TimeoutSender<Ctx, C> {
    pub fn new(
        orchestrator: Arc<Orchestrator<Ctx, C>>,
        config: Arc<TimeoutConfig>,
        adaptive: Arc<AdaptiveTimer>,
        dlq: Option<Arc<DeadLetterQueue<C>>>,
    ) -> Self {
        Self { orchestrator, config, adaptive, dlq }
    }

    /// Sends `event` to `to` on behalf of `from`, waiting for dispatch to
    /// settle under a deadline resolved from `TimeoutConfig` (an adaptive
    /// recommendation once warm, else `default_transition_timeout`, else
    /// no deadline at all — the orchestrator then waits indefinitely).
    pub async fn send(&self, from: Option<MachineId>, to: MachineId, event: Event) -> SendResult {
        send_with_transition_timeout(&self.orchestrator, &self.config, &self.adaptive, self.dlq.as_deref(), from, to, event).await
    }
}

/// Standalone form of [`TimeoutSender::send`] for callers that don't want
/// to hold a whole `TimeoutSender` around (e.g. one-off sends from a
/// supervisor that already owns its own `Orchestrator` handle).
pub async fn send_with_transition_timeout<Ctx: Send + Sync + 'static, C: Clock>(
    orchestrator: &Orchestrator<Ctx, C>,
    config: &TimeoutConfig,
    adaptive: &AdaptiveTimer,
    dlq: Option<&DeadLetterQueue<C>>,
    from: Option<MachineId>,
    to: MachineId,
    event: Event,
) -> SendResult {
    let key = format!("transition:{}", event.name.as_str());
    let deadline = if config.enable_adaptive_timeout && adaptive.is_warm(&key) {
        adaptive.recommended(&key)
    } else {
        config.default_transition_timeout
    };

    let started = Instant::now();
    let result = orchestrator.send_event_async(from.clone(), to.clone(), event.clone(), true, deadline).await;

    match result.status {
        SendStatus::Dispatched => {
            adaptive.record(&key, started.elapsed());
        }
        SendStatus::TimedOut => {
            let limit_ms = deadline.map(|d| d.as_millis() as u64).unwrap_or(0);
            tracing::warn!(to = %to, event = %event.name.as_str(), limit_ms, "transition exceeded its deadline");
            if config.send_timeouts_to_dlq {
                if let Some(dlq) = dlq {
                    dlq.push(
                        from,
                        to,
                        event,
                        FailureKind::TransitionTimeout,
                        Some(format!("transition timed out after {limit_ms}ms")),
                    );
                }
            }
        }
        _ => {}
    }
    result
}

#[cfg(test)]
#[path = "send_tests.rs"]
mod tests;
