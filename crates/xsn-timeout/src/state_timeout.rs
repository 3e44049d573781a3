// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! State-timeout enforcement (`spec.md` §4.5): watches every machine's
//! `xstate.state_changed` notifications (published by the orchestrator
//! after each dispatch settles) and arms one residency timer per active
//! state that has a configured deadline. A timer that fires sends the
//! configured timeout event into its machine; if the state is still
//! active once that send settles, the interpreter had no transition for
//! it, and the occurrence is dead-lettered as `FailureKind::StateTimeout`.
//!
//! This supervisor never touches the interpreter's own timer bookkeeping
//! (the `after` delayed-transition timers it already owns) — it is
//! purely an external watcher built on the same scoped-channel mechanism
//! any other subscriber uses.

use crate::config::TimeoutConfig;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use xsn_core::{Clock, Event, MachineId};
use xsn_dlq::{DeadLetterQueue, FailureKind};
use xsn_orchestrator::{Filter, Orchestrator};

/// One currently-armed state-residency timer, for introspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateTimeoutEntry {
    pub machine_id: MachineId,
    pub state_id: String,
    pub armed_at_ms: u64,
    pub deadline: Duration,
}

struct ArmedTimer {
    handle: JoinHandle<()>,
    entry: StateTimeoutEntry,
}

type ArmedMap = Arc<Mutex<HashMap<(MachineId, String), ArmedTimer>>>;

/// Subscribes to every machine's state-change notifications and arms
/// per-state residency timers per `TimeoutConfig`. Construct with `new`,
/// then `spawn` it to start watching.
pub struct StateTimeoutSupervisor<Ctx, C: Clock> {
    orchestrator: Arc<Orchestrator<Ctx, C>>,
    config: Arc<TimeoutConfig>,
    clock: C,
    dlq: Option<Arc<DeadLetterQueue<C>>>,
}

/// A live watch loop. Holds the task handle plus a shared view of the
/// currently-armed timers for introspection. Aborting it also aborts
/// every currently-armed per-state timer it owns.
pub struct StateTimeoutWatch {
    task: JoinHandle<()>,
    armed: ArmedMap,
}

impl StateTimeoutWatch {
    /// Currently-armed timers, across every machine observed so far.
    pub fn armed_timers(&self) -> Vec<StateTimeoutEntry> {
        self.armed.lock().values().map(|armed| armed.entry.clone()).collect()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stops the watch loop and every timer it currently has armed.
    pub fn abort(self) {
        self.task.abort();
        for armed in self.armed.lock().drain().map(|(_, v)| v) {
            armed.handle.abort();
        }
    }
}

impl<Ctx: Send + Sync + 'static, C: Clock> StateTimeoutSupervisor<Ctx, C> {
    pub fn new(orchestrator: Arc<Orchestrator<Ctx, C>>, config: Arc<TimeoutConfig>, clock: C, dlq: Option<Arc<DeadLetterQueue<C>>>) -> Self {
        Self { orchestrator, config, clock, dlq }
    }

    /// Subscribes and spawns the watch loop. The loop runs until the
    /// returned [`StateTimeoutWatch`] is aborted or the orchestrator's
    /// subscription channel closes (e.g. on orchestrator shutdown).
    pub fn spawn(self) -> StateTimeoutWatch {
        let armed: ArmedMap = Arc::new(Mutex::new(HashMap::new()));
        let armed_for_task = armed.clone();
        let mut handle = self.orchestrator.subscribe(Filter::any().with_event_name("xstate.state_changed"));
        let mut residency: HashMap<MachineId, HashSet<String>> = HashMap::new();
        let orchestrator = self.orchestrator;
        let config = self.config;
        let clock = self.clock;
        let dlq = self.dlq;

        let task = tokio::spawn(async move {
            while let Some((machine_id, event)) = handle.receiver.recv().await {
                let Some(active_states) = event.payload.get("active_states").and_then(|v| v.as_array()) else {
                    continue;
                };
                let new_set: HashSet<String> =
                    active_states.iter().filter_map(|v| v.as_str().map(str::to_string)).collect();
                let old_set = residency.entry(machine_id.clone()).or_default();

                let exited: Vec<String> = old_set.difference(&new_set).cloned().collect();
                let entered: Vec<String> = new_set.difference(old_set).cloned().collect();
                *old_set = new_set;

                for state_id in exited {
                    if let Some(armed_timer) = armed_for_task.lock().remove(&(machine_id.clone(), state_id)) {
                        armed_timer.handle.abort();
                    }
                }

                for state_id in entered {
                    let Some(deadline) = config.state_timeout(&state_id) else {
                        continue;
                    };
                    arm(&orchestrator, &config, &clock, &dlq, &armed_for_task, machine_id.clone(), state_id, deadline);
                }
            }
        });

        StateTimeoutWatch { task, armed }
    }
}

#[allow(clippy::too_many_arguments)]
fn arm<Ctx: Send + Sync + 'static, C: Clock>(
    orchestrator: &Arc<Orchestrator<Ctx, C>>,
    config: &Arc<TimeoutConfig>,
    clock: &C,
    dlq: &Option<Arc<DeadLetterQueue<C>>>,
    armed_map: &ArmedMap,
    machine_id: MachineId,
    state_id: String,
    deadline: Duration,
) {
    let orchestrator = orchestrator.clone();
    let config = config.clone();
    let dlq = dlq.clone();
    let armed_at_ms = clock.epoch_ms();
    let key = (machine_id.clone(), state_id.clone());
    let task_key = key.clone();
    let armed_map_for_task = armed_map.clone();

    let task_machine_id = machine_id.clone();
    let task_state_id = state_id.clone();
    let join = tokio::spawn(async move {
        tokio::time::sleep(deadline).await;
        tracing::warn!(machine = %task_machine_id, state = %task_state_id, deadline_ms = deadline.as_millis() as u64, "state exceeded its residency limit");

        let timeout_event = Event::new(config.timeout_event_name.clone());
        let result = orchestrator
            .send_event_async(None, task_machine_id.clone(), timeout_event.clone(), true, Some(Duration::from_secs(2)))
            .await;
        let still_active = match &result.resulting_state_digest {
            Some(digest) => digest.split('+').any(|s| s == task_state_id),
            None => true,
        };
        if still_active && config.send_timeouts_to_dlq {
            if let Some(dlq) = &dlq {
                dlq.push(
                    None,
                    task_machine_id.clone(),
                    timeout_event,
                    FailureKind::StateTimeout,
                    Some(format!("state {task_state_id} exceeded its {}ms residency limit unhandled", deadline.as_millis())),
                );
            }
        }
        armed_map_for_task.lock().remove(&task_key);
    });

    armed_map.lock().insert(key, ArmedTimer { handle: join, entry: StateTimeoutEntry { machine_id, state_id, armed_at_ms, deadline } });
}

#[cfg(test)]
#[path = "state_timeout_tests.rs"]
mod tests;
