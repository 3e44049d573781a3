// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The cooperative event-bus worker: one `EventBus` owns a fixed set of
//! machines and is the only thread ever applying an event to any of
//! them (`spec.md` §4.3, §5 single-consumer guarantee).

use crate::deferred::DeferredSink;
use crate::slot::BusSlot;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Notify;
use xsn_core::{Clock, ConfigurationSnapshot, CorrelationId, Event, MachineId, TimerId};
use xsn_interpreter::Interpreter;

#[derive(Debug, Error)]
pub enum BusError {
    #[error("machine {0} is not owned by this bus")]
    UnknownMachine(MachineId),
    #[error("machine {0} is already registered on this bus")]
    DuplicateMachine(MachineId),
}

/// What happened to one popped event, reported to the caller that
/// polls [`EventBus::step`] (mainly for tests; production code instead
/// subscribes a [`DispatchObserver`] to learn of completion).
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub machine: MachineId,
    pub snapshot: ConfigurationSnapshot,
}

/// Notified once a dispatch (and any eventless chain it triggered)
/// settles into a stable configuration. The orchestrator implements
/// this to resolve a caller awaiting `SendEventAsync(waitForDispatch:
/// true)` — the call returns once the chain stabilizes, not after the
/// first microstep.
pub trait DispatchObserver: Send + Sync {
    fn on_dispatch_complete(
        &self,
        machine: &MachineId,
        correlation_id: Option<CorrelationId>,
        snapshot: &ConfigurationSnapshot,
    );
}

/// A worker owning a fixed set of machines. Mailboxes are drained
/// round-robin; a full pass that finds nothing live parks on the
/// shared [`Notify`] any of this bus's mailboxes fire when a send
/// lands (`xsn_mailbox::channel`'s wakeup contract).
pub struct EventBus<Ctx, C: Clock> {
    slots: HashMap<MachineId, BusSlot<Ctx, C>>,
    notify: Arc<Notify>,
    deferred_sink: Arc<dyn DeferredSink>,
    observer: Option<Arc<dyn DispatchObserver>>,
    shutdown: Arc<std::sync::atomic::AtomicBool>,
}

impl<Ctx, C> EventBus<Ctx, C>
where
    Ctx: Clone + Send + Sync + 'static,
    C: Clock,
{
    pub fn new(notify: Arc<Notify>, deferred_sink: Arc<dyn DeferredSink>) -> Self {
        Self {
            slots: HashMap::new(),
            notify,
            deferred_sink,
            observer: None,
            shutdown: Arc::new(std::sync::atomic::AtomicBool::new(false)),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn DispatchObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains(&self, machine_id: &MachineId) -> bool {
        self.slots.contains_key(machine_id)
    }

    /// Registers a machine on this bus. The interpreter is started
    /// immediately so its initial configuration (and any eventless
    /// chain `Start` triggers) is settled before the caller observes
    /// the machine as live.
    pub async fn register(&mut self, slot: BusSlot<Ctx, C>) -> Result<DispatchOutcome, BusError> {
        let machine_id = slot.interpreter.machine_id().clone();
        if self.slots.contains_key(&machine_id) {
            return Err(BusError::DuplicateMachine(machine_id));
        }
        self.slots.insert(machine_id.clone(), slot);
        // Allow expect: the key was just inserted above, under the same borrow scope.
        #[allow(clippy::expect_used)]
        let slot = self.slots.get_mut(&machine_id).expect("just inserted");
        let result = slot.interpreter.start().await;
        let snapshot = result.snapshot.clone();
        self.schedule_timers(&machine_id, result.timers_to_start);
        self.cancel_timers(&machine_id, &result.timers_to_cancel);
        self.flush_deferred(&machine_id, result.deferred_sends).await;
        self.notify_observer(&machine_id, None, &snapshot);
        Ok(DispatchOutcome { machine: machine_id, snapshot })
    }

    /// Drops a machine from this bus, stopping its interpreter first so
    /// owned timers/services/activities are cancelled rather than leaked.
    pub async fn unregister(&mut self, machine_id: &MachineId) -> Result<DispatchOutcome, BusError> {
        let mut slot = self
            .slots
            .remove(machine_id)
            .ok_or_else(|| BusError::UnknownMachine(machine_id.clone()))?;
        let result = slot.interpreter.stop().await;
        for (_, handle) in slot.timer_handles.drain() {
            handle.abort();
        }
        Ok(DispatchOutcome { machine: machine_id.clone(), snapshot: result.snapshot })
    }

    /// Requests this bus's `run` loop stop after its current pass.
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, std::sync::atomic::Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Runs the drain loop until `request_shutdown` is called. Each pass
    /// tries every slot once; if a full pass delivers nothing, the bus
    /// parks on the shared notify with a short safety-net timeout (in
    /// case a notification raced the park).
    pub async fn run(&mut self) {
        const IDLE_PARK: Duration = Duration::from_millis(250);
        loop {
            if self.shutdown.load(std::sync::atomic::Ordering::SeqCst) {
                return;
            }
            let delivered = self.drain_pass().await;
            if !delivered && !self.shutdown.load(std::sync::atomic::Ordering::SeqCst) {
                tokio::select! {
                    _ = self.notify.notified() => {}
                    _ = tokio::time::sleep(IDLE_PARK) => {}
                }
            }
        }
    }

    /// The shared notify this bus parks on between passes; callers that
    /// drive the bus manually (the orchestrator, outside `run`) clone
    /// this to know when a fresh pass is worth attempting.
    pub fn notify(&self) -> Arc<Notify> {
        self.notify.clone()
    }

    /// Tries one event from every slot, in machine-id order for
    /// determinism. Returns whether anything was delivered.
    pub async fn drain_pass(&mut self) -> bool {
        let machine_ids: Vec<MachineId> = {
            let mut ids: Vec<_> = self.slots.keys().cloned().collect();
            ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
            ids
        };
        let mut delivered = false;
        for machine_id in machine_ids {
            if self.step(&machine_id).await.is_some() {
                delivered = true;
            }
        }
        delivered
    }

    /// Pulls and dispatches at most one event for `machine_id`, if one
    /// is already queued. Returns `None` if the mailbox was empty or
    /// the machine is unknown.
    pub async fn step(&mut self, machine_id: &MachineId) -> Option<DispatchOutcome> {
        let event = {
            let slot = self.slots.get_mut(machine_id)?;
            match slot.rx.try_recv() {
                Ok(event) => event,
                Err(_) => return None,
            }
        };
        Some(self.dispatch_one(machine_id, event).await)
    }

    async fn dispatch_one(&mut self, machine_id: &MachineId, event: Event) -> DispatchOutcome {
        let correlation_id = event.correlation_id.clone();
        let result = {
            // Allow expect: every caller of `dispatch_one` just looked up
            // `machine_id` in `self.slots` to obtain `event`.
            #[allow(clippy::expect_used)]
            let slot = self.slots.get_mut(machine_id).expect("caller checked machine_id");
            slot.interpreter.dispatch(event).await
        };
        if let Some(err) = &result.error {
            tracing::warn!(machine = %machine_id, error = %err, "dispatch ended in error");
        }
        for fired in &result.fired_transitions {
            tracing::debug!(
                machine = %machine_id,
                source = %fired.source,
                event = %fired.event,
                targets = ?fired.targets,
                "transition fired"
            );
        }
        self.schedule_timers(machine_id, result.timers_to_start);
        self.cancel_timers(machine_id, &result.timers_to_cancel);
        self.flush_deferred(machine_id, result.deferred_sends).await;
        self.notify_observer(machine_id, correlation_id, &result.snapshot);
        DispatchOutcome { machine: machine_id.clone(), snapshot: result.snapshot }
    }

    fn schedule_timers(&mut self, machine_id: &MachineId, timers: Vec<(TimerId, Duration, Event)>) {
        if timers.is_empty() {
            return;
        }
        let slot = match self.slots.get_mut(machine_id) {
            Some(slot) => slot,
            None => return,
        };
        for (timer_id, delay, event) in timers {
            let sender = slot.self_sender.clone();
            let notify = self.notify.clone();
            let handle = tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                if let Err(err) = sender.try_send(event) {
                    tracing::warn!(timer_id = %timer_id, error = %err, "timer fired but mailbox rejected the event");
                }
                notify.notify_one();
            });
            slot.timer_handles.insert(timer_id, handle);
        }
    }

    fn cancel_timers(&mut self, machine_id: &MachineId, timer_ids: &[TimerId]) {
        if timer_ids.is_empty() {
            return;
        }
        if let Some(slot) = self.slots.get_mut(machine_id) {
            for timer_id in timer_ids {
                if let Some(handle) = slot.timer_handles.remove(timer_id) {
                    handle.abort();
                }
            }
        }
    }

    async fn flush_deferred(&self, from: &MachineId, sends: Vec<(MachineId, MachineId, Event)>) {
        for (_source, to, event) in sends {
            self.deferred_sink.deliver(Some(from.clone()), to, event).await;
        }
    }

    fn notify_observer(&self, machine_id: &MachineId, correlation_id: Option<CorrelationId>, snapshot: &ConfigurationSnapshot) {
        if let Some(observer) = &self.observer {
            observer.on_dispatch_complete(machine_id, correlation_id, snapshot);
        }
    }
}
