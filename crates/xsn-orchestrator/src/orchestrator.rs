// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The orchestrator: a pool of `EventBus` workers, the machine registry
//! that assigns each machine to one, cross-machine routing, scoped
//! channels, and graceful shutdown. Generalizes the teacher's
//! `oj-daemon::Runtime` (a single coordinator over many agents) to a
//! pool of independent bus workers, each itself an `oj-daemon`-style
//! coordinator over its own fixed machine set.

use crate::config::OrchestratorConfig;
use crate::dtos::{digest_snapshot, SendResult};
use crate::error::{OrchestratorError, RouteError};
use crate::registry::{assign_bus, MachineRegistry, RegistryEntry};
use crate::subscription::{Filter, SubscriptionHandle, SubscriptionRegistry};
use async_trait::async_trait;
use parking_lot::Mutex as SyncMutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex as AsyncMutex, Notify};
use tokio::task::JoinHandle;
use xsn_bus::{BusSlot, DeferredSink, DispatchObserver, EventBus, MailboxSink};
use xsn_core::{Clock, ConfigurationSnapshot, CorrelationId, Effect, Event, EventName, MachineDefinition, MachineId, SubscriptionId};
use xsn_dlq::{DeadLetterQueue, FailureKind};
use xsn_interpreter::{Interpreter, Resolver};
use xsn_mailbox::{Mailbox, MailboxError, MailboxSender, OverflowPolicy};

const IDLE_PARK: Duration = Duration::from_millis(250);

struct Inner<Ctx, C: Clock> {
    config: OrchestratorConfig,
    registry: MachineRegistry,
    registration_lock: AsyncMutex<()>,
    buses: Vec<Arc<AsyncMutex<EventBus<Ctx, C>>>>,
    bus_notifies: Vec<Arc<Notify>>,
    bus_shutdown: Vec<Arc<AtomicBool>>,
    bus_tasks: SyncMutex<Vec<JoinHandle<()>>>,
    subscriptions: SubscriptionRegistry,
    pending_dispatches: SyncMutex<HashMap<CorrelationId, oneshot::Sender<ConfigurationSnapshot>>>,
    dlq: Arc<DeadLetterQueue<C>>,
}

/// Adapts `Inner` to the seams `EventBus` calls into: deferred-send
/// routing and dispatch-completion notification. Holds only a `Weak`
/// reference — buses must not keep the orchestrator's state alive past
/// `Shutdown`, and constructing the buses needs a handle to `Inner`
/// before `Orchestrator::new` has an `Arc<Inner>` to hand out.
struct Sink<Ctx, C: Clock>(std::sync::Weak<Inner<Ctx, C>>);

#[async_trait]
impl<Ctx, C> DeferredSink for Sink<Ctx, C>
where
    Ctx: Clone + Send + Sync + 'static,
    C: Clock + Send + Sync + 'static,
{
    async fn deliver(&self, from: Option<MachineId>, to: MachineId, event: Event) {
        if let Some(inner) = self.0.upgrade() {
            inner.deliver_deferred(from, to, event).await;
        }
    }
}

impl<Ctx, C> DispatchObserver for Sink<Ctx, C>
where
    Ctx: Clone + Send + Sync + 'static,
    C: Clock + Send + Sync + 'static,
{
    fn on_dispatch_complete(&self, machine: &MachineId, correlation_id: Option<CorrelationId>, snapshot: &ConfigurationSnapshot) {
        if let Some(inner) = self.0.upgrade() {
            inner.resolve_pending(machine, correlation_id, snapshot);
            inner.publish_state_change(machine, snapshot);
        }
    }
}

impl<Ctx, C> Inner<Ctx, C>
where
    Ctx: Clone + Send + Sync + 'static,
    C: Clock + Send + Sync + 'static,
{
    async fn deliver_deferred(&self, from: Option<MachineId>, to: MachineId, event: Event) {
        let effect = Effect::DeferredSend { from: from.clone(), to: to.clone(), event: event.clone() };
        tracing::debug!(effect = effect.name(), fields = ?effect.fields(), "flushing deferred send");

        let published_from = from.clone().unwrap_or_else(|| to.clone());
        self.subscriptions.publish(&published_from, &event);

        let Some(entry) = self.registry.get(&to) else {
            self.dlq.push(from, to, event, FailureKind::UnrecoveredError, Some("target not registered".into()));
            return;
        };
        if let Some(from_id) = &from {
            if let Some(from_entry) = self.registry.get(from_id) {
                if from_entry.channel_group != entry.channel_group {
                    self.dlq.push(
                        from.clone(),
                        to,
                        event,
                        FailureKind::UnrecoveredError,
                        Some(format!(
                            "channel group mismatch: {} is in group {}, target is in group {}",
                            from_id, from_entry.channel_group, entry.channel_group
                        )),
                    );
                    return;
                }
            }
        }
        if let Err(err) = entry.sender.send(event.clone()).await {
            let kind = match err {
                MailboxError::Full => FailureKind::MailboxOverflow,
                MailboxError::Closed | MailboxError::Cancelled => FailureKind::UnrecoveredError,
            };
            self.dlq.push(from, to, event, kind, Some(err.to_string()));
        }
    }

    fn resolve_pending(&self, _machine: &MachineId, correlation_id: Option<CorrelationId>, snapshot: &ConfigurationSnapshot) {
        let Some(correlation_id) = correlation_id else { return };
        let sender = self.pending_dispatches.lock().remove(&correlation_id);
        if let Some(sender) = sender {
            let _ = sender.send(snapshot.clone());
        }
    }

    /// Publishes a `state_changed` notification on the machine's own
    /// topic after every dispatch settles, per `spec.md` §4.7 — this is
    /// the only way an external reader ever observes a live
    /// `Configuration`, and it's what lets `xsn-timeout`'s state-timeout
    /// supervisor watch state residency without touching the interpreter
    /// directly.
    fn publish_state_change(&self, machine_id: &MachineId, snapshot: &ConfigurationSnapshot) {
        let payload = serde_json::to_value(snapshot).unwrap_or(serde_json::Value::Null);
        let event = Event::new(EventName::state_changed()).with_payload(payload);
        self.subscriptions.publish(machine_id, &event);
    }
}

/// Orchestrates a fixed pool of `EventBus` workers across every machine
/// registered to it. Cheaply `Clone`-able — internally an `Arc`.
pub struct Orchestrator<Ctx, C: Clock> {
    inner: Arc<Inner<Ctx, C>>,
}

impl<Ctx, C: Clock> Clone for Orchestrator<Ctx, C> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<Ctx, C> Orchestrator<Ctx, C>
where
    Ctx: Clone + Send + Sync + 'static,
    C: Clock + Send + Sync + 'static,
{
    pub fn new(config: OrchestratorConfig, clock: C) -> Self {
        let bus_count = config.bus_count.max(1);
        let mut bus_notifies = Vec::with_capacity(bus_count);
        let mut bus_shutdown = Vec::with_capacity(bus_count);
        for _ in 0..bus_count {
            bus_notifies.push(Arc::new(Notify::new()));
            bus_shutdown.push(Arc::new(AtomicBool::new(false)));
        }

        let dlq = Arc::new(DeadLetterQueue::new(config.dlq_capacity, clock));

        let inner = Arc::new_cyclic(|weak: &std::sync::Weak<Inner<Ctx, C>>| {
            let sink: Arc<Sink<Ctx, C>> = Arc::new(Sink(weak.clone()));
            let buses = bus_notifies
                .iter()
                .map(|notify| {
                    let bus: EventBus<Ctx, C> =
                        EventBus::new(notify.clone(), sink.clone()).with_observer(sink.clone());
                    Arc::new(AsyncMutex::new(bus))
                })
                .collect();
            Inner {
                config,
                registry: MachineRegistry::new(),
                registration_lock: AsyncMutex::new(()),
                buses,
                bus_notifies: bus_notifies.clone(),
                bus_shutdown: bus_shutdown.clone(),
                bus_tasks: SyncMutex::new(Vec::new()),
                subscriptions: SubscriptionRegistry::new(),
                pending_dispatches: SyncMutex::new(HashMap::new()),
                dlq,
            }
        });

        let orchestrator = Self { inner };
        orchestrator.spawn_bus_tasks();
        orchestrator
    }

    fn spawn_bus_tasks(&self) {
        let mut tasks = self.inner.bus_tasks.lock();
        for (bus, (notify, shutdown)) in self
            .inner
            .buses
            .iter()
            .zip(self.inner.bus_notifies.iter().zip(self.inner.bus_shutdown.iter()))
        {
            let bus = bus.clone();
            let notify = notify.clone();
            let shutdown = shutdown.clone();
            tasks.push(tokio::spawn(async move {
                loop {
                    if shutdown.load(Ordering::SeqCst) {
                        return;
                    }
                    let delivered = {
                        let mut guard = bus.lock().await;
                        guard.drain_pass().await
                    };
                    if !delivered {
                        if shutdown.load(Ordering::SeqCst) {
                            return;
                        }
                        tokio::select! {
                            _ = notify.notified() => {}
                            _ = tokio::time::sleep(IDLE_PARK) => {}
                        }
                    }
                }
            }));
        }
    }

    pub fn dlq(&self) -> Arc<DeadLetterQueue<C>> {
        self.inner.dlq.clone()
    }

    pub fn subscribe(&self, filter: Filter) -> SubscriptionHandle {
        self.inner.subscriptions.subscribe(filter)
    }

    pub fn unsubscribe(&self, id: &SubscriptionId) -> bool {
        self.inner.subscriptions.unsubscribe(id)
    }

    /// `RegisterMachine(id, machine, channelGroup?)`.
    pub async fn register_machine(
        &self,
        machine_id: MachineId,
        definition: Arc<MachineDefinition>,
        resolver: Arc<dyn Resolver<Ctx>>,
        clock: C,
        context: Ctx,
        channel_group: i64,
    ) -> Result<(), OrchestratorError> {
        let _guard = self.inner.registration_lock.lock().await;
        if self.inner.registry.contains(&machine_id) {
            return Err(OrchestratorError::DuplicateId(machine_id));
        }

        let bus_index = assign_bus(&machine_id, self.inner.config.bus_count);
        let notify = self.inner.bus_notifies[bus_index].clone();
        let (sender, mut receiver) = Mailbox::bounded(
            self.inner.config.mailbox_capacity,
            self.inner.config.overflow_policy,
            tokio_util::sync::CancellationToken::new(),
            notify,
        );
        let rx = receiver.take();

        let interpreter = Interpreter::new(
            machine_id.clone(),
            definition,
            resolver,
            clock,
            context,
            Arc::new(MailboxSink(sender.clone())),
        )
        .with_max_eventless_microsteps(self.inner.config.max_eventless_microsteps);

        let slot = BusSlot::new(rx, interpreter, sender.clone());
        {
            let mut bus = self.inner.buses[bus_index].lock().await;
            bus.register(slot).await.map_err(|_| OrchestratorError::DuplicateId(machine_id.clone()))?;
        }

        self.inner.registry.insert(machine_id, RegistryEntry { bus_index, channel_group, sender });
        Ok(())
    }

    /// `UnregisterMachine(id)`. `drain` is currently always effectively
    /// `cancel` — the bus stops the interpreter (cancelling its owned
    /// resources) immediately rather than waiting out the mailbox; a
    /// true `drain` policy is future work (see DESIGN.md).
    pub async fn unregister_machine(&self, machine_id: &MachineId) -> Result<(), OrchestratorError> {
        let _guard = self.inner.registration_lock.lock().await;
        let entry = self
            .inner
            .registry
            .remove(machine_id)
            .ok_or_else(|| OrchestratorError::TargetNotFound(machine_id.clone()))?;
        let mut bus = self.inner.buses[entry.bus_index].lock().await;
        let _ = bus.unregister(machine_id).await;
        Ok(())
    }

    /// `Route(envelope)`: used internally by buses via `DeferredSink`,
    /// and exposed here for hosts that want to inject a routed send
    /// without going through `SendEventAsync`'s waiting semantics.
    pub async fn route(&self, from: Option<MachineId>, to: MachineId, event: Event) -> Result<(), RouteError> {
        if let Some(from_id) = &from {
            if let (Some(from_entry), Some(to_entry)) = (self.inner.registry.get(from_id), self.inner.registry.get(&to)) {
                if from_entry.channel_group != to_entry.channel_group {
                    return Err(RouteError::ChannelGroupMismatch {
                        from: from_id.clone(),
                        to,
                        from_group: from_entry.channel_group,
                        to_group: to_entry.channel_group,
                    });
                }
            }
        }
        let Some(entry) = self.inner.registry.get(&to) else {
            return Err(RouteError::TargetNotFound(to));
        };
        entry
            .sender
            .send(event)
            .await
            .map_err(|_| RouteError::TargetNotFound(to))
    }

    /// `SendEventAsync(fromId?, toId, name, payload?, correlationId?, waitForDispatch?, timeout?)`.
    pub async fn send_event_async(
        &self,
        from: Option<MachineId>,
        to: MachineId,
        mut event: Event,
        wait_for_dispatch: bool,
        timeout: Option<Duration>,
    ) -> SendResult {
        if let Some(from_id) = &from {
            if let (Some(from_entry), Some(to_entry)) = (self.inner.registry.get(from_id), self.inner.registry.get(&to)) {
                if from_entry.channel_group != to_entry.channel_group {
                    return SendResult::rejected();
                }
            }
        }
        let Some(entry) = self.inner.registry.get(&to) else {
            return SendResult::target_not_found();
        };

        if !wait_for_dispatch {
            return match entry.sender.send(event).await {
                Ok(()) => SendResult::delivered(),
                Err(_) => SendResult::cancelled(),
            };
        }

        let correlation_id = event.correlation_id.clone().unwrap_or_default();
        event = event.with_correlation_id(correlation_id.clone());
        let (tx, rx) = oneshot::channel();
        self.inner.pending_dispatches.lock().insert(correlation_id.clone(), tx);

        if entry.sender.send(event).await.is_err() {
            self.inner.pending_dispatches.lock().remove(&correlation_id);
            return SendResult::cancelled();
        }

        let wait = async { rx.await };
        let outcome = match timeout {
            Some(duration) => tokio::time::timeout(duration, wait).await,
            None => Ok(wait.await),
        };
        match outcome {
            Ok(Ok(snapshot)) => SendResult::dispatched(digest_snapshot(&snapshot)),
            Ok(Err(_)) => SendResult::cancelled(),
            Err(_) => {
                self.inner.pending_dispatches.lock().remove(&correlation_id);
                SendResult::timed_out()
            }
        }
    }

    /// `Shutdown(graceful, grace?)`: stops every bus's drain loop,
    /// cancels each machine's owned resources, and waits up to `grace`
    /// (default `shutdownGrace`) for the bus tasks to exit.
    pub async fn shutdown(&self, grace: Option<Duration>) {
        let grace = grace.unwrap_or(self.inner.config.shutdown_grace);
        for flag in &self.inner.bus_shutdown {
            flag.store(true, Ordering::SeqCst);
        }
        for notify in &self.inner.bus_notifies {
            notify.notify_waiters();
        }

        let tasks: Vec<JoinHandle<()>> = std::mem::take(&mut *self.inner.bus_tasks.lock());
        for task in tasks {
            if tokio::time::timeout(grace, task).await.is_err() {
                tracing::warn!("bus task did not stop within shutdown grace period");
            }
        }

        for machine_id in self.inner.registry.machine_ids() {
            let _ = self.unregister_machine(&machine_id).await;
        }
    }
}
