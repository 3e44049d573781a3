// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The statechart interpreter: `Start`, `Dispatch`, `Stop`, and the
//! ten-step transition-selection algorithm that backs `Dispatch`.

use crate::context::{ActionContext, GuardContext};
use crate::error::InterpreterError;
use crate::resolver::Resolver;
use crate::sink::SelfSink;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use xsn_core::{
    ActivityId, Clock, Configuration, ConfigurationSnapshot, Event, EventName, HistoryType, InvokeId,
    MachineDefinition, MachineId, StateId, StateKind, TimerId,
};

const DEFAULT_MAX_EVENTLESS_MICROSTEPS: usize = 100;

/// `uninitialized -> running -> stopped`, per `spec.md` §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineStatus {
    Uninitialized,
    Running,
    Stopped { error: bool },
}

/// One transition that fired during a dispatch, recorded for observability
/// and for the transition-determinism test (testable property 4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiredTransition {
    pub source: StateId,
    pub event: String,
    pub targets: Vec<StateId>,
}

/// The outcome of `Start`/`Dispatch`/`Stop`.
#[derive(Debug, Clone)]
pub struct DispatchResult {
    pub snapshot: ConfigurationSnapshot,
    pub fired_transitions: Vec<FiredTransition>,
    /// Cross-machine sends requested by actions during this dispatch,
    /// to be routed by the bus only now that the dispatch has returned.
    pub deferred_sends: Vec<(MachineId, MachineId, Event)>,
    /// Timers the bus must now actually schedule (start a sleep that,
    /// on fire, re-enqueues the named event into this machine's mailbox).
    pub timers_to_start: Vec<(TimerId, Duration, Event)>,
    pub timers_to_cancel: Vec<TimerId>,
    pub error: Option<InterpreterError>,
}

struct Selected {
    source: StateId,
    transition: xsn_core::Transition,
}

/// A running statechart instance. `Ctx` is the host's opaque context data,
/// read by guards and read/written by actions; `C` is the `Clock` used for
/// every timestamp this interpreter produces.
pub struct Interpreter<Ctx, C: Clock> {
    machine_id: MachineId,
    definition: Arc<MachineDefinition>,
    resolver: Arc<dyn Resolver<Ctx>>,
    clock: C,
    context: Ctx,
    configuration: Configuration,
    timer_tokens: HashMap<TimerId, CancellationToken>,
    service_tokens: HashMap<InvokeId, CancellationToken>,
    activity_tokens: HashMap<ActivityId, CancellationToken>,
    max_eventless_microsteps: usize,
    status: MachineStatus,
    shutdown: CancellationToken,
    self_sink: Arc<dyn SelfSink>,
}

impl<Ctx, C: Clock> Interpreter<Ctx, C>
where
    Ctx: Clone + Send + Sync + 'static,
{
    pub fn new(
        machine_id: MachineId,
        definition: Arc<MachineDefinition>,
        resolver: Arc<dyn Resolver<Ctx>>,
        clock: C,
        context: Ctx,
        self_sink: Arc<dyn SelfSink>,
    ) -> Self {
        Self {
            machine_id,
            definition,
            resolver,
            clock,
            context,
            configuration: Configuration::new(),
            timer_tokens: HashMap::new(),
            service_tokens: HashMap::new(),
            activity_tokens: HashMap::new(),
            max_eventless_microsteps: DEFAULT_MAX_EVENTLESS_MICROSTEPS,
            status: MachineStatus::Uninitialized,
            shutdown: CancellationToken::new(),
            self_sink,
        }
    }

    pub fn with_max_eventless_microsteps(mut self, max: usize) -> Self {
        self.max_eventless_microsteps = max;
        self
    }

    pub fn machine_id(&self) -> &MachineId {
        &self.machine_id
    }

    pub fn status(&self) -> MachineStatus {
        self.status
    }

    pub fn context(&self) -> &Ctx {
        &self.context
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn snapshot(&self) -> ConfigurationSnapshot {
        self.configuration.snapshot(&self.definition)
    }

    /// A child token of this machine's shutdown token; cancelling the
    /// machine cancels every timer/service/activity it owns in one call.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Enter the initial descendants of root. Per the open-question
    /// resolution in `spec.md` §9, eventless transitions ARE considered
    /// during `Start`, up to `max_eventless_microsteps`.
    pub async fn start(&mut self) -> DispatchResult {
        let root = self.definition.root_state.clone();
        let mut entry_path = vec![root.clone()];
        entry_path.extend(default_descent(&self.definition, &root, &self.configuration.history_memory));

        let mut result = DispatchResult {
            snapshot: self.configuration.snapshot(&self.definition),
            fired_transitions: Vec::new(),
            deferred_sends: Vec::new(),
            timers_to_start: Vec::new(),
            timers_to_cancel: Vec::new(),
            error: None,
        };
        self.enter_states(&entry_path, &Event::eventless(), &mut result).await;
        self.status = MachineStatus::Running;
        self.run_eventless_to_fixed_point(&mut result).await;
        result.snapshot = self.configuration.snapshot(&self.definition);
        result
    }

    /// Apply one externally supplied event, then drain eventless
    /// transitions to a fixed point (the macrostep).
    pub async fn dispatch(&mut self, event: Event) -> DispatchResult {
        let mut result = DispatchResult {
            snapshot: self.configuration.snapshot(&self.definition),
            fired_transitions: Vec::new(),
            deferred_sends: Vec::new(),
            timers_to_start: Vec::new(),
            timers_to_cancel: Vec::new(),
            error: None,
        };
        self.apply_one_microstep(&event, &mut result).await;
        if !matches!(self.status, MachineStatus::Stopped { .. }) {
            self.run_eventless_to_fixed_point(&mut result).await;
        }
        result.snapshot = self.configuration.snapshot(&self.definition);
        result
    }

    /// Exit every active state leaf-first, cancelling all owned resources.
    pub async fn stop(&mut self) -> DispatchResult {
        let mut result = DispatchResult {
            snapshot: self.configuration.snapshot(&self.definition),
            fired_transitions: Vec::new(),
            deferred_sends: Vec::new(),
            timers_to_start: Vec::new(),
            timers_to_cancel: Vec::new(),
            error: None,
        };
        let mut active: Vec<StateId> = self.configuration.active_states.iter().cloned().collect();
        active.sort_by_key(|id| std::cmp::Reverse(self.definition.ancestors(id).len()));
        self.exit_states(&active, &Event::eventless(), &mut result).await;
        self.shutdown.cancel();
        self.status = MachineStatus::Stopped { error: false };
        result.snapshot = self.configuration.snapshot(&self.definition);
        result
    }

    async fn run_eventless_to_fixed_point(&mut self, result: &mut DispatchResult) {
        let eventless = Event::eventless();
        for _ in 0..self.max_eventless_microsteps {
            let before = self.configuration.active_states.clone();
            self.apply_one_microstep(&eventless, result).await;
            if matches!(self.status, MachineStatus::Stopped { .. }) {
                return;
            }
            if self.configuration.active_states == before {
                return;
            }
        }
        result.error = Some(InterpreterError::MicrostepLimit { limit: self.max_eventless_microsteps });
        self.status = MachineStatus::Stopped { error: true };
    }

    async fn apply_one_microstep(&mut self, event: &Event, result: &mut DispatchResult) {
        let selected = self.select_transitions(event.name.as_str());
        if selected.is_empty() {
            return;
        }

        let mut exit_union: BTreeSet<StateId> = BTreeSet::new();
        let mut accepted: Vec<Selected> = Vec::new();
        for sel in selected {
            if sel.transition.internal {
                accepted.push(sel);
                continue;
            }
            let domain = transition_domain(&self.definition, &sel.source, &sel.transition.targets);
            let exits = exit_set(&self.definition, &self.configuration, &domain);
            if exits.is_disjoint(&exit_union) {
                exit_union.extend(exits);
                accepted.push(sel);
            } else {
                tracing::warn!(
                    source = %sel.source,
                    event = event.name.as_str(),
                    "dropping conflicting parallel-region transition (first-wins policy)"
                );
            }
        }

        for sel in accepted {
            self.fire(sel, event, result).await;
        }
    }

    async fn fire(&mut self, selected: Selected, event: &Event, result: &mut DispatchResult) {
        let Selected { source, transition } = selected;

        if transition.internal {
            self.run_actions(&transition.actions, event, result).await;
            result.fired_transitions.push(FiredTransition {
                source,
                event: transition.event.clone(),
                targets: transition.targets.clone(),
            });
            return;
        }

        let domain = transition_domain(&self.definition, &source, &transition.targets);
        let exits = exit_set(&self.definition, &self.configuration, &domain);
        let mut exit_list: Vec<StateId> = exits.into_iter().collect();
        exit_list.sort_by_key(|id| std::cmp::Reverse(self.definition.ancestors(id).len()));

        record_history(&self.definition, &mut self.configuration, &exit_list);
        self.exit_states(&exit_list, event, result).await;
        self.run_actions(&transition.actions, event, result).await;

        let mut entry_path: Vec<StateId> = Vec::new();
        let mut seen = HashSet::new();
        for target in &transition.targets {
            for id in entry_closure(&self.definition, target, &domain, &self.configuration.history_memory) {
                if seen.insert(id.clone()) {
                    entry_path.push(id);
                }
            }
        }
        self.enter_states(&entry_path, event, result).await;

        if self.configuration.is_active(&self.definition.root_state) {
            self.check_for_completion();
        }

        result.fired_transitions.push(FiredTransition {
            source,
            event: transition.event.clone(),
            targets: transition.targets.clone(),
        });
    }

    fn check_for_completion(&mut self) {
        let root = self.definition.root();
        if root.is_final() {
            self.status = MachineStatus::Stopped { error: false };
        }
    }

    fn select_transitions(&self, event_name: &str) -> Vec<Selected> {
        let leaves = active_leaves(&self.definition, &self.configuration);
        let mut by_source: Vec<Selected> = Vec::new();
        let mut claimed_sources = HashSet::new();

        for leaf in leaves {
            let chain = ancestor_chain_incl_self(&self.definition, &leaf);
            for state_id in chain.iter().rev() {
                if claimed_sources.contains(state_id) {
                    break;
                }
                let Some(node) = self.definition.state(state_id) else { continue };
                if let Some(transition) = self.first_enabled(node, event_name) {
                    claimed_sources.insert(state_id.clone());
                    by_source.push(Selected { source: state_id.clone(), transition });
                    break;
                }
            }
        }
        by_source
    }

    fn first_enabled(&self, node: &xsn_core::StateNode, event_name: &str) -> Option<xsn_core::Transition> {
        for transition in &node.transitions {
            if transition.event != event_name {
                continue;
            }
            if self.guards_pass(&transition.guards, event_name) {
                return Some(transition.clone());
            }
        }
        for (delay, transition) in &node.after_transitions {
            if EventName::after(delay.as_str()).as_str() != event_name {
                continue;
            }
            if self.guards_pass(&transition.guards, event_name) {
                return Some(transition.clone());
            }
        }
        None
    }

    fn guards_pass(&self, guards: &[xsn_core::GuardRef], event_name: &str) -> bool {
        let guard_ctx = GuardContext { data: &self.context, machine_id: &self.machine_id };
        for guard_ref in guards {
            let Some(guard) = self.resolver.guard(guard_ref.as_str()) else {
                tracing::warn!(guard = %guard_ref, "unresolved guard treated as false");
                return false;
            };
            let event = Event::new(event_name);
            match guard.check(&guard_ctx, &event) {
                Ok(true) => continue,
                Ok(false) => return false,
                Err(err) => {
                    tracing::warn!(guard = %guard_ref, error = %err, "guard error, treated as false");
                    return false;
                }
            }
        }
        true
    }

    async fn exit_states(&mut self, states: &[StateId], event: &Event, result: &mut DispatchResult) {
        for state_id in states {
            self.cancel_owned_resources(state_id, result);
            if let Some(node) = self.definition.state(state_id).cloned() {
                self.run_actions(&node.exit_actions, event, result).await;
            }
            self.configuration.active_states.remove(state_id);
        }
    }

    async fn enter_states(&mut self, states: &[StateId], event: &Event, result: &mut DispatchResult) {
        for state_id in states {
            self.configuration.active_states.insert(state_id.clone());
            if let Some(node) = self.definition.state(state_id).cloned() {
                self.run_actions(&node.entry_actions, event, result).await;
                self.start_owned_resources(&node, result);
            }
        }
    }

    async fn run_actions(&mut self, actions: &[xsn_core::ActionRef], event: &Event, result: &mut DispatchResult) {
        for action_ref in actions {
            let Some(action) = self.resolver.action(action_ref.as_str()) else {
                tracing::warn!(action = %action_ref, "unresolved action, skipped");
                continue;
            };
            let mut ctx = ActionContext::new(&mut self.context, &self.machine_id);
            let outcome = action.run(&mut ctx, event).await;
            result.deferred_sends.extend(ctx.into_deferred_sends());
            if let Err(err) = outcome {
                tracing::warn!(action = %action_ref, error = %err, "action failed, routing error.execution");
                let error_event = Event::new(EventName::error_execution())
                    .with_payload(serde_json::json!({ "action": action_ref.0, "message": err.message }));
                Box::pin(self.apply_one_microstep(&error_event, result)).await;
            }
        }
    }

    fn cancel_owned_resources(&mut self, state_id: &StateId, result: &mut DispatchResult) {
        let to_cancel: Vec<TimerId> = self
            .configuration
            .pending_timers
            .iter()
            .filter(|((owner, _), _)| owner == state_id)
            .map(|(_, id)| *id)
            .collect();
        for timer_id in to_cancel {
            if let Some(token) = self.timer_tokens.remove(&timer_id) {
                token.cancel();
            }
            self.configuration.pending_timers.retain(|_, v| v != &timer_id);
            result.timers_to_cancel.push(timer_id);
        }

        let services: Vec<InvokeId> = self
            .configuration
            .running_services
            .iter()
            .filter(|(_, owner)| *owner == state_id)
            .map(|(id, _)| *id)
            .collect();
        for invoke_id in services {
            if let Some(token) = self.service_tokens.remove(&invoke_id) {
                token.cancel();
            }
            self.configuration.running_services.remove(&invoke_id);
        }

        let activities: Vec<ActivityId> = self
            .configuration
            .running_activities
            .iter()
            .filter(|(_, owner)| *owner == state_id)
            .map(|(id, _)| *id)
            .collect();
        for activity_id in activities {
            if let Some(token) = self.activity_tokens.remove(&activity_id) {
                token.cancel();
            }
            self.configuration.running_activities.remove(&activity_id);
        }
    }

    fn start_owned_resources(&mut self, node: &xsn_core::StateNode, result: &mut DispatchResult) {
        for (delay, _transition) in &node.after_transitions {
            let duration = self.resolver.delay(delay.as_str()).unwrap_or(Duration::from_secs(0));
            let timer_id = TimerId::new();
            let token = self.shutdown.child_token();
            self.timer_tokens.insert(timer_id, token);
            self.configuration.pending_timers.insert((node.id.clone(), delay.to_string()), timer_id);
            result.timers_to_start.push((timer_id, duration, Event::new(EventName::after(delay.as_str()))));
        }

        for service_ref in &node.invokes {
            let invoke_id = InvokeId::new();
            let token = self.shutdown.child_token();
            self.service_tokens.insert(invoke_id, token.clone());
            self.configuration.running_services.insert(invoke_id, node.id.clone());
            match self.resolver.service(service_ref.as_str()) {
                Some(service) => {
                    let data = self.context.clone();
                    let sink = self.self_sink.clone();
                    tokio::spawn(async move {
                        tokio::select! {
                            _ = token.cancelled() => {
                                tracing::debug!(invoke_id = %invoke_id, "invoked service cancelled on state exit");
                            }
                            outcome = service.invoke(data, serde_json::Value::Null) => {
                                let event = match outcome {
                                    Ok(value) => Event::new(EventName::done_invoke(&invoke_id)).with_payload(value),
                                    Err(err) => Event::new(EventName::error_platform(&invoke_id))
                                        .with_payload(serde_json::json!({ "message": err.message })),
                                };
                                sink.enqueue(event);
                            }
                        }
                    });
                }
                None => {
                    tracing::warn!(service = %service_ref, "unresolved service, not started");
                }
            }
        }

        for activity_ref in &node.activities {
            let activity_id = ActivityId::new();
            let token = self.shutdown.child_token();
            self.activity_tokens.insert(activity_id, token.clone());
            self.configuration.running_activities.insert(activity_id, node.id.clone());
            match self.resolver.activity(activity_ref.as_str()) {
                Some(activity) => {
                    let data = self.context.clone();
                    tokio::spawn(async move {
                        tokio::select! {
                            _ = token.cancelled() => {
                                tracing::debug!(activity_id = %activity_id, "activity cancelled on state exit");
                            }
                            outcome = activity.run(data) => {
                                if let Err(err) = outcome {
                                    tracing::warn!(activity = %activity_id, error = %err, "activity exited with error");
                                }
                            }
                        }
                    });
                }
                None => {
                    tracing::warn!(activity = %activity_ref, "unresolved activity, not started");
                }
            }
        }
    }
}

fn ancestor_chain_incl_self(definition: &MachineDefinition, id: &StateId) -> Vec<StateId> {
    let mut chain: Vec<StateId> = definition.ancestors(id).into_iter().cloned().collect();
    chain.reverse();
    chain.push(id.clone());
    chain
}

fn lca(definition: &MachineDefinition, ids: &[StateId]) -> StateId {
    let chains: Vec<Vec<StateId>> = ids.iter().map(|id| ancestor_chain_incl_self(definition, id)).collect();
    let min_len = chains.iter().map(|c| c.len()).min().unwrap_or(0);
    let mut idx = 0;
    for i in 0..min_len {
        if chains.iter().all(|c| c[i] == chains[0][i]) {
            idx = i;
        } else {
            break;
        }
    }
    chains[0].get(idx).cloned().unwrap_or_else(|| definition.root_state.clone())
}

fn transition_domain(definition: &MachineDefinition, source: &StateId, targets: &[StateId]) -> StateId {
    if targets.is_empty() {
        return source.clone();
    }
    let mut ids = vec![source.clone()];
    ids.extend(targets.iter().cloned());
    lca(definition, &ids)
}

fn exit_set(definition: &MachineDefinition, configuration: &Configuration, domain: &StateId) -> BTreeSet<StateId> {
    configuration
        .active_states
        .iter()
        .filter(|id| *id != domain && definition.is_ancestor_or_self(domain, id))
        .cloned()
        .collect()
}

fn active_leaves(definition: &MachineDefinition, configuration: &Configuration) -> Vec<StateId> {
    let mut leaves: Vec<StateId> = configuration.active_leaves(definition).into_iter().collect();
    leaves.sort_by_key(|id| document_index(definition, id));
    leaves
}

fn document_index(definition: &MachineDefinition, id: &StateId) -> usize {
    definition.states().position(|n| &n.id == id).unwrap_or(usize::MAX)
}

fn active_leaves_under(
    definition: &MachineDefinition,
    configuration: &Configuration,
    ancestor: &StateId,
) -> BTreeSet<StateId> {
    configuration
        .active_states
        .iter()
        .filter(|id| {
            definition.is_ancestor_or_self(ancestor, id)
                && definition
                    .state(id)
                    .map(|node| !node.children.iter().any(|c| configuration.is_active(c)))
                    .unwrap_or(false)
        })
        .cloned()
        .collect()
}

fn record_history(definition: &MachineDefinition, configuration: &mut Configuration, exit_list: &[StateId]) {
    for state_id in exit_list {
        let Some(node) = definition.state(state_id) else { continue };
        for child_id in &node.children {
            let Some(child) = definition.state(child_id) else { continue };
            if let StateKind::History { history_type, .. } = &child.kind {
                let recorded = match history_type {
                    HistoryType::Shallow => node
                        .children
                        .iter()
                        .filter(|c| configuration.is_active(c))
                        .cloned()
                        .collect::<BTreeSet<_>>(),
                    HistoryType::Deep => active_leaves_under(definition, configuration, state_id),
                };
                configuration.history_memory.insert(child_id.clone(), recorded);
            }
        }
    }
}

fn default_descent(
    definition: &MachineDefinition,
    id: &StateId,
    history_memory: &HashMap<StateId, BTreeSet<StateId>>,
) -> Vec<StateId> {
    let Some(node) = definition.state(id) else { return Vec::new() };
    match &node.kind {
        StateKind::Atomic | StateKind::Final => Vec::new(),
        StateKind::Compound { initial_child } => {
            let mut out = vec![initial_child.clone()];
            out.extend(default_descent(definition, initial_child, history_memory));
            out
        }
        StateKind::Parallel => {
            let mut out = Vec::new();
            for child in &node.children {
                out.push(child.clone());
                out.extend(default_descent(definition, child, history_memory));
            }
            out
        }
        StateKind::History { default_target, .. } => match history_memory.get(id) {
            Some(leaves) if !leaves.is_empty() => {
                let mut out = Vec::new();
                let parent = node.parent.clone();
                for leaf in leaves {
                    let chain = ancestor_chain_incl_self(definition, leaf);
                    let start = parent
                        .as_ref()
                        .and_then(|p| chain.iter().position(|s| s == p))
                        .map(|idx| idx + 1)
                        .unwrap_or(0);
                    for item in &chain[start..] {
                        if !out.contains(item) {
                            out.push(item.clone());
                        }
                    }
                }
                out
            }
            _ => {
                let mut out = vec![default_target.clone()];
                out.extend(default_descent(definition, default_target, history_memory));
                out
            }
        },
    }
}

fn entry_closure(
    definition: &MachineDefinition,
    target: &StateId,
    domain: &StateId,
    history_memory: &HashMap<StateId, BTreeSet<StateId>>,
) -> Vec<StateId> {
    let chain = ancestor_chain_incl_self(definition, target);
    let mut path = match chain.iter().position(|s| s == domain) {
        Some(idx) => chain[idx + 1..].to_vec(),
        None => chain,
    };
    // A history pseudo-state is never itself an active state (`spec.md`
    // §3) — drop it from the entered path and let `default_descent`
    // resolve its remembered or default real descendants instead.
    if matches!(definition.state(target).map(|n| &n.kind), Some(StateKind::History { .. })) {
        path.pop();
    }
    path.extend(default_descent(definition, target, history_memory));
    path
}

#[cfg(test)]
#[path = "interpreter_tests.rs"]
mod tests;
