// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The immutable machine definition: states, transitions, actions, guards,
//! services, delays and activities as loaded from the host. Nothing in
//! this module consults action/guard/service bodies — those are resolved
//! against a host-supplied resolver only once an interpreter is built.

use crate::error::DefinitionError;
use crate::refs::{ActionRef, ActivityRef, DelayRef, GuardRef, ServiceRef};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// A fully-qualified state id, e.g. `root.a.b`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateId(pub String);

impl StateId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StateId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for StateId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// The shape of a history pseudo-state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistoryType {
    Shallow,
    Deep,
}

/// Tagged variant over the kinds a [`StateNode`] can take. Matches the
/// re-architecture guidance of modeling state kinds as a tagged union
/// rather than an inheritance chain: the interpreter pattern-matches on
/// this tag instead of dispatching through virtual methods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateKind {
    Atomic,
    Compound { initial_child: StateId },
    Parallel,
    Final,
    History { history_type: HistoryType, default_target: StateId },
}

/// A single transition definition: which event triggers it, what it
/// targets, which guards gate it, and which actions it runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    /// Empty string names the eventless ("always") transition.
    pub event: String,
    /// Ordered; empty means an internal/self transition with no target.
    pub targets: Vec<StateId>,
    /// All must hold, evaluated left-to-right.
    pub guards: Vec<GuardRef>,
    /// Executed between exit and entry, in definition order.
    pub actions: Vec<ActionRef>,
    /// If true, no exit/entry of the source compound is performed.
    pub internal: bool,
}

impl Transition {
    pub fn new(event: impl Into<String>) -> Self {
        Self { event: event.into(), targets: Vec::new(), guards: Vec::new(), actions: Vec::new(), internal: false }
    }

    pub fn is_eventless(&self) -> bool {
        self.event.is_empty()
    }

    pub fn with_target(mut self, target: impl Into<StateId>) -> Self {
        self.targets.push(target.into());
        self
    }

    pub fn with_guard(mut self, guard: impl Into<GuardRef>) -> Self {
        self.guards.push(guard.into());
        self
    }

    pub fn with_action(mut self, action: impl Into<ActionRef>) -> Self {
        self.actions.push(action.into());
        self
    }

    pub fn internal(mut self) -> Self {
        self.internal = true;
        self
    }
}

/// One node in the state tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateNode {
    pub id: StateId,
    pub kind: StateKind,
    pub parent: Option<StateId>,
    /// Ordered; the order affects entry order in parallel regions and
    /// document-order priority among sibling transitions.
    pub children: Vec<StateId>,
    pub entry_actions: Vec<ActionRef>,
    pub exit_actions: Vec<ActionRef>,
    /// Document order = priority among siblings.
    pub transitions: Vec<Transition>,
    pub invokes: Vec<ServiceRef>,
    pub activities: Vec<ActivityRef>,
    /// Ordered so that evaluation/reporting order is deterministic.
    pub after_transitions: Vec<(DelayRef, Transition)>,
}

impl StateNode {
    pub fn new(id: impl Into<StateId>, kind: StateKind) -> Self {
        Self {
            id: id.into(),
            kind,
            parent: None,
            children: Vec::new(),
            entry_actions: Vec::new(),
            exit_actions: Vec::new(),
            transitions: Vec::new(),
            invokes: Vec::new(),
            activities: Vec::new(),
            after_transitions: Vec::new(),
        }
    }

    pub fn is_parallel(&self) -> bool {
        matches!(self.kind, StateKind::Parallel)
    }

    pub fn is_compound(&self) -> bool {
        matches!(self.kind, StateKind::Compound { .. })
    }

    pub fn is_atomic(&self) -> bool {
        matches!(self.kind, StateKind::Atomic)
    }

    pub fn is_final(&self) -> bool {
        matches!(self.kind, StateKind::Final)
    }

    pub fn history(&self) -> Option<(HistoryType, &StateId)> {
        match &self.kind {
            StateKind::History { history_type, default_target } => Some((*history_type, default_target)),
            _ => None,
        }
    }

    pub fn initial_child(&self) -> Option<&StateId> {
        match &self.kind {
            StateKind::Compound { initial_child } => Some(initial_child),
            _ => None,
        }
    }
}

/// Immutable, validated machine definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineDefinition {
    pub id: String,
    pub root_state: StateId,
    states: IndexMap<StateId, StateNode>,
}

impl MachineDefinition {
    /// Build and validate a machine definition. Returns the first
    /// `DefinitionError` encountered; definition errors are always fatal
    /// and must bubble up at load time, never at runtime.
    pub fn new(
        id: impl Into<String>,
        root_state: impl Into<StateId>,
        states: Vec<StateNode>,
    ) -> Result<Self, DefinitionError> {
        let root_state = root_state.into();
        let mut map = IndexMap::with_capacity(states.len());
        for state in states {
            if map.insert(state.id.clone(), state).is_some() {
                return Err(DefinitionError::DuplicateStateId {
                    state: map.get_index(map.len() - 1).map(|(k, _)| k.to_string()).unwrap_or_default(),
                });
            }
        }
        let definition = Self { id: id.into(), root_state, states: map };
        definition.validate()?;
        Ok(definition)
    }

    pub fn state(&self, id: &StateId) -> Option<&StateNode> {
        self.states.get(id)
    }

    pub fn root(&self) -> &StateNode {
        // Validated at construction: root_state always resolves.
        &self.states[&self.root_state]
    }

    pub fn states(&self) -> impl Iterator<Item = &StateNode> {
        self.states.values()
    }

    fn validate(&self) -> Result<(), DefinitionError> {
        if !self.states.contains_key(&self.root_state) {
            return Err(DefinitionError::UndefinedRootState { root: self.root_state.to_string() });
        }

        for state in self.states.values() {
            match &state.kind {
                StateKind::Compound { initial_child } => {
                    if !state.children.contains(initial_child) {
                        return Err(DefinitionError::UndefinedInitialChild {
                            state: state.id.to_string(),
                            child: initial_child.to_string(),
                        });
                    }
                }
                StateKind::History { default_target, .. } => {
                    if !self.states.contains_key(default_target) {
                        return Err(DefinitionError::MissingHistoryDefault { state: state.id.to_string() });
                    }
                }
                _ => {}
            }

            for transition in state.transitions.iter().chain(state.after_transitions.iter().map(|(_, t)| t)) {
                for target in &transition.targets {
                    if !self.states.contains_key(target) {
                        return Err(DefinitionError::UndefinedTarget {
                            source: state.id.to_string(),
                            target: target.to_string(),
                        });
                    }
                }
            }
        }

        self.check_initial_child_cycles()?;
        Ok(())
    }

    fn check_initial_child_cycles(&self) -> Result<(), DefinitionError> {
        let mut visited = HashSet::new();
        let mut stack = HashSet::new();
        let mut current = &self.root_state;
        loop {
            if stack.contains(current) {
                return Err(DefinitionError::InitialChildCycle { state: current.to_string() });
            }
            if !visited.insert(current.clone()) {
                break;
            }
            stack.insert(current.clone());
            let Some(node) = self.states.get(current) else { break };
            match node.initial_child() {
                Some(child) => current = child,
                None => break,
            }
        }
        Ok(())
    }

    /// Every ancestor of `id`, nearest first, not including `id` itself.
    pub fn ancestors<'a>(&'a self, id: &'a StateId) -> Vec<&'a StateId> {
        let mut out = Vec::new();
        let mut current = self.states.get(id).and_then(|n| n.parent.as_ref());
        while let Some(parent_id) = current {
            out.push(parent_id);
            current = self.states.get(parent_id).and_then(|n| n.parent.as_ref());
        }
        out
    }

    /// True if `ancestor` is `descendant` or a proper ancestor of it.
    pub fn is_ancestor_or_self(&self, ancestor: &StateId, descendant: &StateId) -> bool {
        if ancestor == descendant {
            return true;
        }
        self.ancestors(descendant).into_iter().any(|a| a == ancestor)
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

#[cfg(test)]
#[path = "definition_tests.rs"]
mod tests;
