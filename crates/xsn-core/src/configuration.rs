// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The live state of a running machine: its active-state set, history
//! memory, and the bookkeeping needed to cancel owned timers/services/
//! activities on exit. Owned exclusively by the bus running a machine's
//! dispatch; external readers only ever see a [`ConfigurationSnapshot`].

use crate::definition::{MachineDefinition, StateId};
use crate::ids::{ActivityId, InvokeId, TimerId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// The active-state set and owned-resource bookkeeping of a running
/// machine. See `spec.md` §3 for the invariants this type must uphold:
/// every active compound has exactly one active child (unless parallel,
/// in which case every child is active), and no two siblings under a
/// compound are simultaneously active.
#[derive(Debug, Clone, Default)]
pub struct Configuration {
    pub active_states: BTreeSet<StateId>,
    /// Per history node, the leaf descendants active immediately before
    /// the enclosing compound was last exited.
    pub history_memory: HashMap<StateId, BTreeSet<StateId>>,
    pub pending_timers: HashMap<(StateId, String), TimerId>,
    pub running_services: HashMap<InvokeId, StateId>,
    pub running_activities: HashMap<ActivityId, StateId>,
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self, id: &StateId) -> bool {
        self.active_states.contains(id)
    }

    /// The active states with no active child — i.e. the actual leaves
    /// of the live configuration tree, excluding every compound/parallel
    /// ancestor that is active only because one of its children is.
    pub fn active_leaves(&self, definition: &MachineDefinition) -> BTreeSet<StateId> {
        self.active_states
            .iter()
            .filter(|id| {
                definition
                    .state(id)
                    .map(|node| !node.children.iter().any(|c| self.is_active(c)))
                    .unwrap_or(false)
            })
            .cloned()
            .collect()
    }

    /// A read-only snapshot safe to publish to subscribers or return to a
    /// caller as a `resultingStateDigest`. Contains only active leaves —
    /// ancestor compounds/parallels are implied by a leaf's membership,
    /// never part of the externally observed state per `spec.md` §3.
    pub fn snapshot(&self, definition: &MachineDefinition) -> ConfigurationSnapshot {
        ConfigurationSnapshot { active_states: self.active_leaves(definition).iter().map(|s| s.0.clone()).collect() }
    }
}

/// An immutable, cheaply shareable copy of a machine's active-state set,
/// safe to read from any thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationSnapshot {
    pub active_states: Vec<String>,
}

impl ConfigurationSnapshot {
    pub fn contains(&self, id: &str) -> bool {
        self.active_states.iter().any(|s| s == id)
    }
}

#[cfg(test)]
#[path = "configuration_tests.rs"]
mod tests;
