// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fluent helpers for building small machine definitions in tests. Not
//! exported outside `test`/`test-support` builds — production definitions
//! are expected to arrive already built from a host-side parser.

use super::{HistoryType, StateId, StateKind, StateNode};

impl StateNode {
    pub fn atomic(id: impl Into<StateId>) -> Self {
        Self::new(id, StateKind::Atomic)
    }

    pub fn compound(id: impl Into<StateId>, initial_child: impl Into<StateId>) -> Self {
        Self::new(id, StateKind::Compound { initial_child: initial_child.into() })
    }

    pub fn parallel(id: impl Into<StateId>) -> Self {
        Self::new(id, StateKind::Parallel)
    }

    pub fn final_state(id: impl Into<StateId>) -> Self {
        Self::new(id, StateKind::Final)
    }

    pub fn history(id: impl Into<StateId>, history_type: HistoryType, default_target: impl Into<StateId>) -> Self {
        Self::new(id, StateKind::History { history_type, default_target: default_target.into() })
    }

    pub fn with_parent(mut self, parent: impl Into<StateId>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = impl Into<StateId>>) -> Self {
        self.children = children.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_transition(mut self, transition: super::Transition) -> Self {
        self.transitions.push(transition);
        self
    }

    pub fn with_after(mut self, delay: impl Into<crate::refs::DelayRef>, transition: super::Transition) -> Self {
        self.after_transitions.push((delay.into(), transition));
        self
    }

    pub fn with_entry_action(mut self, action: impl Into<crate::refs::ActionRef>) -> Self {
        self.entry_actions.push(action.into());
        self
    }

    pub fn with_exit_action(mut self, action: impl Into<crate::refs::ActionRef>) -> Self {
        self.exit_actions.push(action.into());
        self
    }

    pub fn with_invoke(mut self, service: impl Into<crate::refs::ServiceRef>) -> Self {
        self.invokes.push(service.into());
        self
    }

    pub fn with_activity(mut self, activity: impl Into<crate::refs::ActivityRef>) -> Self {
        self.activities.push(activity.into());
        self
    }
}
