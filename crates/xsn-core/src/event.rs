// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Events carried through mailboxes and dispatched against a Configuration.
//!
//! The same [`Event`] type represents both externally triggered events and
//! the internal events the interpreter synthesizes (`after(delayRef)`,
//! `done.invoke.<id>`, `error.platform.<id>`, `error.execution`), so the
//! dispatch path stays uniform regardless of origin.

use crate::ids::{CorrelationId, InvokeId};
use serde::{Deserialize, Serialize};

/// The name of an event. The empty string names the eventless ("always")
/// transition and never appears on an externally sent event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventName(pub String);

impl EventName {
    pub const EVENTLESS: &'static str = "";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn eventless() -> Self {
        Self(String::new())
    }

    pub fn is_eventless(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn after(delay: &str) -> Self {
        Self::new(format!("after({delay})"))
    }

    pub fn done_invoke(id: &InvokeId) -> Self {
        Self::new(format!("done.invoke.{id}"))
    }

    pub fn error_platform(id: &InvokeId) -> Self {
        Self::new(format!("error.platform.{id}"))
    }

    pub fn error_execution() -> Self {
        Self::new("error.execution")
    }

    pub fn error_guard() -> Self {
        Self::new("error.guard")
    }

    /// The scoped-channel notification published after every dispatch
    /// settles (`spec.md` §4.7) — carries a `ConfigurationSnapshot` as
    /// its payload, not a host-triggered event.
    pub fn state_changed() -> Self {
        Self::new("xstate.state_changed")
    }
}

impl std::fmt::Display for EventName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_eventless() {
            f.write_str("<eventless>")
        } else {
            f.write_str(&self.0)
        }
    }
}

impl From<&str> for EventName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for EventName {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// An event dispatched to a machine, whether externally sent or internally
/// synthesized by the interpreter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub name: EventName,
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<CorrelationId>,
}

impl Event {
    pub fn new(name: impl Into<EventName>) -> Self {
        Self { name: name.into(), payload: serde_json::Value::Null, correlation_id: None }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_correlation_id(mut self, id: CorrelationId) -> Self {
        self.correlation_id = Some(id);
        self
    }

    pub fn eventless() -> Self {
        Self::new(EventName::eventless())
    }

    /// One-line summary suitable for structured log fields.
    pub fn log_summary(&self) -> String {
        if self.payload.is_null() {
            self.name.to_string()
        } else {
            format!("{}({})", self.name, self.payload)
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
