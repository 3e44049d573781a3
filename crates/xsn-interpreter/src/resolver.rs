// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Guards, actions, services, activities and delays are each a reference
//! resolved at interpreter-construction time to a callable supplied by
//! the host. The core never knows action bodies — it only knows names.

use crate::context::{ActionContext, GuardContext};
use crate::error::{ActionError, GuardError, ServiceError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use xsn_core::Event;

/// A guard condition. Evaluated synchronously, left-to-right, for every
/// candidate transition; an `Err` is treated as `false` (the transition
/// is skipped) and published as an `error.guard` telemetry event.
pub trait Guard<Ctx>: Send + Sync {
    fn check(&self, ctx: &GuardContext<'_, Ctx>, event: &Event) -> Result<bool, GuardError>;
}

/// An entry/exit/transition action. May suspend the owning bus (but no
/// other machine) while awaiting async work.
#[async_trait]
pub trait Action<Ctx>: Send + Sync {
    async fn run(&self, ctx: &mut ActionContext<'_, Ctx>, event: &Event) -> Result<(), ActionError>;
}

/// An invoked service, started on state entry and cancelled on exit.
/// Its outcome is reported as `done.invoke.<id>` or `error.platform.<id>`.
///
/// Receives a snapshot of the host's context data taken at invocation
/// time, not a live mutable reference — a long-running service must not
/// hold up the bus thread that owns the live `Configuration`.
#[async_trait]
pub trait Service<Ctx>: Send + Sync {
    async fn invoke(&self, data: Ctx, input: serde_json::Value) -> Result<serde_json::Value, ServiceError>;
}

/// A background activity. Identical lifecycle to a service but produces
/// no terminal event; cancellation on exit is mandatory and must be
/// observed before the entry actions of whatever state comes next run.
#[async_trait]
pub trait Activity<Ctx>: Send + Sync {
    async fn run(&self, data: Ctx) -> Result<(), ActionError>;
}

/// Resolves named references against host-supplied implementations.
pub trait Resolver<Ctx>: Send + Sync {
    fn guard(&self, name: &str) -> Option<Arc<dyn Guard<Ctx>>>;
    fn action(&self, name: &str) -> Option<Arc<dyn Action<Ctx>>>;
    fn service(&self, name: &str) -> Option<Arc<dyn Service<Ctx>>>;
    fn activity(&self, name: &str) -> Option<Arc<dyn Activity<Ctx>>>;
    /// Resolves a delay name to a concrete duration (e.g. `"1s"` -> 1s,
    /// or a host-defined alias looked up from config).
    fn delay(&self, name: &str) -> Option<Duration>;
}

/// A simple map-backed `Resolver`, sufficient for most hosts — register
/// each callable by name once at startup.
#[derive(Default)]
pub struct MapResolver<Ctx> {
    guards: HashMap<String, Arc<dyn Guard<Ctx>>>,
    actions: HashMap<String, Arc<dyn Action<Ctx>>>,
    services: HashMap<String, Arc<dyn Service<Ctx>>>,
    activities: HashMap<String, Arc<dyn Activity<Ctx>>>,
    delays: HashMap<String, Duration>,
}

impl<Ctx> MapResolver<Ctx> {
    pub fn new() -> Self {
        Self {
            guards: HashMap::new(),
            actions: HashMap::new(),
            services: HashMap::new(),
            activities: HashMap::new(),
            delays: HashMap::new(),
        }
    }

    pub fn with_guard(mut self, name: impl Into<String>, guard: impl Guard<Ctx> + 'static) -> Self {
        self.guards.insert(name.into(), Arc::new(guard));
        self
    }

    pub fn with_action(mut self, name: impl Into<String>, action: impl Action<Ctx> + 'static) -> Self {
        self.actions.insert(name.into(), Arc::new(action));
        self
    }

    pub fn with_service(mut self, name: impl Into<String>, service: impl Service<Ctx> + 'static) -> Self {
        self.services.insert(name.into(), Arc::new(service));
        self
    }

    pub fn with_activity(mut self, name: impl Into<String>, activity: impl Activity<Ctx> + 'static) -> Self {
        self.activities.insert(name.into(), Arc::new(activity));
        self
    }

    pub fn with_delay(mut self, name: impl Into<String>, duration: Duration) -> Self {
        self.delays.insert(name.into(), duration);
        self
    }
}

impl<Ctx: Send + Sync> Resolver<Ctx> for MapResolver<Ctx> {
    fn guard(&self, name: &str) -> Option<Arc<dyn Guard<Ctx>>> {
        self.guards.get(name).cloned()
    }

    fn action(&self, name: &str) -> Option<Arc<dyn Action<Ctx>>> {
        self.actions.get(name).cloned()
    }

    fn service(&self, name: &str) -> Option<Arc<dyn Service<Ctx>>> {
        self.services.get(name).cloned()
    }

    fn activity(&self, name: &str) -> Option<Arc<dyn Activity<Ctx>>> {
        self.activities.get(name).cloned()
    }

    fn delay(&self, name: &str) -> Option<Duration> {
        self.delays.get(name).copied().or_else(|| parse_literal_delay(name))
    }
}

/// Parses a literal delay name like `"250ms"` or `"2s"` when the host has
/// not registered an explicit alias for it.
fn parse_literal_delay(name: &str) -> Option<Duration> {
    if let Some(ms) = name.strip_suffix("ms") {
        return ms.parse::<u64>().ok().map(Duration::from_millis);
    }
    if let Some(secs) = name.strip_suffix('s') {
        return secs.parse::<f64>().ok().map(Duration::from_secs_f64);
    }
    name.parse::<u64>().ok().map(Duration::from_millis)
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;
