// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Synchronous, recording implementations of the `Resolver` traits for use
//! in interpreter tests. Every invocation (guard check, action run,
//! service start, activity start) appends a one-line string to a shared
//! `Vec<String>` log, gated by a `parking_lot::Mutex` so assertions can
//! read the observed order of execution after a dispatch completes.

use crate::context::{ActionContext, GuardContext};
use crate::error::{ActionError, GuardError, ServiceError};
use crate::resolver::{Action, Activity, Guard, Resolver};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use xsn_core::{Event, MachineId};

/// Shared invocation log, cloned cheaply and read from test assertions.
#[derive(Clone, Default)]
pub struct RecordingLog(Arc<Mutex<Vec<String>>>);

impl RecordingLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}

struct RecordingAction {
    name: String,
    log: RecordingLog,
    fails: bool,
}

#[async_trait]
impl<Ctx: Send + Sync> Action<Ctx> for RecordingAction {
    async fn run(&self, ctx: &mut ActionContext<'_, Ctx>, event: &Event) -> Result<(), ActionError> {
        self.log.record(format!("action:{}:{}", self.name, event.name));
        let _ = ctx.machine_id;
        if self.fails {
            return Err(ActionError { action: self.name.clone(), message: "forced failure".into() });
        }
        Ok(())
    }
}

struct RecordingGuard {
    name: String,
    log: RecordingLog,
    result: bool,
}

impl<Ctx> Guard<Ctx> for RecordingGuard {
    fn check(&self, _ctx: &GuardContext<'_, Ctx>, event: &Event) -> Result<bool, GuardError> {
        self.log.record(format!("guard:{}:{}:{}", self.name, event.name, self.result));
        Ok(self.result)
    }
}

struct RecordingService {
    name: String,
    log: RecordingLog,
    result: Result<serde_json::Value, String>,
    delay: Duration,
}

#[async_trait]
impl<Ctx: Send + Sync> crate::resolver::Service<Ctx> for RecordingService {
    async fn invoke(&self, _data: Ctx, _input: serde_json::Value) -> Result<serde_json::Value, ServiceError> {
        self.log.record(format!("service:start:{}", self.name));
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.result {
            Ok(value) => {
                self.log.record(format!("service:done:{}", self.name));
                Ok(value.clone())
            }
            Err(message) => {
                self.log.record(format!("service:error:{}", self.name));
                Err(ServiceError { service: self.name.clone(), message: message.clone() })
            }
        }
    }
}

struct RecordingActivity {
    name: String,
    log: RecordingLog,
}

#[async_trait]
impl<Ctx: Send + Sync> Activity<Ctx> for RecordingActivity {
    async fn run(&self, _data: Ctx) -> Result<(), ActionError> {
        self.log.record(format!("activity:start:{}", self.name));
        std::future::pending::<()>().await;
        Ok(())
    }
}

/// A `Resolver` whose guards/actions/services/activities are all
/// synchronous, deterministic, and driven entirely by what the test
/// registers — no host application needed.
pub struct RecordingResolver<Ctx> {
    log: RecordingLog,
    actions: HashMap<String, bool>,
    guards: HashMap<String, bool>,
    services: HashMap<String, (Result<serde_json::Value, String>, Duration)>,
    activities: Vec<String>,
    delays: HashMap<String, Duration>,
    _marker: std::marker::PhantomData<fn() -> Ctx>,
}

impl<Ctx> Default for RecordingResolver<Ctx> {
    fn default() -> Self {
        Self {
            log: RecordingLog::new(),
            actions: HashMap::new(),
            guards: HashMap::new(),
            services: HashMap::new(),
            activities: Vec::new(),
            delays: HashMap::new(),
            _marker: std::marker::PhantomData,
        }
    }
}

impl<Ctx: Send + Sync + 'static> RecordingResolver<Ctx> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> RecordingLog {
        self.log.clone()
    }

    pub fn with_action(mut self, name: impl Into<String>) -> Self {
        self.actions.insert(name.into(), false);
        self
    }

    pub fn with_failing_action(mut self, name: impl Into<String>) -> Self {
        self.actions.insert(name.into(), true);
        self
    }

    pub fn with_guard(mut self, name: impl Into<String>, result: bool) -> Self {
        self.guards.insert(name.into(), result);
        self
    }

    pub fn with_service(mut self, name: impl Into<String>, result: Result<serde_json::Value, String>) -> Self {
        self.services.insert(name.into(), (result, Duration::ZERO));
        self
    }

    pub fn with_delayed_service(
        mut self,
        name: impl Into<String>,
        result: Result<serde_json::Value, String>,
        delay: Duration,
    ) -> Self {
        self.services.insert(name.into(), (result, delay));
        self
    }

    pub fn with_activity(mut self, name: impl Into<String>) -> Self {
        self.activities.push(name.into());
        self
    }

    pub fn with_delay(mut self, name: impl Into<String>, duration: Duration) -> Self {
        self.delays.insert(name.into(), duration);
        self
    }
}

impl<Ctx: Send + Sync + 'static> Resolver<Ctx> for RecordingResolver<Ctx> {
    fn guard(&self, name: &str) -> Option<Arc<dyn Guard<Ctx>>> {
        self.guards.get(name).map(|&result| {
            Arc::new(RecordingGuard { name: name.to_string(), log: self.log.clone(), result }) as Arc<dyn Guard<Ctx>>
        })
    }

    fn action(&self, name: &str) -> Option<Arc<dyn Action<Ctx>>> {
        self.actions.get(name).map(|&fails| {
            Arc::new(RecordingAction { name: name.to_string(), log: self.log.clone(), fails }) as Arc<dyn Action<Ctx>>
        })
    }

    fn service(&self, name: &str) -> Option<Arc<dyn crate::resolver::Service<Ctx>>> {
        self.services.get(name).map(|(result, delay)| {
            Arc::new(RecordingService { name: name.to_string(), log: self.log.clone(), result: result.clone(), delay: *delay })
                as Arc<dyn crate::resolver::Service<Ctx>>
        })
    }

    fn activity(&self, name: &str) -> Option<Arc<dyn Activity<Ctx>>> {
        self.activities
            .iter()
            .find(|a| a.as_str() == name)
            .map(|_| Arc::new(RecordingActivity { name: name.to_string(), log: self.log.clone() }) as Arc<dyn Activity<Ctx>>)
    }

    fn delay(&self, name: &str) -> Option<Duration> {
        self.delays.get(name).copied()
    }
}

/// Convenience: a machine id fixed for deterministic test assertions.
pub fn fixed_machine_id() -> MachineId {
    MachineId::from_string("mach-test0000000000000")
}
