// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Action-timeout enforcement (`spec.md` §4.5): wraps a host `Resolver`
//! so every resolved `Action`/`Service` runs under a deadline, feeding
//! the shared [`AdaptiveTimer`] with observed latencies and escalating a
//! timed-out call to `error.execution` plus (optionally) the DLQ.
//!
//! Guards are left unwrapped — they're synchronous by contract
//! (`xsn_interpreter::Guard::check` takes no future to race) and fast by
//! construction, so a deadline adds nothing. Activities are left
//! unwrapped too: a background activity is expected to run until its
//! owning state exits, not to complete within a fixed window; applying
//! `default_action_timeout` to them would kill every long-lived activity
//! after one tick. Both choices are recorded in DESIGN.md.

use crate::adaptive::AdaptiveTimer;
use crate::config::TimeoutConfig;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use xsn_core::{Clock, Event, MachineId};
use xsn_dlq::{DeadLetterQueue, FailureKind};
use xsn_interpreter::{Action, ActionContext, ActionError, Activity, Guard, Resolver, Service, ServiceError};

/// Decorates a host [`Resolver`] with action/service deadlines. One
/// instance is constructed per machine (it's cheap — an `Arc` wrapping
/// the real resolver plus shared timer state), matching the grain at
/// which `xsn_interpreter::Interpreter::new` already takes a resolver.
pub struct TimeoutResolver<Ctx, C: Clock> {
    inner: Arc<dyn Resolver<Ctx>>,
    machine_id: MachineId,
    config: Arc<TimeoutConfig>,
    adaptive: Arc<AdaptiveTimer>,
    dlq: Option<Arc<DeadLetterQueue<C>>>,
}

impl<Ctx, C: Clock> TimeoutResolver<Ctx, C> {
    pub fn new(
        inner: Arc<dyn Resolver<Ctx>>,
        machine_id: MachineId,
        config: Arc<TimeoutConfig>,
        adaptive: Arc<AdaptiveTimer>,
        dlq: Option<Arc<DeadLetterQueue<C>>>,
    ) -> Self {
        Self { inner, machine_id, config, adaptive, dlq }
    }
}

impl<Ctx: Send + Sync + 'static, C: Clock> Resolver<Ctx> for TimeoutResolver<Ctx, C> {
    fn guard(&self, name: &str) -> Option<Arc<dyn Guard<Ctx>>> {
        self.inner.guard(name)
    }

    fn action(&self, name: &str) -> Option<Arc<dyn Action<Ctx>>> {
        self.inner.action(name).map(|action| {
            Arc::new(TimedAction {
                inner: action,
                name: name.to_string(),
                machine_id: self.machine_id.clone(),
                config: self.config.clone(),
                adaptive: self.adaptive.clone(),
                dlq: self.dlq.clone(),
            }) as Arc<dyn Action<Ctx>>
        })
    }

    fn service(&self, name: &str) -> Option<Arc<dyn Service<Ctx>>> {
        self.inner.service(name).map(|service| {
            Arc::new(TimedService {
                inner: service,
                name: name.to_string(),
                machine_id: self.machine_id.clone(),
                config: self.config.clone(),
                adaptive: self.adaptive.clone(),
                dlq: self.dlq.clone(),
            }) as Arc<dyn Service<Ctx>>
        })
    }

    fn activity(&self, name: &str) -> Option<Arc<dyn Activity<Ctx>>> {
        self.inner.activity(name)
    }

    fn delay(&self, name: &str) -> Option<Duration> {
        self.inner.delay(name)
    }
}

struct TimedAction<Ctx, C: Clock> {
    inner: Arc<dyn Action<Ctx>>,
    name: String,
    machine_id: MachineId,
    config: Arc<TimeoutConfig>,
    adaptive: Arc<AdaptiveTimer>,
    dlq: Option<Arc<DeadLetterQueue<C>>>,
}

impl<Ctx, C: Clock> TimedAction<Ctx, C> {
    fn key(&self) -> String {
        format!("action:{}", self.name)
    }
}

#[async_trait]
impl<Ctx: Send + Sync + 'static, C: Clock> Action<Ctx> for TimedAction<Ctx, C> {
    async fn run(&self, ctx: &mut ActionContext<'_, Ctx>, event: &Event) -> Result<(), ActionError> {
        let key = self.key();
        let deadline = if self.config.enable_adaptive_timeout && self.adaptive.is_warm(&key) {
            self.adaptive.recommended(&key)
        } else {
            self.config.default_action_timeout
        };

        let started = Instant::now();
        let outcome = match deadline {
            Some(limit) => match tokio::time::timeout(limit, self.inner.run(ctx, event)).await {
                Ok(result) => result,
                Err(_) => {
                    let limit_ms = limit.as_millis() as u64;
                    tracing::warn!(action = %self.name, limit_ms, "action exceeded its deadline, raising error.execution");
                    if self.config.send_timeouts_to_dlq {
                        if let Some(dlq) = &self.dlq {
                            dlq.push(
                                None,
                                self.machine_id.clone(),
                                event.clone(),
                                FailureKind::ActionTimeout,
                                Some(format!("action {} timed out after {limit_ms}ms", self.name)),
                            );
                        }
                    }
                    return Err(ActionError { action: self.name.clone(), message: format!("timed out after {limit_ms}ms") });
                }
            },
            None => self.inner.run(ctx, event).await,
        };
        if outcome.is_ok() {
            self.adaptive.record(&key, started.elapsed());
        }
        outcome
    }
}

struct TimedService<Ctx, C: Clock> {
    inner: Arc<dyn Service<Ctx>>,
    name: String,
    machine_id: MachineId,
    config: Arc<TimeoutConfig>,
    adaptive: Arc<AdaptiveTimer>,
    dlq: Option<Arc<DeadLetterQueue<C>>>,
}

#[async_trait]
impl<Ctx: Send + Sync + 'static, C: Clock> Service<Ctx> for TimedService<Ctx, C> {
    async fn invoke(&self, data: Ctx, input: serde_json::Value) -> Result<serde_json::Value, ServiceError> {
        let key = format!("service:{}", self.name);
        let deadline = if self.config.enable_adaptive_timeout && self.adaptive.is_warm(&key) {
            self.adaptive.recommended(&key)
        } else {
            self.config.default_action_timeout
        };

        let started = Instant::now();
        let outcome = match deadline {
            Some(limit) => match tokio::time::timeout(limit, self.inner.invoke(data, input)).await {
                Ok(result) => result,
                Err(_) => {
                    let limit_ms = limit.as_millis() as u64;
                    tracing::warn!(service = %self.name, limit_ms, "service exceeded its deadline");
                    if self.config.send_timeouts_to_dlq {
                        if let Some(dlq) = &self.dlq {
                            dlq.push(
                                None,
                                self.machine_id.clone(),
                                Event::new(xsn_core::EventName::error_platform(&xsn_core::InvokeId::new())),
                                FailureKind::ActionTimeout,
                                Some(format!("service {} timed out after {limit_ms}ms", self.name)),
                            );
                        }
                    }
                    return Err(ServiceError { service: self.name.clone(), message: format!("timed out after {limit_ms}ms") });
                }
            },
            None => self.inner.invoke(data, input).await,
        };
        if outcome.is_ok() {
            self.adaptive.record(&key, started.elapsed());
        }
        outcome
    }
}

#[cfg(test)]
#[path = "action_resolver_tests.rs"]
mod tests;
