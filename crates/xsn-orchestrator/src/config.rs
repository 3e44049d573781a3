// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;
use xsn_mailbox::OverflowPolicy;

/// Host-facing orchestrator configuration, defaults per `spec.md` §6.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub bus_count: usize,
    pub mailbox_capacity: usize,
    pub overflow_policy: OverflowPolicy,
    pub shutdown_grace: Duration,
    pub max_eventless_microsteps: usize,
    pub enable_adaptive_timeout: bool,
    pub adaptive_multiplier: f64,
    pub dlq_capacity: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            bus_count: num_cpus::get().max(1),
            mailbox_capacity: 10_000,
            overflow_policy: OverflowPolicy::Wait,
            shutdown_grace: Duration::from_secs(5),
            max_eventless_microsteps: 100,
            enable_adaptive_timeout: false,
            adaptive_multiplier: 1.5,
            dlq_capacity: 10_000,
        }
    }
}

impl OrchestratorConfig {
    pub fn with_bus_count(mut self, bus_count: usize) -> Self {
        self.bus_count = bus_count.max(1);
        self
    }

    pub fn with_mailbox_capacity(mut self, capacity: usize) -> Self {
        self.mailbox_capacity = capacity;
        self
    }

    pub fn with_overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.overflow_policy = policy;
        self
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    pub fn with_max_eventless_microsteps(mut self, max: usize) -> Self {
        self.max_eventless_microsteps = max;
        self
    }
}
