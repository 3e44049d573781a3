// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TimeoutError {
    #[error("action {action} exceeded its {limit_ms}ms deadline")]
    ActionTimedOut { action: String, limit_ms: u64 },
    #[error("service {service} exceeded its {limit_ms}ms deadline")]
    ServiceTimedOut { service: String, limit_ms: u64 },
}
