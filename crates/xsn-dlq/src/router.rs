// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The seam `reprocess` uses to re-enter delivery — implemented by
//! `xsn-orchestrator::Orchestrator` in production, and by a recording
//! fake in tests.

use async_trait::async_trait;
use xsn_core::{Event, MachineId};

#[derive(Debug, Clone, thiserror::Error)]
#[error("route failed: {0}")]
pub struct RouteError(pub String);

/// Re-enters routing exactly as a fresh send (`spec.md` §4.6) — no
/// idempotency or dedup is applied here; a caller that needs that must
/// check `correlation_id` itself.
#[async_trait]
pub trait Router: Send + Sync {
    async fn route(&self, from: Option<MachineId>, to: MachineId, event: Event) -> Result<(), RouteError>;
}
