// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bridges `DeadLetterQueue::reprocess` back into the orchestrator's own
//! routing path, so a reprocessed envelope re-enters exactly the same
//! `channelGroup`-checked send the original went through.

use crate::orchestrator::Orchestrator;
use async_trait::async_trait;
use xsn_core::{Clock, Event, MachineId};
use xsn_dlq::RouteError as DlqRouteError;

/// Newtype so `xsn_dlq::Router` can be implemented for an `Orchestrator`
/// without `xsn-orchestrator` needing to own the `Router` trait itself.
pub struct DlqRouter<Ctx, C: Clock>(pub Orchestrator<Ctx, C>);

#[async_trait]
impl<Ctx, C> xsn_dlq::Router for DlqRouter<Ctx, C>
where
    Ctx: Clone + Send + Sync + 'static,
    C: Clock + Send + Sync + 'static,
{
    async fn route(&self, from: Option<MachineId>, to: MachineId, event: Event) -> Result<(), DlqRouteError> {
        self.0.route(from, to, event).await.map_err(|err| DlqRouteError(err.to_string()))
    }
}
