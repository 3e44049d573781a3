// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identifier types shared across the interpreter, bus, orchestrator,
//! timeout and dead-letter crates.

crate::define_id! {
    /// Identifies a running machine instance inside an orchestrator.
    pub struct MachineId("mach-");
}

crate::define_id! {
    /// Identifies an invoked service (`StartService`/`done.invoke.<id>`/`error.platform.<id>`).
    pub struct InvokeId("inv-");
}

crate::define_id! {
    /// Identifies a running background activity.
    pub struct ActivityId("act-");
}

crate::define_id! {
    /// Identifies a scheduled `after(delayRef)` timer.
    pub struct TimerId("tmr-");
}

crate::define_id! {
    /// Identifies a scoped-channel subscription.
    pub struct SubscriptionId("sub-");
}

crate::define_id! {
    /// Identifies an entry recorded in the dead-letter queue.
    pub struct DlqEntryId("dlq-");
}

crate::define_id! {
    /// Correlates a request across `SendEventAsync` and its eventual dispatch.
    pub struct CorrelationId("cor-");
}
