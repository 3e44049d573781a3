// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The response shapes for `SendEventAsync`, folded in from the
//! teacher's wire-protocol crate since this spec defines no IPC framing
//! of its own — only the in-process DTOs survive.

use serde::{Deserialize, Serialize};

/// Outcome of one `SendEventAsync` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SendStatus {
    /// Enqueued into the mailbox; caller did not opt into waiting.
    Delivered,
    /// Enqueued and the dispatch (and any eventless chain it triggered)
    /// was observed to complete.
    Dispatched,
    /// No machine is registered under the target id.
    TargetNotFound,
    /// The send was cancelled before it could be enqueued (mailbox
    /// shut down underneath the caller).
    Cancelled,
    /// The caller's `timeout` elapsed before the dispatch completed.
    TimedOut,
    /// Rejected by a routing policy (e.g. cross-`channelGroup` send).
    Rejected,
}

/// Result of one `SendEventAsync` call, per `spec.md` §6.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendResult {
    pub status: SendStatus,
    /// A cheap fingerprint of the resulting configuration, present when
    /// the dispatch was observed to complete.
    pub resulting_state_digest: Option<String>,
}

impl SendResult {
    pub fn delivered() -> Self {
        Self { status: SendStatus::Delivered, resulting_state_digest: None }
    }

    pub fn dispatched(digest: String) -> Self {
        Self { status: SendStatus::Dispatched, resulting_state_digest: Some(digest) }
    }

    pub fn target_not_found() -> Self {
        Self { status: SendStatus::TargetNotFound, resulting_state_digest: None }
    }

    pub fn cancelled() -> Self {
        Self { status: SendStatus::Cancelled, resulting_state_digest: None }
    }

    pub fn timed_out() -> Self {
        Self { status: SendStatus::TimedOut, resulting_state_digest: None }
    }

    pub fn rejected() -> Self {
        Self { status: SendStatus::Rejected, resulting_state_digest: None }
    }
}

/// Fingerprints a snapshot's active-state set into a short, stable
/// digest suitable for logging and for `resulting_state_digest`.
pub fn digest_snapshot(snapshot: &xsn_core::ConfigurationSnapshot) -> String {
    let mut states = snapshot.active_states.clone();
    states.sort();
    states.join("+")
}
