// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;
use xsn_core::MachineId;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("machine {0} is already registered")]
    DuplicateId(MachineId),
    #[error("machine {0} is not registered")]
    TargetNotFound(MachineId),
    #[error("mailbox for {0} rejected the send: {1}")]
    MailboxRejected(MachineId, xsn_mailbox::MailboxError),
    #[error("dispatch for {0} did not complete before the caller stopped waiting")]
    TimedOut(MachineId),
    #[error(transparent)]
    Route(#[from] RouteError),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RouteError {
    #[error("machine {0} is not registered")]
    TargetNotFound(MachineId),
    #[error("cross-group send rejected: {from} is in group {from_group}, {to} is in group {to_group}")]
    ChannelGroupMismatch { from: MachineId, to: MachineId, from_group: i64, to_group: i64 },
}
