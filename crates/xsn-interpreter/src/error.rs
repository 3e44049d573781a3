// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy for the interpreter. Per the error-handling design,
//! guard and action errors are *local recovery* conditions: they never
//! bubble out of `dispatch` as an `Err` — only the two fatal conditions
//! below do that.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InterpreterError {
    #[error("eventless microstep chain exceeded the configured limit of {limit}")]
    MicrostepLimit { limit: usize },

    #[error("machine stopped with unrecovered error: {0}")]
    Unrecovered(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("guard {guard} failed: {message}")]
pub struct GuardError {
    pub guard: String,
    pub message: String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("action {action} failed: {message}")]
pub struct ActionError {
    pub action: String,
    pub message: String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("service {service} failed: {message}")]
pub struct ServiceError {
    pub service: String,
    pub message: String,
}
