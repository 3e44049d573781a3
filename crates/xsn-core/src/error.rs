// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy for the machine definition model.
//!
//! Definition errors bubble up at load time and are always fatal — per the
//! error taxonomy, an orchestrator never accepts a machine whose definition
//! fails validation.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DefinitionError {
    #[error("transition in state {source} targets unknown state {target}")]
    UndefinedTarget { source: String, target: String },

    #[error("state {state} has duplicate id")]
    DuplicateStateId { state: String },

    #[error("compound state {state} has no initial child")]
    MissingInitialChild { state: String },

    #[error("compound state {state} initial child {child} does not exist")]
    UndefinedInitialChild { state: String, child: String },

    #[error("cycle detected in initial-child chain starting at {state}")]
    InitialChildCycle { state: String },

    #[error("history state {state} has no default transition")]
    MissingHistoryDefault { state: String },

    #[error("machine has no root state")]
    MissingRootState,

    #[error("root state {root} not found in states map")]
    UndefinedRootState { root: String },
}
