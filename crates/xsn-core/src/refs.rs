// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Named references to host-supplied behavior.
//!
//! A [`MachineDefinition`](crate::definition::MachineDefinition) only ever
//! carries the *name* of a guard, action, service, activity or delay — the
//! concrete implementation is resolved against a host-supplied resolver at
//! interpreter construction time, so the same definition can be reused
//! across orchestrators wired to different hosts.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! name_ref {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(name: impl Into<String>) -> Self {
                Self(name.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self::new(s)
            }
        }
    };
}

name_ref!(GuardRef, "Names a guard condition resolved against the host's `Resolver`.");
name_ref!(ActionRef, "Names an action resolved against the host's `Resolver`.");
name_ref!(ServiceRef, "Names an invoked service resolved against the host's `Resolver`.");
name_ref!(ActivityRef, "Names a background activity resolved against the host's `Resolver`.");
name_ref!(DelayRef, "Names a delay (either a literal duration alias or a resolver-computed one).");
