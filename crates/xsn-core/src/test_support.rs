// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test-only construction helpers shared across the workspace's crates,
//! gated behind the `test-support` feature so downstream crates' own test
//! suites can depend on `xsn-core` with this feature enabled without
//! pulling test code into release builds.

use crate::clock::FakeClock;
use crate::event::Event;

/// A `FakeClock` pinned to a fixed starting epoch, convenient for
/// deterministic timer-ordering assertions.
pub fn fixed_clock() -> FakeClock {
    let clock = FakeClock::new();
    clock.set_epoch_ms(1_700_000_000_000);
    clock
}

/// Shorthand for building a payload-free event in tests.
pub fn event(name: &str) -> Event {
    Event::new(name)
}
