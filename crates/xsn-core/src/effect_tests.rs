// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::event::Event;

#[test]
fn emit_effect_is_not_verbose() {
    let effect = Effect::Emit { event: Event::new("GO") };
    assert_eq!(effect.name(), "emit");
    assert!(!effect.verbose());
}

#[test]
fn deferred_send_fields_include_target_and_event() {
    let effect = Effect::DeferredSend {
        from: Some(MachineId::new()),
        to: MachineId::new(),
        event: Event::new("PING"),
    };
    let fields = effect.fields();
    assert!(fields.iter().any(|(k, _)| *k == "from"));
    assert!(fields.iter().any(|(k, _)| *k == "to"));
    assert!(effect.verbose());
}

#[test]
fn start_timer_fields_include_duration_ms() {
    let effect = Effect::StartTimer {
        id: TimerId::new(),
        delay: DelayRef::new("1s"),
        duration: Duration::from_secs(1),
    };
    let fields = effect.fields();
    assert!(fields.iter().any(|(k, v)| *k == "duration_ms" && v == "1000"));
}
