// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn eventless_name_is_empty_and_displays_placeholder() {
    let name = EventName::eventless();
    assert!(name.is_eventless());
    assert_eq!(name.to_string(), "<eventless>");
}

#[test]
fn named_event_is_not_eventless() {
    let name = EventName::new("GO");
    assert!(!name.is_eventless());
    assert_eq!(name.to_string(), "GO");
}

#[test]
fn synthetic_event_names_follow_convention() {
    let id = InvokeId::new();
    assert_eq!(EventName::after("1s").as_str(), "after(1s)");
    assert_eq!(EventName::done_invoke(&id).as_str(), format!("done.invoke.{id}"));
    assert_eq!(EventName::error_platform(&id).as_str(), format!("error.platform.{id}"));
    assert_eq!(EventName::error_execution().as_str(), "error.execution");
    assert_eq!(EventName::state_changed().as_str(), "xstate.state_changed");
}

#[test]
fn log_summary_omits_null_payload() {
    let event = Event::new("GO");
    assert_eq!(event.log_summary(), "GO");
}

#[test]
fn log_summary_includes_payload_when_present() {
    let event = Event::new("GO").with_payload(serde_json::json!({"n": 1}));
    assert_eq!(event.log_summary(), "GO({\"n\":1})");
}
