// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::config::OrchestratorConfig;
use crate::dtos::SendStatus;
use crate::orchestrator::Orchestrator;
use crate::subscription::Filter;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use xsn_core::test_support::{event, fixed_clock};
use xsn_core::{Event, MachineDefinition, MachineId, StateNode, Transition};
use xsn_interpreter::{Action, ActionContext, ActionError, MapResolver, Resolver};

fn toggle_definition() -> Arc<MachineDefinition> {
    let states = vec![
        StateNode::compound("root", "off").with_children(["off", "on"]),
        StateNode::atomic("off")
            .with_parent("root")
            .with_transition(Transition::new("TOGGLE").with_target("on")),
        StateNode::atomic("on")
            .with_parent("root")
            .with_transition(Transition::new("TOGGLE").with_target("off")),
    ];
    Arc::new(MachineDefinition::new("toggle", "root", states).expect("valid definition"))
}

fn resolver() -> Arc<dyn Resolver<()>> {
    Arc::new(MapResolver::<()>::new())
}

fn orchestrator_with_bus_count(bus_count: usize) -> Orchestrator<(), xsn_core::FakeClock> {
    let config = OrchestratorConfig::default().with_bus_count(bus_count).with_shutdown_grace(Duration::from_millis(500));
    Orchestrator::new(config, fixed_clock())
}

#[tokio::test]
async fn register_then_unregister_round_trips() {
    let orchestrator = orchestrator_with_bus_count(2);
    let machine_id = MachineId::from_string("mach-1");
    orchestrator
        .register_machine(machine_id.clone(), toggle_definition(), resolver(), fixed_clock(), (), 0)
        .await
        .expect("register succeeds");

    orchestrator.unregister_machine(&machine_id).await.expect("unregister succeeds");
    orchestrator.shutdown(None).await;
}

#[tokio::test]
async fn duplicate_registration_is_rejected() {
    let orchestrator = orchestrator_with_bus_count(1);
    let machine_id = MachineId::from_string("mach-1");
    orchestrator
        .register_machine(machine_id.clone(), toggle_definition(), resolver(), fixed_clock(), (), 0)
        .await
        .expect("first register succeeds");
    let err = orchestrator
        .register_machine(machine_id.clone(), toggle_definition(), resolver(), fixed_clock(), (), 0)
        .await
        .unwrap_err();
    assert!(matches!(err, crate::error::OrchestratorError::DuplicateId(_)));
    orchestrator.shutdown(None).await;
}

#[tokio::test]
async fn send_event_async_fire_and_forget_returns_delivered() {
    let orchestrator = orchestrator_with_bus_count(1);
    let machine_id = MachineId::from_string("mach-1");
    orchestrator
        .register_machine(machine_id.clone(), toggle_definition(), resolver(), fixed_clock(), (), 0)
        .await
        .expect("register succeeds");

    let result = orchestrator.send_event_async(None, machine_id.clone(), event("TOGGLE"), false, None).await;
    assert_eq!(result.status, SendStatus::Delivered);
    orchestrator.shutdown(None).await;
}

#[tokio::test]
async fn send_event_async_waits_for_dispatch_to_settle() {
    let orchestrator = orchestrator_with_bus_count(1);
    let machine_id = MachineId::from_string("mach-1");
    orchestrator
        .register_machine(machine_id.clone(), toggle_definition(), resolver(), fixed_clock(), (), 0)
        .await
        .expect("register succeeds");

    let result = orchestrator
        .send_event_async(None, machine_id.clone(), event("TOGGLE"), true, Some(Duration::from_secs(2)))
        .await;
    assert_eq!(result.status, SendStatus::Dispatched);
    assert_eq!(result.resulting_state_digest.as_deref(), Some("on"));
    orchestrator.shutdown(None).await;
}

#[tokio::test]
async fn send_event_async_to_unknown_machine_is_target_not_found() {
    let orchestrator = orchestrator_with_bus_count(1);
    let result = orchestrator
        .send_event_async(None, MachineId::from_string("mach-ghost"), event("TOGGLE"), false, None)
        .await;
    assert_eq!(result.status, SendStatus::TargetNotFound);
    orchestrator.shutdown(None).await;
}

#[tokio::test]
async fn cross_group_send_is_rejected() {
    let orchestrator = orchestrator_with_bus_count(1);
    let sender_id = MachineId::from_string("mach-sender");
    let receiver_id = MachineId::from_string("mach-receiver");
    orchestrator
        .register_machine(sender_id.clone(), toggle_definition(), resolver(), fixed_clock(), (), 1)
        .await
        .expect("register succeeds");
    orchestrator
        .register_machine(receiver_id.clone(), toggle_definition(), resolver(), fixed_clock(), (), 2)
        .await
        .expect("register succeeds");

    let result = orchestrator
        .send_event_async(Some(sender_id), receiver_id, event("TOGGLE"), false, None)
        .await;
    assert_eq!(result.status, SendStatus::Rejected);
    orchestrator.shutdown(None).await;
}

/// A ping-pong pair of actions with mutually referencing sends in their
/// entry actions — the no-deadlock-on-cross-machine-sends property.
struct Pinger {
    to: MachineId,
}

#[async_trait]
impl Action<()> for Pinger {
    async fn run(&self, ctx: &mut ActionContext<'_, ()>, _event: &Event) -> Result<(), ActionError> {
        ctx.request_send(self.to.clone(), Event::new("PING"));
        Ok(())
    }
}

fn ping_pong_definition(peer_name: &str) -> Arc<MachineDefinition> {
    let states = vec![
        StateNode::compound("root", "idle").with_children(["idle", "active"]),
        StateNode::atomic("idle")
            .with_parent("root")
            .with_transition(Transition::new("PING").with_target("active")),
        StateNode::atomic("active").with_parent("root").with_entry_action(peer_name),
    ];
    Arc::new(MachineDefinition::new("ping_pong", "root", states).expect("valid definition"))
}

#[tokio::test]
async fn mutually_referencing_sends_do_not_deadlock() {
    let orchestrator = orchestrator_with_bus_count(2);
    let a = MachineId::from_string("mach-a");
    let b = MachineId::from_string("mach-b");

    let resolver_a = MapResolver::<()>::new().with_action("pong", Pinger { to: b.clone() });
    orchestrator
        .register_machine(a.clone(), ping_pong_definition("pong"), Arc::new(resolver_a), fixed_clock(), (), 0)
        .await
        .expect("register a");

    let resolver_b = MapResolver::<()>::new().with_action("ping_back", Pinger { to: a.clone() });
    orchestrator
        .register_machine(b.clone(), ping_pong_definition("ping_back"), Arc::new(resolver_b), fixed_clock(), (), 0)
        .await
        .expect("register b");

    let result = orchestrator
        .send_event_async(None, a.clone(), Event::new("PING"), true, Some(Duration::from_secs(2)))
        .await;
    assert_eq!(result.status, SendStatus::Dispatched);
    orchestrator.shutdown(None).await;
}

#[tokio::test]
async fn subscribers_observe_deferred_sends_best_effort() {
    let orchestrator = orchestrator_with_bus_count(1);
    let a = MachineId::from_string("mach-a");
    let b = MachineId::from_string("mach-b");

    let resolver_a = MapResolver::<()>::new().with_action("notify_b", Pinger { to: b.clone() });
    orchestrator
        .register_machine(a.clone(), ping_pong_definition("notify_b"), Arc::new(resolver_a), fixed_clock(), (), 0)
        .await
        .expect("register a");
    orchestrator
        .register_machine(b.clone(), toggle_definition(), resolver(), fixed_clock(), (), 0)
        .await
        .expect("register b");

    let mut handle = orchestrator.subscribe(Filter::any().with_event_name("PING"));

    let _ = orchestrator
        .send_event_async(None, a.clone(), Event::new("PING"), true, Some(Duration::from_secs(2)))
        .await;

    let observed = tokio::time::timeout(Duration::from_secs(1), handle.receiver.recv()).await;
    assert!(observed.is_ok(), "subscriber should observe the deferred PING send");
    orchestrator.shutdown(None).await;
}

#[tokio::test]
async fn subscribers_observe_state_changed_after_every_dispatch() {
    let orchestrator = orchestrator_with_bus_count(1);
    let machine_id = MachineId::from_string("mach-1");
    orchestrator
        .register_machine(machine_id.clone(), toggle_definition(), resolver(), fixed_clock(), (), 0)
        .await
        .expect("register succeeds");

    let mut handle = orchestrator.subscribe(Filter::for_machine(machine_id.clone()).with_event_name("xstate.state_changed"));

    let _ = orchestrator
        .send_event_async(None, machine_id.clone(), event("TOGGLE"), true, Some(Duration::from_secs(2)))
        .await;

    let observed = tokio::time::timeout(Duration::from_secs(1), handle.receiver.recv())
        .await
        .expect("state change notification should arrive")
        .expect("channel open");
    assert_eq!(observed.0, machine_id);
    assert_eq!(observed.1.payload["active_states"], serde_json::json!(["on"]));
    orchestrator.shutdown(None).await;
}
