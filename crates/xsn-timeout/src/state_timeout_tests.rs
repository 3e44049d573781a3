// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration;
use xsn_core::test_support::{event, fixed_clock};
use xsn_core::{MachineDefinition, StateNode, Transition};
use xsn_interpreter::MapResolver;
use xsn_orchestrator::OrchestratorConfig;

fn idle_timeout_definition() -> Arc<MachineDefinition> {
    let states = vec![
        StateNode::compound("root", "idle").with_children(["idle", "working", "done"]),
        StateNode::atomic("idle")
            .with_parent("root")
            .with_transition(Transition::new("state.timeout").with_target("working"))
            .with_transition(Transition::new("GO").with_target("done")),
        StateNode::atomic("working").with_parent("root"),
        StateNode::atomic("done").with_parent("root"),
    ];
    Arc::new(MachineDefinition::new("watched", "root", states).expect("valid definition"))
}

fn orchestrator_with_bus_count(bus_count: usize) -> Arc<Orchestrator<(), xsn_core::FakeClock>> {
    let config = OrchestratorConfig::default().with_bus_count(bus_count).with_shutdown_grace(Duration::from_millis(500));
    Arc::new(Orchestrator::new(config, fixed_clock()))
}

#[tokio::test]
async fn unhandled_state_timeout_transitions_the_machine_and_is_not_dead_lettered() {
    let orchestrator = orchestrator_with_bus_count(1);
    let machine_id = MachineId::from_string("mach-watched");
    orchestrator
        .register_machine(machine_id.clone(), idle_timeout_definition(), Arc::new(MapResolver::<()>::new()), fixed_clock(), (), 0)
        .await
        .expect("register succeeds");

    let config = Arc::new(TimeoutConfig::default().with_state_timeout("idle", Duration::from_millis(20)));
    let clock = fixed_clock();
    let dlq = Arc::new(xsn_dlq::DeadLetterQueue::new(10, clock.clone()));
    let supervisor = StateTimeoutSupervisor::new(orchestrator.clone(), config, clock, Some(dlq.clone()));
    let watch = supervisor.spawn();

    // The registration-time publication happened before this supervisor
    // subscribed; force a fresh one so it learns "idle" is active.
    let _ = orchestrator.send_event_async(None, machine_id.clone(), event("__noop__"), true, Some(Duration::from_secs(1))).await;

    tokio::time::sleep(Duration::from_millis(200)).await;

    assert!(dlq.is_empty(), "the configured timeout event transitioned the machine, so nothing should be dead-lettered");
    watch.abort();
    orchestrator.shutdown(None).await;
}

#[tokio::test]
async fn unobserved_state_timeout_is_dead_lettered() {
    let orchestrator = orchestrator_with_bus_count(1);
    let machine_id = MachineId::from_string("mach-stuck");
    // "working" has no transition out, so the timeout event will be
    // ignored by the interpreter and the state stays active.
    let config = Arc::new(TimeoutConfig::default().with_state_timeout("working", Duration::from_millis(20)));
    let clock = fixed_clock();
    let dlq = Arc::new(xsn_dlq::DeadLetterQueue::new(10, clock.clone()));

    orchestrator
        .register_machine(machine_id.clone(), idle_timeout_definition(), Arc::new(MapResolver::<()>::new()), fixed_clock(), (), 0)
        .await
        .expect("register succeeds");

    let supervisor = StateTimeoutSupervisor::new(orchestrator.clone(), config, clock, Some(dlq.clone()));
    let watch = supervisor.spawn();

    // Drive idle -> working directly so the supervisor observes "working"
    // becoming active and arms its timer.
    let _ = orchestrator
        .send_event_async(None, machine_id.clone(), Event::new("state.timeout"), true, Some(Duration::from_secs(1)))
        .await;

    tokio::time::sleep(Duration::from_millis(250)).await;

    assert!(!dlq.is_empty(), "a state timeout with no handling transition must be dead-lettered");
    let entry = dlq.try_dequeue().expect("entry present");
    assert_eq!(entry.failure_kind, xsn_dlq::FailureKind::StateTimeout);
    watch.abort();
    orchestrator.shutdown(None).await;
}

#[tokio::test]
async fn states_without_a_configured_timeout_are_never_armed() {
    let orchestrator = orchestrator_with_bus_count(1);
    let machine_id = MachineId::from_string("mach-unwatched");
    orchestrator
        .register_machine(machine_id.clone(), idle_timeout_definition(), Arc::new(MapResolver::<()>::new()), fixed_clock(), (), 0)
        .await
        .expect("register succeeds");

    let config = Arc::new(TimeoutConfig::default());
    let clock = fixed_clock();
    let supervisor = StateTimeoutSupervisor::new(orchestrator.clone(), config, clock, None);
    let watch = supervisor.spawn();

    let _ = orchestrator.send_event_async(None, machine_id.clone(), event("__noop__"), true, Some(Duration::from_secs(1))).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(watch.armed_timers().is_empty(), "no state has a configured timeout, so nothing should ever be armed");
    assert!(!watch.is_finished(), "the watch loop itself should still be running");
    watch.abort();
    orchestrator.shutdown(None).await;
}
