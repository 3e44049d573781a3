// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use xsn_core::test_support::{event, fixed_clock};
use xsn_core::{Event, MachineDefinition, MachineId, StateNode, Transition};
use xsn_interpreter::{Action, ActionContext, ActionError, MapResolver};
use xsn_orchestrator::{Orchestrator, OrchestratorConfig, SendStatus};

fn toggle_definition() -> Arc<MachineDefinition> {
    let states = vec![
        StateNode::compound("root", "off").with_children(["off", "on"]),
        StateNode::atomic("off").with_parent("root").with_transition(Transition::new("TOGGLE").with_target("on")),
        StateNode::atomic("on").with_parent("root").with_transition(Transition::new("TOGGLE").with_target("off")),
    ];
    Arc::new(MachineDefinition::new("toggle", "root", states).expect("valid definition"))
}

struct SlowEntry {
    delay: Duration,
}

#[async_trait]
impl Action<()> for SlowEntry {
    async fn run(&self, _ctx: &mut ActionContext<'_, ()>, _event: &Event) -> Result<(), ActionError> {
        tokio::time::sleep(self.delay).await;
        Ok(())
    }
}

fn slow_definition(delay: Duration) -> (Arc<MachineDefinition>, Arc<dyn xsn_interpreter::Resolver<()>>) {
    let states = vec![
        StateNode::compound("root", "idle").with_children(["idle", "busy"]),
        StateNode::atomic("idle").with_parent("root").with_transition(Transition::new("GO").with_target("busy")),
        StateNode::atomic("busy").with_parent("root").with_entry_action("stall"),
    ];
    let definition = Arc::new(MachineDefinition::new("slow", "root", states).expect("valid definition"));
    let resolver = Arc::new(MapResolver::<()>::new().with_action("stall", SlowEntry { delay })) as Arc<dyn xsn_interpreter::Resolver<()>>;
    (definition, resolver)
}

fn orchestrator_with_bus_count(bus_count: usize) -> Orchestrator<(), xsn_core::FakeClock> {
    let config = OrchestratorConfig::default().with_bus_count(bus_count).with_shutdown_grace(Duration::from_millis(500));
    Orchestrator::new(config, fixed_clock())
}

#[tokio::test]
async fn dispatched_send_within_deadline_records_a_sample_and_no_dlq_entry() {
    let orchestrator = Arc::new(orchestrator_with_bus_count(1));
    let machine_id = MachineId::from_string("mach-1");
    orchestrator
        .register_machine(machine_id.clone(), toggle_definition(), Arc::new(MapResolver::<()>::new()), fixed_clock(), (), 0)
        .await
        .expect("register succeeds");

    let config = TimeoutConfig::default().with_default_transition_timeout(Duration::from_secs(2));
    let adaptive = AdaptiveTimer::new(1.5, 30);
    let clock = fixed_clock();
    let dlq = xsn_dlq::DeadLetterQueue::new(10, clock);

    let result =
        send_with_transition_timeout(&orchestrator, &config, &adaptive, Some(&dlq), None, machine_id.clone(), event("TOGGLE")).await;

    assert_eq!(result.status, SendStatus::Dispatched);
    assert!(dlq.is_empty());
    assert!(adaptive.stats("transition:TOGGLE").is_some());
    orchestrator.shutdown(None).await;
}

#[tokio::test]
async fn transition_exceeding_its_deadline_is_dead_lettered() {
    let orchestrator = Arc::new(orchestrator_with_bus_count(1));
    let machine_id = MachineId::from_string("mach-slow");
    let (definition, resolver) = slow_definition(Duration::from_millis(50));
    orchestrator
        .register_machine(machine_id.clone(), definition, resolver, fixed_clock(), (), 0)
        .await
        .expect("register succeeds");

    let config = TimeoutConfig::default().with_default_transition_timeout(Duration::from_millis(5));
    let adaptive = AdaptiveTimer::new(1.5, 30);
    let clock = fixed_clock();
    let dlq = xsn_dlq::DeadLetterQueue::new(10, clock);

    let result =
        send_with_transition_timeout(&orchestrator, &config, &adaptive, Some(&dlq), None, machine_id.clone(), event("GO")).await;

    assert_eq!(result.status, SendStatus::TimedOut);
    assert_eq!(dlq.len(), 1);
    let entry = dlq.try_dequeue().expect("entry present");
    assert_eq!(entry.failure_kind, xsn_dlq::FailureKind::TransitionTimeout);
    assert_eq!(entry.to, machine_id);
    orchestrator.shutdown(None).await;
}

#[tokio::test]
async fn timeout_sender_wrapper_delegates_to_the_free_function() {
    let orchestrator = Arc::new(orchestrator_with_bus_count(1));
    let machine_id = MachineId::from_string("mach-1");
    orchestrator
        .register_machine(machine_id.clone(), toggle_definition(), Arc::new(MapResolver::<()>::new()), fixed_clock(), (), 0)
        .await
        .expect("register succeeds");

    let sender = TimeoutSender::new(
        orchestrator.clone(),
        Arc::new(TimeoutConfig::default().with_default_transition_timeout(Duration::from_secs(2))),
        Arc::new(AdaptiveTimer::new(1.5, 30)),
        None,
    );
    let result = sender.send(None, machine_id, event("TOGGLE")).await;
    assert_eq!(result.status, SendStatus::Dispatched);
    orchestrator.shutdown(None).await;
}
