// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use async_trait::async_trait;
use parking_lot::Mutex as PMutex;
use std::sync::Arc;
use xsn_core::FakeClock;

struct RecordingRouter {
    routed: Arc<PMutex<Vec<(MachineId, String)>>>,
}

#[async_trait]
impl Router for RecordingRouter {
    async fn route(&self, _from: Option<MachineId>, to: MachineId, event: Event) -> Result<(), crate::router::RouteError> {
        self.routed.lock().push((to, event.name.to_string()));
        Ok(())
    }
}

fn machine(id: &str) -> MachineId {
    MachineId::from_string(id)
}

#[test]
fn push_and_dequeue_is_fifo() {
    let dlq = DeadLetterQueue::new(10, FakeClock::new());
    dlq.push(None, machine("mach-a"), Event::new("one"), FailureKind::MailboxOverflow, None);
    dlq.push(None, machine("mach-b"), Event::new("two"), FailureKind::TransitionTimeout, Some("timed out".into()));
    let first = dlq.try_dequeue().expect("first entry");
    assert_eq!(first.event.name.as_str(), "one");
    let second = dlq.try_dequeue().expect("second entry");
    assert_eq!(second.event.name.as_str(), "two");
    assert!(dlq.try_dequeue().is_none());
}

#[test]
fn capacity_bound_never_exceeded_and_counter_tracks_drops() {
    let dlq = DeadLetterQueue::new(3, FakeClock::new());
    for i in 0..10 {
        dlq.push(None, machine("mach-a"), Event::new(format!("e{i}")), FailureKind::ActionTimeout, None);
    }
    assert_eq!(dlq.len(), 3);
    assert_eq!(dlq.dropped_oldest(), 7);
    // oldest surviving entry should be e7, since e0..e6 were dropped.
    let oldest = dlq.try_dequeue().expect("entry");
    assert_eq!(oldest.event.name.as_str(), "e7");
}

#[tokio::test]
async fn reprocess_routes_entries_without_dedup() {
    let dlq = DeadLetterQueue::new(10, FakeClock::new());
    dlq.push(None, machine("mach-a"), Event::new("retry-me"), FailureKind::StateTimeout, None);
    let routed = Arc::new(PMutex::new(Vec::new()));
    let router = RecordingRouter { routed: routed.clone() };
    let count = dlq.reprocess(5, &router).await;
    assert_eq!(count, 1);
    assert!(dlq.is_empty());
    assert_eq!(routed.lock().len(), 1);
}
