// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::mailbox::{Mailbox, MailboxError, OverflowPolicy};
use std::sync::Arc;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use xsn_core::Event;

fn new_pair(capacity: usize, policy: OverflowPolicy) -> (crate::MailboxSender, crate::MailboxReceiver) {
    Mailbox::bounded(capacity, policy, CancellationToken::new(), Arc::new(Notify::new()))
}

#[tokio::test]
async fn fifo_per_machine() {
    let (tx, mut rx) = new_pair(8, OverflowPolicy::Wait);
    tx.send(Event::new("a")).await.unwrap();
    tx.send(Event::new("b")).await.unwrap();
    tx.send(Event::new("c")).await.unwrap();

    let mut inner = rx.take();
    assert_eq!(inner.recv().await.unwrap().name.as_str(), "a");
    assert_eq!(inner.recv().await.unwrap().name.as_str(), "b");
    assert_eq!(inner.recv().await.unwrap().name.as_str(), "c");
}

#[tokio::test]
async fn drop_newest_rejects_and_counts_once_full() {
    let (tx, _rx) = new_pair(1, OverflowPolicy::DropNewest);
    tx.send(Event::new("first")).await.unwrap();
    let result = tx.send(Event::new("second")).await;
    assert_eq!(result, Err(MailboxError::Full));
    assert_eq!(tx.dropped_newest(), 1);
}

#[tokio::test]
async fn cancelled_before_enqueue_returns_cancelled() {
    let shutdown = CancellationToken::new();
    let (tx, _rx) = Mailbox::bounded(8, OverflowPolicy::Wait, shutdown.clone(), Arc::new(Notify::new()));
    shutdown.cancel();
    let result = tx.send(Event::new("too-late")).await;
    assert_eq!(result, Err(MailboxError::Cancelled));
}

#[test]
#[should_panic(expected = "already taken")]
fn taking_receiver_twice_panics() {
    let (_tx, mut rx) = new_pair(8, OverflowPolicy::Wait);
    let _first = rx.take();
    let _second = rx.take();
}

#[tokio::test]
async fn notify_fires_on_successful_send() {
    let notify = Arc::new(Notify::new());
    let (tx, _rx) = Mailbox::bounded(8, OverflowPolicy::Wait, CancellationToken::new(), notify.clone());
    let notified = notify.notified();
    tx.send(Event::new("x")).await.unwrap();
    tokio::time::timeout(std::time::Duration::from_millis(100), notified)
        .await
        .expect("notify should have fired");
}
