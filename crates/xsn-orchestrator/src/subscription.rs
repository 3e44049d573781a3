// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scoped channels (spec §4.7): best-effort pub-sub over routed events,
//! never on the publish path's critical section — a full subscriber
//! channel drops the notification and counts it, it never blocks.

use parking_lot::RwLock;
use regex::Regex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use xsn_core::{Event, MachineId, SubscriptionId};

const SUBSCRIBER_CHANNEL_CAPACITY: usize = 256;

/// What a subscription matches against. `None` fields are wildcards.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    pub machine_id: Option<MachineId>,
    pub event_name: Option<String>,
    pub event_name_pattern: Option<Regex>,
}

impl Filter {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn for_machine(machine_id: MachineId) -> Self {
        Self { machine_id: Some(machine_id), ..Self::default() }
    }

    pub fn with_event_name(mut self, name: impl Into<String>) -> Self {
        self.event_name = Some(name.into());
        self
    }

    pub fn with_event_pattern(mut self, pattern: Regex) -> Self {
        self.event_name_pattern = Some(pattern);
        self
    }

    fn matches(&self, machine_id: &MachineId, event: &Event) -> bool {
        if let Some(wanted) = &self.machine_id {
            if wanted != machine_id {
                return false;
            }
        }
        if let Some(name) = &self.event_name {
            if name.as_str() != event.name.as_str() {
                return false;
            }
        }
        if let Some(pattern) = &self.event_name_pattern {
            if !pattern.is_match(event.name.as_str()) {
                return false;
            }
        }
        true
    }
}

struct Subscription {
    filter: Filter,
    sender: mpsc::Sender<(MachineId, Event)>,
    bypassed: Arc<AtomicU64>,
}

/// A live subscription. Drop it or call `unsubscribe` to stop delivery.
pub struct SubscriptionHandle {
    pub id: SubscriptionId,
    pub receiver: mpsc::Receiver<(MachineId, Event)>,
    bypassed: Arc<AtomicU64>,
}

impl SubscriptionHandle {
    /// Count of notifications dropped because this subscriber's bounded
    /// channel was full at publish time.
    pub fn bypassed(&self) -> u64 {
        self.bypassed.load(Ordering::Relaxed)
    }
}

#[derive(Default)]
pub struct SubscriptionRegistry {
    subscriptions: RwLock<HashMap<SubscriptionId, Subscription>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, filter: Filter) -> SubscriptionHandle {
        let id = SubscriptionId::new();
        let (sender, receiver) = mpsc::channel(SUBSCRIBER_CHANNEL_CAPACITY);
        let bypassed = Arc::new(AtomicU64::new(0));
        self.subscriptions.write().insert(
            id,
            Subscription { filter, sender, bypassed: bypassed.clone() },
        );
        SubscriptionHandle { id, receiver, bypassed }
    }

    pub fn unsubscribe(&self, id: &SubscriptionId) -> bool {
        self.subscriptions.write().remove(id).is_some()
    }

    /// Offers `event` to every matching subscriber without awaiting any
    /// of them; a full channel is a dropped notification, not a
    /// back-pressure signal.
    pub fn publish(&self, machine_id: &MachineId, event: &Event) {
        let subscriptions = self.subscriptions.read();
        for subscription in subscriptions.values() {
            if !subscription.filter.matches(machine_id, event) {
                continue;
            }
            if subscription.sender.try_send((machine_id.clone(), event.clone())).is_err() {
                subscription.bypassed.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(machine = %machine_id, event = %event.name, "subscriber bypassed, channel full");
            }
        }
    }
}
