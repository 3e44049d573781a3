// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The machine registry: which bus owns a machine, its mailbox sender,
//! and its tenant `channelGroup`. Swapped wholesale on register/
//! unregister for copy-on-write reads, mirroring the teacher's
//! `Mutex<HashMap<AgentId, OwnerId>>` registry pattern generalized to a
//! `parking_lot::RwLock` (many more readers than writers here).

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use xsn_core::MachineId;
use xsn_mailbox::MailboxSender;

#[derive(Clone)]
pub struct RegistryEntry {
    pub bus_index: usize,
    pub channel_group: i64,
    pub sender: MailboxSender,
}

#[derive(Default)]
pub struct MachineRegistry {
    entries: RwLock<HashMap<MachineId, Arc<RegistryEntry>>>,
}

impl MachineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, machine_id: &MachineId) -> Option<Arc<RegistryEntry>> {
        self.entries.read().get(machine_id).cloned()
    }

    pub fn contains(&self, machine_id: &MachineId) -> bool {
        self.entries.read().contains_key(machine_id)
    }

    /// Inserts a new entry. Callers must check `contains` first under
    /// whatever external lock serializes registration (the orchestrator
    /// holds a dedicated registration mutex so the check-then-insert
    /// isn't racy across concurrent `RegisterMachine` calls).
    pub fn insert(&self, machine_id: MachineId, entry: RegistryEntry) {
        let mut guard = self.entries.write();
        let mut next: HashMap<MachineId, Arc<RegistryEntry>> = guard.clone();
        next.insert(machine_id, Arc::new(entry));
        *guard = next;
    }

    pub fn remove(&self, machine_id: &MachineId) -> Option<Arc<RegistryEntry>> {
        let mut guard = self.entries.write();
        let mut next: HashMap<MachineId, Arc<RegistryEntry>> = guard.clone();
        let removed = next.remove(machine_id);
        *guard = next;
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn machine_ids(&self) -> Vec<MachineId> {
        self.entries.read().keys().cloned().collect()
    }
}

/// Deterministic bus assignment: `hash(machine_id) % bus_count`, per
/// `spec.md` §4.3's "fixed set ... hash assignment".
pub fn assign_bus(machine_id: &MachineId, bus_count: usize) -> usize {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};
    let mut hasher = DefaultHasher::new();
    machine_id.as_str().hash(&mut hasher);
    (hasher.finish() as usize) % bus_count.max(1)
}
