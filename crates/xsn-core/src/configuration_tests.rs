// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::definition::{MachineDefinition, StateNode};

#[test]
fn new_configuration_has_no_active_states() {
    let configuration = Configuration::new();
    assert!(!configuration.is_active(&StateId::new("root")));
}

fn traffic_light() -> MachineDefinition {
    let states = vec![
        StateNode::compound("root", "red").with_children(["red", "green"]),
        StateNode::atomic("red").with_parent("root"),
        StateNode::atomic("green").with_parent("root"),
    ];
    MachineDefinition::new("light", "root", states).expect("valid definition")
}

#[test]
fn snapshot_contains_only_the_active_leaf_not_its_active_ancestors() {
    let definition = traffic_light();
    let mut configuration = Configuration::new();
    configuration.active_states.insert(StateId::new("root"));
    configuration.active_states.insert(StateId::new("red"));
    let snapshot = configuration.snapshot(&definition);
    assert!(snapshot.contains("red"));
    assert!(!snapshot.contains("root"), "an active compound ancestor is not itself a leaf");
    assert!(!snapshot.contains("green"));
}
