//! Helpers shared by the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use genesis_addons::LifecycleController;
use genesis_dispatch::{DispatchNode, flatten};

/// Owners of every node under the command root, root excluded.
pub fn attached_command_owners(controller: &LifecycleController) -> Vec<String> {
    owners(&controller.roots().commands)
}

/// Owners of every node under the event root, root excluded.
pub fn attached_event_owners(controller: &LifecycleController) -> Vec<String> {
    owners(&controller.roots().events)
}

fn owners(root: &Arc<DispatchNode>) -> Vec<String> {
    let mut names: Vec<String> = flatten(root)
        .iter()
        .skip(1)
        .filter_map(|node| node.owner().addon_name().map(str::to_string))
        .collect();
    names.sort();
    names
}
