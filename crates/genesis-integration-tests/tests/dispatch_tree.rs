//! Dispatch and statistics across addon subtrees attached by the controller.

mod common;

use std::collections::HashSet;
use std::sync::Arc;

use genesis_addons::AddonStatus;
use genesis_dispatch::stats::{top_n, total_call_count};
use genesis_dispatch::{DispatchNode, Dispatcher, NodeKind, NodeOwner, flatten, flatten_active};
use genesis_test::{MockModule, RecordingMessenger, TestRuntime, test_update};

#[tokio::test]
async fn test_commands_route_through_attached_addons() {
    let weather = MockModule::new("weather").with_command("forecast");
    let games = MockModule::new("games").with_command("dice");
    let rt = TestRuntime::new()
        .with_addon("weather", AddonStatus::Enabled, &weather)
        .with_addon("games", AddonStatus::Enabled, &games);
    let controller = rt.start();
    controller.load_many(Vec::new()).await.unwrap();

    let messenger = RecordingMessenger::new();
    let shared = messenger.shared();
    let dispatcher = Dispatcher::new(Arc::clone(&controller.roots().commands));
    for text in [".forecast", ".dice", ".dice", ".unknown"] {
        dispatcher.dispatch(&test_update(text), &shared).await;
    }

    let replies: Vec<String> = messenger.messages().into_iter().map(|m| m.text).collect();
    assert_eq!(replies, vec!["forecast", "dice", "dice"]);
    assert_eq!(total_call_count(&controller.roots().commands), 3);

    let top: Vec<(String, u64)> = top_n(&controller.roots().commands, 1)
        .into_iter()
        .map(|r| (r.registration.body().to_string(), r.call_count))
        .collect();
    assert_eq!(top, vec![("dice".to_string(), 2)]);

    controller.unload("games").await.unwrap();
    assert_eq!(total_call_count(&controller.roots().commands), 1);
    dispatcher.dispatch(&test_update(".dice"), &shared).await;
    assert_eq!(messenger.messages().len(), 3);
}

#[test]
fn test_flatten_has_no_duplicates_after_reshuffling() {
    let root = DispatchNode::root(NodeKind::Command);
    let nodes: Vec<_> = (0..6)
        .map(|i| DispatchNode::new(NodeKind::Command, NodeOwner::addon(format!("n{i}"))))
        .collect();

    for node in &nodes {
        root.include(node).unwrap();
    }
    // Chain n0 > n1 > n2, then move n1 around and try to close cycles.
    nodes[0].include(&nodes[1]).unwrap();
    nodes[1].include(&nodes[2]).unwrap();
    assert!(nodes[2].include(&nodes[0]).is_err());
    assert!(nodes[1].include(&nodes[1]).is_err());
    nodes[3].include(&nodes[1]).unwrap();
    nodes[4].include(&nodes[3]).unwrap();
    assert!(root.exclude(&nodes[5]));
    assert!(!root.exclude(&nodes[5]));
    nodes[2].include(&nodes[5]).unwrap();

    let flat = flatten(&root);
    let unique: HashSet<_> = flat.iter().map(|n| n.id()).collect();
    assert_eq!(unique.len(), flat.len());
    assert_eq!(flat.len(), 7);
}

#[tokio::test]
async fn test_disabled_subtree_stays_visible_but_inactive() {
    let weather = MockModule::new("weather").with_command("forecast");
    let rt = TestRuntime::new().with_addon("weather", AddonStatus::Enabled, &weather);
    let controller = rt.start();
    controller.load("weather").await.unwrap();

    let node = weather.commands().unwrap();
    node.find("forecast").unwrap().record_call();
    node.disable();

    let root = &controller.roots().commands;
    assert_eq!(flatten(root).len(), 2);
    assert_eq!(flatten_active(root).len(), 1);
    assert_eq!(total_call_count(root), 0);

    let messenger = RecordingMessenger::new();
    let handled = Dispatcher::new(Arc::clone(root))
        .dispatch(&test_update(".forecast"), &messenger.shared())
        .await;
    assert!(handled.is_none());
}
