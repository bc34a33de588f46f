//! Converging live state with manifests edited on disk.

use genesis_addons::AddonStatus;
use genesis_test::{MockModule, TestRuntime, write_manifest};

#[tokio::test]
async fn test_reconcile_follows_disk() {
    let module = MockModule::new("weather").with_command("forecast");
    let rt = TestRuntime::new().with_addon("weather", AddonStatus::Enabled, &module);
    let controller = rt.start();
    controller.load("weather").await.unwrap();

    write_manifest(rt.root(), "weather", AddonStatus::Disabled);
    let status = controller.reconcile("weather").await.unwrap();
    assert_eq!(status, AddonStatus::Disabled);
    assert!(!controller.loaded().contains("weather"));

    write_manifest(rt.root(), "weather", AddonStatus::Enabled);
    let status = controller.reconcile("weather").await.unwrap();
    assert_eq!(status, AddonStatus::Enabled);
    assert!(controller.loaded().contains("weather"));
}

#[tokio::test]
async fn test_rescan_picks_up_new_addon() {
    let rt = TestRuntime::new();
    let controller = rt.start();
    assert!(controller.registry().all().is_empty());

    let dir = write_manifest(rt.root(), "late", AddonStatus::Enabled);
    assert_eq!(controller.registry().rescan().unwrap(), 1);
    let addon = controller.registry().find_by_dir(&dir).unwrap();
    controller.reconcile(&addon).await.unwrap();
    assert!(controller.loaded().contains("late"));
}
