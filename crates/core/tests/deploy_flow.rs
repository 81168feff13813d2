//! End-to-end tests for the upload and rollback pipelines.
//!
//! These tests drive a real `DeployEngine` over a temporary data
//! directory: real zip bundles, real child processes (via `sh`), and the
//! actual persistent-folder relocation between deployments.

#![cfg(unix)]

use dk_core::engine::ConfigUpdate;
use dk_core::engine::DeployEngine;
use dk_core::engine::DeployError;
use dk_core::store::StoreError;
use dk_core::supervisor::ProcessSupervisor;
use dk_core::supervisor::StopTimeouts;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

/// Write a zip bundle containing the given (name, content) entries.
fn write_bundle(path: &Path, entries: &[(&str, &str)]) {
    let file = fs::File::create(path).expect("create bundle");
    let mut writer = zip::ZipWriter::new(file);
    for (name, content) in entries {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .expect("start entry");
        writer.write_all(content.as_bytes()).expect("write entry");
    }
    writer.finish().expect("finish bundle");
}

/// Engine with stop timeouts short enough for tests.
async fn test_engine(data_dir: &Path) -> DeployEngine {
    let supervisor = ProcessSupervisor::new().with_stop_timeouts(StopTimeouts {
        graceful: Duration::from_millis(500),
        forced: Duration::from_secs(2),
    });
    DeployEngine::with_supervisor(data_dir, supervisor)
        .await
        .expect("engine should open")
}

fn sample_bundle(dir: &TempDir, file_name: &str) -> PathBuf {
    let path = dir.path().join(file_name);
    write_bundle(
        &path,
        &[
            ("package.json", "{\"name\":\"app\"}"),
            ("index.js", "console.log('app');"),
        ],
    );
    path
}

#[tokio::test]
async fn test_deploy_extracts_and_switches_current() {
    let dir = TempDir::new().expect("temp dir");
    let engine = test_engine(&dir.path().join("data")).await;
    engine
        .update_config(ConfigUpdate {
            command: Some("true".to_string()),
            ..ConfigUpdate::default()
        })
        .await
        .expect("configure command");

    let bundle = sample_bundle(&dir, "app.zip");
    let name = engine.deploy(&bundle).await.expect("deploy should succeed");

    let status = engine.status().await;
    assert_eq!(status.current_deployment.as_deref(), Some(name.as_str()));
    assert!(status.last_upload_date.is_some());

    let base_path = PathBuf::from(status.base_path.expect("base path set"));
    assert!(base_path.join("package.json").is_file());
    assert!(base_path.join("index.js").is_file());

    assert_eq!(engine.deployments().await.expect("list"), vec![name]);
    // The caller's bundle is not staged under uploads/, so it survives.
    assert!(bundle.exists());
}

#[tokio::test]
async fn test_deploy_carries_persistent_folders_between_versions() {
    let dir = TempDir::new().expect("temp dir");
    let engine = test_engine(&dir.path().join("data")).await;
    engine
        .update_config(ConfigUpdate {
            command: Some("true".to_string()),
            persistent_folders: Some("uploads,data".to_string()),
            ..ConfigUpdate::default()
        })
        .await
        .expect("configure");

    let bundle_a = sample_bundle(&dir, "a.zip");
    engine.deploy(&bundle_a).await.expect("first deploy");

    // The running version accumulates user data.
    let status = engine.status().await;
    let deployment_a = PathBuf::from(status.base_path.expect("base path set"));
    fs::create_dir_all(deployment_a.join("uploads")).expect("setup");
    fs::write(deployment_a.join("uploads/test.txt"), "hi").expect("setup");

    let bundle_b = sample_bundle(&dir, "b.zip");
    engine.deploy(&bundle_b).await.expect("second deploy");

    let status = engine.status().await;
    let deployment_b = PathBuf::from(status.base_path.expect("base path set"));
    assert_ne!(deployment_a, deployment_b);

    // User data followed the switch; the old deployment gave it up.
    assert_eq!(
        fs::read_to_string(deployment_b.join("uploads/test.txt")).expect("read"),
        "hi"
    );
    assert!(!deployment_a.join("uploads").exists());
    // Ownership transferred out of the persistent store as well.
    assert!(!dir
        .path()
        .join("data/persistent/uploads/test.txt")
        .exists());
}

#[tokio::test]
async fn test_rollback_switches_back_to_retained_version() {
    let dir = TempDir::new().expect("temp dir");
    let engine = test_engine(&dir.path().join("data")).await;
    engine
        .update_config(ConfigUpdate {
            command: Some("true".to_string()),
            ..ConfigUpdate::default()
        })
        .await
        .expect("configure");

    let bundle_a = sample_bundle(&dir, "a.zip");
    let version_a = engine.deploy(&bundle_a).await.expect("first deploy");
    let bundle_b = sample_bundle(&dir, "b.zip");
    let version_b = engine.deploy(&bundle_b).await.expect("second deploy");
    assert_ne!(version_a, version_b);

    engine.rollback(&version_a).await.expect("rollback");

    let status = engine.status().await;
    assert_eq!(status.current_deployment.as_deref(), Some(version_a.as_str()));

    // Both versions are still retained.
    let retained = engine.deployments().await.expect("list");
    assert!(retained.contains(&version_a));
    assert!(retained.contains(&version_b));
}

#[tokio::test]
async fn test_rollback_to_unknown_version_keeps_app_running() {
    let dir = TempDir::new().expect("temp dir");
    let engine = test_engine(&dir.path().join("data")).await;
    engine
        .update_config(ConfigUpdate {
            command: Some("sleep 5".to_string()),
            ..ConfigUpdate::default()
        })
        .await
        .expect("configure");

    let bundle = sample_bundle(&dir, "app.zip");
    engine.deploy(&bundle).await.expect("deploy");
    assert!(engine.status().await.running);

    let result = engine.rollback("2030-01-01T00-00-00-000Z").await;
    assert!(matches!(
        result,
        Err(DeployError::Store(StoreError::VersionNotFound { .. }))
    ));
    // The existence check ran before the stop stage.
    assert!(engine.status().await.running);

    assert!(engine.stop_app().await);
    assert!(!engine.status().await.running);
}

#[tokio::test]
async fn test_repeated_deploys_rotate_old_versions() {
    let dir = TempDir::new().expect("temp dir");
    let engine = test_engine(&dir.path().join("data")).await;
    engine
        .update_config(ConfigUpdate {
            command: Some("true".to_string()),
            ..ConfigUpdate::default()
        })
        .await
        .expect("configure");

    let mut names = Vec::new();
    for i in 0..6 {
        let bundle = sample_bundle(&dir, &format!("v{i}.zip"));
        names.push(engine.deploy(&bundle).await.expect("deploy"));
    }

    let retained = engine.deployments().await.expect("list");
    assert_eq!(retained.len(), 5);
    // The oldest deployment was pruned, the newest five remain.
    assert!(!retained.contains(&names[0]));
    for name in &names[1..] {
        assert!(retained.contains(name));
    }
    assert_eq!(
        engine.status().await.current_deployment.as_deref(),
        Some(names[5].as_str())
    );
}

#[tokio::test]
async fn test_staged_upload_is_discarded_after_deploy() {
    let dir = TempDir::new().expect("temp dir");
    let engine = test_engine(&dir.path().join("data")).await;
    engine
        .update_config(ConfigUpdate {
            command: Some("true".to_string()),
            ..ConfigUpdate::default()
        })
        .await
        .expect("configure");

    // A bundle staged under uploads/ is one-shot.
    let staged = engine.uploads_dir().join("staged.zip");
    write_bundle(&staged, &[("index.js", "1;")]);

    engine.deploy(&staged).await.expect("deploy");
    assert!(!staged.exists());
}
