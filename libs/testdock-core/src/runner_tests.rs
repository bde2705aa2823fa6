//! Integration tests for the full pipeline
//!
//! These verify the externally observable behavior end to end:
//! 1. A passing test yields output starting at the pytest banner
//! 2. A syntax error still produces the banner (collection errors happen
//!    after pytest starts), reported as test failure output
//! 3. A nonexistent image fails before anything is staged
//! 4. Staged files and containers are gone after every run
//!
//! They require a Docker daemon and network access to pull python:3.8, so
//! they are ignored by default. Run with:
//!   cargo test -p testdock-core -- --ignored

use std::collections::HashMap;
use std::path::Path;

use crate::config::RunnerConfig;
use crate::engine::DockerEngine;
use crate::errors::Error;
use crate::runner::TestRunner;

const IMAGE: &str = "python:3.8";
const BANNER: &str =
    "============================= test session starts ==============================";

fn runner_with_staging(dir: &Path) -> TestRunner {
    let config = RunnerConfig {
        staging_dir: dir.to_path_buf(),
        ..RunnerConfig::default()
    };
    TestRunner::new(DockerEngine::connect(config).expect("docker daemon reachable"))
}

fn runner_with_config(config: RunnerConfig) -> TestRunner {
    TestRunner::new(DockerEngine::connect(config).expect("docker daemon reachable"))
}

async fn staging_dir_entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).expect("staging dir readable").count()
}

async fn stale_containers() -> usize {
    let docker = bollard::Docker::connect_with_local_defaults().expect("docker daemon reachable");
    let mut filters = HashMap::new();
    filters.insert("name".to_string(), vec!["testdock-".to_string()]);
    let options = bollard::container::ListContainersOptions::<String> {
        all: true,
        filters,
        ..Default::default()
    };
    docker
        .list_containers(Some(options))
        .await
        .expect("list containers")
        .len()
}

#[tokio::test]
#[ignore] // Requires Docker
async fn passing_test_reports_from_the_banner() {
    let staging = tempfile::tempdir().unwrap();
    let runner = runner_with_staging(staging.path());

    let source = "import numpy as np\nimport pytest\n\ndef test_add():\n    assert 1 + 1 == 2\n";
    let report = runner.run(source, IMAGE).await.expect("pipeline succeeds");

    assert!(report.starts_with(BANNER), "nothing may precede the banner");
    assert!(report.contains("1 passed"));
    assert!(!report.contains("pip install"));
}

#[tokio::test]
#[ignore] // Requires Docker
async fn syntax_error_still_yields_banner_output() {
    let staging = tempfile::tempdir().unwrap();
    let runner = runner_with_staging(staging.path());

    // Collection error, not BannerNotFound: pytest starts before it parses
    // the file.
    let source = "def test_broken(:\n    assert True\n";
    let report = runner.run(source, IMAGE).await.expect("pipeline succeeds");

    assert!(report.starts_with(BANNER));
    assert!(report.to_lowercase().contains("error"));
}

#[tokio::test]
#[ignore] // Requires Docker
async fn nonexistent_image_fails_before_staging() {
    let staging = tempfile::tempdir().unwrap();
    let runner = runner_with_staging(staging.path());

    let err = runner
        .run("def test_ok():\n    pass\n", "testdock-no-such-image:latest")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::ImageUnavailable { .. }));
    assert_eq!(
        staging_dir_entries(staging.path()).await,
        0,
        "no staged file may be left behind"
    );
}

#[tokio::test]
#[ignore] // Requires Docker
async fn teardown_leaves_no_staged_files_or_containers() {
    let staging = tempfile::tempdir().unwrap();
    let runner = runner_with_staging(staging.path());

    let source = "def test_ok():\n    assert 1 == 1\n";
    runner.run(source, IMAGE).await.expect("pipeline succeeds");

    // Container removal is spawned from the drop guard; give it a moment.
    tokio::time::sleep(std::time::Duration::from_secs(2)).await;

    assert_eq!(staging_dir_entries(staging.path()).await, 0);
    assert_eq!(stale_containers().await, 0);
}

#[tokio::test]
#[ignore] // Requires Docker
async fn missing_banner_is_reported_not_swallowed() {
    let staging = tempfile::tempdir().unwrap();
    // The command never invokes pytest, so no banner can appear.
    let config = RunnerConfig {
        staging_dir: staging.path().to_path_buf(),
        packages: vec![],
        pytest_command: "echo skipping".to_string(),
        ..RunnerConfig::default()
    };
    let runner = runner_with_config(config);

    let err = runner
        .run("def test_ok():\n    pass\n", IMAGE)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::BannerNotFound));

    assert_eq!(
        staging_dir_entries(staging.path()).await,
        0,
        "cleanup must run on the extraction failure path too"
    );
}

#[tokio::test]
#[ignore] // Requires Docker
async fn hung_test_code_hits_the_deadline() {
    let staging = tempfile::tempdir().unwrap();
    let config = RunnerConfig {
        staging_dir: staging.path().to_path_buf(),
        packages: vec![],
        // Run the file directly so the deadline is not spent in pip.
        pytest_command: "python".to_string(),
        timeout_secs: 10,
        ..RunnerConfig::default()
    };
    let runner = runner_with_config(config);

    let source = "import time\ntime.sleep(600)\n";
    let err = runner.run(source, IMAGE).await.unwrap_err();
    assert!(matches!(err, Error::ExecutionTimeout { .. }));

    assert_eq!(staging_dir_entries(staging.path()).await, 0);
}
