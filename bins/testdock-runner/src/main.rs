use testdock_core::{DockerEngine, RunnerConfig, TestRunner};
use tracing::info;

// Demonstration entry point: runs a built-in payload against a fixed image
// and prints the captured pytest session to stdout. No argument parsing.

const EXAMPLE_IMAGE: &str = "python:3.8";

const EXAMPLE_SOURCE: &str = r#"
import numpy as np
import pytest

def test_add():
    assert 1 + 1 == 2
"#;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    info!("testdock runner booting...");

    let config = RunnerConfig::load_default()?;
    info!(
        staging_dir = %config.staging_dir.display(),
        image = EXAMPLE_IMAGE,
        timeout_secs = config.timeout_secs,
        "configuration loaded"
    );

    let engine = DockerEngine::connect(config)?;
    let runner = TestRunner::new(engine);

    let report = runner.run(EXAMPLE_SOURCE, EXAMPLE_IMAGE).await?;
    println!("{report}");

    Ok(())
}
