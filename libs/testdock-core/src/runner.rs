// Pipeline orchestration - High-Level Glue
//
// The runner coordinates the image check, source staging, container
// execution and output extraction. It knows nothing about:
// - How containers run (engine's job)
// - Where the report begins in the log stream (delimiter's job)

use std::path::{Path, PathBuf};
use tracing::{info, instrument};

use crate::engine::DockerEngine;
use crate::errors::{Error, Result};
use crate::extract::OutputDelimiter;
use crate::stager::StagedTest;

/// Runs caller-supplied pytest source inside an ephemeral container and
/// returns the captured test session output.
pub struct TestRunner {
    engine: DockerEngine,
    delimiter: OutputDelimiter,
}

impl TestRunner {
    pub fn new(engine: DockerEngine) -> Self {
        Self {
            engine,
            delimiter: OutputDelimiter::pytest(),
        }
    }

    /// Replace the default pytest banner matcher, e.g. for another runner's
    /// report format.
    pub fn with_delimiter(mut self, delimiter: OutputDelimiter) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Execute `source` as a test file inside a container built from
    /// `image` and return the runner output from the session banner to the
    /// end of the stream.
    ///
    /// The stages run strictly in order and the first failure aborts the
    /// rest; the staged file and the container are cleaned up on every
    /// path via drop guards.
    #[instrument(skip(self, source), fields(image = %image, source_size = source.len()))]
    pub async fn run(&self, source: &str, image: &str) -> Result<String> {
        // Pull before staging, so an unavailable image leaves nothing behind.
        self.engine.ensure_image(image).await?;

        let config = self.engine.config();
        let staged = StagedTest::create(&config.staging_dir, source).await?;
        let host_dir = host_staging_dir(&config.staging_dir)?;

        info!(basename = %staged.basename(), "executing staged tests");
        let output = self
            .engine
            .run_container(image, &host_dir, staged.basename())
            .await?;

        let report = self.delimiter.extract(&output.logs)?.to_owned();
        info!(
            exit_code = output.exit_code,
            report_bytes = report.len(),
            "test session captured"
        );
        Ok(report)
        // `staged` drops here on every path; the container was already
        // removed by the engine's guard.
    }
}

/// The bind mount source must be an absolute host path; the configured
/// staging directory is resolved against the working directory.
fn host_staging_dir(staging_dir: &Path) -> Result<PathBuf> {
    std::fs::canonicalize(staging_dir).map_err(|e| Error::StagingFailed {
        dir: staging_dir.to_path_buf(),
        source: e,
    })
}
