//! Run pytest snippets inside ephemeral Docker containers.
//!
//! The pipeline pulls the requested image, stages the caller's test source
//! into a bind-mounted directory, launches a container that installs the
//! declared packages and invokes pytest against the staged file, then
//! returns the captured session output starting at the pytest banner.
//!
//! Isolation is delegated entirely to the container boundary; the staged
//! source is treated as an opaque blob and never parsed.
//!
//! ```no_run
//! use testdock_core::{DockerEngine, RunnerConfig, TestRunner};
//!
//! # async fn demo() -> testdock_core::Result<()> {
//! let engine = DockerEngine::connect(RunnerConfig::default())?;
//! let runner = TestRunner::new(engine);
//!
//! let report = runner
//!     .run("def test_ok():\n    assert 1 == 1\n", "python:3.8")
//!     .await?;
//! println!("{report}");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod errors;
pub mod extract;
pub mod runner;
pub mod stager;

#[cfg(test)]
mod runner_tests;

pub use config::RunnerConfig;
pub use engine::{ContainerOutput, DockerEngine};
pub use errors::{Error, Result};
pub use extract::OutputDelimiter;
pub use runner::TestRunner;
pub use stager::StagedTest;
