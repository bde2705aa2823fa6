// Error taxonomy for the pipeline
// Every stage failure aborts the remaining pipeline and surfaces here with
// the stage context and underlying cause attached.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The image reference is malformed or the pull failed (registry
    /// unreachable, auth failure, tag not found). No retry is attempted.
    #[error("image '{image}' is unavailable: {source}")]
    ImageUnavailable {
        image: String,
        #[source]
        source: bollard::errors::Error,
    },

    /// The staging directory is not writable or the source could not be
    /// fully written.
    #[error("failed to stage test source under {dir}: {source}")]
    StagingFailed {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The container could not be created or started.
    #[error("failed to launch container from image '{image}': {source}")]
    LaunchFailed {
        image: String,
        #[source]
        source: bollard::errors::Error,
    },

    /// The daemon became unreachable, or waiting/log collection failed
    /// after the container was already running.
    #[error("container backend error: {0}")]
    Backend(#[source] bollard::errors::Error),

    /// The container did not finish within the configured deadline and was
    /// force-killed.
    #[error("execution exceeded the {timeout:?} deadline; container was killed")]
    ExecutionTimeout { timeout: Duration },

    /// The captured output never contains the test runner's start banner,
    /// e.g. the dependency install failed before the runner launched.
    #[error("test runner banner not found in container output")]
    BannerNotFound,

    /// A caller-supplied delimiter pattern did not compile.
    #[error("invalid output delimiter pattern")]
    InvalidDelimiter(#[from] regex::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
