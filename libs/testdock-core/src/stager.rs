// Source staging into the shared mount directory

use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::{Error, Result};

/// A test source file staged into the bind-mounted directory.
///
/// The file is removed when the handle is dropped, so cleanup happens on
/// every exit path of the pipeline, not just the successful one.
#[derive(Debug)]
pub struct StagedTest {
    path: PathBuf,
    basename: String,
}

impl StagedTest {
    /// Write `source` to a uniquely named pytest file under `staging_dir`.
    ///
    /// The basename embeds a v4 UUID, so concurrent invocations sharing the
    /// directory never collide, and uses the `test_*.py` shape pytest
    /// recognizes. The payload is fully written and synced before this
    /// returns, so the container never observes a partial file.
    pub async fn create(staging_dir: &Path, source: &str) -> Result<Self> {
        fs::create_dir_all(staging_dir)
            .await
            .map_err(|e| staging_failed(staging_dir, e))?;

        // Hex-only name: pytest imports the file as a Python module, so the
        // basename must stay a valid identifier.
        let basename = format!("test_{}.py", Uuid::new_v4().simple());
        let path = staging_dir.join(&basename);

        let file = fs::File::create(&path)
            .await
            .map_err(|e| staging_failed(staging_dir, e))?;

        // Guard exists before the first write: an interrupted write (disk
        // exhausted) must not leave a partial file in the shared directory.
        let staged = Self { path, basename };
        staged
            .write_payload(file, source)
            .await
            .map_err(|e| staging_failed(staging_dir, e))?;

        debug!(basename = %staged.basename, "staged test source");
        Ok(staged)
    }

    async fn write_payload(&self, mut file: fs::File, source: &str) -> std::io::Result<()> {
        file.write_all(source.as_bytes()).await?;
        file.flush().await?;
        file.sync_all().await
    }

    /// Container-relative argument for the test runner.
    pub fn basename(&self) -> &str {
        &self.basename
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagedTest {
    fn drop(&mut self) {
        // Best-effort removal; log, never panic, during teardown.
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %e, "failed to remove staged test file");
            }
        }
    }
}

fn staging_failed(dir: &Path, source: std::io::Error) -> Error {
    Error::StagingFailed {
        dir: dir.to_path_buf(),
        source,
    }
}
