// Runner configuration management
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::{Error, Result};

/// Settings for the execution pipeline.
///
/// The defaults reproduce the conventional layout: a `tests/` staging
/// directory next to the process working directory, bind-mounted at
/// `/tests` inside the container, with pytest and numpy installed before
/// the staged file is run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Host directory holding staged test files, resolved relative to the
    /// working directory. Created on first use.
    pub staging_dir: PathBuf,
    /// Absolute path the staging directory is mounted at inside the
    /// container; also the container's working directory.
    pub mount_target: String,
    /// Packages `pip install`ed before the test runner is invoked.
    pub packages: Vec<String>,
    /// Command that invokes the test runner against the staged basename.
    pub pytest_command: String,
    /// Deadline for a single container run, in seconds.
    pub timeout_secs: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            staging_dir: PathBuf::from("tests"),
            mount_target: "/tests".to_string(),
            packages: vec!["pytest".to_string(), "numpy".to_string()],
            pytest_command: "pytest".to_string(),
            timeout_secs: 300,
        }
    }
}

impl RunnerConfig {
    /// Load configuration from a JSON file.
    pub fn load(config_path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(config_path).map_err(|e| {
            Error::Config(format!("failed to read {}: {}", config_path.display(), e))
        })?;

        let config: Self = serde_json::from_str(&content).map_err(|e| {
            Error::Config(format!("failed to parse {}: {}", config_path.display(), e))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load from the default path (config/testdock.json), falling back to
    /// the built-in defaults when the file does not exist.
    pub fn load_default() -> Result<Self> {
        let default_path = Path::new("config/testdock.json");
        if default_path.exists() {
            Self::load(default_path)
        } else {
            Ok(Self::default())
        }
    }

    fn validate(&self) -> Result<()> {
        if self.staging_dir.as_os_str().is_empty() {
            return Err(Error::Config("staging_dir must not be empty".to_string()));
        }
        if !self.mount_target.starts_with('/') {
            return Err(Error::Config(format!(
                "mount_target must be an absolute container path, got '{}'",
                self.mount_target
            )));
        }
        if self.pytest_command.trim().is_empty() {
            return Err(Error::Config("pytest_command must not be empty".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(Error::Config("timeout_secs must be greater than zero".to_string()));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Shell sequence run inside the container: install the declared
    /// packages, then invoke the test runner against the staged file by
    /// basename.
    pub fn install_script(&self, basename: &str) -> String {
        if self.packages.is_empty() {
            format!("{} {}", self.pytest_command, basename)
        } else {
            format!(
                "pip install {}\n{} {}",
                self.packages.join(" "),
                self.pytest_command,
                basename
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_conventional_layout() {
        let config = RunnerConfig::default();
        assert_eq!(config.staging_dir, PathBuf::from("tests"));
        assert_eq!(config.mount_target, "/tests");
        assert_eq!(config.packages, vec!["pytest".to_string(), "numpy".to_string()]);
        assert_eq!(config.timeout(), Duration::from_secs(300));
    }

    #[test]
    fn install_script_installs_then_runs_the_staged_file() {
        let script = RunnerConfig::default().install_script("test_abc.py");
        assert_eq!(script, "pip install pytest numpy\npytest test_abc.py");
    }

    #[test]
    fn install_script_skips_pip_when_no_packages_declared() {
        let config = RunnerConfig {
            packages: vec![],
            ..Default::default()
        };
        assert_eq!(config.install_script("test_abc.py"), "pytest test_abc.py");
    }

    #[test]
    fn load_round_trips_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("testdock.json");
        let config = RunnerConfig {
            timeout_secs: 60,
            ..Default::default()
        };
        std::fs::write(&path, serde_json::to_string(&config).unwrap()).unwrap();

        let loaded = RunnerConfig::load(&path).unwrap();
        assert_eq!(loaded.timeout_secs, 60);
        assert_eq!(loaded.mount_target, "/tests");
    }

    #[test]
    fn relative_mount_target_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("testdock.json");
        let config = RunnerConfig {
            mount_target: "tests".to_string(),
            ..Default::default()
        };
        std::fs::write(&path, serde_json::to_string(&config).unwrap()).unwrap();

        let err = RunnerConfig::load(&path).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("testdock.json");
        let config = RunnerConfig {
            timeout_secs: 0,
            ..Default::default()
        };
        std::fs::write(&path, serde_json::to_string(&config).unwrap()).unwrap();

        assert!(matches!(RunnerConfig::load(&path).unwrap_err(), Error::Config(_)));
    }

    #[test]
    fn missing_file_reports_config_error() {
        let err = RunnerConfig::load(Path::new("/nonexistent/testdock.json")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
