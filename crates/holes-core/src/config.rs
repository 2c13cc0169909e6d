use crate::error::Result;
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Project settings read from `.holes/config.yaml`. Every field has a default,
/// so a project without the file behaves as if it were empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_document")]
    pub document: PathBuf,
    #[serde(default = "default_baseline_tests")]
    pub baseline_tests: PathBuf,
    #[serde(default = "default_resolution_tests")]
    pub resolution_tests: PathBuf,
    #[serde(default = "default_test_prefix")]
    pub test_prefix: String,
    /// Test modules must also end with this. Empty accepts any file name.
    #[serde(default = "default_test_suffix")]
    pub test_suffix: String,
    /// Shell command used to run tests. `{targets}` is replaced by the
    /// quoted list of test module paths.
    #[serde(default = "default_test_command")]
    pub test_command: String,
    #[serde(default = "default_protected_branch")]
    pub protected_branch: String,
    #[serde(default = "default_protected_path")]
    pub protected_path: PathBuf,
    /// `0` disables the timeout.
    #[serde(default = "default_test_timeout")]
    pub test_timeout_seconds: u64,
    #[serde(default = "default_vcs_timeout")]
    pub vcs_timeout_seconds: u64,
    #[serde(default = "default_report_file")]
    pub report_file: PathBuf,
}

fn default_document() -> PathBuf {
    PathBuf::from(paths::DEFAULT_DOCUMENT)
}

fn default_baseline_tests() -> PathBuf {
    PathBuf::from(paths::DEFAULT_BASELINE_TESTS)
}

fn default_resolution_tests() -> PathBuf {
    PathBuf::from(paths::DEFAULT_RESOLUTION_TESTS)
}

fn default_test_prefix() -> String {
    paths::DEFAULT_TEST_PREFIX.to_string()
}

fn default_test_suffix() -> String {
    paths::DEFAULT_TEST_SUFFIX.to_string()
}

fn default_test_command() -> String {
    "python -m pytest -q {targets}".to_string()
}

fn default_protected_branch() -> String {
    paths::DEFAULT_PROTECTED_BRANCH.to_string()
}

fn default_protected_path() -> PathBuf {
    PathBuf::from(paths::DEFAULT_PROTECTED_PATH)
}

fn default_test_timeout() -> u64 {
    600
}

fn default_vcs_timeout() -> u64 {
    30
}

fn default_report_file() -> PathBuf {
    PathBuf::from(paths::DEFAULT_REPORT)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            document: default_document(),
            baseline_tests: default_baseline_tests(),
            resolution_tests: default_resolution_tests(),
            test_prefix: default_test_prefix(),
            test_suffix: default_test_suffix(),
            test_command: default_test_command(),
            protected_branch: default_protected_branch(),
            protected_path: default_protected_path(),
            test_timeout_seconds: default_test_timeout(),
            vcs_timeout_seconds: default_vcs_timeout(),
            report_file: default_report_file(),
        }
    }
}

fn seconds(secs: u64) -> Option<Duration> {
    if secs == 0 {
        None
    } else {
        Some(Duration::from_secs(secs))
    }
}

impl Config {
    /// Load `.holes/config.yaml`, falling back to defaults when absent.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Ok(Config::default());
        }
        let data = std::fs::read_to_string(&path)?;
        if data.trim().is_empty() {
            return Ok(Config::default());
        }
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn document_path(&self, root: &Path) -> PathBuf {
        paths::under_root(root, &self.document)
    }

    pub fn baseline_dir(&self, root: &Path) -> PathBuf {
        paths::under_root(root, &self.baseline_tests)
    }

    pub fn resolution_dir(&self, root: &Path) -> PathBuf {
        paths::under_root(root, &self.resolution_tests)
    }

    pub fn test_timeout(&self) -> Option<Duration> {
        seconds(self.test_timeout_seconds)
    }

    pub fn vcs_timeout(&self) -> Option<Duration> {
        seconds(self.vcs_timeout_seconds)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.test_command.trim().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "test_command is empty".to_string(),
            });
        } else if !self.test_command.contains("{targets}") {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "test_command '{}' has no {{targets}} placeholder; every run executes the same tests",
                    self.test_command
                ),
            });
        }

        if self.test_prefix.is_empty() && self.test_suffix.is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "test_prefix and test_suffix are empty; any file is a test module"
                    .to_string(),
            });
        }

        if self.protected_branch.trim().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "protected_branch is empty".to_string(),
            });
        }

        if self.test_timeout_seconds == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "test_timeout_seconds=0: a hung test run blocks the gate indefinitely"
                    .to_string(),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
