//! Harness configuration, loadable from a YAML file

use crate::error::{HarnessError, HarnessResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Per-test bound used when nothing else is configured
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// How to launch an external engine binary
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Executable to run, e.g. `node` or `d8`
    pub program: Option<String>,
    /// Arguments placed before the test file path
    pub args: Vec<String>,
    /// Extra arguments for module tests (e.g. `--module` for d8)
    pub module_args: Vec<String>,
    /// Arguments that make the engine parse without evaluating (e.g. `--check`).
    /// Without them a parse check falls back to a full run.
    pub check_args: Option<Vec<String>>,
}

/// Harness settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    /// Bound on each engine run, in milliseconds
    pub timeout_ms: u64,
    /// Bound on the whole run; tests not started by then are skipped
    pub run_timeout_ms: Option<u64>,
    /// Worker threads
    pub jobs: usize,
    /// Directory searched for fixtures before the bundled ones
    pub includes_dir: Option<PathBuf>,
    /// Tests requiring any of these features are skipped
    pub unsupported_features: HashSet<String>,
    pub engine: EngineConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            run_timeout_ms: None,
            jobs: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            includes_dir: None,
            unsupported_features: HashSet::new(),
            engine: EngineConfig::default(),
        }
    }
}

impl HarnessConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a YAML config file
    pub fn load<P: AsRef<Path>>(path: P) -> HarnessResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| HarnessError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text)
            .map_err(|e| HarnessError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_yaml(text: &str) -> HarnessResult<Self> {
        let config: HarnessConfig =
            serde_yaml::from_str(text).map_err(|e| HarnessError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> HarnessResult<()> {
        if self.timeout_ms == 0 {
            return Err(HarnessError::Config("timeout_ms must be positive".into()));
        }
        if self.jobs == 0 {
            return Err(HarnessError::Config("jobs must be at least 1".into()));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn run_timeout(&self) -> Option<Duration> {
        self.run_timeout_ms.map(Duration::from_millis)
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_run_timeout_ms(mut self, run_timeout_ms: u64) -> Self {
        self.run_timeout_ms = Some(run_timeout_ms);
        self
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }

    pub fn with_includes_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.includes_dir = Some(dir.into());
        self
    }

    /// Mark a feature as unsupported
    pub fn with_unsupported_feature(mut self, feature: &str) -> Self {
        self.unsupported_features.insert(feature.to_string());
        self
    }

    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }
}
