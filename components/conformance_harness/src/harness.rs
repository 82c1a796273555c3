use crate::adapter::{build_units, ExecutionAdapter};
use crate::config::HarnessConfig;
use crate::discovery::{discover, GlobFilter};
use crate::engine::Engine;
use crate::error::{HarnessError, HarnessResult};
use crate::evaluator::{judge, Expectation};
use crate::fixtures::{assemble, FixtureCache};
use crate::test_case::TestCase;
use serde::{Deserialize, Serialize};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Detail recorded for tests the run-level timeout never reached
pub const RUN_TIMEOUT_DETAIL: &str = "run timeout elapsed before this test started";

/// Overall outcome of one test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pass,
    Fail,
    Skip,
}

/// Why a failing test failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    /// The harness could not run the test
    Harness,
    /// The engine under test did not behave as specified
    Engine,
    /// The engine under test did not finish in time
    Timeout,
}

/// Result of running a single test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub path: PathBuf,
    pub status: Status,
    /// Empty for passes; always set otherwise
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
}

impl Verdict {
    pub fn pass(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            status: Status::Pass,
            detail: String::new(),
            failure: None,
        }
    }

    pub fn skip(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            status: Status::Skip,
            detail: reason.into(),
            failure: None,
        }
    }

    /// Failing verdict; the first error decides the failure kind
    pub fn from_errors(path: impl Into<PathBuf>, errors: &[HarnessError]) -> Self {
        let kind = match errors.first() {
            Some(e) if e.is_harness_fault() => FailureKind::Harness,
            Some(HarnessError::Timeout { .. }) => FailureKind::Timeout,
            _ => FailureKind::Engine,
        };
        let prefix = match kind {
            FailureKind::Harness => "harness could not run test",
            FailureKind::Engine | FailureKind::Timeout => "engine under test failed",
        };
        let reasons = errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        Self {
            path: path.into(),
            status: Status::Fail,
            detail: format!("{}: {}", prefix, reasons),
            failure: Some(kind),
        }
    }

    pub fn from_error(path: impl Into<PathBuf>, error: HarnessError) -> Self {
        Self::from_errors(path, &[error])
    }

    pub fn is_pass(&self) -> bool {
        self.status == Status::Pass
    }

    pub fn is_fail(&self) -> bool {
        self.status == Status::Fail
    }

    pub fn is_skip(&self) -> bool {
        self.status == Status::Skip
    }

    pub fn is_timeout(&self) -> bool {
        self.failure == Some(FailureKind::Timeout)
    }

    /// Failed because the harness could not run it
    pub fn is_harness_error(&self) -> bool {
        self.failure == Some(FailureKind::Harness)
    }
}

/// Conformance run coordinator.
///
/// Sequences metadata parsing, fixture assembly, execution and evaluation for
/// each test. Every failure, including a panic, is turned into a [`Verdict`];
/// nothing escapes [`Harness::run_all`].
pub struct Harness {
    adapter: ExecutionAdapter,
    fixtures: Arc<FixtureCache>,
    config: HarnessConfig,
}

impl Harness {
    /// Harness with default settings
    pub fn new(engine: impl Engine + 'static) -> Self {
        Self::with_config(engine, HarnessConfig::default())
    }

    pub fn with_config(engine: impl Engine + 'static, config: HarnessConfig) -> Self {
        let fixtures = match &config.includes_dir {
            Some(dir) => FixtureCache::with_includes_dir(dir),
            None => FixtureCache::new(),
        };
        Self {
            adapter: ExecutionAdapter::new(Arc::new(engine)),
            fixtures: Arc::new(fixtures),
            config,
        }
    }

    /// Share a fixture cache with other harnesses
    pub fn with_fixtures(mut self, fixtures: Arc<FixtureCache>) -> Self {
        self.fixtures = fixtures;
        self
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn fixtures(&self) -> &FixtureCache {
        &self.fixtures
    }

    pub fn engine_name(&self) -> &str {
        self.adapter.engine_name()
    }

    /// Load and run one test file
    pub fn run_one(&self, path: &Path) -> Verdict {
        let outcome = catch_unwind(AssertUnwindSafe(|| match TestCase::load(path) {
            Ok(case) => self.run_case(&case),
            Err(e) => Verdict::from_error(path, e),
        }));
        let verdict = outcome.unwrap_or_else(|payload| {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Verdict::from_error(path, HarnessError::Engine(format!("panicked: {}", message)))
        });

        match verdict.status {
            Status::Pass => tracing::debug!(test = %path.display(), "pass"),
            Status::Skip => tracing::debug!(test = %path.display(), reason = %verdict.detail, "skip"),
            Status::Fail => tracing::info!(test = %path.display(), detail = %verdict.detail, "fail"),
        }
        verdict
    }

    /// Run a test that is already loaded
    pub fn run_case(&self, case: &TestCase) -> Verdict {
        let missing = case
            .metadata
            .unsupported_features(&self.config.unsupported_features);
        if !missing.is_empty() {
            return Verdict::skip(&case.path, format!("unsupported features: {}", missing.join(", ")));
        }

        match self.run_modes(case) {
            Ok(errors) if errors.is_empty() => Verdict::pass(&case.path),
            Ok(errors) => Verdict::from_errors(&case.path, &errors),
            Err(e) => Verdict::from_error(&case.path, e),
        }
    }

    /// Run every required mode, even after one fails, and collect what went wrong
    fn run_modes(&self, case: &TestCase) -> HarnessResult<Vec<HarnessError>> {
        let expectation = Expectation::from_metadata(&case.metadata)?;
        let assembled = assemble(&self.fixtures, &case.metadata, &case.source)?;
        let timeout = self.config.timeout();

        let mut errors = Vec::new();
        for unit in build_units(&case.path, &assembled, &case.metadata, timeout) {
            let result = if expectation.needs_check_only() {
                self.adapter.check(&unit)?
            } else {
                self.adapter.run(&unit, expectation.awaits_done())?
            };
            if let Err(e) = judge(&expectation, &result, timeout) {
                errors.push(e);
            }
        }
        Ok(errors)
    }

    /// Run tests and return one verdict per path, in the given order.
    ///
    /// Work is spread over `jobs` threads. Once the run timeout (if any) has
    /// elapsed, tests that have not started are skipped; verdicts already
    /// produced are unaffected.
    pub fn run_all(&self, paths: &[PathBuf]) -> Vec<Verdict> {
        let started = Instant::now();
        let run_deadline = self.config.run_timeout().map(|limit| started + limit);
        let out_of_time = || run_deadline.is_some_and(|deadline| Instant::now() >= deadline);

        let jobs = self.config.jobs.clamp(1, paths.len().max(1));
        tracing::info!(tests = paths.len(), jobs, engine = self.engine_name(), "starting run");

        let (task_tx, task_rx) = crossbeam::channel::unbounded::<(usize, &PathBuf)>();
        for task in paths.iter().enumerate() {
            let _ = task_tx.send(task);
        }
        drop(task_tx);

        let (done_tx, done_rx) = crossbeam::channel::unbounded::<(usize, Verdict)>();
        let scoped = crossbeam::scope(|scope| {
            for _ in 0..jobs {
                let task_rx = task_rx.clone();
                let done_tx = done_tx.clone();
                let out_of_time = &out_of_time;
                scope.spawn(move |_| {
                    for (index, path) in task_rx.iter() {
                        let verdict = if out_of_time() {
                            Verdict::skip(path, RUN_TIMEOUT_DETAIL)
                        } else {
                            self.run_one(path)
                        };
                        if done_tx.send((index, verdict)).is_err() {
                            break;
                        }
                    }
                });
            }
        });
        if scoped.is_err() {
            tracing::error!("a worker thread panicked; its remaining tests are reported as harness failures");
        }
        drop(done_tx);

        let mut slots: Vec<Option<Verdict>> = vec![None; paths.len()];
        for (index, verdict) in done_rx.try_iter() {
            slots[index] = Some(verdict);
        }
        let verdicts: Vec<Verdict> = slots
            .into_iter()
            .zip(paths)
            .map(|(slot, path)| {
                slot.unwrap_or_else(|| {
                    Verdict::from_error(path, HarnessError::Engine("worker exited before reporting".into()))
                })
            })
            .collect();

        tracing::info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "run finished"
        );
        verdicts
    }

    /// Discover tests under `root` and run them
    pub fn run_directory(&self, root: &Path, filter: Option<&GlobFilter>) -> HarnessResult<Vec<Verdict>> {
        let paths = discover(root, filter)?;
        Ok(self.run_all(&paths))
    }
}
