//! Mode selection and bounded engine invocation

use crate::engine::{Completion, Engine, ExecutionMode, ExecutionResult, HostCapabilities, SourceUnit};
use crate::error::{HarnessError, HarnessResult};
use crate::metadata::TestMetadata;
use crossbeam::channel::{self, RecvTimeoutError};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Prepended to the assembled source for strict-mode runs
pub const STRICT_PREFIX: &str = "\"use strict\";\n";

/// Modes a test must succeed in, in run order
pub fn plan_modes(metadata: &TestMetadata) -> Vec<ExecutionMode> {
    if metadata.is_module() {
        vec![ExecutionMode::Module]
    } else if metadata.is_raw() || metadata.is_no_strict() {
        vec![ExecutionMode::Sloppy]
    } else if metadata.is_strict_only() {
        vec![ExecutionMode::Strict]
    } else {
        vec![ExecutionMode::Sloppy, ExecutionMode::Strict]
    }
}

/// One source unit per planned mode, each named after `origin`
pub fn build_units(
    origin: &Path,
    assembled: &str,
    metadata: &TestMetadata,
    timeout: Duration,
) -> Vec<SourceUnit> {
    plan_modes(metadata)
        .into_iter()
        .map(|mode| {
            let source = match mode {
                ExecutionMode::Strict => format!("{}{}", STRICT_PREFIX, assembled),
                ExecutionMode::Sloppy | ExecutionMode::Module => assembled.to_string(),
            };
            SourceUnit {
                name: origin.display().to_string(),
                origin: origin.to_path_buf(),
                source,
                mode,
                timeout,
            }
        })
        .collect()
}

/// Drives an [`Engine`] with a wall-clock bound on every call.
///
/// Each call runs on its own thread. If the bound elapses first the call is
/// abandoned and reported as [`Completion::TimedOut`]; the thread is left to
/// finish on its own, so engines that own external resources should also
/// honor [`SourceUnit::timeout`] themselves.
#[derive(Clone)]
pub struct ExecutionAdapter {
    engine: Arc<dyn Engine>,
}

impl ExecutionAdapter {
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        Self { engine }
    }

    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    /// Syntax-check step used for parse and resolution negatives
    pub fn check(&self, unit: &SourceUnit) -> HarnessResult<ExecutionResult> {
        let engine = Arc::clone(&self.engine);
        let owned = unit.clone();
        let completion = bounded(unit, move || engine.check(&owned))?;
        Ok(ExecutionResult {
            mode: unit.mode,
            completion,
            async_signal: None,
        })
    }

    /// Evaluate a unit with fresh host capabilities.
    ///
    /// With `await_done` set, a normal completion is followed by a wait for
    /// `$DONE` bounded by whatever is left of the unit's timeout.
    pub fn run(&self, unit: &SourceUnit, await_done: bool) -> HarnessResult<ExecutionResult> {
        let started = Instant::now();
        let host = HostCapabilities::new();

        let engine = Arc::clone(&self.engine);
        let owned = unit.clone();
        let remote_host = host.clone();
        let completion = bounded(unit, move || engine.execute(&owned, &remote_host))?;

        let async_signal = if await_done && completion == Completion::Normal {
            let remaining = unit.timeout.saturating_sub(started.elapsed());
            host.wait_for_done(remaining)
        } else {
            host.async_signal()
        };

        tracing::trace!(
            test = %unit.name,
            mode = %unit.mode,
            ?completion,
            ?async_signal,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "engine run finished"
        );

        Ok(ExecutionResult {
            mode: unit.mode,
            completion,
            async_signal,
        })
    }
}

fn bounded<F>(unit: &SourceUnit, call: F) -> HarnessResult<Completion>
where
    F: FnOnce() -> HarnessResult<Completion> + Send + 'static,
{
    let (tx, rx) = channel::bounded(1);
    std::thread::Builder::new()
        .name(format!("engine-{}", unit.mode))
        .spawn(move || {
            // The receiver is gone once the harness has given up on this call.
            let _ = tx.send(call());
        })
        .map_err(|e| HarnessError::Engine(format!("could not start engine thread: {}", e)))?;

    match rx.recv_timeout(unit.timeout) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => {
            tracing::warn!(test = %unit.name, mode = %unit.mode, "engine call exceeded its bound");
            Ok(Completion::TimedOut)
        }
        Err(RecvTimeoutError::Disconnected) => Err(HarnessError::Engine(format!(
            "engine panicked while running {} [{}]",
            unit.name, unit.mode
        ))),
    }
}
