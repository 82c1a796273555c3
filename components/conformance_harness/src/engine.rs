//! The boundary to the engine under test
//!
//! The harness never interprets ECMAScript. It hands an [`Engine`] a
//! [`SourceUnit`] together with the [`HostCapabilities`] the script may call
//! back into (`$DONE`, `print`), and gets a [`Completion`] back.

use crate::error::HarnessResult;
use crate::metadata::Phase;
use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Line printed by `doneprintHandle.js` when `$DONE()` succeeds
pub const ASYNC_COMPLETE_MARKER: &str = "Test262:AsyncTestComplete";

/// Prefix printed by `doneprintHandle.js` when `$DONE(error)` is called
pub const ASYNC_FAILURE_MARKER: &str = "Test262:AsyncTestFailure:";

/// How a source unit is evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Classic script, non-strict
    Sloppy,
    /// Classic script with a `"use strict";` directive prepended
    Strict,
    /// Module goal; top-level bindings stay module-scoped
    Module,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::Sloppy => write!(f, "sloppy"),
            ExecutionMode::Strict => write!(f, "strict"),
            ExecutionMode::Module => write!(f, "module"),
        }
    }
}

/// One self-contained piece of source handed to the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUnit {
    /// Display name, normally the test path
    pub name: String,
    /// Test file the unit was built from. Relative module specifiers resolve
    /// against its directory.
    pub origin: PathBuf,
    /// Fixtures plus test body, strict prefix already applied
    pub source: String,
    pub mode: ExecutionMode,
    /// Wall-clock bound for this unit
    pub timeout: Duration,
}

/// A value thrown out of the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThrownValue {
    /// Where the error surfaced
    pub phase: Phase,
    /// Constructor name (e.g. "TypeError") when the engine could tell
    pub error_type: Option<String>,
    pub message: String,
}

impl ThrownValue {
    pub fn new(phase: Phase, error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            phase,
            error_type: Some(error_type.into()),
            message: message.into(),
        }
    }

    /// Error raised while evaluating
    pub fn runtime(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Phase::Runtime, error_type, message)
    }

    /// Early error raised before evaluation
    pub fn parse(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Phase::Parse, error_type, message)
    }

    /// Thrown value whose kind is unknown (a thrown string, say)
    pub fn untyped(phase: Phase, message: impl Into<String>) -> Self {
        Self {
            phase,
            error_type: None,
            message: message.into(),
        }
    }

    /// Check whether this value is an instance of the named error kind
    pub fn is(&self, error_type: &str) -> bool {
        self.error_type.as_deref() == Some(error_type)
    }
}

impl fmt::Display for ThrownValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.error_type, self.message.is_empty()) {
            (Some(ty), true) => write!(f, "{}", ty),
            (Some(ty), false) => write!(f, "{}: {}", ty, self.message),
            (None, _) => write!(f, "{}", self.message),
        }
    }
}

/// How the engine finished with a unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// Ran to the end (or, for a syntax check, was accepted)
    Normal,
    /// An uncaught value escaped
    Thrown(ThrownValue),
    /// The unit did not finish within its bound
    TimedOut,
}

/// What the script reported through `$DONE`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsyncSignal {
    /// `$DONE()` with no or a falsy argument
    pub ok: bool,
    /// Rendered argument of a failing `$DONE(error)`
    pub reason: Option<String>,
}

#[derive(Debug, Default)]
struct DoneState {
    signal: Option<AsyncSignal>,
    calls: usize,
}

/// Host hooks a script can reach, injected per execution.
///
/// Every execution gets a fresh value, so nothing a strict run signals can be
/// observed by the sloppy run of the same test. Clones share state: an engine
/// may hand a clone to a worker thread and signal from there.
#[derive(Debug, Clone, Default)]
pub struct HostCapabilities {
    done: Arc<(Mutex<DoneState>, Condvar)>,
    output: Arc<Mutex<Vec<String>>>,
}

impl HostCapabilities {
    pub fn new() -> Self {
        Self::default()
    }

    /// `$DONE(reason)`. `None` stands for a call with no or a falsy argument.
    ///
    /// Only the first call counts; later calls are tallied but ignored.
    pub fn done(&self, reason: Option<String>) {
        let (state, ready) = &*self.done;
        let mut state = state.lock();
        state.calls += 1;
        if state.signal.is_some() {
            tracing::debug!(calls = state.calls, "ignoring repeated $DONE");
            return;
        }
        state.signal = Some(AsyncSignal {
            ok: reason.is_none(),
            reason,
        });
        ready.notify_all();
    }

    /// `print(line)`. Recognizes the completion lines written by
    /// `doneprintHandle.js` and forwards them to [`HostCapabilities::done`].
    pub fn print(&self, line: &str) {
        let trimmed = line.trim_end();
        if trimmed == ASYNC_COMPLETE_MARKER {
            self.done(None);
        } else if let Some(reason) = trimmed.strip_prefix(ASYNC_FAILURE_MARKER) {
            self.done(Some(reason.trim().to_string()));
        }
        self.output.lock().push(trimmed.to_string());
    }

    /// Signal recorded so far, without waiting
    pub fn async_signal(&self) -> Option<AsyncSignal> {
        self.done.0.lock().signal.clone()
    }

    /// Number of times `$DONE` was called
    pub fn done_calls(&self) -> usize {
        self.done.0.lock().calls
    }

    /// Block until `$DONE` is called or `timeout` elapses
    pub fn wait_for_done(&self, timeout: Duration) -> Option<AsyncSignal> {
        let deadline = Instant::now() + timeout;
        let (state, ready) = &*self.done;
        let mut state = state.lock();
        while state.signal.is_none() {
            if ready.wait_until(&mut state, deadline).timed_out() {
                break;
            }
        }
        state.signal.clone()
    }

    /// Everything printed so far
    pub fn output(&self) -> Vec<String> {
        self.output.lock().clone()
    }
}

/// Observable result of running one unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub mode: ExecutionMode,
    pub completion: Completion,
    pub async_signal: Option<AsyncSignal>,
}

/// An ECMAScript implementation the harness can drive.
///
/// Both methods report engine-level problems (cannot spawn, cannot talk to
/// the engine) as `Err`; anything the script itself did is a [`Completion`].
pub trait Engine: Send + Sync {
    /// Short name for logs and reports
    fn name(&self) -> &str;

    /// Parse the unit without evaluating it. Module units are also linked, so
    /// resolution failures surface here with [`Phase::Resolution`].
    ///
    /// `Completion::Normal` means the source was accepted.
    fn check(&self, unit: &SourceUnit) -> HarnessResult<Completion>;

    /// Evaluate the unit, draining any jobs the engine queues before returning
    fn execute(&self, unit: &SourceUnit, host: &HostCapabilities) -> HarnessResult<Completion>;
}

impl<E: Engine + ?Sized> Engine for Arc<E> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn check(&self, unit: &SourceUnit) -> HarnessResult<Completion> {
        (**self).check(unit)
    }

    fn execute(&self, unit: &SourceUnit, host: &HostCapabilities) -> HarnessResult<Completion> {
        (**self).execute(unit, host)
    }
}
