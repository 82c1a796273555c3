//! Decide whether an observed execution satisfies a test's metadata

use crate::engine::{Completion, ExecutionResult};
use crate::error::{HarnessError, HarnessResult};
use crate::metadata::{NegativeExpectation, Phase, TestMetadata};
use std::time::Duration;

/// What a test expects from every run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expectation {
    /// Rejected before evaluation (parse or resolution phase)
    EarlyError(NegativeExpectation),
    /// Evaluation throws the named error
    RuntimeError(NegativeExpectation),
    /// `$DONE()` is called without an error before the bound elapses
    AsyncCompletion,
    /// Evaluation finishes without an uncaught throw
    NormalCompletion,
}

impl Expectation {
    pub fn from_metadata(metadata: &TestMetadata) -> HarnessResult<Self> {
        match (&metadata.negative, metadata.is_async()) {
            (Some(_), true) => Err(HarnessError::malformed(
                "a negative test cannot also be `async`",
            )),
            (Some(negative), false) => Ok(match negative.phase {
                Phase::Parse | Phase::Resolution => Expectation::EarlyError(negative.clone()),
                Phase::Runtime => Expectation::RuntimeError(negative.clone()),
            }),
            (None, true) => Ok(Expectation::AsyncCompletion),
            (None, false) => Ok(Expectation::NormalCompletion),
        }
    }

    /// Early errors are observed through the check step, never by evaluating
    pub fn needs_check_only(&self) -> bool {
        matches!(self, Expectation::EarlyError(_))
    }

    pub fn awaits_done(&self) -> bool {
        matches!(self, Expectation::AsyncCompletion)
    }
}

/// Judge one mode's result.
///
/// `bound` is the timeout the run was given; it is reported when the run or
/// the wait for `$DONE` ran out of time.
pub fn judge(expectation: &Expectation, result: &ExecutionResult, bound: Duration) -> HarnessResult<()> {
    let mode = result.mode;
    let timed_out = || HarnessError::Timeout {
        mode: mode.to_string(),
        elapsed: bound,
    };

    match expectation {
        Expectation::EarlyError(negative) | Expectation::RuntimeError(negative) => {
            match &result.completion {
                Completion::TimedOut => Err(timed_out()),
                Completion::Normal => Err(HarnessError::assertion(
                    mode,
                    match negative.phase {
                        Phase::Runtime => format!(
                            "expected {} to be thrown at runtime but evaluation completed normally",
                            negative.error_type
                        ),
                        phase => format!(
                            "expected {} during {} phase but the source was accepted",
                            negative.error_type, phase
                        ),
                    },
                )),
                Completion::Thrown(thrown) if thrown.phase != negative.phase => {
                    Err(HarnessError::assertion(
                        mode,
                        format!(
                            "expected {} during {} phase but got `{}` during {} phase",
                            negative.error_type, negative.phase, thrown, thrown.phase
                        ),
                    ))
                }
                Completion::Thrown(thrown) if !thrown.is(&negative.error_type) => {
                    Err(HarnessError::assertion(
                        mode,
                        format!("expected {} but got `{}`", negative.error_type, thrown),
                    ))
                }
                Completion::Thrown(_) => Ok(()),
            }
        }
        Expectation::AsyncCompletion => match &result.completion {
            Completion::TimedOut => Err(timed_out()),
            Completion::Thrown(thrown) => Err(HarnessError::assertion(
                mode,
                format!("uncaught `{}` before $DONE", thrown),
            )),
            Completion::Normal => match &result.async_signal {
                Some(signal) if signal.ok => Ok(()),
                Some(signal) => Err(HarnessError::assertion(
                    mode,
                    format!(
                        "async test failed: {}",
                        signal.reason.as_deref().unwrap_or("$DONE called with an error")
                    ),
                )),
                None => Err(timed_out()),
            },
        },
        Expectation::NormalCompletion => match &result.completion {
            Completion::Normal => Ok(()),
            Completion::TimedOut => Err(timed_out()),
            Completion::Thrown(thrown) => Err(HarnessError::assertion(
                mode,
                format!("uncaught `{}`", thrown),
            )),
        },
    }
}
