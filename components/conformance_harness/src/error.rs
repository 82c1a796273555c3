//! Error types for the harness

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Everything that can stop a single test from producing a clean verdict.
///
/// The first group means the harness itself could not run the test (broken
/// frontmatter, missing helper, bad configuration). The second group means the
/// engine under test was run and did not behave as the test expects.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Frontmatter is absent, unterminated, or carries an unusable value
    #[error("malformed metadata: {0}")]
    MalformedMetadata(String),

    /// An `includes` entry has no known source
    #[error("missing fixture `{0}`")]
    MissingFixture(String),

    /// Test file could not be read
    #[error("could not read {}: {source}", path.display())]
    Io {
        /// File being read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Harness configuration is unusable
    #[error("configuration error: {0}")]
    Config(String),

    /// The engine could not be driven (spawn failure, crash in the adapter)
    #[error("engine error: {0}")]
    Engine(String),

    /// The engine ran the test and observable behavior was wrong
    #[error("assertion failure [{mode}]: {detail}")]
    AssertionFailure {
        /// Execution mode the failure was observed in
        mode: String,
        /// What was expected and what happened
        detail: String,
    },

    /// The test did not finish within the configured bound
    #[error("timed out after {}ms [{mode}]", elapsed.as_millis())]
    Timeout {
        /// Execution mode that timed out
        mode: String,
        /// Bound that elapsed
        elapsed: Duration,
    },
}

impl HarnessError {
    /// Shorthand for a metadata error
    pub fn malformed(reason: impl Into<String>) -> Self {
        HarnessError::MalformedMetadata(reason.into())
    }

    /// Shorthand for an engine misbehavior observed in `mode`
    pub fn assertion(mode: impl ToString, detail: impl Into<String>) -> Self {
        HarnessError::AssertionFailure {
            mode: mode.to_string(),
            detail: detail.into(),
        }
    }

    /// True when the harness could not run the test at all, as opposed to the
    /// engine producing the wrong behavior
    pub fn is_harness_fault(&self) -> bool {
        matches!(
            self,
            HarnessError::MalformedMetadata(_)
                | HarnessError::MissingFixture(_)
                | HarnessError::Io { .. }
                | HarnessError::Config(_)
                | HarnessError::Engine(_)
        )
    }
}

/// Result type for harness operations
pub type HarnessResult<T> = Result<T, HarnessError>;
