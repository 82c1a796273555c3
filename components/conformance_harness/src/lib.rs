//! Conformance Test Harness
//!
//! Runs test262-style ECMAScript conformance scripts against any engine that
//! implements [`Engine`]: reads each file's frontmatter, prepends the helper
//! fixtures it asks for, executes it in the modes its flags require, and
//! reduces what the engine did to a pass/fail/skip [`Verdict`].

pub mod adapter;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod fixtures;
pub mod harness;
pub mod metadata;
pub mod process;
pub mod report;
pub mod test_case;

pub use adapter::ExecutionAdapter;
pub use cli::{Cli, Command, RunArgs};
pub use config::{EngineConfig, HarnessConfig};
pub use discovery::{discover, GlobFilter};
pub use engine::{
    AsyncSignal, Completion, Engine, ExecutionMode, ExecutionResult, HostCapabilities, SourceUnit,
    ThrownValue,
};
pub use error::{HarnessError, HarnessResult};
pub use evaluator::Expectation;
pub use fixtures::FixtureCache;
pub use harness::{FailureKind, Harness, Status, Verdict};
pub use metadata::{Flag, NegativeExpectation, Phase, TestMetadata};
pub use process::ProcessEngine;
pub use report::TestReport;
pub use test_case::TestCase;
