//! Command-line interface

use crate::config::HarnessConfig;
use crate::error::HarnessResult;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Once;

/// Conformance runner for test262-style ECMAScript tests
#[derive(Parser, Debug)]
#[command(name = "conformance", version, about)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a test file or every test under a directory
    Run(RunArgs),
}

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Test file or directory
    pub path: PathBuf,

    /// Only run tests matching this glob
    #[arg(long, value_name = "GLOB")]
    pub filter: Option<String>,

    /// Per-test timeout in milliseconds
    #[arg(long, value_name = "MS")]
    pub timeout: Option<u64>,

    /// Whole-run timeout in milliseconds
    #[arg(long, value_name = "MS")]
    pub run_timeout: Option<u64>,

    /// Worker threads
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// YAML config file; command-line options take precedence
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory with harness fixtures (a test262 checkout's `harness/`)
    #[arg(long, value_name = "DIR")]
    pub includes_dir: Option<PathBuf>,

    /// Engine executable
    #[arg(long, value_name = "PROGRAM")]
    pub engine: Option<String>,

    /// Argument passed to the engine before the test file (repeatable)
    #[arg(long = "engine-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub engine_args: Vec<String>,

    /// Extra engine argument for module tests (repeatable)
    #[arg(long = "module-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub module_args: Vec<String>,

    /// Engine argument that selects parse-only checking (repeatable)
    #[arg(long = "check-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub check_args: Vec<String>,

    /// Skip tests that require this feature (repeatable)
    #[arg(long = "skip-feature", value_name = "FEATURE")]
    pub skip_features: Vec<String>,

    /// Write a JSON report to this file
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,
}

impl RunArgs {
    /// Config file (if any) with command-line overrides applied
    pub fn resolve_config(&self) -> HarnessResult<HarnessConfig> {
        let mut config = match &self.config {
            Some(path) => HarnessConfig::load(path)?,
            None => HarnessConfig::default(),
        };

        if let Some(timeout) = self.timeout {
            config = config.with_timeout_ms(timeout);
        }
        if let Some(run_timeout) = self.run_timeout {
            config = config.with_run_timeout_ms(run_timeout);
        }
        if let Some(jobs) = self.jobs {
            config = config.with_jobs(jobs);
        }
        if let Some(dir) = &self.includes_dir {
            config = config.with_includes_dir(dir);
        }
        for feature in &self.skip_features {
            config = config.with_unsupported_feature(feature);
        }

        let engine = &mut config.engine;
        if let Some(program) = &self.engine {
            engine.program = Some(program.clone());
        }
        if !self.engine_args.is_empty() {
            engine.args = self.engine_args.clone();
        }
        if !self.module_args.is_empty() {
            engine.module_args = self.module_args.clone();
        }
        if !self.check_args.is_empty() {
            engine.check_args = Some(self.check_args.clone());
        }

        config.validate()?;
        Ok(config)
    }
}

static TRACING_INIT: Once = Once::new();

/// Install the stderr log subscriber. Safe to call more than once.
pub fn init_tracing(verbose: u8) {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(match verbose {
                0 => "warn",
                1 => "info",
                2 => "debug",
                _ => "trace",
            })
        });
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .with(filter)
            .init();
    });
}
