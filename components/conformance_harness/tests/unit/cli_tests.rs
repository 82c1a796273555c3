//! Unit tests for command-line parsing and config resolution

use clap::Parser;
use conformance_harness::{Cli, Command, HarnessError, RunArgs};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn run_args(argv: &[&str]) -> RunArgs {
    let cli = Cli::try_parse_from(argv).unwrap();
    match cli.command {
        Command::Run(args) => args,
    }
}

#[test]
fn test_parse_run_with_filter_and_timeout() {
    let args = run_args(&["conformance", "run", "test/language", "--filter=*.js", "--timeout=500"]);
    assert_eq!(args.path, PathBuf::from("test/language"));
    assert_eq!(args.filter.as_deref(), Some("*.js"));
    assert_eq!(args.timeout, Some(500));
}

#[test]
fn test_path_is_required() {
    assert!(Cli::try_parse_from(["conformance", "run"]).is_err());
}

#[test]
fn test_timeout_must_be_numeric() {
    assert!(Cli::try_parse_from(["conformance", "run", "t", "--timeout=soon"]).is_err());
}

#[test]
fn test_verbosity_counts() {
    let cli = Cli::try_parse_from(["conformance", "-vv", "run", "t"]).unwrap();
    assert_eq!(cli.verbose, 2);
}

#[test]
fn test_engine_args_accept_leading_hyphens() {
    let args = run_args(&[
        "conformance",
        "run",
        "t",
        "--engine",
        "d8",
        "--engine-arg",
        "--harmony",
        "--module-arg=--module",
        "--check-arg",
        "--check",
    ]);
    assert_eq!(args.engine.as_deref(), Some("d8"));
    assert_eq!(args.engine_args, vec!["--harmony"]);
    assert_eq!(args.module_args, vec!["--module"]);
    assert_eq!(args.check_args, vec!["--check"]);
}

#[test]
fn test_resolve_config_applies_overrides() {
    let args = run_args(&[
        "conformance",
        "run",
        "t",
        "--timeout=250",
        "--run-timeout=60000",
        "-j",
        "3",
        "--skip-feature",
        "Temporal",
        "--skip-feature",
        "ShadowRealm",
        "--engine",
        "node",
        "--check-arg=--check",
    ]);
    let config = args.resolve_config().unwrap();
    assert_eq!(config.timeout_ms, 250);
    assert_eq!(config.run_timeout_ms, Some(60_000));
    assert_eq!(config.jobs, 3);
    assert!(config.unsupported_features.contains("Temporal"));
    assert!(config.unsupported_features.contains("ShadowRealm"));
    assert_eq!(config.engine.program.as_deref(), Some("node"));
    assert_eq!(config.engine.check_args, Some(vec!["--check".to_string()]));
}

#[test]
fn test_command_line_beats_config_file() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("harness.yaml");
    fs::write(
        &config_path,
        "timeout_ms: 9000\njobs: 2\nengine:\n  program: qjs\n  args: [--std]\n",
    )
    .unwrap();

    let args = RunArgs {
        path: PathBuf::from("t"),
        config: Some(config_path),
        timeout: Some(100),
        ..Default::default()
    };
    let config = args.resolve_config().unwrap();
    assert_eq!(config.timeout_ms, 100);
    assert_eq!(config.jobs, 2);
    assert_eq!(config.engine.program.as_deref(), Some("qjs"));
    assert_eq!(config.engine.args, vec!["--std"]);
}

#[test]
fn test_zero_timeout_is_config_error() {
    let args = RunArgs {
        path: PathBuf::from("t"),
        timeout: Some(0),
        ..Default::default()
    };
    assert!(matches!(args.resolve_config(), Err(HarnessError::Config(_))));
}

#[test]
fn test_missing_config_file_is_io_error() {
    let args = RunArgs {
        path: PathBuf::from("t"),
        config: Some(PathBuf::from("/definitely/not/here.yaml")),
        ..Default::default()
    };
    assert!(matches!(args.resolve_config(), Err(HarnessError::Io { .. })));
}
