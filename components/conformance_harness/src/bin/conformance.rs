//! Conformance Test Runner
//!
//! Command-line front end: discovers tests, drives an external engine through
//! the harness, prints a summary and exits 0 only if nothing failed.

use clap::Parser;
use conformance_harness::{
    Cli, Command, GlobFilter, Harness, HarnessError, HarnessResult, ProcessEngine, RunArgs,
    TestReport,
};
use std::process::ExitCode;
use std::time::Instant;

fn main() -> ExitCode {
    let cli = Cli::parse();
    conformance_harness::cli::init_tracing(cli.verbose);

    match cli.command {
        Command::Run(args) => match run(&args) {
            Ok(report) if report.is_success() => ExitCode::SUCCESS,
            Ok(_) => ExitCode::from(1),
            Err(e) => {
                eprintln!("Error: {}", e);
                ExitCode::from(2)
            }
        },
    }
}

fn run(args: &RunArgs) -> HarnessResult<TestReport> {
    let config = args.resolve_config()?;
    let filter = args.filter.as_deref().map(GlobFilter::new).transpose()?;
    let engine = ProcessEngine::new(config.engine.clone())?;
    let harness = Harness::with_config(engine, config);

    println!("====================================");
    println!("Conformance Test Runner");
    println!("====================================");
    println!("Path:    {}", args.path.display());
    println!("Engine:  {}", harness.engine_name());
    if let Some(filter) = &filter {
        println!("Filter:  {}", filter.pattern());
    }
    println!("Timeout: {}ms", harness.config().timeout_ms);
    println!();

    let start = Instant::now();
    let verdicts = harness.run_directory(&args.path, filter.as_ref())?;
    let duration = start.elapsed();

    let report = TestReport::from_verdicts(&verdicts);
    print_report(&report, duration);

    if let Some(path) = &args.report {
        let json = report
            .to_json()
            .map_err(|e| HarnessError::Config(format!("could not encode report: {}", e)))?;
        std::fs::write(path, json).map_err(|source| HarnessError::Io {
            path: path.clone(),
            source,
        })?;
        println!("Report written to {}", path.display());
    }

    Ok(report)
}

fn print_report(report: &TestReport, duration: std::time::Duration) {
    println!("====================================");
    println!("RESULTS");
    println!("====================================");
    println!("Total:    {}", report.total);
    println!("Passed:   {} ({:.1}%)", report.passed, report.pass_rate());
    println!("Failed:   {} ({:.1}%)", report.failed, report.failure_rate());
    println!("  Timeout: {}", report.timeout);
    println!("  Harness: {}", report.harness_errors);
    println!("Skipped:  {} ({:.1}%)", report.skipped, report.skip_rate());
    println!("Duration: {:.2}s", duration.as_secs_f64());
    println!();

    if !report.failures.is_empty() {
        println!("Failures (showing first 10):");
        for (i, (path, reason)) in report.failures.iter().take(10).enumerate() {
            println!("  {}. {}", i + 1, path);
            println!("     -> {}", truncate(reason, 160));
        }
        if report.failures.len() > 10 {
            println!("  ... and {} more failures", report.failures.len() - 10);
        }
        println!();
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars - 3).collect();
        format!("{}...", cut)
    }
}
