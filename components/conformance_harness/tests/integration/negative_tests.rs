//! Integration tests for negative (expected-error) tests

use crate::common::{write_test, Call, ScriptedEngine};
use conformance_harness::{Harness, HarnessConfig, Verdict};
use std::sync::Arc;
use tempfile::TempDir;

fn run(frontmatter: &str, code: &str) -> (Verdict, Arc<ScriptedEngine>) {
    let temp_dir = TempDir::new().unwrap();
    let path = write_test(temp_dir.path(), "negative.js", frontmatter, code);
    let engine = Arc::new(ScriptedEngine::new());
    let config = HarnessConfig::new().with_timeout_ms(2_000).with_jobs(1);
    let verdict = Harness::with_config(Arc::clone(&engine), config).run_one(&path);
    (verdict, engine)
}

const PARSE_SYNTAX_ERROR: &str = "negative:\n  phase: parse\n  type: SyntaxError";
const RUNTIME_TYPE_ERROR: &str = "negative:\n  phase: runtime\n  type: TypeError";

#[test]
fn test_parse_negative_passes_without_evaluating() {
    let (verdict, engine) = run(PARSE_SYNTAX_ERROR, "$DONOTEVALUATE();\nvar class = 1;");
    assert!(verdict.is_pass(), "{}", verdict.detail);

    let calls = engine.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|(call, _, _)| *call == Call::Check));
}

#[test]
fn test_parse_negative_fails_when_accepted() {
    let (verdict, _) = run(PARSE_SYNTAX_ERROR, "var ok = 1;");
    assert!(verdict.is_fail());
    assert!(verdict
        .detail
        .contains("expected SyntaxError during parse phase but the source was accepted"));
}

#[test]
fn test_parse_negative_wrong_type_fails() {
    let (verdict, _) = run(
        "negative:\n  phase: parse\n  type: ReferenceError",
        "var class = 1;",
    );
    assert!(verdict.is_fail());
    assert!(verdict.detail.contains("expected ReferenceError but got `SyntaxError"));
}

#[test]
fn test_strict_only_early_error() {
    let (verdict, engine) = run(
        &format!("{}\nflags: [onlyStrict]", PARSE_SYNTAX_ERROR),
        "with ({}) {}",
    );
    assert!(verdict.is_pass(), "{}", verdict.detail);
    assert_eq!(engine.calls().len(), 1);
}

#[test]
fn test_early_error_missing_in_sloppy_mode() {
    let (verdict, _) = run(PARSE_SYNTAX_ERROR, "with ({}) {}");
    assert!(verdict.is_fail());
    assert!(verdict.detail.contains("[sloppy]"));
    assert!(!verdict.detail.contains("[strict]"));
}

#[test]
fn test_runtime_negative_passes() {
    let (verdict, engine) = run(RUNTIME_TYPE_ERROR, "throw new TypeError(\"not a function\");");
    assert!(verdict.is_pass(), "{}", verdict.detail);
    assert!(engine.calls().iter().all(|(call, _, _)| *call == Call::Execute));
}

#[test]
fn test_runtime_negative_fails_on_normal_completion() {
    let (verdict, _) = run(RUNTIME_TYPE_ERROR, "1;");
    assert!(verdict.is_fail());
    assert!(verdict
        .detail
        .contains("expected TypeError to be thrown at runtime but evaluation completed normally"));
}

#[test]
fn test_runtime_negative_rejects_parse_error() {
    let (verdict, _) = run(RUNTIME_TYPE_ERROR, "var class = 1;");
    assert!(verdict.is_fail());
    assert!(verdict.detail.contains("during runtime phase but got"));
    assert!(verdict.detail.contains("during parse phase"));
}

#[test]
fn test_error_type_must_match_exactly() {
    let (verdict, _) = run(
        "negative:\n  phase: runtime\n  type: Error",
        "throw new TypeError(\"subclass\");",
    );
    assert!(verdict.is_fail());
    assert!(verdict.detail.contains("expected Error but got `TypeError: subclass`"));
}

#[test]
fn test_negative_async_is_harness_failure() {
    let (verdict, engine) = run(&format!("{}\nflags: [async]", RUNTIME_TYPE_ERROR), "1;");
    assert!(verdict.is_harness_error());
    assert!(verdict.detail.contains("malformed metadata"));
    assert!(engine.calls().is_empty());
}
