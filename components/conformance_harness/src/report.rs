use crate::harness::{Status, Verdict};
use serde::{Deserialize, Serialize};

/// Test run report with statistics and failure details
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TestReport {
    /// Total number of tests run
    pub total: usize,
    pub passed: usize,
    /// Failures of any kind, timeouts and harness errors included
    pub failed: usize,
    pub skipped: usize,
    /// Failures caused by a timeout
    pub timeout: usize,
    /// Failures where the harness could not run the test
    pub harness_errors: usize,
    /// List of failures with (path, detail)
    pub failures: Vec<(String, String)>,
    /// List of skipped tests with (path, reason)
    pub skips: Vec<(String, String)>,
}

impl TestReport {
    /// Create a new empty report
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_verdicts<'a>(verdicts: impl IntoIterator<Item = &'a Verdict>) -> Self {
        let mut report = Self::new();
        for verdict in verdicts {
            report.add_verdict(verdict);
        }
        report
    }

    /// Add a test result to the report
    pub fn add_verdict(&mut self, verdict: &Verdict) {
        let path = verdict.path.display().to_string();
        self.total += 1;
        match verdict.status {
            Status::Pass => self.passed += 1,
            Status::Fail => {
                self.failed += 1;
                if verdict.is_timeout() {
                    self.timeout += 1;
                }
                if verdict.is_harness_error() {
                    self.harness_errors += 1;
                }
                self.failures.push((path, verdict.detail.clone()));
            }
            Status::Skip => {
                self.skipped += 1;
                self.skips.push((path, verdict.detail.clone()));
            }
        }
    }

    /// Calculate the pass rate as a percentage
    pub fn pass_rate(&self) -> f64 {
        percentage(self.passed, self.total)
    }

    /// Calculate the effective pass rate (excluding skips)
    pub fn effective_pass_rate(&self) -> f64 {
        percentage(self.passed, self.total - self.skipped)
    }

    pub fn failure_rate(&self) -> f64 {
        percentage(self.failed, self.total)
    }

    pub fn skip_rate(&self) -> f64 {
        percentage(self.skipped, self.total)
    }

    /// Generate a human-readable summary
    pub fn summary(&self) -> String {
        format!(
            "Conformance Results:\n\
             Total: {}\n\
             Passed: {} ({:.1}%)\n\
             Failed: {} ({} timeout, {} harness)\n\
             Skipped: {}\n\
             Effective Pass Rate: {:.1}%",
            self.total,
            self.passed,
            self.pass_rate(),
            self.failed,
            self.timeout,
            self.harness_errors,
            self.skipped,
            self.effective_pass_rate()
        )
    }

    /// Generate a detailed report including failures
    pub fn detailed_summary(&self) -> String {
        let mut output = self.summary();

        if !self.failures.is_empty() {
            output.push_str("\n\nFailures:\n");
            for (path, reason) in &self.failures {
                output.push_str(&format!("  - {}\n    Reason: {}\n", path, reason));
            }
        }

        output
    }

    /// Merge another report into this one
    pub fn merge(&mut self, other: &TestReport) {
        self.total += other.total;
        self.passed += other.passed;
        self.failed += other.failed;
        self.skipped += other.skipped;
        self.timeout += other.timeout;
        self.harness_errors += other.harness_errors;
        self.failures.extend(other.failures.iter().cloned());
        self.skips.extend(other.skips.iter().cloned());
    }

    /// Every verdict was a pass or a skip
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Export report as JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Import report from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        (part as f64 / whole as f64) * 100.0
    }
}
