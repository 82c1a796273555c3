//! Drive an external engine binary (node, d8, qjs, ...) as the engine under test
//!
//! Each unit is written to a temp file and passed as the last argument. Stdout
//! lines are fed to the host's `print` hook, which is how `doneprintHandle.js`
//! reports `$DONE`. A non-zero exit is an uncaught throw; its kind is read
//! from stderr.

use crate::config::EngineConfig;
use crate::engine::{Completion, Engine, ExecutionMode, HostCapabilities, SourceUnit, ThrownValue};
use crate::error::{HarnessError, HarnessResult};
use crate::metadata::Phase;
use regex::Regex;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::OnceLock;
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(5);

fn error_line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^\s*(?:Uncaught\s+)?((?:[A-Z][A-Za-z0-9_$]*)?Error)\b(?::\s*|\s+)?(.*)$")
            .expect("error line regex is valid")
    })
}

fn resolution_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)cannot find module|could not resolve|ERR_MODULE_NOT_FOUND|does not provide an export|failed to resolve|unresolvable",
        )
        .expect("resolution regex is valid")
    })
}

/// Extract the thrown error from an engine's stderr.
///
/// The first line that starts with an `...Error` constructor name wins; if
/// none does, the value is reported untyped with the last non-empty line.
pub fn classify_stderr(stderr: &str, phase: Phase) -> ThrownValue {
    if let Some(caps) = error_line_regex().captures(stderr) {
        let error_type = caps.get(1).map_or("", |m| m.as_str());
        let message = caps.get(2).map_or("", |m| m.as_str()).trim();
        return ThrownValue::new(phase, error_type, message);
    }
    let last = stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("engine exited with an error");
    ThrownValue::untyped(phase, last)
}

/// Early errors from a module unit may come from linking rather than parsing
fn early_phase(mode: ExecutionMode, stderr: &str) -> Phase {
    if mode == ExecutionMode::Module && resolution_regex().is_match(stderr) {
        Phase::Resolution
    } else {
        Phase::Parse
    }
}

struct ProcessOutput {
    timed_out: bool,
    success: bool,
    stdout: String,
    stderr: String,
}

/// An [`Engine`] backed by an external executable
#[derive(Debug, Clone)]
pub struct ProcessEngine {
    name: String,
    config: EngineConfig,
}

impl ProcessEngine {
    pub fn new(config: EngineConfig) -> HarnessResult<Self> {
        let program = config
            .program
            .clone()
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| HarnessError::Config("no engine program configured".into()))?;
        let name = Path::new(&program)
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or(&program)
            .to_string();
        Ok(Self { name, config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn program(&self) -> &str {
        self.config.program.as_deref().unwrap_or_default()
    }

    /// Write the unit next to its test file so `./dep_FIXTURE.js` style
    /// imports resolve. Falls back to the system temp dir when the test's
    /// directory is not writable.
    fn write_unit(&self, unit: &SourceUnit) -> HarnessResult<tempfile::NamedTempFile> {
        let suffix = match unit.mode {
            ExecutionMode::Module => ".mjs",
            ExecutionMode::Sloppy | ExecutionMode::Strict => ".js",
        };
        let mut builder = tempfile::Builder::new();
        builder.prefix(".conformance-").suffix(suffix);

        let beside_test = unit
            .origin
            .parent()
            .filter(|dir| dir.is_dir())
            .map(|dir| (dir, builder.tempfile_in(dir)));
        let created = match beside_test {
            Some((_, Ok(file))) => Ok(file),
            Some((dir, Err(e))) => {
                tracing::warn!(dir = %dir.display(), error = %e, "test directory not writable; using system temp dir");
                builder.tempfile()
            }
            None => builder.tempfile(),
        };
        let mut file =
            created.map_err(|e| HarnessError::Engine(format!("could not create temp file: {}", e)))?;
        file.write_all(unit.source.as_bytes())
            .and_then(|_| file.flush())
            .map_err(|e| HarnessError::Engine(format!("could not write temp file: {}", e)))?;
        Ok(file)
    }

    fn spawn_and_wait(&self, extra_args: &[String], unit: &SourceUnit) -> HarnessResult<ProcessOutput> {
        let script = self.write_unit(unit)?;
        let engine_err = |what: &str, e: std::io::Error| {
            HarnessError::Engine(format!("{} `{}`: {}", what, self.program(), e))
        };

        // Output goes to files so a chatty engine cannot block on a full pipe.
        let mut stdout_file = tempfile::tempfile().map_err(|e| engine_err("capturing stdout of", e))?;
        let mut stderr_file = tempfile::tempfile().map_err(|e| engine_err("capturing stderr of", e))?;

        let mut command = Command::new(self.program());
        command.args(&self.config.args);
        if unit.mode == ExecutionMode::Module {
            command.args(&self.config.module_args);
        }
        command
            .args(extra_args)
            .arg(script.path())
            .stdin(Stdio::null())
            .stdout(Stdio::from(
                stdout_file.try_clone().map_err(|e| engine_err("capturing stdout of", e))?,
            ))
            .stderr(Stdio::from(
                stderr_file.try_clone().map_err(|e| engine_err("capturing stderr of", e))?,
            ));

        tracing::debug!(engine = %self.name, test = %unit.name, mode = %unit.mode, "spawning engine");
        let mut child = command.spawn().map_err(|e| engine_err("failed to spawn", e))?;
        let (timed_out, success) = wait_for_child(&mut child, unit.timeout)
            .map_err(|e| engine_err("failed waiting for", e))?;

        Ok(ProcessOutput {
            timed_out,
            success,
            stdout: read_back(&mut stdout_file).map_err(|e| engine_err("reading stdout of", e))?,
            stderr: read_back(&mut stderr_file).map_err(|e| engine_err("reading stderr of", e))?,
        })
    }
}

fn read_back(file: &mut File) -> std::io::Result<String> {
    let mut bytes = Vec::new();
    file.seek(SeekFrom::Start(0))?;
    file.read_to_end(&mut bytes)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Poll until the child exits or `timeout` elapses; returns (timed_out, success)
fn wait_for_child(child: &mut Child, timeout: Duration) -> std::io::Result<(bool, bool)> {
    let started = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok((false, status.success()));
        }
        if started.elapsed() >= timeout {
            let _ = child.kill();
            child.wait()?;
            return Ok((true, false));
        }
        thread::sleep(POLL_INTERVAL);
    }
}

impl Engine for ProcessEngine {
    fn name(&self) -> &str {
        &self.name
    }

    fn check(&self, unit: &SourceUnit) -> HarnessResult<Completion> {
        match &self.config.check_args {
            Some(check_args) => {
                let output = self.spawn_and_wait(check_args, unit)?;
                if output.timed_out {
                    return Ok(Completion::TimedOut);
                }
                if output.success {
                    return Ok(Completion::Normal);
                }
                let phase = early_phase(unit.mode, &output.stderr);
                Ok(Completion::Thrown(classify_stderr(&output.stderr, phase)))
            }
            None => {
                // No parse-only switch: run it and treat a SyntaxError as early.
                let completion = self.execute(unit, &HostCapabilities::new())?;
                Ok(match completion {
                    Completion::Thrown(thrown) if thrown.is("SyntaxError") => {
                        let phase = early_phase(unit.mode, &thrown.message);
                        Completion::Thrown(ThrownValue { phase, ..thrown })
                    }
                    Completion::TimedOut => Completion::TimedOut,
                    Completion::Normal | Completion::Thrown(_) => Completion::Normal,
                })
            }
        }
    }

    fn execute(&self, unit: &SourceUnit, host: &HostCapabilities) -> HarnessResult<Completion> {
        let output = self.spawn_and_wait(&[], unit)?;
        for line in output.stdout.lines() {
            host.print(line);
        }
        if output.timed_out {
            return Ok(Completion::TimedOut);
        }
        if output.success {
            Ok(Completion::Normal)
        } else {
            Ok(Completion::Thrown(classify_stderr(&output.stderr, Phase::Runtime)))
        }
    }
}
