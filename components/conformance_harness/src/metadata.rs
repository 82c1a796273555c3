use crate::error::{HarnessError, HarnessResult};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::ops::Range;
use std::sync::OnceLock;

const FRONTMATTER_OPEN: &str = "/*---";

fn frontmatter_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)/\*---(.*?)---\*/").expect("frontmatter regex is valid"))
}

/// Top-level `esid` / `es5id` / `es6id` lines holding a plain (unquoted) scalar
fn spec_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?m)^(esid|es5id|es6id)[ \t]*:[ \t]*([^\s#'"|>\[{&*!%@`][^#\r\n]*)"#)
            .expect("id regex is valid")
    })
}

/// Locate the frontmatter block.
///
/// Returns the byte range of the whole `/*--- ... ---*/` comment and the range
/// of its YAML body.
pub fn frontmatter_span(source: &str) -> HarnessResult<(Range<usize>, Range<usize>)> {
    let mut blocks = frontmatter_regex().captures_iter(source);
    let Some(first) = blocks.next() else {
        return Err(if source.contains(FRONTMATTER_OPEN) {
            HarnessError::malformed("frontmatter block is not terminated by `---*/`")
        } else {
            HarnessError::malformed("no `/*--- ... ---*/` frontmatter block found")
        });
    };
    if blocks.next().is_some() {
        return Err(HarnessError::malformed("more than one frontmatter block"));
    }
    let whole = first.get(0).map(|m| m.range()).unwrap_or_default();
    let body = first.get(1).map(|m| m.range()).unwrap_or_default();
    Ok((whole, body))
}

/// Phase at which a negative test expects its error
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Early error raised while parsing; `early` is the legacy spelling
    #[serde(alias = "early")]
    Parse,
    /// Module linking failed
    Resolution,
    /// Error thrown while evaluating
    Runtime,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Parse => write!(f, "parse"),
            Phase::Resolution => write!(f, "resolution"),
            Phase::Runtime => write!(f, "runtime"),
        }
    }
}

/// Negative test expectation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NegativeExpectation {
    /// Phase where the error is expected
    pub phase: Phase,
    /// Error constructor name expected (e.g. "SyntaxError")
    #[serde(rename = "type")]
    pub error_type: String,
}

/// A frontmatter flag.
///
/// Flags the harness acts on get their own variant; everything else is kept
/// as written so files with newer flags still load.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Flag {
    OnlyStrict,
    NoStrict,
    Module,
    Raw,
    Async,
    Generated,
    CanBlockIsFalse,
    CanBlockIsTrue,
    NonDeterministic,
    Other(String),
}

impl Flag {
    pub fn as_str(&self) -> &str {
        match self {
            Flag::OnlyStrict => "onlyStrict",
            Flag::NoStrict => "noStrict",
            Flag::Module => "module",
            Flag::Raw => "raw",
            Flag::Async => "async",
            Flag::Generated => "generated",
            Flag::CanBlockIsFalse => "CanBlockIsFalse",
            Flag::CanBlockIsTrue => "CanBlockIsTrue",
            Flag::NonDeterministic => "non-deterministic",
            Flag::Other(name) => name,
        }
    }
}

impl From<String> for Flag {
    fn from(name: String) -> Self {
        match name.as_str() {
            "onlyStrict" => Flag::OnlyStrict,
            "noStrict" => Flag::NoStrict,
            "module" => Flag::Module,
            "raw" => Flag::Raw,
            "async" => Flag::Async,
            "generated" => Flag::Generated,
            "CanBlockIsFalse" => Flag::CanBlockIsFalse,
            "CanBlockIsTrue" => Flag::CanBlockIsTrue,
            "non-deterministic" => Flag::NonDeterministic,
            _ => Flag::Other(name),
        }
    }
}

impl From<&str> for Flag {
    fn from(name: &str) -> Self {
        Flag::from(name.to_string())
    }
}

impl From<Flag> for String {
    fn from(flag: Flag) -> Self {
        flag.as_str().to_string()
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accept any scalar as text. Numbers come back in YAML's rendering
/// (`12.10` reads as `12.1`), so ids are restored from the raw lines in
/// [`TestMetadata::parse`].
fn opaque_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let value = serde_yaml::Value::deserialize(deserializer)?;
    match value {
        serde_yaml::Value::Null => Ok(None),
        serde_yaml::Value::String(s) => Ok(Some(s)),
        serde_yaml::Value::Number(n) => Ok(Some(n.to_string())),
        serde_yaml::Value::Bool(b) => Ok(Some(b.to_string())),
        other => Err(D::Error::custom(format!(
            "expected a scalar, found {:?}",
            other
        ))),
    }
}

fn opaque_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    opaque_string(deserializer).map(Option::unwrap_or_default)
}

/// Test metadata parsed from the YAML frontmatter
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TestMetadata {
    /// Human-readable description of what the test verifies
    #[serde(deserialize_with = "opaque_text")]
    pub description: String,
    /// Free-form explanation, carried as-is
    #[serde(deserialize_with = "opaque_string", skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
    #[serde(deserialize_with = "opaque_string", skip_serializing_if = "Option::is_none")]
    pub esid: Option<String>,
    #[serde(deserialize_with = "opaque_string", skip_serializing_if = "Option::is_none")]
    pub es5id: Option<String>,
    #[serde(deserialize_with = "opaque_string", skip_serializing_if = "Option::is_none")]
    pub es6id: Option<String>,
    #[serde(deserialize_with = "opaque_string", skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Expected error for negative tests
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative: Option<NegativeExpectation>,
    /// Helper files to load before the test, in order
    pub includes: Vec<String>,
    pub flags: BTreeSet<Flag>,
    /// ECMAScript features required by this test
    pub features: BTreeSet<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub locale: Vec<String>,
    /// Keys the harness does not interpret, kept verbatim
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl TestMetadata {
    /// Parse the frontmatter of a test file.
    ///
    /// Contradictory directives are rejected here as well, so a successfully
    /// parsed value is always safe to plan execution from.
    pub fn parse(source: &str) -> HarnessResult<Self> {
        let (_, body) = frontmatter_span(source)?;
        let yaml = &source[body];

        let mut metadata: TestMetadata = if yaml.trim().is_empty() {
            TestMetadata::default()
        } else {
            serde_yaml::from_str(yaml).map_err(|e| HarnessError::malformed(e.to_string()))?
        };
        metadata.restore_id_text(yaml);
        metadata.validate()?;
        Ok(metadata)
    }

    /// Replace parsed ids with the text as written in the frontmatter
    fn restore_id_text(&mut self, yaml: &str) {
        for caps in spec_id_regex().captures_iter(yaml) {
            let written = caps[2].trim_end().to_string();
            let slot = match &caps[1] {
                "esid" => &mut self.esid,
                "es5id" => &mut self.es5id,
                _ => &mut self.es6id,
            };
            if slot.is_some() {
                *slot = Some(written);
            }
        }
    }

    /// Reject directive combinations that have no single reading
    pub fn validate(&self) -> HarnessResult<()> {
        if self.is_strict_only() && self.is_no_strict() {
            return Err(HarnessError::malformed(
                "flags `onlyStrict` and `noStrict` are mutually exclusive",
            ));
        }
        if self.is_raw() && self.is_strict_only() {
            return Err(HarnessError::malformed(
                "flag `raw` cannot be combined with `onlyStrict`",
            ));
        }
        if self.negative.is_some() && self.is_async() {
            return Err(HarnessError::malformed(
                "a negative test cannot also be `async`",
            ));
        }
        Ok(())
    }

    /// Serialize back to frontmatter YAML
    pub fn to_yaml(&self) -> HarnessResult<String> {
        serde_yaml::to_string(self).map_err(|e| HarnessError::malformed(e.to_string()))
    }

    /// Get list of unsupported features required by this test
    pub fn unsupported_features(&self, unsupported: &HashSet<String>) -> Vec<String> {
        self.features
            .iter()
            .filter(|f| unsupported.contains(*f))
            .cloned()
            .collect()
    }

    pub fn has_flag(&self, flag: &Flag) -> bool {
        self.flags.contains(flag)
    }

    /// Phase of the expected error, if this is a negative test
    pub fn negative_phase(&self) -> Option<Phase> {
        self.negative.as_ref().map(|n| n.phase)
    }

    /// Check if test expects an error before evaluation begins
    pub fn expects_early_error(&self) -> bool {
        matches!(
            self.negative_phase(),
            Some(Phase::Parse) | Some(Phase::Resolution)
        )
    }

    pub fn is_strict_only(&self) -> bool {
        self.has_flag(&Flag::OnlyStrict)
    }

    pub fn is_no_strict(&self) -> bool {
        self.has_flag(&Flag::NoStrict)
    }

    pub fn is_module(&self) -> bool {
        self.has_flag(&Flag::Module)
    }

    pub fn is_async(&self) -> bool {
        self.has_flag(&Flag::Async)
    }

    /// Raw tests run exactly as written: no fixtures, no strict prefix
    pub fn is_raw(&self) -> bool {
        self.has_flag(&Flag::Raw)
    }
}
