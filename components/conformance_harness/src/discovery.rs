//! Finding test files on disk

use crate::error::{HarnessError, HarnessResult};
use regex::Regex;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Helper files other tests import; never tests themselves
const FIXTURE_SUFFIX: &str = "_FIXTURE.js";

/// A `--filter` glob.
///
/// `*` and `?` stay within one path segment, `**` crosses segments and
/// `{a,b}` picks alternatives. A pattern without `/` is matched against the
/// file name, anything else against the path relative to the search root.
#[derive(Debug, Clone)]
pub struct GlobFilter {
    pattern: String,
    regex: Regex,
}

impl GlobFilter {
    pub fn new(pattern: &str) -> HarnessResult<Self> {
        let regex = Regex::new(&glob_to_regex(pattern))
            .map_err(|e| HarnessError::Config(format!("invalid filter `{}`: {}", pattern, e)))?;
        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn matches(&self, relative: &Path) -> bool {
        let text = if self.pattern.contains('/') {
            relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/")
        } else {
            relative
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        };
        self.regex.is_match(&text)
    }
}

fn glob_to_regex(glob: &str) -> String {
    let mut out = String::from("^");
    let chars: Vec<char> = glob.chars().collect();
    let mut in_group = false;
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' if chars.get(i + 1) == Some(&'*') => {
                if chars.get(i + 2) == Some(&'/') {
                    out.push_str("(?:.*/)?");
                    i += 1;
                } else {
                    out.push_str(".*");
                }
                i += 1;
            }
            '*' => out.push_str("[^/]*"),
            '?' => out.push_str("[^/]"),
            '{' if !in_group => {
                in_group = true;
                out.push_str("(?:");
            }
            '}' if in_group => {
                in_group = false;
                out.push(')');
            }
            ',' if in_group => out.push('|'),
            c => out.push_str(&regex::escape(&c.to_string())),
        }
        i += 1;
    }
    out.push('$');
    out
}

fn is_test_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name.ends_with(".js") && !name.ends_with(FIXTURE_SUFFIX)
}

/// Collect test files under `root` in a stable order.
///
/// A file given directly is returned as-is (subject to the filter). Unreadable
/// directory entries are logged and skipped.
pub fn discover(root: &Path, filter: Option<&GlobFilter>) -> HarnessResult<Vec<PathBuf>> {
    if !root.exists() {
        return Err(HarnessError::Io {
            path: root.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file or directory"),
        });
    }

    if root.is_file() {
        let keep = filter.map_or(true, |f| {
            f.matches(root.file_name().map(Path::new).unwrap_or(root))
        });
        return Ok(if keep { vec![root.to_path_buf()] } else { Vec::new() });
    }

    let mut found = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        let path = entry.path();
        if !entry.file_type().is_file() || !is_test_file(path) {
            continue;
        }
        let relative = path.strip_prefix(root).unwrap_or(path);
        if filter.map_or(true, |f| f.matches(relative)) {
            found.push(path.to_path_buf());
        }
    }
    tracing::debug!(root = %root.display(), count = found.len(), "discovered tests");
    Ok(found)
}
