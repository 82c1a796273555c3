//! Helper fixtures (`assert.js`, `sta.js`, ...) and source assembly

use crate::error::{HarnessError, HarnessResult};
use crate::metadata::TestMetadata;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Included ahead of every non-raw test, in this order
pub const DEFAULT_INCLUDES: &[&str] = &["sta.js", "assert.js"];

/// Included after the defaults for `async` tests
pub const ASYNC_INCLUDE: &str = "doneprintHandle.js";

const BUNDLED: &[(&str, &str)] = &[
    ("sta.js", include_str!("../harness/sta.js")),
    ("assert.js", include_str!("../harness/assert.js")),
    ("doneprintHandle.js", include_str!("../harness/doneprintHandle.js")),
    ("compareArray.js", include_str!("../harness/compareArray.js")),
];

/// Name-keyed fixture store.
///
/// Lookups check an optional on-disk includes directory (a test262 checkout's
/// `harness/`) before the fixtures bundled with this crate. Each name is read
/// at most once; afterwards the cached text is shared.
#[derive(Debug, Default)]
pub struct FixtureCache {
    includes_dir: Option<PathBuf>,
    loaded: RwLock<HashMap<String, Arc<str>>>,
}

impl FixtureCache {
    /// Cache backed only by the bundled fixtures
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache that prefers files from `dir`
    pub fn with_includes_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            includes_dir: Some(dir.into()),
            loaded: RwLock::new(HashMap::new()),
        }
    }

    pub fn includes_dir(&self) -> Option<&Path> {
        self.includes_dir.as_deref()
    }

    /// Register a fixture directly, replacing any cached text for `name`
    pub fn insert(&self, name: impl Into<String>, source: impl Into<Arc<str>>) {
        self.loaded.write().insert(name.into(), source.into());
    }

    /// Number of fixtures loaded so far
    pub fn len(&self) -> usize {
        self.loaded.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolve a fixture by name
    pub fn get(&self, name: &str) -> HarnessResult<Arc<str>> {
        if let Some(source) = self.loaded.read().get(name) {
            return Ok(Arc::clone(source));
        }

        let source = self.load(name)?;
        // Two workers may race to load the same name; keep whichever landed first.
        let mut loaded = self.loaded.write();
        let entry = loaded.entry(name.to_string()).or_insert(source);
        Ok(Arc::clone(entry))
    }

    fn load(&self, name: &str) -> HarnessResult<Arc<str>> {
        let mut components = Path::new(name).components();
        let is_plain_name = matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        );
        if !is_plain_name {
            return Err(HarnessError::MissingFixture(name.to_string()));
        }

        if let Some(dir) = &self.includes_dir {
            let path = dir.join(name);
            if path.is_file() {
                tracing::debug!(fixture = name, path = %path.display(), "loading fixture from disk");
                let text = std::fs::read_to_string(&path)
                    .map_err(|source| HarnessError::Io { path, source })?;
                return Ok(Arc::from(text));
            }
        }

        BUNDLED
            .iter()
            .find(|(bundled, _)| *bundled == name)
            .map(|(_, text)| Arc::from(*text))
            .ok_or_else(|| HarnessError::MissingFixture(name.to_string()))
    }
}

/// Fixture names a test needs, in load order.
///
/// Defaults come first so later helpers can rely on them; a name listed more
/// than once is loaded once, at its first position.
pub fn include_list(metadata: &TestMetadata) -> Vec<String> {
    if metadata.is_raw() {
        return Vec::new();
    }

    let mut names: Vec<String> = DEFAULT_INCLUDES.iter().map(|s| s.to_string()).collect();
    if metadata.is_async() {
        names.push(ASYNC_INCLUDE.to_string());
    }
    for include in &metadata.includes {
        if !names.contains(include) {
            names.push(include.clone());
        }
    }
    names
}

/// Concatenate the required fixtures followed by the test source
pub fn assemble(cache: &FixtureCache, metadata: &TestMetadata, body: &str) -> HarnessResult<String> {
    let mut assembled = String::new();
    for name in include_list(metadata) {
        let fixture = cache.get(&name)?;
        assembled.push_str(&fixture);
        if !fixture.ends_with('\n') {
            assembled.push('\n');
        }
    }
    assembled.push_str(body);
    Ok(assembled)
}
