use crate::error::{HarnessError, HarnessResult};
use crate::metadata::{frontmatter_span, TestMetadata};
use std::path::{Path, PathBuf};

/// A test file with its source and parsed metadata
#[derive(Debug, Clone)]
pub struct TestCase {
    /// Path to the test file
    pub path: PathBuf,
    /// Source exactly as read from disk
    pub source: String,
    /// Parsed metadata from the frontmatter
    pub metadata: TestMetadata,
}

impl TestCase {
    /// Load a test file from disk
    pub fn load<P: AsRef<Path>>(path: P) -> HarnessResult<Self> {
        let path = path.as_ref().to_path_buf();
        let source = std::fs::read_to_string(&path).map_err(|source| HarnessError::Io {
            path: path.clone(),
            source,
        })?;
        Self::from_source(path, source)
    }

    /// Build a test case from source already in memory
    pub fn from_source(path: impl Into<PathBuf>, source: impl Into<String>) -> HarnessResult<Self> {
        let source = source.into();
        let metadata = TestMetadata::parse(&source)?;
        Ok(Self {
            path: path.into(),
            source,
            metadata,
        })
    }

    /// Get the test name (file name without extension)
    pub fn name(&self) -> &str {
        self.path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
    }

    /// Source with the frontmatter comment cut out.
    ///
    /// Execution always uses the full source so line numbers in engine
    /// diagnostics match the file; this is for display.
    pub fn body(&self) -> &str {
        match frontmatter_span(&self.source) {
            Ok((whole, _)) => self.source[whole.end..].trim_start(),
            Err(_) => &self.source,
        }
    }
}
