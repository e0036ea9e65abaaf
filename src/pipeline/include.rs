//! Include Expansion
//!
//! Flattens `#include` directives into a single source string so that the
//! cache key covers the full text the compiler will see, and so that the
//! registry learns which files a shader depends on.
//!
//! Two directive forms are recognised at the very start of a line:
//!
//! | Form                    | Resolved against                         |
//! |-------------------------|------------------------------------------|
//! | `#include "Path.hlsl"`  | directory of the including file          |
//! | `#include <Path.hlsl>`  | the framework shader root                |
//!
//! Each file is expanded at most once per call tree. A file that has
//! already been visited contributes an empty string, which both breaks
//! include cycles and drops duplicate inclusions (a diamond `A → {B, C} → D`
//! contains `D` exactly once). No warning is produced for dropped
//! inclusions.

use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{Result, ShaderError};

const INCLUDE_MARKER: &str = "#include";

/// Result of expanding one root file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpandedSource {
    /// Flattened source text.
    pub text: String,
    /// Canonical paths of every file touched, root first, in visit order.
    pub files: Vec<PathBuf>,
}

impl ExpandedSource {
    /// Whether any touched file is named exactly `file_name`.
    #[must_use]
    pub fn touches(&self, file_name: &str) -> bool {
        self.files
            .iter()
            .any(|path| path.file_name().is_some_and(|name| name == file_name))
    }
}

/// Recursive `#include` flattener.
#[derive(Debug, Clone)]
pub struct IncludeExpander {
    framework_root: PathBuf,
}

impl IncludeExpander {
    #[must_use]
    pub fn new(framework_root: impl Into<PathBuf>) -> Self {
        Self {
            framework_root: framework_root.into(),
        }
    }

    #[inline]
    #[must_use]
    pub fn framework_root(&self) -> &Path {
        &self.framework_root
    }

    /// Expands `root` with a fresh visited list.
    pub fn expand_file(&self, root: &Path) -> Result<ExpandedSource> {
        if !root.is_file() {
            return Err(ShaderError::MissingFile {
                path: root.to_path_buf(),
                included_from: None,
            });
        }

        let mut files = Vec::new();
        let text = self.expand(root, &mut files)?;
        Ok(ExpandedSource { text, files })
    }

    /// Expands `path`, recording every newly visited file in `visited`.
    ///
    /// Returns an empty string if `path` is already in `visited`.
    pub fn expand(&self, path: &Path, visited: &mut Vec<PathBuf>) -> Result<String> {
        let path = fs::canonicalize(path)?;
        if visited.contains(&path) {
            return Ok(String::new());
        }
        visited.push(path.clone());

        let contents = fs::read_to_string(&path)?;
        let directory = path.parent().map(Path::to_path_buf).unwrap_or_default();

        let mut output = String::with_capacity(contents.len());
        for line in contents.split_inclusive('\n') {
            if !line.starts_with(INCLUDE_MARKER) {
                output.push_str(line);
                continue;
            }

            let include_path = self.resolve_directive(line, &directory, &path)?;
            if !include_path.is_file() {
                return Err(ShaderError::MissingFile {
                    path: include_path,
                    included_from: Some(path.clone()),
                });
            }

            let included = self.expand(&include_path, visited)?;
            output.push_str(&included);
            if !included.is_empty() && !included.ends_with('\n') && line.ends_with('\n') {
                output.push('\n');
            }
        }

        Ok(output)
    }

    fn resolve_directive(&self, line: &str, directory: &Path, file: &Path) -> Result<PathBuf> {
        let malformed = || ShaderError::MalformedInclude {
            line: line.trim_end().to_string(),
            file: file.to_path_buf(),
        };

        if let Some(relative) = delimited(line, '"', '"') {
            return Ok(directory.join(relative));
        }
        if let Some(framework) = delimited(line, '<', '>') {
            return Ok(self.framework_root.join(framework));
        }
        Err(malformed())
    }
}

/// Text between the first `open` and the following `close`.
fn delimited(line: &str, open: char, close: char) -> Option<&str> {
    let start = line.find(open)? + open.len_utf8();
    let len = line[start..].find(close)?;
    let inner = &line[start..start + len];
    (!inner.is_empty()).then_some(inner)
}
