//! Analysis input: the set of source units submitted together.

use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// How much of a project the caller selected
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisScope {
    /// One file
    Single,
    /// One directory's worth of files
    Module,
    /// Whole project
    #[default]
    Project,
}

impl AnalysisScope {
    pub fn as_str(self) -> &'static str {
        match self {
            AnalysisScope::Single => "single",
            AnalysisScope::Module => "module",
            AnalysisScope::Project => "project",
        }
    }
}

/// One source unit as supplied by the caller
#[derive(Debug, Clone)]
pub struct SourceInput {
    /// Logical path, `/`- or `\`-separated
    pub path: String,
    pub content: Arc<[u8]>,
    /// `path` is relative to the batch root. Otherwise it is rebased onto it.
    pub root_relative: bool,
}

impl SourceInput {
    /// A unit whose path is already relative to the batch root
    pub fn new(path: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            content: Arc::from(content.into()),
            root_relative: true,
        }
    }

    /// A unit whose path must be rebased onto the batch root
    pub fn rebased(path: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            root_relative: false,
            ..Self::new(path, content)
        }
    }
}

/// Units submitted for one analysis call
#[derive(Debug, Clone, Default)]
pub struct Batch {
    root: String,
    scope: AnalysisScope,
    inputs: Vec<SourceInput>,
}

/// A validated unit with its normalized logical path
#[derive(Debug, Clone)]
pub(crate) struct PreparedUnit {
    pub path: String,
    pub content: Arc<[u8]>,
}

impl Batch {
    pub fn new(inputs: impl IntoIterator<Item = SourceInput>) -> Self {
        Self {
            inputs: inputs.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Root that non-root-relative paths are rebased onto
    #[must_use]
    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root = root.into();
        self
    }

    #[must_use]
    pub fn with_scope(mut self, scope: AnalysisScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn push(&mut self, input: SourceInput) {
        self.inputs.push(input);
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn scope(&self) -> AnalysisScope {
        self.scope
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Normalize every path and reject structurally invalid batches.
    ///
    /// Runs before any extraction: an empty batch, an unusable path or two
    /// inputs that normalize to the same unit fail the whole call. Paths that
    /// differ only in case are distinct units.
    pub(crate) fn prepare(self) -> Result<Vec<PreparedUnit>> {
        if self.inputs.is_empty() {
            return Err(AnalysisError::EmptyBatch);
        }

        let root = normalize_absolute(&self.root);
        let mut seen: HashMap<String, String> = HashMap::with_capacity(self.inputs.len());
        let mut prepared = Vec::with_capacity(self.inputs.len());

        for input in self.inputs {
            let path = if input.root_relative {
                if is_absolute(&input.path) {
                    return Err(AnalysisError::InvalidPath(format!(
                        "{}: root-relative path is absolute",
                        input.path
                    )));
                }
                normalize_path(&input.path)
            } else {
                rebase(&input.path, root.as_deref())
            };
            let Some(path) = path else {
                return Err(AnalysisError::InvalidPath(format!(
                    "{}: path is empty or escapes the batch root",
                    input.path
                )));
            };

            if let Some(previous) = seen.insert(path.clone(), input.path.clone()) {
                return Err(AnalysisError::DuplicatePath(format!(
                    "{path} (given as `{previous}` and `{}`)",
                    input.path
                )));
            }

            prepared.push(PreparedUnit {
                path,
                content: input.content,
            });
        }

        Ok(prepared)
    }
}

pub(crate) fn path_key(path: &str, case_insensitive: bool) -> String {
    if case_insensitive {
        path.to_ascii_lowercase()
    } else {
        path.to_string()
    }
}

fn is_absolute(path: &str) -> bool {
    path.starts_with('/') || path.starts_with('\\') || has_drive_prefix(path)
}

fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Collapse `.`/`..`, unify separators and drop empty segments.
///
/// Returns `None` for an empty result or a `..` that climbs above the start.
pub(crate) fn normalize_path(path: &str) -> Option<String> {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            other => segments.push(other),
        }
    }
    if segments.is_empty() {
        None
    } else {
        Some(segments.join("/"))
    }
}

/// Normalized absolute form with a leading `/` (drive prefixes kept as a segment)
fn normalize_absolute(path: &str) -> Option<String> {
    normalize_path(path).map(|p| format!("/{p}"))
}

/// Rebase a caller path onto the batch root. Paths outside the root keep
/// their normalized absolute form.
fn rebase(path: &str, root: Option<&str>) -> Option<String> {
    let absolute = normalize_absolute(path)?;
    if let Some(root) = root {
        if let Some(rest) = absolute.strip_prefix(root) {
            if let Some(relative) = rest.strip_prefix('/') {
                return Some(relative.to_string());
            }
        }
    }
    if is_absolute(path) {
        Some(absolute)
    } else {
        normalize_path(path)
    }
}

/// Directory part of a logical path (`""` for top-level units)
pub(crate) fn parent_dir(path: &str) -> &str {
    path.rfind('/').map_or("", |idx| &path[..idx])
}

/// Join a relative reference onto a directory and normalize
pub(crate) fn join_normalized(dir: &str, relative: &str) -> Option<String> {
    if dir.is_empty() {
        normalize_path(relative)
    } else {
        normalize_path(&format!("{dir}/{relative}"))
    }
}
