//! Known module names outside the batch.

use crate::error::{AnalysisError, Result};
use serde::Deserialize;
use std::collections::HashSet;
use xref_extractor::Language;

const BUILTIN_EXTERNALS: &str = include_str!("../registry/external.json");

#[derive(Debug, Deserialize)]
struct RawRegistry {
    python: RawPython,
    ecmascript: RawEcmascript,
}

#[derive(Debug, Deserialize)]
struct RawPython {
    #[serde(default)]
    stdlib: Vec<String>,
    #[serde(default)]
    packages: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawEcmascript {
    #[serde(default)]
    builtins: Vec<String>,
    #[serde(default)]
    packages: Vec<String>,
}

/// Module names classified as `external` when no batch unit matches
#[derive(Debug, Clone, Default)]
pub struct ExternalRegistry {
    python: HashSet<String>,
    ecmascript: HashSet<String>,
    extra: HashSet<String>,
}

impl ExternalRegistry {
    /// Python standard library, Node built-ins and well-known packages
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_EXTERNALS)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let raw: RawRegistry = serde_json::from_str(raw)
            .map_err(|e| AnalysisError::Registry(format!("external module registry: {e}")))?;
        Ok(Self {
            python: raw
                .python
                .stdlib
                .into_iter()
                .chain(raw.python.packages)
                .collect(),
            ecmascript: raw
                .ecmascript
                .builtins
                .into_iter()
                .chain(raw.ecmascript.packages)
                .collect(),
            extra: HashSet::new(),
        })
    }

    /// Treat `names` (top-level module or package names) as external for every language
    #[must_use]
    pub fn with_extra<S: AsRef<str>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.extra
            .extend(names.into_iter().map(|n| n.as_ref().trim().to_string()));
        self
    }

    pub fn is_external(&self, language: Language, specifier: &str) -> bool {
        let Some(name) = package_name(language, specifier) else {
            return false;
        };
        if self.extra.contains(name) {
            return true;
        }
        match language {
            Language::Python => self.python.contains(name),
            Language::JavaScript | Language::TypeScript | Language::Tsx => {
                specifier.starts_with("node:") || self.ecmascript.contains(name)
            }
            Language::Unknown => false,
        }
    }
}

/// Top-level package a specifier refers to: `os` for `os.path`, `@scope/pkg`
/// for `@scope/pkg/sub`, `fs` for `node:fs`. `None` for relative specifiers.
pub(crate) fn package_name(language: Language, specifier: &str) -> Option<&str> {
    match language {
        Language::Python => {
            if specifier.starts_with('.') {
                return None;
            }
            specifier.split('.').next().filter(|s| !s.is_empty())
        }
        Language::JavaScript | Language::TypeScript | Language::Tsx => {
            if specifier.starts_with('.') || specifier.starts_with('/') {
                return None;
            }
            let specifier = specifier.strip_prefix("node:").unwrap_or(specifier);
            if specifier.starts_with('@') {
                let end = specifier
                    .match_indices('/')
                    .nth(1)
                    .map_or(specifier.len(), |(idx, _)| idx);
                Some(&specifier[..end])
            } else {
                specifier.split('/').next().filter(|s| !s.is_empty())
            }
        }
        Language::Unknown => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_name() {
        assert_eq!(package_name(Language::Python, "os.path"), Some("os"));
        assert_eq!(package_name(Language::Python, "..pkg"), None);
        assert_eq!(
            package_name(Language::TypeScript, "@angular/core/testing"),
            Some("@angular/core")
        );
        assert_eq!(package_name(Language::JavaScript, "lodash/fp"), Some("lodash"));
        assert_eq!(package_name(Language::JavaScript, "node:fs"), Some("fs"));
        assert_eq!(package_name(Language::JavaScript, "./util"), None);
    }

    #[test]
    fn test_builtin_registry() {
        let registry = ExternalRegistry::builtin().unwrap();
        assert!(registry.is_external(Language::Python, "os.path"));
        assert!(registry.is_external(Language::Python, "fastapi"));
        assert!(!registry.is_external(Language::Python, "myapp.models"));
        assert!(registry.is_external(Language::JavaScript, "react"));
        assert!(registry.is_external(Language::Tsx, "node:worker_threads"));
        assert!(!registry.is_external(Language::JavaScript, "./react"));
        assert!(!registry.is_external(Language::JavaScript, "os.path"));
    }

    #[test]
    fn test_extra_names() {
        let registry = ExternalRegistry::builtin()
            .unwrap()
            .with_extra(["internal_sdk", "@corp/ui"]);
        assert!(registry.is_external(Language::Python, "internal_sdk.client"));
        assert!(registry.is_external(Language::TypeScript, "@corp/ui/button"));
    }

    #[test]
    fn test_malformed_registry_is_an_error() {
        assert!(matches!(
            ExternalRegistry::from_json("{}"),
            Err(AnalysisError::Registry(_))
        ));
    }
}
