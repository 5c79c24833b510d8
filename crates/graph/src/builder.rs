//! Dependency graph builder: classifies every import reference and collapses
//! local references into unit-to-unit edges.

use crate::batch::{join_normalized, normalize_path, parent_dir, path_key};
use crate::registry::ExternalRegistry;
use crate::unit::SourceUnit;
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};
use xref_extractor::{ImportSpec, Language};

/// Where an import reference points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionState {
    /// Another unit of the batch (or the importing unit itself)
    Local,
    /// A known library or standard module
    External,
    /// Neither: a missing module
    Unresolved,
}

/// One import reference with its resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportReference {
    /// Importing unit
    pub unit: String,
    pub specifier: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub wildcard: bool,
    pub line: usize,
    pub state: ResolutionState,
    /// Target unit for `local` references
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// `from pkg import mod` resolved to the submodule `pkg/mod` itself,
    /// so the symbol is the module and needs no export check
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub binds_module: bool,
}

impl ImportReference {
    pub fn is_local(&self) -> bool {
        self.state == ResolutionState::Local
    }
}

/// Directed unit-to-unit dependency derived from local import references
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyEdge {
    pub from: String,
    pub to: String,
    /// Import references collapsed into this edge
    pub import_count: usize,
}

impl DependencyEdge {
    pub fn is_self_loop(&self) -> bool {
        self.from == self.to
    }
}

/// Output of the graph builder
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct DependencyGraph {
    /// Every import reference, in unit order then source order
    pub imports: Vec<ImportReference>,
    /// Deduplicated edges sorted by `(from, to)`
    pub edges: Vec<DependencyEdge>,
}

enum Target {
    Local { path: String, binds_module: bool },
    External,
    Unresolved,
}

/// Resolves import specifiers against the batch's unit paths
pub(crate) struct GraphBuilder<'a> {
    externals: &'a ExternalRegistry,
    case_insensitive: bool,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(externals: &'a ExternalRegistry, case_insensitive: bool) -> Self {
        Self {
            externals,
            case_insensitive,
        }
    }

    /// Build the graph over units sorted by path
    pub fn build(&self, units: &[SourceUnit]) -> DependencyGraph {
        let index = PathIndex::new(units, self.case_insensitive);
        let mut imports = Vec::new();
        let mut edges: BTreeMap<(String, String), usize> = BTreeMap::new();

        for unit in units {
            for spec in &unit.specs {
                let target = match unit.language {
                    Language::Python => self.resolve_python(&index, &unit.path, spec),
                    language if language.is_ecmascript() => {
                        self.resolve_ecmascript(&index, &unit.path, language, spec)
                    }
                    _ => Target::Unresolved,
                };

                let (state, target, binds_module) = match target {
                    Target::Local { path, binds_module } => {
                        *edges
                            .entry((unit.path.clone(), path.clone()))
                            .or_insert(0) += 1;
                        (ResolutionState::Local, Some(path), binds_module)
                    }
                    Target::External => (ResolutionState::External, None, false),
                    Target::Unresolved => {
                        log::debug!(
                            "{}:{}: unresolved import `{}`",
                            unit.path,
                            spec.line,
                            spec.specifier
                        );
                        (ResolutionState::Unresolved, None, false)
                    }
                };

                imports.push(ImportReference {
                    unit: unit.path.clone(),
                    specifier: spec.specifier.clone(),
                    symbol: spec.symbol.clone(),
                    alias: spec.alias.clone(),
                    wildcard: spec.wildcard,
                    line: spec.line,
                    state,
                    target,
                    binds_module,
                });
            }
        }

        let edges = edges
            .into_iter()
            .map(|((from, to), import_count)| DependencyEdge {
                from,
                to,
                import_count,
            })
            .collect();

        DependencyGraph { imports, edges }
    }

    fn resolve_python(&self, index: &PathIndex<'_>, importer: &str, spec: &ImportSpec) -> Target {
        let relative = spec.specifier.starts_with('.');
        let Some(module) = python_module_path(importer, &spec.specifier) else {
            return Target::Unresolved;
        };

        // `from pkg import name` may name the submodule `pkg/name`
        let mut modules = Vec::with_capacity(2);
        if let Some(symbol) = spec.symbol.as_deref().filter(|_| !spec.wildcard) {
            modules.push((join_module(&module, symbol), true));
        }
        modules.push((module, false));

        for (module, binds_module) in &modules {
            if let Some(path) = index.first_exact(&python_candidates(module)) {
                return Target::Local {
                    path,
                    binds_module: *binds_module,
                };
            }
        }

        if !relative && self.externals.is_external(Language::Python, &spec.specifier) {
            return Target::External;
        }

        // src/ layouts: `app.models` matching `src/app/models.py`
        if !relative {
            for (module, binds_module) in &modules {
                if let Some(path) = index.first_suffix(&python_candidates(module)) {
                    return Target::Local {
                        path,
                        binds_module: *binds_module,
                    };
                }
            }
        }

        Target::Unresolved
    }

    fn resolve_ecmascript(
        &self,
        index: &PathIndex<'_>,
        importer: &str,
        language: Language,
        spec: &ImportSpec,
    ) -> Target {
        let candidates = ecmascript_candidates(importer, &spec.specifier);
        if let Some(path) = index.first_exact(&candidates) {
            return Target::Local {
                path,
                binds_module: false,
            };
        }
        if self.externals.is_external(language, &spec.specifier) {
            return Target::External;
        }
        Target::Unresolved
    }
}

/// Slash-separated module path for a Python specifier (`""` is the root package)
fn python_module_path(importer: &str, specifier: &str) -> Option<String> {
    let dots = specifier.chars().take_while(|&c| c == '.').count();
    let rest = &specifier[dots..];
    if dots == 0 {
        return Some(rest.replace('.', "/"));
    }

    let mut base = parent_dir(importer);
    for _ in 1..dots {
        if base.is_empty() {
            return None;
        }
        base = parent_dir(base);
    }
    Some(join_module(base, rest))
}

fn join_module(base: &str, dotted: &str) -> String {
    let tail = dotted.replace('.', "/");
    match (base.is_empty(), tail.is_empty()) {
        (true, _) => tail,
        (false, true) => base.to_string(),
        (false, false) => format!("{base}/{tail}"),
    }
}

fn python_candidates(module: &str) -> Vec<String> {
    if module.is_empty() {
        return vec!["__init__.py".to_string()];
    }
    let mut candidates: Vec<String> = Language::Python
        .module_extensions()
        .iter()
        .map(|ext| format!("{module}.{ext}"))
        .collect();
    candidates.push(format!("{module}/__init__.py"));
    candidates
}

/// Paths probed for a relative or root-absolute JS/TS specifier, in priority order.
/// Bare package specifiers have none.
fn ecmascript_candidates(importer: &str, specifier: &str) -> Vec<String> {
    let relative = specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../");
    let base = if relative {
        join_normalized(parent_dir(importer), specifier)
    } else if let Some(absolute) = specifier.strip_prefix('/') {
        normalize_path(absolute)
    } else {
        None
    };
    let Some(base) = base else {
        return Vec::new();
    };

    let mut candidates = vec![base.clone()];
    // ESM TypeScript imports name the emitted JavaScript file
    if let Some(stem) = base.strip_suffix(".js") {
        candidates.push(format!("{stem}.ts"));
        candidates.push(format!("{stem}.tsx"));
    } else if let Some(stem) = base.strip_suffix(".mjs") {
        candidates.push(format!("{stem}.mts"));
    } else if let Some(stem) = base.strip_suffix(".cjs") {
        candidates.push(format!("{stem}.cts"));
    }
    let extensions = Language::TypeScript.module_extensions();
    candidates.extend(extensions.iter().map(|ext| format!("{base}.{ext}")));
    candidates.extend(extensions.iter().map(|ext| format!("{base}/index.{ext}")));
    candidates
}

/// Unit paths keyed for lookup (lower-cased when matching is case-insensitive)
struct PathIndex<'u> {
    by_key: HashMap<String, Vec<&'u str>>,
    case_insensitive: bool,
}

impl<'u> PathIndex<'u> {
    fn new(units: &'u [SourceUnit], case_insensitive: bool) -> Self {
        let mut by_key: HashMap<String, Vec<&'u str>> = HashMap::with_capacity(units.len());
        for unit in units {
            by_key
                .entry(path_key(&unit.path, case_insensitive))
                .or_default()
                .push(unit.path.as_str());
        }
        Self {
            by_key,
            case_insensitive,
        }
    }

    /// Best unit for the first candidate with any exact match
    fn first_exact(&self, candidates: &[String]) -> Option<String> {
        candidates.iter().find_map(|candidate| {
            let matches = self.by_key.get(&path_key(candidate, self.case_insensitive))?;
            pick(matches.iter().copied())
        })
    }

    /// Best unit whose path ends with `/<candidate>`, for the first candidate with any
    fn first_suffix(&self, candidates: &[String]) -> Option<String> {
        candidates.iter().find_map(|candidate| {
            let suffix = format!("/{}", path_key(candidate, self.case_insensitive));
            pick(
                self.by_key
                    .iter()
                    .filter(|(key, _)| key.ends_with(&suffix))
                    .flat_map(|(_, paths)| paths.iter().copied()),
            )
        })
    }
}

/// Most specific match wins: longest path, then lexicographically smallest
fn pick<'p>(matches: impl Iterator<Item = &'p str>) -> Option<String> {
    matches
        .min_by_key(|path| (Reverse(path.len()), *path))
        .map(str::to_string)
}
