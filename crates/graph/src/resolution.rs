//! Resolution engine: cross-references names a unit needs but does not
//! satisfy against the global symbol table.
//!
//! Works at unit-export granularity. Shadowing and nested scopes are not
//! modelled, so a local helper with the same name as a missing one hides it.

use crate::builder::{DependencyGraph, ImportReference, ResolutionState};
use crate::symbols::SymbolTable;
use crate::unit::SourceUnit;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Outcome for one unsatisfied name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Verdict {
    /// Exactly one other unit exports the name
    ResolvedElsewhere,
    /// Several units export the name
    Ambiguous,
    /// No unit exports the name
    Undefined,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::ResolvedElsewhere => "resolved-elsewhere",
            Verdict::Ambiguous => "ambiguous",
            Verdict::Undefined => "undefined",
        }
    }
}

/// Where the unsatisfied name appears
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteKind {
    /// A symbol-level import whose target does not provide the name
    Import,
    /// A bare use of a name nothing in the unit binds
    Usage,
}

/// One resolution finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub unit: String,
    pub line: usize,
    pub symbol: String,
    pub site: SiteKind,
    pub verdict: Verdict,
    /// Units exporting `symbol`, in path order
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl Finding {
    fn new(unit: &str, line: usize, symbol: &str, site: SiteKind, candidates: Vec<&str>) -> Self {
        let (verdict, suggestion) = match candidates.as_slice() {
            [] => (Verdict::Undefined, None),
            [only] => (
                Verdict::ResolvedElsewhere,
                Some(format!(
                    "available in `{only}`; add an import for `{symbol}` from `{only}`"
                )),
            ),
            many => {
                let listed: Vec<String> = many.iter().map(|u| format!("`{u}`")).collect();
                (
                    Verdict::Ambiguous,
                    Some(format!(
                        "defined in multiple units: {}; choose the intended source",
                        listed.join(", ")
                    )),
                )
            }
        };
        Self {
            unit: unit.to_string(),
            line,
            symbol: symbol.to_string(),
            site,
            verdict,
            candidates: candidates.into_iter().map(str::to_string).collect(),
            suggestion,
        }
    }
}

/// Resolve every unit's unsatisfied imports and usages.
///
/// `units` must be sorted by path; findings come back ordered by unit, line
/// and symbol.
pub(crate) fn resolve(
    units: &[SourceUnit],
    graph: &DependencyGraph,
    symbols: &SymbolTable,
) -> Vec<Finding> {
    let by_path: HashMap<&str, &SourceUnit> =
        units.iter().map(|u| (u.path.as_str(), u)).collect();
    let mut refs_by_unit: HashMap<&str, Vec<&ImportReference>> = HashMap::new();
    for reference in &graph.imports {
        refs_by_unit
            .entry(reference.unit.as_str())
            .or_default()
            .push(reference);
    }

    let mut findings = Vec::new();
    let mut seen: HashSet<(String, String, SiteKind)> = HashSet::new();
    let mut push = |finding: Finding, findings: &mut Vec<Finding>| {
        let key = (finding.unit.clone(), finding.symbol.clone(), finding.site);
        if seen.insert(key) {
            findings.push(finding);
        }
    };

    for unit in units {
        let refs = refs_by_unit
            .get(unit.path.as_str())
            .map(Vec::as_slice)
            .unwrap_or_default();

        for reference in refs {
            let Some(symbol) = reference.symbol.as_deref() else {
                continue;
            };
            if reference.wildcard || import_satisfied(reference, symbol, &by_path) {
                continue;
            }
            let candidates = symbols.exporters(symbol, &unit.path);
            push(
                Finding::new(&unit.path, reference.line, symbol, SiteKind::Import, candidates),
                &mut findings,
            );
        }

        let scope = WildcardScope::collect(refs, &by_path);
        for usage in &unit.usages {
            if scope.names.contains(usage.name.as_str()) {
                continue;
            }
            let candidates = symbols.exporters(&usage.name, &unit.path);
            if candidates.is_empty() && scope.open {
                continue;
            }
            push(
                Finding::new(&unit.path, usage.line, &usage.name, SiteKind::Usage, candidates),
                &mut findings,
            );
        }
    }

    findings.sort_by(|a, b| {
        a.unit
            .cmp(&b.unit)
            .then(a.line.cmp(&b.line))
            .then_with(|| a.symbol.cmp(&b.symbol))
            .then(a.site.cmp(&b.site))
    });
    findings
}

fn import_satisfied(
    reference: &ImportReference,
    symbol: &str,
    by_path: &HashMap<&str, &SourceUnit>,
) -> bool {
    match reference.state {
        // cannot be checked
        ResolutionState::External => true,
        ResolutionState::Unresolved => false,
        ResolutionState::Local => {
            if reference.binds_module {
                return true;
            }
            reference
                .target
                .as_deref()
                .and_then(|target| by_path.get(target))
                .is_some_and(|target| target.provides(symbol) || target.has_wildcard_import())
        }
    }
}

/// Names a unit receives through `*` imports
struct WildcardScope<'u> {
    names: HashSet<&'u str>,
    /// A `*` import whose contents are unknown (external, unresolved or chained)
    open: bool,
}

impl<'u> WildcardScope<'u> {
    fn collect(refs: &[&ImportReference], by_path: &HashMap<&str, &'u SourceUnit>) -> Self {
        let mut scope = Self {
            names: HashSet::new(),
            open: false,
        };
        for reference in refs.iter().filter(|r| r.wildcard) {
            let target = reference
                .target
                .as_deref()
                .and_then(|path| by_path.get(path).copied());
            match target {
                Some(target) if !target.has_wildcard_import() => {
                    scope
                        .names
                        .extend(target.exported_symbols().map(|s| s.name.as_str()));
                }
                _ => scope.open = true,
            }
        }
        scope
    }
}
