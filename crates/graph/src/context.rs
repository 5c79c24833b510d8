use crate::batch::AnalysisScope;
use crate::builder::{DependencyEdge, ImportReference, ResolutionState};
use crate::cycles::Cycle;
use crate::frameworks::FrameworkVerdict;
use crate::registry::package_name;
use crate::resolution::{Finding, Verdict};
use crate::symbols::SymbolTable;
use crate::unit::SourceUnit;
use serde::Serialize;
use std::collections::BTreeSet;

/// Immutable result of one analysis call.
///
/// Every collection has a stable order (units by path, edges by endpoints,
/// findings by unit, line and symbol), so two runs over the same batch
/// serialize to identical JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectContext {
    pub(crate) root: String,
    pub(crate) scope: AnalysisScope,
    pub(crate) units: Vec<SourceUnit>,
    pub(crate) symbols: SymbolTable,
    pub(crate) imports: Vec<ImportReference>,
    pub(crate) edges: Vec<DependencyEdge>,
    pub(crate) cycles: Vec<Cycle>,
    pub(crate) self_imports: Vec<String>,
    pub(crate) findings: Vec<Finding>,
    pub(crate) frameworks: Vec<FrameworkVerdict>,
}

/// Headline numbers for a context
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextSummary {
    pub scope: AnalysisScope,
    pub units: usize,
    pub parsed: usize,
    pub unparsable: usize,
    pub lines: usize,
    pub symbols: usize,
    pub imports: usize,
    pub local_imports: usize,
    pub external_imports: usize,
    pub unresolved_imports: usize,
    pub edges: usize,
    pub cycles: usize,
    pub self_imports: usize,
    pub resolved_elsewhere: usize,
    pub ambiguous: usize,
    pub undefined: usize,
    pub external_dependencies: usize,
    pub internal_dependencies: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_framework: Option<String>,
}

impl ProjectContext {
    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn scope(&self) -> AnalysisScope {
        self.scope
    }

    /// Units sorted by path
    pub fn units(&self) -> &[SourceUnit] {
        &self.units
    }

    pub fn unit(&self, path: &str) -> Option<&SourceUnit> {
        self.units
            .binary_search_by(|u| u.path.as_str().cmp(path))
            .ok()
            .map(|idx| &self.units[idx])
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn imports(&self) -> &[ImportReference] {
        &self.imports
    }

    pub fn imports_of<'c>(&'c self, path: &'c str) -> impl Iterator<Item = &'c ImportReference> {
        self.imports.iter().filter(move |r| r.unit == path)
    }

    pub fn edges(&self) -> &[DependencyEdge] {
        &self.edges
    }

    pub fn cycles(&self) -> &[Cycle] {
        &self.cycles
    }

    /// Units importing themselves
    pub fn self_imports(&self) -> &[String] {
        &self.self_imports
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn findings_for<'c>(&'c self, path: &'c str) -> impl Iterator<Item = &'c Finding> {
        self.findings.iter().filter(move |f| f.unit == path)
    }

    /// Framework verdicts, most confident first
    pub fn frameworks(&self) -> &[FrameworkVerdict] {
        &self.frameworks
    }

    /// Distinct external top-level packages, sorted
    pub fn external_dependencies(&self) -> Vec<String> {
        let names: BTreeSet<&str> = self
            .imports
            .iter()
            .filter(|r| r.state == ResolutionState::External)
            .filter_map(|r| {
                let language = self.unit(&r.unit)?.language;
                package_name(language, &r.specifier)
            })
            .collect();
        names.into_iter().map(str::to_string).collect()
    }

    /// Units some other unit depends on, sorted
    pub fn internal_dependencies(&self) -> Vec<String> {
        let targets: BTreeSet<&str> = self
            .edges
            .iter()
            .filter(|e| !e.is_self_loop())
            .map(|e| e.to.as_str())
            .collect();
        targets.into_iter().map(str::to_string).collect()
    }

    /// Units `path` imports, sorted
    pub fn dependencies_of(&self, path: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|e| e.from == path && !e.is_self_loop())
            .map(|e| e.to.as_str())
            .collect()
    }

    /// Units importing `path`, sorted
    pub fn dependents_of(&self, path: &str) -> Vec<&str> {
        let dependents: BTreeSet<&str> = self
            .edges
            .iter()
            .filter(|e| e.to == path && !e.is_self_loop())
            .map(|e| e.from.as_str())
            .collect();
        dependents.into_iter().collect()
    }

    /// Importers, importees and same-directory units of `path`, sorted
    pub fn related_units(&self, path: &str) -> Vec<&str> {
        let Some(unit) = self.unit(path) else {
            return Vec::new();
        };
        let directory = unit.directory();

        let mut related: BTreeSet<&str> = BTreeSet::new();
        related.extend(self.dependencies_of(path));
        related.extend(self.dependents_of(path));
        related.extend(
            self.units
                .iter()
                .filter(|u| u.directory() == directory)
                .map(|u| u.path.as_str()),
        );
        related.remove(path);
        related.into_iter().collect()
    }

    /// Parsed units that neither import nor declare anything
    pub fn orphan_units(&self) -> Vec<&str> {
        self.units
            .iter()
            .filter(|u| u.is_parsed() && u.symbols.is_empty() && u.specs.is_empty())
            .map(|u| u.path.as_str())
            .collect()
    }

    pub fn summary(&self) -> ContextSummary {
        let parsed = self.units.iter().filter(|u| u.is_parsed()).count();
        let count_state =
            |state: ResolutionState| self.imports.iter().filter(|r| r.state == state).count();
        let count_verdict =
            |verdict: Verdict| self.findings.iter().filter(|f| f.verdict == verdict).count();

        ContextSummary {
            scope: self.scope,
            units: self.units.len(),
            parsed,
            unparsable: self.units.len() - parsed,
            lines: self.units.iter().map(|u| u.line_count).sum(),
            symbols: self.symbols.symbol_count(),
            imports: self.imports.len(),
            local_imports: count_state(ResolutionState::Local),
            external_imports: count_state(ResolutionState::External),
            unresolved_imports: count_state(ResolutionState::Unresolved),
            edges: self.edges.len(),
            cycles: self.cycles.len(),
            self_imports: self.self_imports.len(),
            resolved_elsewhere: count_verdict(Verdict::ResolvedElsewhere),
            ambiguous: count_verdict(Verdict::Ambiguous),
            undefined: count_verdict(Verdict::Undefined),
            external_dependencies: self.external_dependencies().len(),
            internal_dependencies: self.internal_dependencies().len(),
            top_framework: self.frameworks.first().map(|f| f.name.clone()),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
