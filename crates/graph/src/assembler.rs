//! Context bundle assembly: merges the stage outputs into one `ProjectContext`.

use crate::batch::AnalysisScope;
use crate::builder::DependencyGraph;
use crate::config::SizeThresholds;
use crate::context::ProjectContext;
use crate::cycles::CycleReport;
use crate::frameworks::FrameworkVerdict;
use crate::resolution::Finding;
use crate::symbols::SymbolTable;
use crate::unit::SourceUnit;

/// Intermediate results of one analysis, borrowed from the pipeline
pub(crate) struct AssemblyInputs<'a> {
    pub root: &'a str,
    pub scope: AnalysisScope,
    /// Sorted by path
    pub units: &'a [SourceUnit],
    pub graph: &'a DependencyGraph,
    pub symbols: &'a SymbolTable,
    pub cycles: &'a CycleReport,
    pub findings: &'a [Finding],
    pub frameworks: &'a [FrameworkVerdict],
    pub thresholds: Option<&'a SizeThresholds>,
}

/// Build the context. Pure: equal inputs give equal contexts.
pub(crate) fn assemble(inputs: &AssemblyInputs<'_>) -> ProjectContext {
    let units = inputs
        .units
        .iter()
        .map(|unit| {
            let mut unit = unit.clone();
            unit.size_class = inputs
                .thresholds
                .map(|t| t.classify(unit.line_count).to_string());
            unit
        })
        .collect();

    ProjectContext {
        root: inputs.root.to_string(),
        scope: inputs.scope,
        units,
        symbols: inputs.symbols.clone(),
        imports: inputs.graph.imports.clone(),
        edges: inputs.graph.edges.clone(),
        cycles: inputs.cycles.cycles.clone(),
        self_imports: inputs.cycles.self_imports.clone(),
        findings: inputs.findings.to_vec(),
        frameworks: inputs.frameworks.to_vec(),
    }
}
