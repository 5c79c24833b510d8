use std::fmt::Write as _;
use xref_graph::{ProjectContext, ResolutionState};

/// Plain-text overview of a context for terminals
pub(crate) fn render_summary(context: &ProjectContext) -> String {
    let summary = context.summary();
    let mut out = String::new();

    let _ = writeln!(
        out,
        "xref: {} units ({} parsed, {} unparsable), {} lines, {} scope",
        summary.units,
        summary.parsed,
        summary.unparsable,
        summary.lines,
        summary.scope.as_str()
    );
    let _ = writeln!(
        out,
        "imports: {} local, {} external, {} unresolved; {} edges",
        summary.local_imports, summary.external_imports, summary.unresolved_imports, summary.edges
    );

    if !context.frameworks().is_empty() {
        out.push_str("\nFrameworks\n");
        for verdict in context.frameworks() {
            let _ = writeln!(out, "  {:<10} {:>3}%", verdict.name, verdict.confidence);
        }
    }

    let unparsable: Vec<_> = context.units().iter().filter(|u| !u.is_parsed()).collect();
    if !unparsable.is_empty() {
        out.push_str("\nUnparsable units\n");
        for unit in unparsable {
            if let Some(reason) = unit.status.reason() {
                let _ = writeln!(out, "  {}: {reason}", unit.path);
            }
        }
    }

    let unresolved: Vec<_> = context
        .imports()
        .iter()
        .filter(|r| r.state == ResolutionState::Unresolved)
        .collect();
    if !unresolved.is_empty() {
        out.push_str("\nUnresolved imports\n");
        for reference in unresolved {
            let _ = writeln!(
                out,
                "  {}:{}: `{}`",
                reference.unit, reference.line, reference.specifier
            );
        }
    }

    if !context.cycles().is_empty() || !context.self_imports().is_empty() {
        out.push_str("\nImport cycles\n");
        for cycle in context.cycles() {
            let _ = writeln!(out, "  {}", cycle.units.join(" <-> "));
        }
        for path in context.self_imports() {
            let _ = writeln!(out, "  {path} imports itself");
        }
    }

    if !context.findings().is_empty() {
        out.push_str("\nFindings\n");
        for finding in context.findings() {
            let _ = write!(
                out,
                "  {}:{}: {} `{}`",
                finding.unit,
                finding.line,
                finding.verdict.as_str(),
                finding.symbol
            );
            match &finding.suggestion {
                Some(suggestion) => {
                    let _ = writeln!(out, " ({suggestion})");
                }
                None => out.push('\n'),
            }
        }
    }

    let flagged: Vec<_> = context
        .units()
        .iter()
        .filter_map(|u| u.size_class.as_deref().map(|class| (u, class)))
        .filter(|(_, class)| matches!(*class, "warning" | "critical" | "dangerous"))
        .collect();
    if !flagged.is_empty() {
        out.push_str("\nLarge units\n");
        for (unit, class) in flagged {
            let _ = writeln!(out, "  {} ({} lines, {class})", unit.path, unit.line_count);
        }
    }

    let _ = writeln!(
        out,
        "\n{} resolved elsewhere, {} ambiguous, {} undefined, {} cycles",
        summary.resolved_elsewhere,
        summary.ambiguous,
        summary.undefined,
        summary.cycles + summary.self_imports
    );
    out
}

/// Whether the context carries anything a CI gate should fail on
pub(crate) fn has_problems(context: &ProjectContext) -> bool {
    !context.cycles().is_empty()
        || !context.self_imports().is_empty()
        || !context.findings().is_empty()
}
