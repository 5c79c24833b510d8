use clap::ValueEnum;
use xref_graph::AnalysisScope;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum ScopeFlag {
    Single,
    Module,
    Project,
}

impl ScopeFlag {
    pub(crate) const fn as_domain(self) -> AnalysisScope {
        match self {
            ScopeFlag::Single => AnalysisScope::Single,
            ScopeFlag::Module => AnalysisScope::Module,
            ScopeFlag::Project => AnalysisScope::Project,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum PresetFlag {
    Strict,
    Standard,
    Relaxed,
    Legacy,
}

impl PresetFlag {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            PresetFlag::Strict => "strict",
            PresetFlag::Standard => "standard",
            PresetFlag::Relaxed => "relaxed",
            PresetFlag::Legacy => "legacy",
        }
    }
}

/// How the context is written to stdout
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Human-readable overview
    #[default]
    Summary,
    /// Compact JSON of the full context
    Json,
    /// Indented JSON of the full context
    Pretty,
}
