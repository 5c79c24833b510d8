//! # xref Graph
//!
//! Cross-file dependency and symbol resolution over a batch of source units.
//!
//! ## Pipeline
//!
//! ```text
//! Batch (logical path, content)
//!     │
//!     ├──> Validation (empty batch, bad or duplicate paths) ──> AnalysisError
//!     │
//!     ├──> Extraction (bounded spawn_blocking workers, optional cache)
//!     │      └─ units sorted by path
//!     │
//!     ├──> Graph Builder
//!     │      ├─ import references: local / external / unresolved
//!     │      └─ unit-to-unit dependency edges
//!     │
//!     ├──> Resolution Engine ──> resolved-elsewhere / ambiguous / undefined
//!     ├──> Cycle Detector (Tarjan) ──> cycles + self-imports
//!     ├──> Framework Detector (weighted signature registry)
//!     │
//!     └──> Assembler ──> ProjectContext (immutable, deterministic JSON)
//! ```
//!
//! A cancellation token is checked between extraction tasks and before each
//! aggregate stage; a cancelled analysis never returns a partial context.
//!
//! ## Example
//!
//! ```rust,no_run
//! use xref_graph::{AnalysisConfig, Analyzer, Batch, SourceInput, Verdict};
//!
//! # async fn run() -> xref_graph::Result<()> {
//! let analyzer = Analyzer::new(AnalysisConfig::default())?;
//! let batch = Batch::new([
//!     SourceInput::new("app.py", "def run():\n    return helper()\n"),
//!     SourceInput::new("util.py", "def helper():\n    return 1\n"),
//! ]);
//!
//! let context = analyzer.analyze(batch).await?;
//! assert_eq!(context.findings()[0].verdict, Verdict::ResolvedElsewhere);
//! # Ok(())
//! # }
//! ```

mod analyzer;
mod assembler;
mod batch;
mod builder;
mod cache;
mod cancel;
mod config;
mod context;
mod cycles;
mod error;
mod frameworks;
mod registry;
mod resolution;
mod symbols;
mod unit;

pub use analyzer::Analyzer;
pub use batch::{AnalysisScope, Batch, SourceInput};
pub use builder::{DependencyEdge, ImportReference, ResolutionState};
pub use cache::{CacheStats, ExtractionCache, DEFAULT_CACHE_CAPACITY};
pub use cancel::CancellationToken;
pub use config::{
    AnalysisConfig, SizeBand, SizeThresholds, DEFAULT_MIN_CONFIDENCE, MAX_WORKERS, WORKERS_ENV,
};
pub use context::{ContextSummary, ProjectContext};
pub use cycles::Cycle;
pub use error::{AnalysisError, Result, Stage};
pub use frameworks::{
    Evidence, FrameworkRegistry, FrameworkVerdict, MatchKind, Rule, RuleTarget, Signature,
};
pub use registry::ExternalRegistry;
pub use resolution::{Finding, SiteKind, Verdict};
pub use symbols::{SymbolOwner, SymbolTable};
pub use unit::SourceUnit;

pub use xref_extractor::{
    Declaration, ExtractorConfig, Language, ParseStatus, SymbolKind, UnparsableReason, Usage,
};
