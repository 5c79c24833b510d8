//! Analysis pipeline: bounded concurrent extraction followed by the
//! single-pass aggregate stages.

use crate::assembler::{assemble, AssemblyInputs};
use crate::batch::{Batch, PreparedUnit};
use crate::builder::GraphBuilder;
use crate::cache::ExtractionCache;
use crate::cancel::CancellationToken;
use crate::config::AnalysisConfig;
use crate::context::ProjectContext;
use crate::cycles::UnitGraph;
use crate::error::{AnalysisError, Result, Stage};
use crate::frameworks::FrameworkRegistry;
use crate::registry::ExternalRegistry;
use crate::resolution::resolve;
use crate::symbols::SymbolTable;
use crate::unit::SourceUnit;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use xref_extractor::{
    content_hash, count_lines, Extraction, Language, SymbolExtractor, UnparsableReason,
};

/// Runs analyses over batches of source units.
///
/// An analyzer holds only read-only state and can serve concurrent calls.
/// Nothing survives a call except what the optional caller-owned
/// [`ExtractionCache`] keeps.
pub struct Analyzer {
    config: AnalysisConfig,
    extractor: Arc<SymbolExtractor>,
    externals: ExternalRegistry,
    frameworks: FrameworkRegistry,
    cache: Option<Arc<ExtractionCache>>,
}

impl Analyzer {
    /// Create an analyzer with the bundled registries
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        let extractor = SymbolExtractor::new(config.extractor.clone())?;
        let externals =
            ExternalRegistry::builtin()?.with_extra(config.extra_external_modules.iter());
        let frameworks = FrameworkRegistry::builtin()?;

        Ok(Self {
            config,
            extractor: Arc::new(extractor),
            externals,
            frameworks,
            cache: None,
        })
    }

    /// Reuse extractions across calls.
    ///
    /// A cache must only be shared between analyzers with the same extractor
    /// configuration.
    pub fn with_cache(mut self, cache: Arc<ExtractionCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Replace the framework signature registry
    pub fn with_frameworks(mut self, frameworks: FrameworkRegistry) -> Self {
        self.frameworks = frameworks;
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyze a batch to completion
    pub async fn analyze(&self, batch: Batch) -> Result<ProjectContext> {
        self.analyze_with_cancel(batch, &CancellationToken::new())
            .await
    }

    /// Analyze a batch, stopping early once `cancel` is triggered.
    ///
    /// Cancellation is observed between extraction tasks and before each
    /// aggregate stage, and always yields [`AnalysisError::Cancelled`].
    pub async fn analyze_with_cancel(
        &self,
        batch: Batch,
        cancel: &CancellationToken,
    ) -> Result<ProjectContext> {
        let started = Instant::now();
        let root = batch.root().to_string();
        let scope = batch.scope();
        let prepared = batch.prepare()?;
        log::debug!(
            "Analyzing {} units ({} scope) with {} workers",
            prepared.len(),
            scope.as_str(),
            self.config.effective_workers()
        );

        let units = self.extract_all(prepared, cancel).await?;
        for unit in &units {
            if let Some(reason) = unit.status.reason() {
                log::warn!("{}: unparsable ({reason})", unit.path);
            }
        }

        cancel.check(Stage::GraphBuilding)?;
        let graph = GraphBuilder::new(&self.externals, self.config.case_insensitive_paths)
            .build(&units);
        let symbols = SymbolTable::build(&units);
        log::debug!(
            "Graph: {} import references, {} edges, {} symbols",
            graph.imports.len(),
            graph.edges.len(),
            symbols.symbol_count()
        );

        cancel.check(Stage::Resolution)?;
        let findings = resolve(&units, &graph, &symbols);

        cancel.check(Stage::CycleDetection)?;
        let cycles = UnitGraph::new(&units, &graph.edges).detect();

        cancel.check(Stage::FrameworkDetection)?;
        let frameworks = self.frameworks.detect(&units, self.config.min_confidence);

        let context = assemble(&AssemblyInputs {
            root: &root,
            scope,
            units: &units,
            graph: &graph,
            symbols: &symbols,
            cycles: &cycles,
            findings: &findings,
            frameworks: &frameworks,
            thresholds: self.config.size_thresholds.as_ref(),
        });

        log::info!(
            "Analyzed {} units in {:.2}s: {} edges, {} cycles, {} findings, {} frameworks",
            units.len(),
            started.elapsed().as_secs_f64(),
            context.edges().len(),
            context.cycles().len(),
            context.findings().len(),
            context.frameworks().len()
        );
        Ok(context)
    }

    /// Extract every unit with at most `workers` tasks in flight.
    /// Returns units sorted by path.
    async fn extract_all(
        &self,
        prepared: Vec<PreparedUnit>,
        cancel: &CancellationToken,
    ) -> Result<Vec<SourceUnit>> {
        let semaphore = Arc::new(Semaphore::new(self.config.effective_workers()));
        let mut tasks = JoinSet::new();
        let mut units = Vec::with_capacity(prepared.len());

        for unit in prepared {
            cancel.check(Stage::Extraction)?;
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|_| AnalysisError::Cancelled {
                    stage: Stage::Extraction,
                })?;

            let extractor = Arc::clone(&self.extractor);
            let cache = self.cache.clone();
            tasks.spawn_blocking(move || {
                let _permit = permit;
                extract_unit(&extractor, cache.as_deref(), unit)
            });

            while let Some(joined) = tasks.try_join_next() {
                units.push(joined.map_err(join_error)?);
                cancel.check(Stage::Extraction)?;
            }
        }

        while let Some(joined) = tasks.join_next().await {
            units.push(joined.map_err(join_error)?);
            cancel.check(Stage::Extraction)?;
        }

        units.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(units)
    }
}

/// Extract one unit, consulting the cache first. A panicking parser degrades
/// the unit to `unparsable`.
fn extract_unit(
    extractor: &SymbolExtractor,
    cache: Option<&ExtractionCache>,
    unit: PreparedUnit,
) -> SourceUnit {
    let PreparedUnit { path, content } = unit;
    let language = Language::from_path(&path);
    let hash = content_hash(&content);

    if let Some(extraction) = cache.and_then(|c| c.get(language, &hash)) {
        log::debug!("{path}: extraction cache hit");
        return SourceUnit::new(path, content, extraction);
    }

    let extraction =
        match panic::catch_unwind(AssertUnwindSafe(|| extractor.extract(&path, &content))) {
            Ok(extraction) => {
                if let Some(cache) = cache {
                    cache.insert(extraction.clone());
                }
                extraction
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                log::warn!("{path}: extraction panicked: {message}");
                Extraction::unparsable(
                    language,
                    count_lines(&content),
                    hash,
                    UnparsableReason::ParserUnavailable { message },
                )
            }
        };
    SourceUnit::new(path, content, extraction)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "extraction task panicked".to_string())
}

/// Extraction tasks catch their own panics, so a join error means the task
/// was torn down with the runtime.
fn join_error(e: JoinError) -> AnalysisError {
    log::warn!("Extraction task did not complete: {e}");
    AnalysisError::Cancelled {
        stage: Stage::Extraction,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::SourceInput;
    use pretty_assertions::assert_eq;

    fn batch(files: &[(&str, &str)]) -> Batch {
        Batch::new(
            files
                .iter()
                .map(|(path, src)| SourceInput::new(*path, src.as_bytes().to_vec())),
        )
    }

    fn analyzer(workers: usize) -> Analyzer {
        Analyzer::new(AnalysisConfig {
            workers: Some(workers),
            ..AnalysisConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_units_sorted_regardless_of_worker_count() {
        let files: Vec<(String, String)> = (0..40)
            .rev()
            .map(|i| (format!("pkg/m{i:02}.py"), format!("def f{i}():\n    return {i}\n")))
            .collect();
        let refs: Vec<(&str, &str)> = files
            .iter()
            .map(|(p, s)| (p.as_str(), s.as_str()))
            .collect();

        let single = analyzer(1).analyze(batch(&refs)).await.unwrap();
        let many = analyzer(8).analyze(batch(&refs)).await.unwrap();

        let paths: Vec<&str> = many.units().iter().map(|u| u.path.as_str()).collect();
        let mut sorted = paths.clone();
        sorted.sort();
        assert_eq!(paths, sorted);
        assert_eq!(single.to_json().unwrap(), many.to_json().unwrap());
    }

    #[tokio::test]
    async fn test_cache_is_consulted() {
        let cache = Arc::new(ExtractionCache::new(16));
        let analyzer = analyzer(2).with_cache(Arc::clone(&cache));
        let files = [("a.py", "def f():\n    pass\n"), ("b.py", "x = 1\n")];

        let first = analyzer.analyze(batch(&files)).await.unwrap();
        assert_eq!(cache.stats().misses, 2);
        assert_eq!(cache.len(), 2);

        let second = analyzer.analyze(batch(&files)).await.unwrap();
        assert_eq!(cache.stats().hits, 2);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_invalid_input_fails_before_extraction() {
        let cache = Arc::new(ExtractionCache::new(16));
        let analyzer = analyzer(2).with_cache(Arc::clone(&cache));

        let err = analyzer.analyze(Batch::default()).await.unwrap_err();
        assert!(matches!(err, AnalysisError::EmptyBatch));

        let err = analyzer
            .analyze(batch(&[("a.py", "x = 1\n"), ("./a.py", "y = 2\n")]))
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::DuplicatePath(_)));
        assert_eq!(cache.stats().misses, 0);
    }

    const FILES: &[(&str, &str)] = &[
        ("a.py", "from b import helper\n"),
        ("b.py", "def helper():\n    pass\n"),
        ("c.py", "import a\n"),
    ];

    #[tokio::test]
    async fn test_cancellation_before_each_aggregate_stage() {
        for stage in [
            Stage::GraphBuilding,
            Stage::Resolution,
            Stage::CycleDetection,
            Stage::FrameworkDetection,
        ] {
            let token = CancellationToken::trip_at(stage, 1);
            let result = analyzer(2).analyze_with_cancel(batch(FILES), &token).await;
            match result {
                Err(AnalysisError::Cancelled { stage: stopped }) => assert_eq!(stopped, stage),
                other => panic!("expected cancellation before {stage}, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_cancellation_between_extraction_tasks() {
        // each unit is checked once before its task is spawned and once after it joins
        let checks = 2 * FILES.len();
        for workers in [1, 4] {
            for trip in [2, checks] {
                let token = CancellationToken::trip_at(Stage::Extraction, trip);
                let result = analyzer(workers)
                    .analyze_with_cancel(batch(FILES), &token)
                    .await;
                assert!(
                    matches!(
                        result,
                        Err(AnalysisError::Cancelled {
                            stage: Stage::Extraction
                        })
                    ),
                    "workers {workers}, check {trip}: {result:?}"
                );
            }

            let token = CancellationToken::trip_at(Stage::Extraction, checks + 1);
            let context = analyzer(workers)
                .analyze_with_cancel(batch(FILES), &token)
                .await
                .unwrap();
            assert_eq!(context.units().len(), FILES.len());
        }
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let result = Analyzer::new(AnalysisConfig {
            workers: Some(0),
            ..AnalysisConfig::default()
        });
        assert!(matches!(result, Err(AnalysisError::InvalidConfig(_))));
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(payload.as_ref()), "extraction task panicked");
    }
}
