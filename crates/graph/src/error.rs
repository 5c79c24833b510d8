use serde::Serialize;
use std::fmt;
use thiserror::Error;
use xref_extractor::ExtractorError;

pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Pipeline stage an analysis was in when it stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Extraction,
    GraphBuilding,
    Resolution,
    CycleDetection,
    FrameworkDetection,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Extraction => "extraction",
            Stage::GraphBuilding => "graph building",
            Stage::Resolution => "resolution",
            Stage::CycleDetection => "cycle detection",
            Stage::FrameworkDetection => "framework detection",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Batch-level failures. Per-unit problems are data on the context, never errors.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Empty batch: nothing to analyze")]
    EmptyBatch,

    #[error("Duplicate path in batch: {0}")]
    DuplicatePath(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid size thresholds: {0}")]
    InvalidThresholds(String),

    #[error("Registry error: {0}")]
    Registry(String),

    #[error("Analysis cancelled during {stage}")]
    Cancelled { stage: Stage },

    #[error("Extractor error: {0}")]
    Extractor(#[from] ExtractorError),
}

impl AnalysisError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, AnalysisError::Cancelled { .. })
    }
}
