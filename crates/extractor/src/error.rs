use thiserror::Error;

/// Result type for extractor construction
pub type Result<T> = std::result::Result<T, ExtractorError>;

/// Errors raised while setting up extraction.
///
/// Problems with an individual unit's content are never errors; they are
/// reported as [`crate::UnparsableReason`] on the unit.
#[derive(Error, Debug)]
pub enum ExtractorError {
    /// No grammar is bundled for the language
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Tree-sitter refused the grammar
    #[error("Tree-sitter error: {0}")]
    TreeSitterError(String),
}

impl ExtractorError {
    /// Create an unsupported language error
    pub fn unsupported_language(lang: impl Into<String>) -> Self {
        Self::UnsupportedLanguage(lang.into())
    }

    /// Create an invalid config error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a tree-sitter error
    pub fn tree_sitter(msg: impl Into<String>) -> Self {
        Self::TreeSitterError(msg.into())
    }
}
