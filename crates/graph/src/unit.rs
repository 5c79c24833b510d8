use serde::Serialize;
use std::sync::Arc;
use xref_extractor::{Declaration, Extraction, ImportSpec, Language, ParseStatus, Usage};

/// One analyzed source unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceUnit {
    /// Normalized logical path, unique within the batch
    pub path: String,
    pub language: Language,
    pub line_count: usize,
    pub content_hash: String,
    #[serde(flatten)]
    pub status: ParseStatus,
    /// Label from the caller's size thresholds, if any were supplied
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_class: Option<String>,
    pub symbols: Vec<Declaration>,
    pub usages: Vec<Usage>,
    #[serde(skip)]
    pub(crate) specs: Vec<ImportSpec>,
    #[serde(skip)]
    content: Arc<[u8]>,
}

impl SourceUnit {
    pub(crate) fn new(path: String, content: Arc<[u8]>, extraction: Extraction) -> Self {
        Self {
            path,
            language: extraction.language,
            line_count: extraction.line_count,
            content_hash: extraction.content_hash,
            status: extraction.status,
            size_class: None,
            symbols: extraction.declarations,
            usages: extraction.usages,
            specs: extraction.imports,
            content,
        }
    }

    /// Raw content as supplied by the caller
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn is_parsed(&self) -> bool {
        self.status.is_parsed()
    }

    pub fn exported_symbols(&self) -> impl Iterator<Item = &Declaration> {
        self.symbols.iter().filter(|s| s.exported)
    }

    pub fn exports(&self, name: &str) -> bool {
        self.exported_symbols().any(|s| s.name == name)
    }

    /// Names other units can import from this one: exported declarations
    /// plus names it re-exports through symbol imports
    pub(crate) fn provides(&self, name: &str) -> bool {
        self.exports(name)
            || self.specs.iter().any(|spec| {
                !spec.wildcard
                    && spec.symbol.is_some()
                    && spec.alias.as_deref().or(spec.symbol.as_deref()) == Some(name)
            })
    }

    /// Has a `*` import, so it may provide any name
    pub(crate) fn has_wildcard_import(&self) -> bool {
        self.specs.iter().any(|spec| spec.wildcard)
    }

    /// Directory part of the path (`""` for top-level units)
    pub fn directory(&self) -> &str {
        crate::batch::parent_dir(&self.path)
    }
}

/// Extract `(path, source)` pairs into units sorted by path
#[cfg(test)]
pub(crate) fn extract_units(files: &[(&str, &str)]) -> Vec<SourceUnit> {
    use xref_extractor::{ExtractorConfig, SymbolExtractor};

    let extractor = SymbolExtractor::new(ExtractorConfig::default()).unwrap();
    let mut units: Vec<SourceUnit> = files
        .iter()
        .map(|(path, src)| {
            SourceUnit::new(
                path.to_string(),
                Arc::from(src.as_bytes()),
                extractor.extract(path, src.as_bytes()),
            )
        })
        .collect();
    units.sort_by(|a, b| a.path.cmp(&b.path));
    units
}
