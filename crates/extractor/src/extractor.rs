use crate::builtins::is_builtin;
use crate::config::ExtractorConfig;
use crate::error::{ExtractorError, Result};
use crate::language::Language;
use crate::types::{
    content_hash, Declaration, Extraction, ImportSpec, SymbolKind, UnparsableReason, Usage,
};
use crate::{javascript, python};
use std::collections::{HashMap, HashSet};
use tree_sitter::{Node, Parser};

/// Extracts declarations, imports and usages from one source unit.
///
/// Cheap to share: a fresh tree-sitter parser is created per call, so one
/// extractor can serve any number of worker threads.
#[derive(Debug, Clone)]
pub struct SymbolExtractor {
    config: ExtractorConfig,
}

impl SymbolExtractor {
    /// Create a new extractor with configuration
    pub fn new(config: ExtractorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Extract a unit, detecting its language from `logical_path`
    pub fn extract(&self, logical_path: &str, content: &[u8]) -> Extraction {
        let language = Language::from_path(logical_path);
        let extraction = self.extract_with_language(language, content);
        if let Some(reason) = extraction.status.reason() {
            log::debug!("{logical_path}: unparsable ({reason})");
        }
        extraction
    }

    /// Extract a unit with an explicit language
    pub fn extract_with_language(&self, language: Language, content: &[u8]) -> Extraction {
        let hash = content_hash(content);
        let line_count = count_lines(content);

        let text = match std::str::from_utf8(content) {
            Ok(text) => text,
            Err(e) => {
                return Extraction::unparsable(
                    language,
                    line_count,
                    hash,
                    UnparsableReason::InvalidEncoding {
                        byte_offset: e.valid_up_to(),
                    },
                );
            }
        };

        if text.trim().is_empty() {
            return Extraction::unparsable(
                language,
                line_count,
                hash,
                UnparsableReason::EmptyContent,
            );
        }

        if !language.supports_ast() {
            return Extraction::empty(language, line_count, hash);
        }

        let mut parser = match new_parser(language) {
            Ok(parser) => parser,
            Err(e) => {
                return Extraction::unparsable(
                    language,
                    line_count,
                    hash,
                    UnparsableReason::ParserUnavailable {
                        message: e.to_string(),
                    },
                );
            }
        };

        let Some(tree) = parser.parse(text, None) else {
            return Extraction::unparsable(
                language,
                line_count,
                hash,
                UnparsableReason::ParserUnavailable {
                    message: "parser produced no tree".to_string(),
                },
            );
        };

        let root = tree.root_node();
        if root.has_error() {
            let (line, column) = first_syntax_error(root).unwrap_or((1, 1));
            return Extraction::unparsable(
                language,
                line_count,
                hash,
                UnparsableReason::Syntax { line, column },
            );
        }

        let facts = match language {
            Language::Python => python::visit(root, text, &self.config),
            _ => javascript::visit(root, text, &self.config),
        };
        let (declarations, imports, usages) = facts.finish(language);

        Extraction {
            declarations,
            imports,
            usages,
            ..Extraction::empty(language, line_count, hash)
        }
    }
}

/// Facts collected by a language visitor before bindings are applied
pub(crate) struct UnitFacts<'c> {
    config: &'c ExtractorConfig,
    declarations: Vec<Declaration>,
    declared: HashSet<String>,
    imports: Vec<ImportSpec>,
    bindings: HashSet<String>,
    candidates: Vec<Usage>,
}

impl<'c> UnitFacts<'c> {
    pub(crate) fn new(config: &'c ExtractorConfig) -> Self {
        Self {
            config,
            declarations: Vec::new(),
            declared: HashSet::new(),
            imports: Vec::new(),
            bindings: HashSet::new(),
            candidates: Vec::new(),
        }
    }

    /// Record a top-level declaration. Redefinitions keep the first one.
    pub(crate) fn declare(&mut self, name: &str, kind: SymbolKind, line: usize) {
        self.push_declaration(name, kind, line, None);
    }

    /// Record a top-level function along with its rendered parameter list
    pub(crate) fn declare_function(&mut self, name: &str, line: usize, params: Option<String>) {
        let signature = params.map(|params| format!("{name}({params})"));
        self.push_declaration(name, SymbolKind::Function, line, signature);
    }

    fn push_declaration(
        &mut self,
        name: &str,
        kind: SymbolKind,
        line: usize,
        signature: Option<String>,
    ) {
        if name.is_empty() || !self.declared.insert(name.to_string()) {
            return;
        }
        self.declarations.push(Declaration {
            name: name.to_string(),
            kind,
            exported: !self.config.is_private(name),
            line,
            signature,
        });
    }

    /// Kind of an already declared top-level name
    pub(crate) fn declared_kind(&self, name: &str) -> Option<SymbolKind> {
        self.declarations
            .iter()
            .find(|d| d.name == name)
            .map(|d| d.kind)
    }

    /// A name bound somewhere in the unit (any scope)
    pub(crate) fn bind(&mut self, name: &str) {
        if !name.is_empty() {
            self.bindings.insert(name.to_string());
        }
    }

    /// Record an import and bind the local name it introduces
    pub(crate) fn import(&mut self, spec: ImportSpec) {
        if let Some(name) = spec.bound_name() {
            self.bindings.insert(name.to_string());
        }
        self.imports.push(spec);
    }

    /// Record an import that binds nothing locally (re-exports)
    pub(crate) fn import_unbound(&mut self, spec: ImportSpec) {
        self.imports.push(spec);
    }

    /// A name used as a call target, base class, decorator or component
    pub(crate) fn use_name(&mut self, name: &str, line: usize) {
        if !name.is_empty() {
            self.candidates.push(Usage {
                name: name.to_string(),
                line,
            });
        }
    }

    pub(crate) fn finish(
        self,
        language: Language,
    ) -> (Vec<Declaration>, Vec<ImportSpec>, Vec<Usage>) {
        let mut first_use: HashMap<String, usize> = HashMap::new();
        for usage in self.candidates {
            if self.bindings.contains(&usage.name)
                || self.declared.contains(&usage.name)
                || is_builtin(language, &usage.name)
            {
                continue;
            }
            first_use
                .entry(usage.name)
                .and_modify(|line| *line = (*line).min(usage.line))
                .or_insert(usage.line);
        }

        let mut usages: Vec<Usage> = first_use
            .into_iter()
            .map(|(name, line)| Usage { name, line })
            .collect();
        usages.sort_by(|a, b| a.line.cmp(&b.line).then_with(|| a.name.cmp(&b.name)));

        (self.declarations, self.imports, usages)
    }
}

/// Source text of a node
pub(crate) fn node_text<'s>(node: Node<'_>, src: &'s str) -> &'s str {
    &src[node.start_byte()..node.end_byte()]
}

/// Node text with runs of whitespace collapsed to one space
pub(crate) fn compact_text(node: Node<'_>, src: &str) -> String {
    node_text(node, src)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// 1-indexed line a node starts on
pub(crate) fn line_of(node: Node<'_>) -> usize {
    node.start_position().row + 1
}

fn new_parser(language: Language) -> Result<Parser> {
    let ts_language = language.tree_sitter_language()?;
    let mut parser = Parser::new();
    parser
        .set_language(&ts_language)
        .map_err(|e| ExtractorError::tree_sitter(format!("Failed to set language: {e}")))?;
    Ok(parser)
}

/// Number of lines, counting a trailing line without a newline
pub fn count_lines(content: &[u8]) -> usize {
    if content.is_empty() {
        return 0;
    }
    let newlines = content.iter().filter(|&&b| b == b'\n').count();
    newlines + usize::from(content.last() != Some(&b'\n'))
}

/// Position (1-indexed line and column) of the first ERROR or MISSING node
fn first_syntax_error(root: Node<'_>) -> Option<(usize, usize)> {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            let pos = node.start_position();
            return Some((pos.row + 1, pos.column + 1));
        }
        if !node.has_error() {
            continue;
        }
        let mut cursor = node.walk();
        let children: Vec<_> = node.children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ParseStatus;
    use pretty_assertions::assert_eq;

    fn extractor() -> SymbolExtractor {
        SymbolExtractor::new(ExtractorConfig::default()).unwrap()
    }

    #[test]
    fn test_empty_content_is_unparsable() {
        let extraction = extractor().extract("pkg/__init__.py", b"  \n\n");
        assert_eq!(
            extraction.status,
            ParseStatus::Unparsable {
                reason: UnparsableReason::EmptyContent
            }
        );
        assert_eq!(extraction.line_count, 2);
    }

    #[test]
    fn test_invalid_utf8_is_unparsable() {
        let extraction = extractor().extract("a.py", b"x = 1\n\xff\xfe");
        assert_eq!(
            extraction.status.reason(),
            Some(&UnparsableReason::InvalidEncoding { byte_offset: 6 })
        );
        assert!(extraction.declarations.is_empty());
    }

    #[test]
    fn test_syntax_error_is_unparsable() {
        let extraction = extractor().extract("broken.py", b"def ok():\n    pass\n\ndef broken(:\n");
        match extraction.status.reason() {
            Some(UnparsableReason::Syntax { line, .. }) => assert_eq!(*line, 4),
            other => panic!("expected syntax error, got {other:?}"),
        }
        assert!(extraction.declarations.is_empty());
        assert!(extraction.imports.is_empty());
    }

    #[test]
    fn test_unknown_language_is_opaque() {
        let extraction = extractor().extract("README.md", b"# Title\n\nSome text\n");
        assert!(extraction.status.is_parsed());
        assert_eq!(extraction.language, Language::Unknown);
        assert_eq!(extraction.line_count, 3);
        assert!(extraction.declarations.is_empty());
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let src = b"import os\nfrom util import a, b\n\ndef f():\n    return a() + c()\n";
        let first = extractor().extract("m.py", src);
        let second = extractor().extract("m.py", src);
        assert_eq!(first, second);
    }

    #[test]
    fn test_count_lines() {
        assert_eq!(count_lines(b""), 0);
        assert_eq!(count_lines(b"a"), 1);
        assert_eq!(count_lines(b"a\n"), 1);
        assert_eq!(count_lines(b"a\nb"), 2);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ExtractorConfig {
            private_prefixes: vec![String::new()],
        };
        assert!(SymbolExtractor::new(config).is_err());
    }
}
