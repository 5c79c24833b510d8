use crate::language::Language;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Kind of a unit-level declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Function,
    Class,
    Variable,
    Constant,
}

impl SymbolKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SymbolKind::Function => "function",
            SymbolKind::Class => "class",
            SymbolKind::Variable => "variable",
            SymbolKind::Constant => "constant",
        }
    }
}

/// A top-level declaration found in a unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declaration {
    pub name: String,
    pub kind: SymbolKind,
    /// Visible outside the unit (not hidden by the private naming convention)
    pub exported: bool,
    /// 1-indexed line of the declaration
    pub line: usize,
    /// Call signature of a function, `name(a, b=...)`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

/// One import reference as written in the unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSpec {
    /// Module specifier as written (`pkg.mod`, `..sibling`, `./util`, `react`)
    pub specifier: String,

    /// Imported symbol. `None` imports the whole module.
    pub symbol: Option<String>,

    /// Local name the import binds, when it differs from `symbol`
    pub alias: Option<String>,

    /// `from m import *`: binds every name the target exports
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub wildcard: bool,

    /// 1-indexed line of the import statement
    pub line: usize,
}

impl ImportSpec {
    pub fn module(specifier: impl Into<String>, line: usize) -> Self {
        Self {
            specifier: specifier.into(),
            symbol: None,
            alias: None,
            wildcard: false,
            line,
        }
    }

    pub fn symbol(specifier: impl Into<String>, symbol: impl Into<String>, line: usize) -> Self {
        Self {
            symbol: Some(symbol.into()),
            ..Self::module(specifier, line)
        }
    }

    pub fn wildcard(specifier: impl Into<String>, line: usize) -> Self {
        Self {
            wildcard: true,
            ..Self::module(specifier, line)
        }
    }

    #[must_use]
    pub fn with_alias(mut self, alias: Option<String>) -> Self {
        self.alias = alias;
        self
    }

    /// Whole-module or wildcard import (empty symbol name)
    pub fn is_module_level(&self) -> bool {
        self.symbol.is_none()
    }

    /// Name this import binds in the importing unit, if any
    pub fn bound_name(&self) -> Option<&str> {
        if self.wildcard {
            return None;
        }
        self.alias.as_deref().or(self.symbol.as_deref())
    }
}

/// A name used by the unit that nothing in the unit binds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub name: String,
    /// 1-indexed line of the first occurrence
    pub line: usize,
}

/// Why a unit could not be parsed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnparsableReason {
    EmptyContent,
    InvalidEncoding { byte_offset: usize },
    Syntax { line: usize, column: usize },
    ParserUnavailable { message: String },
}

impl fmt::Display for UnparsableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnparsableReason::EmptyContent => f.write_str("empty content"),
            UnparsableReason::InvalidEncoding { byte_offset } => {
                write!(f, "invalid UTF-8 at byte {byte_offset}")
            }
            UnparsableReason::Syntax { line, column } => {
                write!(f, "syntax error at line {line}, column {column}")
            }
            UnparsableReason::ParserUnavailable { message } => {
                write!(f, "parser unavailable: {message}")
            }
        }
    }
}

/// Parse status of a unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ParseStatus {
    Parsed,
    Unparsable { reason: UnparsableReason },
}

impl ParseStatus {
    pub fn is_parsed(&self) -> bool {
        matches!(self, ParseStatus::Parsed)
    }

    pub fn reason(&self) -> Option<&UnparsableReason> {
        match self {
            ParseStatus::Parsed => None,
            ParseStatus::Unparsable { reason } => Some(reason),
        }
    }
}

/// Everything extracted from one unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extraction {
    pub language: Language,
    pub line_count: usize,
    /// Lower-case hex SHA-256 of the raw content
    pub content_hash: String,
    pub status: ParseStatus,
    pub declarations: Vec<Declaration>,
    pub imports: Vec<ImportSpec>,
    pub usages: Vec<Usage>,
}

impl Extraction {
    /// An extraction with nothing in it
    pub fn empty(language: Language, line_count: usize, content_hash: String) -> Self {
        Self {
            language,
            line_count,
            content_hash,
            status: ParseStatus::Parsed,
            declarations: Vec::new(),
            imports: Vec::new(),
            usages: Vec::new(),
        }
    }

    /// A unit that could not be parsed
    pub fn unparsable(
        language: Language,
        line_count: usize,
        content_hash: String,
        reason: UnparsableReason,
    ) -> Self {
        Self {
            status: ParseStatus::Unparsable { reason },
            ..Self::empty(language, line_count, content_hash)
        }
    }

    /// Declarations visible to other units
    pub fn exported(&self) -> impl Iterator<Item = &Declaration> {
        self.declarations.iter().filter(|d| d.exported)
    }

    pub fn declares(&self, name: &str) -> bool {
        self.declarations.iter().any(|d| d.name == name)
    }

    pub fn exports(&self, name: &str) -> bool {
        self.exported().any(|d| d.name == name)
    }
}

/// Lower-case hex SHA-256 of `content`
pub fn content_hash(content: &[u8]) -> String {
    let digest = Sha256::digest(content);
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}
