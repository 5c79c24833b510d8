//! # xref Extractor
//!
//! Turns one source unit into the facts cross-file analysis needs: what the unit
//! declares, what it imports, and which names it uses without binding them.
//!
//! ## Pipeline
//!
//! ```text
//! (logical path, bytes)
//!     │
//!     ├──> Language Detection (from extension)
//!     │
//!     ├──> Decoding + emptiness checks ──> Unparsable { reason }
//!     │
//!     ├──> Tree-sitter Parsing → AST ──> Unparsable { syntax error }
//!     │
//!     └──> Language visitor
//!          ├─> Top-level declarations (function/class/variable/constant)
//!          ├─> Import references (per symbol, whole-module, wildcard)
//!          └─> Bare usages (calls, bases, decorators) minus unit bindings
//! ```
//!
//! Extraction never fails past the unit boundary: a unit that cannot be read or
//! parsed comes back as an [`Extraction`] with [`ParseStatus::Unparsable`].
//!
//! ## Example
//!
//! ```rust
//! use xref_extractor::{ExtractorConfig, SymbolExtractor};
//!
//! let extractor = SymbolExtractor::new(ExtractorConfig::default()).unwrap();
//! let extraction = extractor.extract("app/views.py", b"from app.util import helper\n\ndef index():\n    return helper()\n");
//!
//! assert!(extraction.status.is_parsed());
//! assert_eq!(extraction.declarations[0].name, "index");
//! assert_eq!(extraction.imports[0].symbol.as_deref(), Some("helper"));
//! ```

mod builtins;
mod config;
mod error;
mod extractor;
mod javascript;
mod language;
mod python;
mod types;

pub use config::ExtractorConfig;
pub use error::{ExtractorError, Result};
pub use extractor::{count_lines, SymbolExtractor};
pub use language::Language;
pub use types::{
    content_hash, Declaration, Extraction, ImportSpec, ParseStatus, SymbolKind,
    UnparsableReason, Usage,
};
