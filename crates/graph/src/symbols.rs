use crate::unit::SourceUnit;
use serde::Serialize;
use std::collections::BTreeMap;
use xref_extractor::SymbolKind;

/// One unit declaring a symbol
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SymbolOwner {
    pub unit: String,
    pub kind: SymbolKind,
    pub exported: bool,
    pub line: usize,
}

/// Project-wide map from symbol name to every unit declaring it.
///
/// Names are not unique across units; owners are kept in unit path order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SymbolTable {
    entries: BTreeMap<String, Vec<SymbolOwner>>,
}

impl SymbolTable {
    /// Build from units sorted by path
    pub(crate) fn build(units: &[SourceUnit]) -> Self {
        let mut entries: BTreeMap<String, Vec<SymbolOwner>> = BTreeMap::new();
        for unit in units {
            for symbol in &unit.symbols {
                entries
                    .entry(symbol.name.clone())
                    .or_default()
                    .push(SymbolOwner {
                        unit: unit.path.clone(),
                        kind: symbol.kind,
                        exported: symbol.exported,
                        line: symbol.line,
                    });
            }
        }
        Self { entries }
    }

    pub fn owners(&self, name: &str) -> &[SymbolOwner] {
        self.entries.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    /// Units exporting `name`, other than `excluding`
    pub fn exporters<'t>(&'t self, name: &str, excluding: &str) -> Vec<&'t str> {
        self.owners(name)
            .iter()
            .filter(|owner| owner.exported && owner.unit != excluding)
            .map(|owner| owner.unit.as_str())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[SymbolOwner])> {
        self.entries
            .iter()
            .map(|(name, owners)| (name.as_str(), owners.as_slice()))
    }

    /// Distinct symbol names
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Declarations across all units
    pub fn symbol_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }
}
