//! Framework detection from a declarative signature registry.
//!
//! A signature is a set of weighted rules. Each rule matches at most once per
//! unit; a framework's score is the sum of matched weights over all units,
//! normalized against the signature's saturation point.

use crate::error::{AnalysisError, Result};
use crate::unit::SourceUnit;
use globset::{GlobBuilder, GlobMatcher};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

const BUILTIN_FRAMEWORKS: &str = include_str!("../registry/frameworks.json");

/// What part of a unit a rule inspects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleTarget {
    /// Module specifier of any import
    Import,
    /// The unit's logical path
    Path,
    /// Name of a top-level declaration
    Declares,
    /// A bare usage or an imported symbol name
    Uses,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    #[default]
    Exact,
    Prefix,
    Glob,
    Regex,
}

#[derive(Debug, Clone, Deserialize)]
struct RawRegistry {
    frameworks: Vec<RawSignature>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawSignature {
    name: String,
    saturation: u32,
    rules: Vec<RawRule>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawRule {
    target: RuleTarget,
    #[serde(default)]
    kind: MatchKind,
    pattern: String,
    weight: u32,
}

#[derive(Debug, Clone)]
struct Matcher {
    kind: MatchKind,
    needle: String,
    glob: Option<GlobMatcher>,
    regex: Option<Regex>,
}

impl Matcher {
    fn new(kind: MatchKind, needle: &str) -> Result<Self> {
        let glob = if kind == MatchKind::Glob {
            Some(
                GlobBuilder::new(needle)
                    .literal_separator(true)
                    .build()
                    .map_err(|e| AnalysisError::Registry(format!("invalid glob `{needle}`: {e}")))?
                    .compile_matcher(),
            )
        } else {
            None
        };
        let regex = if kind == MatchKind::Regex {
            Some(
                Regex::new(needle).map_err(|e| {
                    AnalysisError::Registry(format!("invalid regex `{needle}`: {e}"))
                })?,
            )
        } else {
            None
        };
        Ok(Self {
            kind,
            needle: needle.to_string(),
            glob,
            regex,
        })
    }

    fn matches(&self, haystack: &str) -> bool {
        match self.kind {
            MatchKind::Exact => haystack == self.needle,
            MatchKind::Prefix => haystack.starts_with(&self.needle),
            MatchKind::Glob => self.glob.as_ref().is_some_and(|g| g.is_match(haystack)),
            MatchKind::Regex => self.regex.as_ref().is_some_and(|r| r.is_match(haystack)),
        }
    }
}

/// One weighted rule of a signature
#[derive(Debug, Clone)]
pub struct Rule {
    pub target: RuleTarget,
    pub weight: u32,
    matcher: Matcher,
}

impl Rule {
    pub fn new(target: RuleTarget, kind: MatchKind, pattern: &str, weight: u32) -> Result<Self> {
        if pattern.trim().is_empty() {
            return Err(AnalysisError::Registry("rule pattern is empty".to_string()));
        }
        if weight == 0 {
            return Err(AnalysisError::Registry(format!(
                "rule `{pattern}` has zero weight"
            )));
        }
        Ok(Self {
            target,
            weight,
            matcher: Matcher::new(kind, pattern)?,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.matcher.needle
    }

    fn matches(&self, unit: &SourceUnit) -> bool {
        let m = &self.matcher;
        match self.target {
            RuleTarget::Import => unit.specs.iter().any(|s| m.matches(&s.specifier)),
            RuleTarget::Path => m.matches(&unit.path),
            RuleTarget::Declares => unit.symbols.iter().any(|d| m.matches(&d.name)),
            RuleTarget::Uses => {
                unit.usages.iter().any(|u| m.matches(&u.name))
                    || unit
                        .specs
                        .iter()
                        .filter_map(|s| s.symbol.as_deref())
                        .any(|symbol| m.matches(symbol))
            }
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let target = match self.target {
            RuleTarget::Import => "import",
            RuleTarget::Path => "path",
            RuleTarget::Declares => "declares",
            RuleTarget::Uses => "uses",
        };
        let kind = match self.matcher.kind {
            MatchKind::Exact => "exact",
            MatchKind::Prefix => "prefix",
            MatchKind::Glob => "glob",
            MatchKind::Regex => "regex",
        };
        write!(f, "{target} {kind} `{}`", self.matcher.needle)
    }
}

/// A framework's weighted rule set
#[derive(Debug, Clone)]
pub struct Signature {
    pub name: String,
    /// Raw score that maps to 100% confidence
    pub saturation: u32,
    pub rules: Vec<Rule>,
}

/// Matched rule with the units that matched it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Evidence {
    pub rule: String,
    pub weight: u32,
    pub units: Vec<String>,
}

/// Scored guess that the batch uses a framework
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameworkVerdict {
    pub name: String,
    /// 0-100
    pub confidence: u8,
    pub evidence: Vec<Evidence>,
}

/// Registry of framework signatures
#[derive(Debug, Clone, Default)]
pub struct FrameworkRegistry {
    signatures: Vec<Signature>,
}

impl FrameworkRegistry {
    /// Bundled signatures for common Python and JavaScript frameworks
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_FRAMEWORKS)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let raw: RawRegistry = serde_json::from_str(raw)
            .map_err(|e| AnalysisError::Registry(format!("framework registry: {e}")))?;

        let mut signatures = Vec::with_capacity(raw.frameworks.len());
        for signature in raw.frameworks {
            let rules = signature
                .rules
                .iter()
                .map(|r| Rule::new(r.target, r.kind, &r.pattern, r.weight))
                .collect::<Result<Vec<_>>>()
                .map_err(|e| match e {
                    AnalysisError::Registry(msg) => {
                        AnalysisError::Registry(format!("{}: {msg}", signature.name))
                    }
                    other => other,
                })?;
            signatures.push(Signature {
                name: signature.name,
                saturation: signature.saturation,
                rules,
            });
        }

        let registry = Self { signatures };
        registry.validate()?;
        Ok(registry)
    }

    pub fn signatures(&self) -> &[Signature] {
        &self.signatures
    }

    /// Add signatures, replacing existing ones with the same name
    pub fn extend(&mut self, other: FrameworkRegistry) {
        for signature in other.signatures {
            match self.signatures.iter_mut().find(|s| s.name == signature.name) {
                Some(existing) => *existing = signature,
                None => self.signatures.push(signature),
            }
        }
    }

    fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        for signature in &self.signatures {
            if signature.name.trim().is_empty() {
                return Err(AnalysisError::Registry(
                    "framework name is empty".to_string(),
                ));
            }
            if !names.insert(signature.name.as_str()) {
                return Err(AnalysisError::Registry(format!(
                    "framework `{}` is defined twice",
                    signature.name
                )));
            }
            if signature.saturation == 0 {
                return Err(AnalysisError::Registry(format!(
                    "framework `{}` has zero saturation",
                    signature.name
                )));
            }
        }
        Ok(())
    }

    /// Score every signature against `units`; keep those at or above
    /// `min_confidence`, highest confidence first
    pub(crate) fn detect(&self, units: &[SourceUnit], min_confidence: u8) -> Vec<FrameworkVerdict> {
        let mut verdicts = Vec::new();

        for signature in &self.signatures {
            let mut raw: u64 = 0;
            let mut evidence = Vec::new();
            for rule in &signature.rules {
                let matched: Vec<String> = units
                    .iter()
                    .filter(|unit| rule.matches(unit))
                    .map(|unit| unit.path.clone())
                    .collect();
                if matched.is_empty() {
                    continue;
                }
                raw += u64::from(rule.weight) * matched.len() as u64;
                evidence.push(Evidence {
                    rule: rule.to_string(),
                    weight: rule.weight,
                    units: matched,
                });
            }

            if raw == 0 {
                continue;
            }
            let confidence = confidence(raw, signature.saturation);
            log::debug!(
                "framework {}: raw score {raw}, confidence {confidence}",
                signature.name
            );
            if confidence >= min_confidence {
                verdicts.push(FrameworkVerdict {
                    name: signature.name.clone(),
                    confidence,
                    evidence,
                });
            }
        }

        verdicts.sort_by(|a, b| {
            b.confidence
                .cmp(&a.confidence)
                .then_with(|| a.name.cmp(&b.name))
        });
        verdicts
    }
}

/// `min(100, round(100 * raw / saturation))`
fn confidence(raw: u64, saturation: u32) -> u8 {
    let saturation = u64::from(saturation.max(1));
    let scaled = (raw * 200 + saturation) / (saturation * 2);
    scaled.min(100) as u8
}
