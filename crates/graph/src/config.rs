use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use xref_extractor::ExtractorConfig;

/// Upper bound for concurrent extraction tasks
pub const MAX_WORKERS: usize = 32;

/// Environment override for the default worker count
pub const WORKERS_ENV: &str = "XREF_WORKERS";

/// Frameworks scoring below this confidence are dropped
pub const DEFAULT_MIN_CONFIDENCE: u8 = 25;

/// Configuration for one analysis run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Maximum extraction tasks in flight. `None` uses `XREF_WORKERS` or the
    /// available parallelism.
    pub workers: Option<usize>,

    /// Minimum framework confidence (0-100) to report a verdict
    pub min_confidence: u8,

    /// Match import targets against unit paths ignoring ASCII case
    pub case_insensitive_paths: bool,

    /// Extra module names treated as external on top of the bundled registry
    pub extra_external_modules: Vec<String>,

    pub extractor: ExtractorConfig,

    /// Caller-owned size bands used to classify units by line count
    pub size_thresholds: Option<SizeThresholds>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            workers: None,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            case_insensitive_paths: false,
            extra_external_modules: Vec::new(),
            extractor: ExtractorConfig::default(),
            size_thresholds: None,
        }
    }
}

impl AnalysisConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if let Some(workers) = self.workers {
            if workers == 0 || workers > MAX_WORKERS {
                return Err(AnalysisError::InvalidConfig(format!(
                    "workers must be between 1 and {MAX_WORKERS}, got {workers}"
                )));
            }
        }

        if self.min_confidence > 100 {
            return Err(AnalysisError::InvalidConfig(format!(
                "min_confidence must be at most 100, got {}",
                self.min_confidence
            )));
        }

        if let Some(idx) = self
            .extra_external_modules
            .iter()
            .position(|name| name.trim().is_empty())
        {
            return Err(AnalysisError::InvalidConfig(format!(
                "extra_external_modules[{idx}] is empty"
            )));
        }

        self.extractor.validate()?;

        if let Some(thresholds) = &self.size_thresholds {
            thresholds.validate()?;
        }

        Ok(())
    }

    /// Worker count actually used for extraction
    pub fn effective_workers(&self) -> usize {
        self.workers
            .map(|w| w.clamp(1, MAX_WORKERS))
            .unwrap_or_else(workers_from_env)
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .clamp(1, MAX_WORKERS)
}

fn parse_workers(raw: Option<&str>, default_value: usize) -> usize {
    raw.map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default_value)
        .clamp(1, MAX_WORKERS)
}

fn workers_from_env() -> usize {
    let raw = std::env::var(WORKERS_ENV).ok();
    parse_workers(raw.as_deref(), default_workers())
}

/// One size band: units with at most `max_lines` lines get `label`.
/// The last band has no bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeBand {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_lines: Option<usize>,
}

impl SizeBand {
    pub fn bounded(label: impl Into<String>, max_lines: usize) -> Self {
        Self {
            label: label.into(),
            max_lines: Some(max_lines),
        }
    }

    pub fn unbounded(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            max_lines: None,
        }
    }
}

/// Ordered line-count bands, e.g. optimal / warning / critical / dangerous
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<SizeBand>", into = "Vec<SizeBand>")]
pub struct SizeThresholds {
    bands: Vec<SizeBand>,
}

impl SizeThresholds {
    pub fn new(bands: Vec<SizeBand>) -> Result<Self> {
        let thresholds = Self { bands };
        thresholds.validate()?;
        Ok(thresholds)
    }

    /// Bands from ascending `(label, max_lines)` cut points plus the label for
    /// everything above the last cut point
    pub fn from_cut_points<L: Into<String>>(
        cut_points: impl IntoIterator<Item = (L, usize)>,
        overflow_label: impl Into<String>,
    ) -> Result<Self> {
        let mut bands: Vec<SizeBand> = cut_points
            .into_iter()
            .map(|(label, max)| SizeBand::bounded(label, max))
            .collect();
        bands.push(SizeBand::unbounded(overflow_label));
        Self::new(bands)
    }

    pub fn bands(&self) -> &[SizeBand] {
        &self.bands
    }

    /// Label of the first band whose bound holds `line_count`
    pub fn classify(&self, line_count: usize) -> &str {
        self.bands
            .iter()
            .find(|band| band.max_lines.map_or(true, |max| line_count <= max))
            .or(self.bands.last())
            .map(|band| band.label.as_str())
            .unwrap_or_default()
    }

    pub fn validate(&self) -> Result<()> {
        let Some((last, bounded)) = self.bands.split_last() else {
            return Err(AnalysisError::InvalidThresholds(
                "at least one band is required".to_string(),
            ));
        };

        if let Some(band) = self.bands.iter().find(|b| b.label.trim().is_empty()) {
            return Err(AnalysisError::InvalidThresholds(format!(
                "band with max_lines {:?} has an empty label",
                band.max_lines
            )));
        }

        if last.max_lines.is_some() {
            return Err(AnalysisError::InvalidThresholds(format!(
                "last band `{}` must be unbounded",
                last.label
            )));
        }

        let mut previous: Option<usize> = None;
        for band in bounded {
            let Some(max) = band.max_lines else {
                return Err(AnalysisError::InvalidThresholds(format!(
                    "only the last band may be unbounded, `{}` is not last",
                    band.label
                )));
            };
            if previous.is_some_and(|prev| max <= prev) {
                return Err(AnalysisError::InvalidThresholds(format!(
                    "bounds must be strictly increasing, `{}` has {max}",
                    band.label
                )));
            }
            previous = Some(max);
        }

        Ok(())
    }
}

impl TryFrom<Vec<SizeBand>> for SizeThresholds {
    type Error = AnalysisError;

    fn try_from(bands: Vec<SizeBand>) -> Result<Self> {
        Self::new(bands)
    }
}

impl From<SizeThresholds> for Vec<SizeBand> {
    fn from(thresholds: SizeThresholds) -> Self {
        thresholds.bands
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn standard() -> SizeThresholds {
        SizeThresholds::from_cut_points(
            [
                ("optimal", 400),
                ("acceptable", 600),
                ("warning", 800),
                ("critical", 1200),
            ],
            "dangerous",
        )
        .unwrap()
    }

    #[test]
    fn test_classify_uses_first_matching_band() {
        let thresholds = standard();
        assert_eq!(thresholds.classify(0), "optimal");
        assert_eq!(thresholds.classify(400), "optimal");
        assert_eq!(thresholds.classify(401), "acceptable");
        assert_eq!(thresholds.classify(1200), "critical");
        assert_eq!(thresholds.classify(5000), "dangerous");
    }

    #[test]
    fn test_thresholds_reject_bad_bands() {
        assert!(SizeThresholds::new(Vec::new()).is_err());
        assert!(SizeThresholds::from_cut_points([("a", 10), ("b", 10)], "c").is_err());
        assert!(SizeThresholds::from_cut_points([("", 10)], "c").is_err());
        assert!(SizeThresholds::new(vec![SizeBand::bounded("a", 10)]).is_err());
        assert!(SizeThresholds::new(vec![
            SizeBand::unbounded("a"),
            SizeBand::unbounded("b"),
        ])
        .is_err());
    }

    #[test]
    fn test_thresholds_deserialize_validates() {
        let ok: SizeThresholds =
            serde_json::from_str(r#"[{"label":"small","max_lines":10},{"label":"big"}]"#)
                .unwrap();
        assert_eq!(ok.classify(11), "big");

        let bad = serde_json::from_str::<SizeThresholds>(
            r#"[{"label":"small","max_lines":10},{"label":"mid","max_lines":5},{"label":"big"}]"#,
        );
        assert!(bad.is_err());
    }

    #[test]
    fn test_parse_workers() {
        assert_eq!(parse_workers(None, 4), 4);
        assert_eq!(parse_workers(Some(""), 4), 4);
        assert_eq!(parse_workers(Some(" 8 "), 4), 8);
        assert_eq!(parse_workers(Some("0"), 4), 1);
        assert_eq!(parse_workers(Some("1000"), 4), MAX_WORKERS);
        assert_eq!(parse_workers(Some("many"), 4), 4);
    }

    #[test]
    fn test_config_validation() {
        assert!(AnalysisConfig::default().validate().is_ok());

        let zero_workers = AnalysisConfig {
            workers: Some(0),
            ..AnalysisConfig::default()
        };
        assert!(matches!(
            zero_workers.validate(),
            Err(AnalysisError::InvalidConfig(_))
        ));

        let bad_confidence = AnalysisConfig {
            min_confidence: 101,
            ..AnalysisConfig::default()
        };
        assert!(bad_confidence.validate().is_err());

        let explicit = AnalysisConfig {
            workers: Some(3),
            ..AnalysisConfig::default()
        };
        assert_eq!(explicit.effective_workers(), 3);
    }
}
