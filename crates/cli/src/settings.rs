use anyhow::{bail, Context as AnyhowContext, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use xref_graph::{AnalysisConfig, SizeBand, SizeThresholds};

/// Config file looked up in the analysis root when `--config` is not given
pub(crate) const CONFIG_FILE_NAME: &str = "xref.toml";

/// Preset used when neither flags nor the config file choose size bands
pub(crate) const DEFAULT_PRESET: &str = "standard";

/// Named line-count cut points: optimal / acceptable / warning / critical,
/// everything above is dangerous
const PRESETS: &[(&str, [usize; 4])] = &[
    ("strict", [250, 400, 500, 700]),
    ("standard", [400, 600, 800, 1200]),
    ("relaxed", [600, 800, 1000, 1500]),
    ("legacy", [800, 1200, 1500, 2000]),
];

const PRESET_LABELS: [&str; 4] = ["optimal", "acceptable", "warning", "critical"];
const OVERFLOW_LABEL: &str = "dangerous";

/// Contents of `xref.toml`
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct FileSettings {
    pub analysis: AnalysisConfig,
    pub size: Option<SizeSection>,
}

/// `[size]`: either a named preset or explicit bands
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct SizeSection {
    pub preset: Option<String>,
    pub bands: Vec<SizeBand>,
}

impl FileSettings {
    /// Load `explicit`, or `<root>/xref.toml` when present
    pub(crate) fn load(explicit: Option<&Path>, root: &Path) -> Result<Self> {
        let path: PathBuf = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let candidate = root.join(CONFIG_FILE_NAME);
                if !candidate.is_file() {
                    return Ok(Self::default());
                }
                candidate
            }
        };

        let raw = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let settings = Self::parse(&raw)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(settings)
    }

    pub(crate) fn parse(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Size bands from the `[size]` section, if it has any
    pub(crate) fn size_thresholds(&self) -> Result<Option<SizeThresholds>> {
        let Some(size) = &self.size else {
            return Ok(None);
        };
        match (&size.preset, size.bands.is_empty()) {
            (Some(_), false) => bail!("[size] sets both `preset` and `bands`; choose one"),
            (Some(name), true) => preset(name).map(Some),
            (None, false) => Ok(Some(SizeThresholds::new(size.bands.clone())?)),
            (None, true) => Ok(None),
        }
    }
}

/// Thresholds for a named preset
pub(crate) fn preset(name: &str) -> Result<SizeThresholds> {
    let Some((_, cuts)) = PRESETS.iter().find(|(preset, _)| *preset == name) else {
        let known: Vec<&str> = PRESETS.iter().map(|(preset, _)| *preset).collect();
        bail!("Unknown size preset `{name}` (expected one of: {})", known.join(", "));
    };
    let cut_points = PRESET_LABELS.iter().copied().zip(cuts.iter().copied());
    Ok(SizeThresholds::from_cut_points(cut_points, OVERFLOW_LABEL)?)
}

pub(crate) fn preset_names() -> impl Iterator<Item = &'static str> {
    PRESETS.iter().map(|(name, _)| *name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn presets_classify_like_the_bands_they_name() {
        let strict = preset("strict").unwrap();
        assert_eq!(strict.classify(250), "optimal");
        assert_eq!(strict.classify(401), "warning");
        assert_eq!(strict.classify(701), "dangerous");

        let legacy = preset("legacy").unwrap();
        assert_eq!(legacy.classify(1000), "acceptable");
        assert!(preset("custom").is_err());
        assert_eq!(
            preset_names().collect::<Vec<_>>(),
            vec!["strict", "standard", "relaxed", "legacy"]
        );
    }

    #[test]
    fn parses_analysis_and_size_sections() {
        let settings = FileSettings::parse(
            r#"
            [analysis]
            workers = 2
            min_confidence = 40
            extra_external_modules = ["internal_sdk"]

            [analysis.extractor]
            private_prefixes = ["_", "internal_"]

            [size]
            bands = [
                { label = "small", max_lines = 100 },
                { label = "large" },
            ]
            "#,
        )
        .unwrap();

        assert_eq!(settings.analysis.workers, Some(2));
        assert_eq!(settings.analysis.min_confidence, 40);
        assert_eq!(settings.analysis.extra_external_modules, vec!["internal_sdk"]);
        assert!(settings.analysis.extractor.is_private("internal_api"));

        let thresholds = settings.size_thresholds().unwrap().unwrap();
        assert_eq!(thresholds.classify(100), "small");
        assert_eq!(thresholds.classify(101), "large");
    }

    #[test]
    fn empty_file_uses_defaults() {
        let settings = FileSettings::parse("").unwrap();
        assert_eq!(settings.analysis, AnalysisConfig::default());
        assert!(settings.size_thresholds().unwrap().is_none());
    }

    #[test]
    fn rejects_conflicting_or_unknown_settings() {
        let both = FileSettings::parse(
            "[size]\npreset = \"strict\"\nbands = [{ label = \"all\" }]\n",
        )
        .unwrap();
        assert!(both.size_thresholds().is_err());

        assert!(FileSettings::parse("[sizes]\npreset = \"strict\"\n").is_err());
        assert!(FileSettings::parse("[size]\nbands = [{ label = \"small\", max_lines = 5 }]\n")
            .unwrap()
            .size_thresholds()
            .is_err());
    }
}
