use crate::error::{ExtractorError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for symbol extraction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Declarations whose name starts with any of these prefixes are recorded
    /// as not exported. An empty list exports every top-level declaration.
    pub private_prefixes: Vec<String>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            private_prefixes: vec!["_".to_string()],
        }
    }
}

impl ExtractorConfig {
    /// Config that treats every top-level declaration as exported
    pub fn export_everything() -> Self {
        Self {
            private_prefixes: Vec::new(),
        }
    }

    /// Whether the unit's naming convention hides `name` from other units
    pub fn is_private(&self, name: &str) -> bool {
        self.private_prefixes
            .iter()
            .any(|prefix| name.starts_with(prefix.as_str()))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if let Some(idx) = self.private_prefixes.iter().position(String::is_empty) {
            return Err(ExtractorError::invalid_config(format!(
                "private_prefixes[{idx}] is empty and would hide every declaration"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = ExtractorConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.is_private("_helper"));
        assert!(config.is_private("__dunder__"));
        assert!(!config.is_private("helper"));
    }

    #[test]
    fn test_export_everything() {
        let config = ExtractorConfig::export_everything();
        assert!(config.validate().is_ok());
        assert!(!config.is_private("_helper"));
    }

    #[test]
    fn test_empty_prefix_rejected() {
        let config = ExtractorConfig {
            private_prefixes: vec!["_".to_string(), String::new()],
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("private_prefixes[1]"));
    }

    #[test]
    fn test_custom_prefixes() {
        let config = ExtractorConfig {
            private_prefixes: vec!["internal_".to_string(), "$".to_string()],
        };
        assert!(config.is_private("internal_cache"));
        assert!(config.is_private("$state"));
        assert!(!config.is_private("_helper"));
    }
}
