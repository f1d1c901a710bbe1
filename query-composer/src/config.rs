//! Limits for normalization and selection building, loadable from YAML.
use displaydoc::Display;
use schemars::JsonSchema;
use schemars::schema::RootSchema;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::normalize::Normalizer;

/// Configuration error.
#[derive(Debug, Error, Display)]
#[non_exhaustive]
pub enum ConfigurationError {
    /// could not deserialize configuration: {0}
    DeserializeConfigError(serde_yaml::Error),
    /// {message}: {error}
    InvalidConfiguration {
        message: &'static str,
        error: String,
    },
}

/// The configuration for query composition.
///
/// Can be created through `serde::Deserialize` from various formats, or with
/// [`Configuration::from_yaml`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Configuration {
    /// Limits applied while normalizing host values.
    #[serde(default)]
    pub normalization: NormalizationLimits,

    /// Limits applied when a selection tree is built.
    #[serde(default)]
    pub selection: SelectionLimits,
}

/// Limits applied while normalizing host values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct NormalizationLimits {
    /// Deepest nesting of wrappers and containers before normalization gives up.
    /// Self-referential input is reported once this depth is reached.
    /// default: 512
    #[serde(default = "default_normalization_depth")]
    pub max_depth: usize,
}

/// Limits applied when a selection tree is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SelectionLimits {
    /// Deepest nesting of child selections and casts.
    /// default: 64
    #[serde(default = "default_selection_depth")]
    pub max_depth: usize,
}

fn default_normalization_depth() -> usize {
    crate::normalize::DEFAULT_MAX_DEPTH
}

fn default_selection_depth() -> usize {
    64
}

impl Default for NormalizationLimits {
    fn default() -> Self {
        Self {
            max_depth: default_normalization_depth(),
        }
    }
}

impl Default for SelectionLimits {
    fn default() -> Self {
        Self {
            max_depth: default_selection_depth(),
        }
    }
}

impl Configuration {
    /// Parses and validates a YAML document. An empty document yields the defaults.
    pub fn from_yaml(raw_yaml: &str) -> Result<Self, ConfigurationError> {
        let configuration = if raw_yaml.trim().is_empty() {
            Configuration::default()
        } else {
            serde_yaml::from_str(raw_yaml).map_err(ConfigurationError::DeserializeConfigError)?
        };
        configuration.validate()?;
        Ok(configuration)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.normalization.max_depth == 0 {
            return Err(ConfigurationError::InvalidConfiguration {
                message: "normalization.max_depth",
                error: "must be at least 1".to_string(),
            });
        }
        if self.selection.max_depth == 0 {
            return Err(ConfigurationError::InvalidConfiguration {
                message: "selection.max_depth",
                error: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn normalizer(&self) -> Normalizer {
        Normalizer::new(&self.normalization)
    }

    /// Draft-07 JSON schema of the configuration file.
    pub fn json_schema() -> RootSchema {
        schemars::schema_for!(Configuration)
    }
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;

    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let configuration = Configuration::from_yaml("  \n").unwrap();
        assert_eq!(configuration.normalization.max_depth, 512);
        assert_eq!(configuration.selection.max_depth, 64);
        assert_eq!(configuration.normalizer().max_depth(), 512);
    }

    #[test]
    fn partial_documents_keep_other_defaults() {
        let configuration = Configuration::from_yaml("selection:\n  max_depth: 8\n").unwrap();
        assert_eq!(configuration.selection.max_depth, 8);
        assert_eq!(configuration.normalization, NormalizationLimits::default());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let error = Configuration::from_yaml("selection:\n  depth: 8\n").unwrap_err();
        assert!(matches!(error, ConfigurationError::DeserializeConfigError(_)));
    }

    #[test]
    fn zero_limits_are_rejected() {
        let error = Configuration::from_yaml("normalization:\n  max_depth: 0\n").unwrap_err();
        assert_snapshot!(error.to_string(), @"normalization.max_depth: must be at least 1");
    }

    #[test]
    fn schema_lists_both_sections() {
        let schema = serde_json::to_value(Configuration::json_schema()).unwrap();
        let properties = schema["properties"].as_object().unwrap();
        assert!(properties.contains_key("normalization"));
        assert!(properties.contains_key("selection"));
        assert_eq!(schema["additionalProperties"], serde_json::json!(false));
    }
}
