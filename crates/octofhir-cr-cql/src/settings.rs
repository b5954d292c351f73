//! Evaluation settings
//!
//! Settings are plain serde structures read from camelCase JSON. Every
//! field has a default, so an empty document `{}` is a valid configuration.

use crate::content::LibraryContentType;
use crate::selector::{LibraryVersionSelector, VersionMissPolicy};
use octofhir_cr_diagnostics::{CR0403, CrError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings from {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid settings: {0}")]
    Invalid(String),
}

impl From<SettingsError> for CrError {
    fn from(err: SettingsError) -> Self {
        CrError::unsupported(CR0403, err.to_string())
    }
}

/// How strictly the translator checks overload signatures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum SignatureLevel {
    #[default]
    None,
    Differing,
    Overloads,
    All,
}

/// Options passed to the CQL translator.
///
/// Compiled libraries are cached together with the options they were
/// translated with; a request with different options retranslates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TranslatorOptions {
    pub enable_annotations: bool,
    pub enable_locators: bool,
    pub enable_result_types: bool,
    pub disable_list_demotion: bool,
    pub disable_list_promotion: bool,
    pub enable_date_range_optimization: bool,
    pub signature_level: SignatureLevel,
    pub compatibility_level: String,
}

impl Default for TranslatorOptions {
    fn default() -> Self {
        Self {
            enable_annotations: true,
            enable_locators: true,
            enable_result_types: true,
            disable_list_demotion: false,
            disable_list_promotion: false,
            enable_date_range_optimization: false,
            signature_level: SignatureLevel::None,
            compatibility_level: "1.5".to_string(),
        }
    }
}

/// Settings shared by the provider factories, the library manager and the
/// evaluation processor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EvaluationSettings {
    pub translator_options: TranslatorOptions,
    pub version_miss_policy: VersionMissPolicy,
    /// Library content representations, most preferred first
    pub content_preference: Vec<LibraryContentType>,
    /// `_count` sent with repository searches
    pub search_page_size: Option<usize>,
    pub cache_libraries: bool,
}

impl Default for EvaluationSettings {
    fn default() -> Self {
        Self {
            translator_options: TranslatorOptions::default(),
            version_miss_policy: VersionMissPolicy::default(),
            content_preference: vec![
                LibraryContentType::ElmJson,
                LibraryContentType::ElmXml,
                LibraryContentType::Cql,
            ],
            search_page_size: None,
            cache_libraries: true,
        }
    }
}

impl EvaluationSettings {
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.content_preference.is_empty() {
            return Err(SettingsError::Invalid(
                "contentPreference must name at least one content type".to_string(),
            ));
        }
        for (index, content_type) in self.content_preference.iter().enumerate() {
            if self.content_preference[..index].contains(content_type) {
                return Err(SettingsError::Invalid(format!(
                    "contentPreference lists {content_type} more than once"
                )));
            }
        }
        if self.search_page_size == Some(0) {
            return Err(SettingsError::Invalid("searchPageSize must be positive".to_string()));
        }
        Ok(())
    }

    pub fn selector(&self) -> LibraryVersionSelector {
        LibraryVersionSelector::new(self.version_miss_policy)
    }

    pub fn with_translator_options(mut self, options: TranslatorOptions) -> Self {
        self.translator_options = options;
        self
    }

    pub fn with_version_miss_policy(mut self, policy: VersionMissPolicy) -> Self {
        self.version_miss_policy = policy;
        self
    }

    pub fn with_search_page_size(mut self, page_size: usize) -> Self {
        self.search_page_size = Some(page_size);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(EvaluationSettings::from_json("{}").unwrap(), EvaluationSettings::default());
    }

    #[test]
    fn test_camel_case_fields() {
        let settings = EvaluationSettings::from_json(
            r#"{
                "versionMissPolicy": "fail",
                "contentPreference": ["text/cql"],
                "searchPageSize": 50,
                "translatorOptions": { "enableAnnotations": false, "signatureLevel": "Overloads" }
            }"#,
        )
        .unwrap();
        assert_eq!(settings.version_miss_policy, VersionMissPolicy::Fail);
        assert_eq!(settings.content_preference, vec![LibraryContentType::Cql]);
        assert_eq!(settings.search_page_size, Some(50));
        assert!(!settings.translator_options.enable_annotations);
        assert!(settings.translator_options.enable_locators);
        assert_eq!(settings.translator_options.signature_level, SignatureLevel::Overloads);
        assert_eq!(settings.selector().policy(), VersionMissPolicy::Fail);
    }

    #[test]
    fn test_invalid_settings() {
        for json in [
            r#"{ "contentPreference": [] }"#,
            r#"{ "contentPreference": ["text/cql", "text/cql"] }"#,
            r#"{ "searchPageSize": 0 }"#,
        ] {
            let err = EvaluationSettings::from_json(json).unwrap_err();
            assert!(matches!(err, SettingsError::Invalid(_)), "{json}");
            assert_eq!(CrError::from(err).code(), CR0403);
        }
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "cacheLibraries": false }}"#).unwrap();
        let settings = EvaluationSettings::from_file(file.path()).unwrap();
        assert!(!settings.cache_libraries);

        let missing = EvaluationSettings::from_file(file.path().with_extension("missing"));
        assert!(matches!(missing, Err(SettingsError::Io { .. })));
    }
}
