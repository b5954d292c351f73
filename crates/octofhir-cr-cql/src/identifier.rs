//! Library and model identifiers

use octofhir_cr_fhir::{Canonical, VersionedResource};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Storage-independent address of a CQL library; an absent version means
/// the latest available
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionedIdentifier {
    pub id: String,
    pub version: Option<String>,
    /// Namespace URI
    pub system: Option<String>,
}

impl VersionedIdentifier {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: None,
            system: None,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// `http://example.org/Library/Common|1.0` becomes id `Common`, version
    /// `1.0` and namespace `http://example.org`
    pub fn from_canonical(canonical: &Canonical) -> Self {
        let system = canonical
            .url()
            .rsplit_once("/Library/")
            .map(|(base, _)| base.to_string());
        Self {
            id: canonical.id_part().to_string(),
            version: canonical.version().map(String::from),
            system,
        }
    }

    /// Identifier of a Library resource, from its `name` and `version`
    pub fn from_library(library: &impl VersionedResource) -> Option<Self> {
        let name = library.name()?;
        let mut identifier = Self::new(name);
        identifier.version = library.version().map(String::from);
        if let Some(canonical) = library.url().and_then(|url| Canonical::parse(url).ok()) {
            identifier.system = Self::from_canonical(&canonical).system;
        }
        Some(identifier)
    }
}

impl fmt::Display for VersionedIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}|{}", self.id, version),
            None => f.write_str(&self.id),
        }
    }
}

/// Address of a model info (e.g. `FHIR` version `4.0.1`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelIdentifier {
    pub id: String,
    pub version: Option<String>,
    pub system: Option<String>,
}

impl ModelIdentifier {
    pub fn new(id: impl Into<String>, version: Option<&str>) -> Self {
        Self {
            id: id.into(),
            version: version.map(String::from),
            system: None,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}

impl From<&ModelIdentifier> for VersionedIdentifier {
    fn from(model: &ModelIdentifier) -> Self {
        Self {
            id: model.id.clone(),
            version: model.version.clone(),
            system: model.system.clone(),
        }
    }
}

impl From<ModelIdentifier> for VersionedIdentifier {
    fn from(model: ModelIdentifier) -> Self {
        Self {
            id: model.id,
            version: model.version,
            system: model.system,
        }
    }
}

impl From<VersionedIdentifier> for ModelIdentifier {
    fn from(identifier: VersionedIdentifier) -> Self {
        Self {
            id: identifier.id,
            version: identifier.version,
            system: identifier.system,
        }
    }
}

impl fmt::Display for ModelIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}|{}", self.id, version),
            None => f.write_str(&self.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_from_canonical() {
        let canonical = Canonical::parse("http://example.org/fhir/Library/Common|2.1").unwrap();
        let identifier = VersionedIdentifier::from_canonical(&canonical);
        assert_eq!(identifier.id, "Common");
        assert_eq!(identifier.version.as_deref(), Some("2.1"));
        assert_eq!(identifier.system.as_deref(), Some("http://example.org/fhir"));
        assert_eq!(identifier.to_string(), "Common|2.1");
    }

    #[test]
    fn test_from_library() {
        let library = json!({
            "resourceType": "Library",
            "name": "Screening",
            "url": "http://example.org/Library/Screening"
        });
        let identifier = VersionedIdentifier::from_library(&library).unwrap();
        assert_eq!(identifier.id, "Screening");
        assert_eq!(identifier.version, None);
        assert!(VersionedIdentifier::from_library(&json!({ "resourceType": "Library" })).is_none());
    }

    #[test]
    fn test_model_identifier_round_trip() {
        let model = ModelIdentifier::new("FHIR", Some("4.0.1")).with_system("http://hl7.org/fhir");
        let identifier = VersionedIdentifier::from(&model);
        assert_eq!(identifier.system.as_deref(), Some("http://hl7.org/fhir"));
        assert_eq!(ModelIdentifier::from(identifier), model);
    }
}
