//! Canonical URLs and resource references

use octofhir_cr_diagnostics::{CR0005, CR0006, CrError};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CanonicalError {
    #[error("empty canonical URL")]
    EmptyCanonical,

    #[error("invalid reference '{0}'")]
    InvalidReference(String),
}

impl From<CanonicalError> for CrError {
    fn from(err: CanonicalError) -> Self {
        match &err {
            CanonicalError::EmptyCanonical => CrError::precondition(CR0006, err.to_string()),
            CanonicalError::InvalidReference(_) => CrError::precondition(CR0005, err.to_string()),
        }
    }
}

/// Canonical with optional version using `url|version` syntax
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Canonical {
    url: String,
    version: Option<String>,
}

impl Canonical {
    pub fn parse(input: &str) -> Result<Self, CanonicalError> {
        let input = input.trim();
        let (url, version) = match input.split_once('|') {
            Some((url, version)) => (url.trim(), Some(version.trim()).filter(|v| !v.is_empty())),
            None => (input, None),
        };
        if url.is_empty() {
            return Err(CanonicalError::EmptyCanonical);
        }
        Ok(Self {
            url: url.to_string(),
            version: version.map(String::from),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Last path segment, e.g. `FHIRHelpers` for
    /// `http://hl7.org/fhir/Library/FHIRHelpers`
    pub fn id_part(&self) -> &str {
        let path = self.url.split(['#', '?']).next().unwrap_or(&self.url);
        path.trim_end_matches('/').rsplit('/').next().unwrap_or(path)
    }

    /// Resource type segment preceding the id, when the URL follows the
    /// RESTful `[base]/[type]/[id]` shape
    pub fn resource_type(&self) -> Option<&str> {
        let path = self.url.split(['#', '?']).next().unwrap_or(&self.url);
        let mut segments = path.trim_end_matches('/').rsplit('/');
        segments.next()?;
        segments
            .next()
            .filter(|s| s.chars().next().is_some_and(|c| c.is_ascii_uppercase()))
    }
}

impl fmt::Display for Canonical {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}|{}", self.url, version),
            None => f.write_str(&self.url),
        }
    }
}

/// Reference to a resource by type and id
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    resource_type: Option<String>,
    id: String,
}

impl Reference {
    /// Parse `Type/id`, `id`, absolute `[base]/Type/id` or
    /// `Type/id/_history/n` references
    pub fn parse(input: &str) -> Result<Self, CanonicalError> {
        let trimmed = input.trim().trim_end_matches('/');
        let without_history = match trimmed.find("/_history/") {
            Some(index) => &trimmed[..index],
            None => trimmed,
        };
        let mut segments = without_history.rsplit('/');
        let id = segments
            .next()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| CanonicalError::InvalidReference(input.to_string()))?;
        let resource_type = segments
            .next()
            .filter(|s| s.chars().next().is_some_and(|c| c.is_ascii_uppercase()))
            .map(String::from);

        Ok(Self {
            resource_type,
            id: id.to_string(),
        })
    }

    pub fn new(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            resource_type: Some(resource_type.into()),
            id: id.into(),
        }
    }

    /// Fill in the type for bare ids
    pub fn with_default_type(mut self, resource_type: &str) -> Self {
        if self.resource_type.is_none() {
            self.resource_type = Some(resource_type.to_string());
        }
        self
    }

    pub fn resource_type(&self) -> Option<&str> {
        self.resource_type.as_deref()
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.resource_type {
            Some(resource_type) => write!(f, "{}/{}", resource_type, self.id),
            None => f.write_str(&self.id),
        }
    }
}
