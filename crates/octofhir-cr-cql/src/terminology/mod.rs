//! Terminology providers
//!
//! Value set membership, expansion and code lookup over ValueSet
//! resources. Expansion prefers a pre-computed `expansion` and otherwise
//! derives codes from a `compose` made only of plain concept lists; any
//! other compose logic is rejected instead of producing a partial list.

mod bundle;
mod priority;
mod repository;
pub mod valueset;

pub use bundle::BundleTerminologyProvider;
pub use priority::PriorityTerminologyProvider;
pub use repository::RepositoryTerminologyProvider;

use async_trait::async_trait;
use octofhir_cr_diagnostics::{CR0004, CR0200, CR0201, CR0203, CrError, Result};
use octofhir_cr_fhir::{FhirVersion, RepositoryError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// A coded value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Code {
    pub code: String,
    pub system: Option<String>,
    pub version: Option<String>,
    pub display: Option<String>,
}

impl Code {
    pub fn new(system: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            system: Some(system.into()),
            version: None,
            display: None,
        }
    }

    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display = Some(display.into());
        self
    }

    /// Same code in the same system
    pub fn matches(&self, other: &Code) -> bool {
        self.code == other.code && self.system == other.system
    }
}

/// Value set reference: canonical url, `urn:oid:` identifier or id
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValueSetInfo {
    pub id: String,
    pub version: Option<String>,
    pub code_systems: Vec<CodeSystemInfo>,
}

impl ValueSetInfo {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: None,
            code_systems: Vec::new(),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CodeSystemInfo {
    pub id: String,
    pub version: Option<String>,
}

impl CodeSystemInfo {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TerminologyError {
    #[error("ValueSet {id} not found")]
    ValueSetNotFound { id: String },

    #[error("ValueSet {id} cannot be expanded locally: {reason}")]
    UnsupportedCompose { id: String, reason: String },

    #[error("priority terminology provider requires at least one delegate")]
    NoDelegates,

    #[error("terminology delegate for FHIR {found} mixed with FHIR {expected}")]
    MismatchedVersions { expected: FhirVersion, found: FhirVersion },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<TerminologyError> for CrError {
    fn from(err: TerminologyError) -> Self {
        let message = err.to_string();
        match err {
            TerminologyError::ValueSetNotFound { .. } => CrError::terminology(CR0200, message),
            TerminologyError::UnsupportedCompose { .. } => CrError::terminology(CR0201, message),
            TerminologyError::NoDelegates => CrError::precondition(CR0203, message),
            TerminologyError::MismatchedVersions { .. } => CrError::precondition(CR0004, message),
            TerminologyError::Repository(e) => e.into(),
        }
    }
}

#[async_trait]
pub trait TerminologyProvider: Send + Sync {
    fn fhir_version(&self) -> FhirVersion;

    /// Membership of `code` (code and system equality) in the expansion of
    /// `value_set`
    async fn in_value_set(&self, code: &Code, value_set: &ValueSetInfo) -> Result<bool>;

    async fn expand(&self, value_set: &ValueSetInfo) -> Result<Vec<Code>>;

    /// `code` itself when it belongs to `code_system`; no CodeSystem
    /// resource is consulted
    async fn lookup(&self, code: &Code, code_system: &CodeSystemInfo) -> Result<Option<Code>>;
}

pub type DynTerminologyProvider = Arc<dyn TerminologyProvider>;

/// Membership scan shared by the providers; always goes through `expand`
pub(crate) async fn in_expansion<P>(provider: &P, code: &Code, value_set: &ValueSetInfo) -> Result<bool>
where
    P: TerminologyProvider + ?Sized,
{
    let codes = provider.expand(value_set).await?;
    Ok(codes.iter().any(|c| c.matches(code)))
}

pub(crate) fn lookup_in_system(code: &Code, code_system: &CodeSystemInfo) -> Option<Code> {
    let same_system = code.system.as_deref() == Some(code_system.id.as_str());
    let same_version = code_system
        .version
        .as_deref()
        .is_none_or(|version| code.version.as_deref() == Some(version));
    (same_system && same_version).then(|| code.clone())
}
