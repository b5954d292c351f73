//! The data provider triple handed to the engine

use crate::model_resolver::ModelResolver;
use crate::retrieve::DynRetrieveProvider;
use crate::terminology::DynTerminologyProvider;
use octofhir_cr_diagnostics::{CR0004, CrError};
use octofhir_cr_fhir::FhirVersion;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataProviderError {
    #[error("{component} serves FHIR {found} but the model resolver is FHIR {expected}")]
    MismatchedVersions {
        component: &'static str,
        expected: FhirVersion,
        found: FhirVersion,
    },
}

impl From<DataProviderError> for CrError {
    fn from(err: DataProviderError) -> Self {
        CrError::precondition(CR0004, err.to_string())
    }
}

/// Model resolver, retrieve provider and terminology provider for one FHIR
/// version
#[derive(Clone)]
pub struct DataProvider {
    model_resolver: ModelResolver,
    retrieve: DynRetrieveProvider,
    terminology: DynTerminologyProvider,
}

impl DataProvider {
    /// Fails unless all three parts serve the same FHIR version
    pub fn new(
        model_resolver: ModelResolver,
        retrieve: DynRetrieveProvider,
        terminology: DynTerminologyProvider,
    ) -> Result<Self, DataProviderError> {
        let expected = model_resolver.fhir_version();
        let parts = [
            ("retrieve provider", retrieve.fhir_version()),
            ("terminology provider", terminology.fhir_version()),
        ];
        if let Some((component, found)) = parts.into_iter().find(|(_, found)| *found != expected) {
            return Err(DataProviderError::MismatchedVersions {
                component,
                expected,
                found,
            });
        }
        Ok(Self {
            model_resolver,
            retrieve,
            terminology,
        })
    }

    pub fn fhir_version(&self) -> FhirVersion {
        self.model_resolver.fhir_version()
    }

    pub fn model_resolver(&self) -> &ModelResolver {
        &self.model_resolver
    }

    pub fn retrieve(&self) -> &DynRetrieveProvider {
        &self.retrieve
    }

    pub fn terminology(&self) -> &DynTerminologyProvider {
        &self.terminology
    }
}

impl std::fmt::Debug for DataProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataProvider")
            .field("fhir_version", &self.fhir_version())
            .finish_non_exhaustive()
    }
}
