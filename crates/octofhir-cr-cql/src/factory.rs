//! Version-dispatched provider construction
//!
//! Every builder looks up the adapter for the FHIR version of its source
//! first, so an unsupported release fails the same way for every kind of
//! provider, before anything is built.

use crate::data_provider::DataProvider;
use crate::model_info::{BundleModelInfoProvider, ModelInfoProvider, RepositoryModelInfoProvider};
use crate::model_resolver::ModelResolver;
use crate::retrieve::{BundleRetrieveProvider, RepositoryRetrieveProvider};
use crate::settings::EvaluationSettings;
use crate::source::{BundleLibrarySourceProvider, DynLibrarySourceProvider, RepositoryLibrarySourceProvider};
use crate::terminology::{BundleTerminologyProvider, DynTerminologyProvider, RepositoryTerminologyProvider};
use log::debug;
use octofhir_cr_diagnostics::Result;
use octofhir_cr_fhir::{DynRepository, FhirVersion, adapter_for};
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct ProviderFactory {
    settings: EvaluationSettings,
}

impl ProviderFactory {
    pub fn new(settings: EvaluationSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &EvaluationSettings {
        &self.settings
    }

    pub fn terminology_for_repository(&self, repository: DynRepository) -> Result<DynTerminologyProvider> {
        adapter_for(repository.fhir_version())?;
        Ok(Arc::new(
            RepositoryTerminologyProvider::new(repository).with_page_size(self.settings.search_page_size),
        ))
    }

    pub fn terminology_for_bundle(&self, bundle: &Value, version: FhirVersion) -> Result<DynTerminologyProvider> {
        adapter_for(version)?;
        Ok(Arc::new(BundleTerminologyProvider::new(bundle, version)))
    }

    pub fn library_source_for_repository(&self, repository: DynRepository) -> Result<DynLibrarySourceProvider> {
        adapter_for(repository.fhir_version())?;
        Ok(Arc::new(
            RepositoryLibrarySourceProvider::new(repository, self.settings.selector())
                .with_page_size(self.settings.search_page_size),
        ))
    }

    pub fn library_source_for_bundle(&self, bundle: &Value, version: FhirVersion) -> Result<DynLibrarySourceProvider> {
        adapter_for(version)?;
        Ok(Arc::new(BundleLibrarySourceProvider::new(bundle, self.settings.selector())))
    }

    /// Retrieves through `repository`; value set filters go to
    /// `terminology`, or to the repository's own ValueSets when absent
    pub fn data_provider_for_repository(
        &self,
        repository: DynRepository,
        terminology: Option<DynTerminologyProvider>,
    ) -> Result<DataProvider> {
        let resolver = ModelResolver::new(adapter_for(repository.fhir_version())?);
        let terminology = match terminology {
            Some(terminology) => terminology,
            None => self.terminology_for_repository(repository.clone())?,
        };
        let retrieve = RepositoryRetrieveProvider::new(repository, resolver.clone())
            .with_terminology(terminology.clone())
            .with_page_size(self.settings.search_page_size);
        debug!("built repository data provider for FHIR {}", resolver.fhir_version());
        Ok(DataProvider::new(resolver, Arc::new(retrieve), terminology)?)
    }

    pub fn data_provider_for_bundle(
        &self,
        bundle: &Value,
        version: FhirVersion,
        terminology: Option<DynTerminologyProvider>,
    ) -> Result<DataProvider> {
        let resolver = ModelResolver::new(adapter_for(version)?);
        let terminology = match terminology {
            Some(terminology) => terminology,
            None => self.terminology_for_bundle(bundle, version)?,
        };
        let retrieve = BundleRetrieveProvider::new(bundle, resolver.clone()).with_terminology(terminology.clone());
        Ok(DataProvider::new(resolver, Arc::new(retrieve), terminology)?)
    }

    pub fn model_info_for_repository(&self, repository: DynRepository) -> Result<Arc<dyn ModelInfoProvider>> {
        adapter_for(repository.fhir_version())?;
        Ok(Arc::new(
            RepositoryModelInfoProvider::new(repository, self.settings.selector())
                .with_page_size(self.settings.search_page_size),
        ))
    }

    pub fn model_info_for_bundle(&self, bundle: &Value, version: FhirVersion) -> Result<Arc<dyn ModelInfoProvider>> {
        adapter_for(version)?;
        Ok(Arc::new(BundleModelInfoProvider::new(bundle, self.settings.selector())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use octofhir_cr_diagnostics::{CR0004, CR0400};
    use octofhir_cr_fhir::bundle::collection;
    use rstest::rstest;

    #[rstest]
    #[case(FhirVersion::Dstu2)]
    #[case(FhirVersion::Dstu2Hl7Org)]
    #[case(FhirVersion::Dstu2_1)]
    fn test_unsupported_versions_fail_for_every_builder(#[case] version: FhirVersion) {
        let factory = ProviderFactory::default();
        let bundle = collection(Vec::new());
        let codes = [
            factory.terminology_for_bundle(&bundle, version).err().map(|e| e.code()),
            factory.library_source_for_bundle(&bundle, version).err().map(|e| e.code()),
            factory.data_provider_for_bundle(&bundle, version, None).err().map(|e| e.code()),
            factory.model_info_for_bundle(&bundle, version).err().map(|e| e.code()),
        ];
        assert!(codes.iter().all(|code| *code == Some(CR0400)), "{codes:?}");
    }

    #[rstest]
    #[case(FhirVersion::Dstu3)]
    #[case(FhirVersion::R4)]
    #[case(FhirVersion::R4B)]
    #[case(FhirVersion::R5)]
    fn test_supported_versions(#[case] version: FhirVersion) {
        let factory = ProviderFactory::default();
        let bundle = collection(Vec::new());
        let provider = factory.data_provider_for_bundle(&bundle, version, None).unwrap();
        assert_eq!(provider.fhir_version(), version);
    }

    #[test]
    fn test_foreign_terminology_version_rejected() {
        let factory = ProviderFactory::default();
        let bundle = collection(Vec::new());
        let r5_terminology = factory.terminology_for_bundle(&bundle, FhirVersion::R5).unwrap();
        let err = factory
            .data_provider_for_bundle(&bundle, FhirVersion::R4, Some(r5_terminology))
            .unwrap_err();
        assert_eq!(err.code(), CR0004);
    }
}
