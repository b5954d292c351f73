use super::valueset::{ValueSetAddress, expand_value_set, select_value_set};
use super::{Code, CodeSystemInfo, TerminologyProvider, ValueSetInfo, in_expansion, lookup_in_system};
use async_trait::async_trait;
use log::debug;
use octofhir_cr_diagnostics::Result;
use octofhir_cr_fhir::{DynRepository, FhirVersion, SearchParams, read_optional, search_all};
use serde_json::Value;

/// Terminology over the ValueSet resources of a repository
pub struct RepositoryTerminologyProvider {
    repository: DynRepository,
    page_size: Option<usize>,
}

impl RepositoryTerminologyProvider {
    pub fn new(repository: DynRepository) -> Self {
        Self {
            repository,
            page_size: None,
        }
    }

    pub fn with_page_size(mut self, page_size: Option<usize>) -> Self {
        self.page_size = page_size;
        self
    }

    async fn candidates(&self, info: &ValueSetInfo) -> Result<Vec<Value>> {
        let params = match ValueSetAddress::of(info) {
            ValueSetAddress::Id(id) => {
                let found = read_optional(self.repository.as_ref(), "ValueSet", id).await?;
                return Ok(found.into_iter().collect());
            }
            ValueSetAddress::Url(url) => SearchParams::new().with_param("url", url),
            ValueSetAddress::Identifier(oid) => SearchParams::new().with_param("identifier", oid),
        };
        let params = match self.page_size {
            Some(count) => params.with_count(count),
            None => params,
        };
        Ok(search_all(self.repository.as_ref(), "ValueSet", &params).await?)
    }
}

#[async_trait]
impl TerminologyProvider for RepositoryTerminologyProvider {
    fn fhir_version(&self) -> FhirVersion {
        self.repository.fhir_version()
    }

    async fn in_value_set(&self, code: &Code, value_set: &ValueSetInfo) -> Result<bool> {
        in_expansion(self, code, value_set).await
    }

    async fn expand(&self, value_set: &ValueSetInfo) -> Result<Vec<Code>> {
        let candidates = self.candidates(value_set).await?;
        let selected = select_value_set(value_set, &candidates)?;
        let codes = expand_value_set(selected)?;
        debug!("expanded ValueSet {} to {} codes", value_set.id, codes.len());
        Ok(codes)
    }

    async fn lookup(&self, code: &Code, code_system: &CodeSystemInfo) -> Result<Option<Code>> {
        Ok(lookup_in_system(code, code_system))
    }
}
