//! ModelInfo providers backed by Library resources

use super::parser::parse;
use super::types::ModelInfo;
use crate::content::{ModelInfoContentType, get_content};
use crate::identifier::{ModelIdentifier, VersionedIdentifier};
use crate::selector::LibraryVersionSelector;
use async_trait::async_trait;
use log::debug;
use octofhir_cr_diagnostics::Result;
use octofhir_cr_fhir::bundle::resources_of_type;
use octofhir_cr_fhir::{DynRepository, SearchParams, search_all};
use serde_json::Value;

/// Resolves model identifiers to parsed model info documents.
///
/// `Ok(None)` lets a chain of providers move on to the next one.
#[async_trait]
pub trait ModelInfoProvider: Send + Sync {
    async fn load(&self, identifier: &ModelIdentifier) -> Result<Option<ModelInfo>>;
}

/// Parse the first model info attachment (XML preferred) of a Library
fn model_info_from_library(library: &Value) -> Result<Option<ModelInfo>> {
    for content_type in ModelInfoContentType::ALL {
        if let Some(content) = get_content(library, content_type)? {
            return Ok(Some(parse(&content, content_type)?));
        }
    }
    Ok(None)
}

fn select_model_info(
    selector: &LibraryVersionSelector,
    identifier: &ModelIdentifier,
    candidates: &[Value],
) -> Result<Option<ModelInfo>> {
    // The namespace only matters for the round trip, not for the lookup
    let library_identifier = VersionedIdentifier::from(identifier);
    match selector.select(&library_identifier, candidates)? {
        Some(library) => model_info_from_library(library),
        None => {
            debug!("no model info library named {}", identifier.id);
            Ok(None)
        }
    }
}

/// Searches a repository for model info Libraries
pub struct RepositoryModelInfoProvider {
    repository: DynRepository,
    selector: LibraryVersionSelector,
    page_size: Option<usize>,
}

impl RepositoryModelInfoProvider {
    pub fn new(repository: DynRepository, selector: LibraryVersionSelector) -> Self {
        Self {
            repository,
            selector,
            page_size: None,
        }
    }

    pub fn with_page_size(mut self, page_size: Option<usize>) -> Self {
        self.page_size = page_size;
        self
    }
}

#[async_trait]
impl ModelInfoProvider for RepositoryModelInfoProvider {
    async fn load(&self, identifier: &ModelIdentifier) -> Result<Option<ModelInfo>> {
        let mut params = SearchParams::new().with_param("name", identifier.id.clone());
        if let Some(count) = self.page_size {
            params = params.with_count(count);
        }
        let candidates = search_all(self.repository.as_ref(), "Library", &params).await?;
        select_model_info(&self.selector, identifier, &candidates)
    }
}

/// Model info Libraries carried in a bundle
pub struct BundleModelInfoProvider {
    libraries: Vec<Value>,
    selector: LibraryVersionSelector,
}

impl BundleModelInfoProvider {
    pub fn new(bundle: &Value, selector: LibraryVersionSelector) -> Self {
        Self {
            libraries: resources_of_type(bundle, "Library").cloned().collect(),
            selector,
        }
    }
}

#[async_trait]
impl ModelInfoProvider for BundleModelInfoProvider {
    async fn load(&self, identifier: &ModelIdentifier) -> Result<Option<ModelInfo>> {
        select_model_info(&self.selector, identifier, &self.libraries)
    }
}
