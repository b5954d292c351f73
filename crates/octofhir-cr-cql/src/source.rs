//! Library source providers
//!
//! A provider turns a [`VersionedIdentifier`] into the selected Library
//! resource and its content. Absence is reported as `Ok(None)` so that a
//! library manager can fall through to its next provider; only failures of
//! the underlying store, corrupt content or a configured version-miss
//! failure are errors.

use crate::content::{LibraryContentType, get_content};
use crate::identifier::VersionedIdentifier;
use crate::selector::LibraryVersionSelector;
use async_trait::async_trait;
use log::debug;
use octofhir_cr_diagnostics::Result;
use octofhir_cr_fhir::bundle::resources_of_type;
use octofhir_cr_fhir::{DynRepository, FhirVersion, SearchParams, search_all};
use serde_json::Value;
use std::sync::Arc;

#[async_trait]
pub trait LibrarySourceProvider: Send + Sync {
    /// The Library resource selected for `identifier`
    async fn library(&self, identifier: &VersionedIdentifier) -> Result<Option<Value>>;

    /// Content of the selected library in the given representation
    async fn library_content(
        &self,
        identifier: &VersionedIdentifier,
        content_type: LibraryContentType,
    ) -> Result<Option<Vec<u8>>> {
        match self.library(identifier).await? {
            Some(library) => Ok(get_content(&library, content_type)?),
            None => Ok(None),
        }
    }
}

pub type DynLibrarySourceProvider = Arc<dyn LibrarySourceProvider>;

/// Searches a repository for Library resources by name, following every
/// result page before selecting
pub struct RepositoryLibrarySourceProvider {
    repository: DynRepository,
    selector: LibraryVersionSelector,
    page_size: Option<usize>,
}

impl RepositoryLibrarySourceProvider {
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

    pub fn fhir_version(&self) -> FhirVersion {
        self.repository.fhir_version()
    }
}

#[async_trait]
impl LibrarySourceProvider for RepositoryLibrarySourceProvider {
    async fn library(&self, identifier: &VersionedIdentifier) -> Result<Option<Value>> {
        let mut params = SearchParams::new().with_param("name", identifier.id.clone());
        if let Some(count) = self.page_size {
            params = params.with_count(count);
        }

        let candidates = search_all(self.repository.as_ref(), "Library", &params).await?;
        if candidates.is_empty() {
            debug!("repository has no Library named {}", identifier.id);
            return Ok(None);
        }
        Ok(self.selector.select(identifier, &candidates)?.cloned())
    }
}

/// Libraries held in memory: the Library entries of a bundle, or
/// individual inline resources
pub struct BundleLibrarySourceProvider {
    libraries: Vec<Value>,
    selector: LibraryVersionSelector,
}

impl BundleLibrarySourceProvider {
    pub fn new(bundle: &Value, selector: LibraryVersionSelector) -> Self {
        Self::from_libraries(resources_of_type(bundle, "Library").cloned(), selector)
    }

    pub fn from_libraries(libraries: impl IntoIterator<Item = Value>, selector: LibraryVersionSelector) -> Self {
        Self {
            libraries: libraries.into_iter().collect(),
            selector,
        }
    }

    pub fn len(&self) -> usize {
        self.libraries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.libraries.is_empty()
    }
}

#[async_trait]
impl LibrarySourceProvider for BundleLibrarySourceProvider {
    async fn library(&self, identifier: &VersionedIdentifier) -> Result<Option<Value>> {
        Ok(self.selector.select(identifier, &self.libraries)?.cloned())
    }
}
