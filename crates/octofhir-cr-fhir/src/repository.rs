//! Repository abstraction
//!
//! A [`Repository`] is any store of FHIR resources for one FHIR version: a
//! remote server, an in-memory bundle, a database. Resolution code only ever
//! reads, searches and follows page links; the rest of the REST surface has
//! default implementations that report the operation as unsupported.

use crate::bundle;
use crate::version::FhirVersion;
use async_trait::async_trait;
use indexmap::IndexMap;
use log::{debug, warn};
use octofhir_cr_diagnostics::{CR0001, CR0104, CR0402, CR0502, CrError};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

/// Repository error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("{resource_type}/{id} not found")]
    NotFound { resource_type: String, id: String },

    #[error("operation '{operation}' is not supported by this repository")]
    Unsupported { operation: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("repository failure: {0}")]
    Backend(String),
}

impl RepositoryError {
    pub fn not_found(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource_type: resource_type.into(),
            id: id.into(),
        }
    }

    pub fn unsupported(operation: impl Into<String>) -> Self {
        Self::Unsupported {
            operation: operation.into(),
        }
    }
}

impl From<RepositoryError> for CrError {
    fn from(err: RepositoryError) -> Self {
        match &err {
            RepositoryError::NotFound { .. } => CrError::resolution(CR0104, err.to_string()),
            RepositoryError::Unsupported { .. } => CrError::unsupported(CR0402, err.to_string()),
            RepositoryError::InvalidRequest(_) => CrError::precondition(CR0001, err.to_string()),
            RepositoryError::Backend(_) => CrError::system(CR0502, err.to_string()),
        }
    }
}

/// Search parameters, kept in insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchParams {
    params: IndexMap<String, Vec<String>>,
}

impl SearchParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value; repeated names accumulate (AND semantics)
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.entry(name.into()).or_default().push(value.into());
        self
    }

    pub fn with_count(self, count: usize) -> Self {
        self.with_param("_count", count.to_string())
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.params.get(name).map(Vec::as_slice)
    }

    /// First value of `name`
    pub fn first(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|values| values.first()).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

/// Store of FHIR resources for a single FHIR version
#[async_trait]
pub trait Repository: Send + Sync {
    fn fhir_version(&self) -> FhirVersion;

    async fn read(&self, resource_type: &str, id: &str) -> Result<Value, RepositoryError>;

    /// One page of results as a `searchset` Bundle
    async fn search(&self, resource_type: &str, params: &SearchParams) -> Result<Value, RepositoryError>;

    /// Fetch the page a `next` link points to
    async fn link(&self, url: &str) -> Result<Value, RepositoryError>;

    async fn create(&self, _resource: Value) -> Result<Value, RepositoryError> {
        Err(RepositoryError::unsupported("create"))
    }

    async fn update(&self, _resource: Value) -> Result<Value, RepositoryError> {
        Err(RepositoryError::unsupported("update"))
    }

    async fn patch(&self, _resource_type: &str, _id: &str, _patch: Value) -> Result<Value, RepositoryError> {
        Err(RepositoryError::unsupported("patch"))
    }

    async fn delete(&self, _resource_type: &str, _id: &str) -> Result<(), RepositoryError> {
        Err(RepositoryError::unsupported("delete"))
    }

    async fn transaction(&self, _bundle: Value) -> Result<Value, RepositoryError> {
        Err(RepositoryError::unsupported("transaction"))
    }

    async fn invoke(
        &self,
        _resource_type: Option<&str>,
        _operation: &str,
        _parameters: Value,
    ) -> Result<Value, RepositoryError> {
        Err(RepositoryError::unsupported("invoke"))
    }

    async fn capabilities(&self) -> Result<Value, RepositoryError> {
        Err(RepositoryError::unsupported("capabilities"))
    }

    async fn history(&self, _resource_type: &str, _id: &str) -> Result<Value, RepositoryError> {
        Err(RepositoryError::unsupported("history"))
    }
}

pub type DynRepository = Arc<dyn Repository>;

/// Run a search and follow `next` links until the result set is exhausted
pub async fn search_all(
    repository: &dyn Repository,
    resource_type: &str,
    params: &SearchParams,
) -> Result<Vec<Value>, RepositoryError> {
    let mut page = repository.search(resource_type, params).await?;
    let mut resources = Vec::new();
    let mut visited = HashSet::new();
    let mut pages = 1usize;

    loop {
        resources.extend(bundle::entry_resources(&page).cloned());
        let Some(next) = bundle::next_link(&page).map(String::from) else {
            break;
        };
        if !visited.insert(next.clone()) {
            warn!("search for {} revisited page link '{}', stopping", resource_type, next);
            break;
        }
        page = repository.link(&next).await?;
        pages += 1;
    }

    debug!(
        "search for {} returned {} resources across {} pages",
        resource_type,
        resources.len(),
        pages
    );
    Ok(resources)
}

/// Read a resource, mapping not-found to `None`
pub async fn read_optional(
    repository: &dyn Repository,
    resource_type: &str,
    id: &str,
) -> Result<Option<Value>, RepositoryError> {
    match repository.read(resource_type, id).await {
        Ok(resource) => Ok(Some(resource)),
        Err(RepositoryError::NotFound { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}
