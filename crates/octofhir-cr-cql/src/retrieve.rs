//! Retrieve providers
//!
//! Data access for CQL retrieve expressions: resources of one type, scoped
//! to a context (usually a patient) and optionally filtered by codes or by
//! a value set.

use crate::model_resolver::ModelResolver;
use crate::terminology::{Code, DynTerminologyProvider, ValueSetInfo};
use async_trait::async_trait;
use log::debug;
use octofhir_cr_diagnostics::{CR0302, CrError, Result};
use octofhir_cr_fhir::bundle::resources_of_type;
use octofhir_cr_fhir::{DynRepository, FhirVersion, SearchParams, search_all};
use serde_json::Value;
use std::sync::Arc;

const DEFAULT_CODE_PATH: &str = "code";

/// A retrieve: `[Observation: "Blood Pressure"]` in the `Patient` context
#[derive(Debug, Clone, PartialEq)]
pub struct RetrieveRequest {
    pub data_type: String,
    pub context_type: Option<String>,
    pub context_value: Option<String>,
    pub template_id: Option<String>,
    pub code_path: Option<String>,
    pub codes: Option<Vec<Code>>,
    pub value_set: Option<ValueSetInfo>,
}

impl RetrieveRequest {
    pub fn new(data_type: impl Into<String>) -> Self {
        Self {
            data_type: data_type.into(),
            context_type: None,
            context_value: None,
            template_id: None,
            code_path: None,
            codes: None,
            value_set: None,
        }
    }

    pub fn in_context(mut self, context_type: impl Into<String>, context_value: impl Into<String>) -> Self {
        self.context_type = Some(context_type.into());
        self.context_value = Some(context_value.into());
        self
    }

    pub fn with_codes(mut self, code_path: Option<&str>, codes: Vec<Code>) -> Self {
        self.code_path = code_path.map(String::from);
        self.codes = Some(codes);
        self
    }

    pub fn with_value_set(mut self, code_path: Option<&str>, value_set: ValueSetInfo) -> Self {
        self.code_path = code_path.map(String::from);
        self.value_set = Some(value_set);
        self
    }

    fn code_path(&self) -> &str {
        self.code_path.as_deref().unwrap_or(DEFAULT_CODE_PATH)
    }
}

#[async_trait]
pub trait RetrieveProvider: Send + Sync {
    fn fhir_version(&self) -> FhirVersion;

    async fn retrieve(&self, request: &RetrieveRequest) -> Result<Vec<Value>>;
}

pub type DynRetrieveProvider = Arc<dyn RetrieveProvider>;

/// Context and terminology filtering shared by the providers
struct RetrieveFilter<'a> {
    resolver: &'a ModelResolver,
    request: &'a RetrieveRequest,
    value_set_codes: Option<Vec<Code>>,
}

impl<'a> RetrieveFilter<'a> {
    async fn new(
        resolver: &'a ModelResolver,
        terminology: Option<&DynTerminologyProvider>,
        request: &'a RetrieveRequest,
    ) -> Result<Self> {
        let value_set_codes = match &request.value_set {
            Some(value_set) => {
                let terminology = terminology.ok_or_else(|| {
                    CrError::evaluation(
                        CR0302,
                        format!("retrieve of {} filters by ValueSet {} but no terminology is configured", request.data_type, value_set.id),
                    )
                })?;
                Some(terminology.expand(value_set).await?)
            }
            None => None,
        };
        Ok(Self {
            resolver,
            request,
            value_set_codes,
        })
    }

    fn accepts(&self, resource: &Value) -> bool {
        self.in_context(resource) && self.has_codes(resource)
    }

    fn in_context(&self, resource: &Value) -> bool {
        let (Some(context_type), Some(context_value)) = (&self.request.context_type, &self.request.context_value) else {
            return true;
        };
        let Some(kind) = self.resolver.resource_type(resource) else {
            return false;
        };
        // Types outside the context compartment are shared across contexts
        if kind != context_type.as_str() && self.resolver.context_path(context_type, kind).is_none() {
            return true;
        }
        self.resolver
            .context_ids(context_type, resource)
            .iter()
            .any(|id| id == context_value)
    }

    fn has_codes(&self, resource: &Value) -> bool {
        let wanted: Option<&[Code]> = self
            .request
            .codes
            .as_deref()
            .or(self.value_set_codes.as_deref());
        let Some(wanted) = wanted else {
            return true;
        };
        codes_at(self.resolver, resource, self.request.code_path())
            .iter()
            .any(|code| wanted.iter().any(|w| w.code == code.code && (w.system.is_none() || w.system == code.system)))
    }
}

/// Codings found at `path`: CodeableConcepts, Codings or bare codes
fn codes_at(resolver: &ModelResolver, resource: &Value, path: &str) -> Vec<Code> {
    let mut codes = Vec::new();
    for value in resolver.resolve_path(resource, path) {
        match &value {
            Value::String(code) => codes.push(Code {
                code: code.clone(),
                system: None,
                version: None,
                display: None,
            }),
            Value::Object(object) if object.contains_key("coding") => {
                codes.extend(resolver.resolve_path(&value, "coding").iter().filter_map(coding));
            }
            Value::Object(_) => codes.extend(coding(&value)),
            _ => {}
        }
    }
    codes
}

fn coding(value: &Value) -> Option<Code> {
    let field = |key: &str| value.get(key).and_then(Value::as_str).map(String::from);
    Some(Code {
        code: field("code")?,
        system: field("system"),
        version: field("version"),
        display: field("display"),
    })
}

/// Retrieves from the resources carried in a bundle
pub struct BundleRetrieveProvider {
    resources: Vec<Value>,
    resolver: ModelResolver,
    terminology: Option<DynTerminologyProvider>,
}

impl BundleRetrieveProvider {
    pub fn new(bundle: &Value, resolver: ModelResolver) -> Self {
        Self {
            resources: octofhir_cr_fhir::bundle::entry_resources(bundle).cloned().collect(),
            resolver,
            terminology: None,
        }
    }

    pub fn with_terminology(mut self, terminology: DynTerminologyProvider) -> Self {
        self.terminology = Some(terminology);
        self
    }
}

#[async_trait]
impl RetrieveProvider for BundleRetrieveProvider {
    fn fhir_version(&self) -> FhirVersion {
        self.resolver.fhir_version()
    }

    async fn retrieve(&self, request: &RetrieveRequest) -> Result<Vec<Value>> {
        let filter = RetrieveFilter::new(&self.resolver, self.terminology.as_ref(), request).await?;
        let collection = octofhir_cr_fhir::bundle::collection(self.resources.iter().cloned());
        Ok(resources_of_type(&collection, &request.data_type)
            .filter(|resource| filter.accepts(resource))
            .cloned()
            .collect())
    }
}

/// Retrieves by searching a repository, following every result page
pub struct RepositoryRetrieveProvider {
    repository: DynRepository,
    resolver: ModelResolver,
    terminology: Option<DynTerminologyProvider>,
    page_size: Option<usize>,
}

impl RepositoryRetrieveProvider {
    pub fn new(repository: DynRepository, resolver: ModelResolver) -> Self {
        Self {
            repository,
            resolver,
            terminology: None,
            page_size: None,
        }
    }

    pub fn with_terminology(mut self, terminology: DynTerminologyProvider) -> Self {
        self.terminology = Some(terminology);
        self
    }

    pub fn with_page_size(mut self, page_size: Option<usize>) -> Self {
        self.page_size = page_size;
        self
    }

    fn search_params(&self, request: &RetrieveRequest) -> SearchParams {
        let mut params = SearchParams::new();
        if let (Some(context_type), Some(context_value)) = (&request.context_type, &request.context_value) {
            if request.data_type == *context_type {
                params = params.with_param("_id", context_value.clone());
            } else if let Some(path) = self.resolver.context_path(context_type, &request.data_type) {
                params = params.with_param(path, format!("{context_type}/{context_value}"));
            }
        }
        if let Some(profile) = &request.template_id {
            params = params.with_param("_profile", profile.clone());
        }
        if let Some(count) = self.page_size {
            params = params.with_count(count);
        }
        params
    }
}

#[async_trait]
impl RetrieveProvider for RepositoryRetrieveProvider {
    fn fhir_version(&self) -> FhirVersion {
        self.resolver.fhir_version()
    }

    async fn retrieve(&self, request: &RetrieveRequest) -> Result<Vec<Value>> {
        let filter = RetrieveFilter::new(&self.resolver, self.terminology.as_ref(), request).await?;
        let params = self.search_params(request);
        let found = search_all(self.repository.as_ref(), &request.data_type, &params).await?;
        let total = found.len();
        let accepted: Vec<Value> = found.into_iter().filter(|r| filter.accepts(r)).collect();
        debug!(
            "retrieve {} kept {} of {} searched resources",
            request.data_type,
            accepted.len(),
            total
        );
        Ok(accepted)
    }
}
