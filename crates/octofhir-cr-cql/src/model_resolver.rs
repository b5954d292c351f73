//! Navigation over JSON resources for one FHIR version

use octofhir_cr_fhir::{
    DispatchError, FhirVersion, Reference, VersionAdapter, adapter_for, resource_type,
};
use serde_json::Value;
use std::sync::Arc;

/// Resolves paths, types and context references on resources of a single
/// FHIR version
#[derive(Debug, Clone)]
pub struct ModelResolver {
    adapter: Arc<dyn VersionAdapter>,
}

impl ModelResolver {
    pub fn new(adapter: Arc<dyn VersionAdapter>) -> Self {
        Self { adapter }
    }

    pub fn for_version(version: FhirVersion) -> Result<Self, DispatchError> {
        adapter_for(version).map(Self::new)
    }

    pub fn fhir_version(&self) -> FhirVersion {
        self.adapter.fhir_version()
    }

    pub fn adapter(&self) -> &Arc<dyn VersionAdapter> {
        &self.adapter
    }

    pub fn model_info_version(&self) -> &'static str {
        self.adapter.model_info_version()
    }

    pub fn resource_type<'a>(&self, resource: &'a Value) -> Option<&'a str> {
        resource_type(resource)
    }

    /// Values at a dotted `path`, with lists flattened.
    ///
    /// A segment naming a choice element (`value`) also matches its typed
    /// forms (`valueQuantity`, `valueCodeableConcept`).
    pub fn resolve_path(&self, target: &Value, path: &str) -> Vec<Value> {
        let mut current: Vec<&Value> = vec![target];
        for segment in path.split('.').filter(|s| !s.is_empty()) {
            current = current
                .into_iter()
                .flat_map(|value| child(value, segment))
                .flat_map(flatten)
                .collect();
        }
        current.into_iter().cloned().collect()
    }

    /// Path from `resource_type` to its context resource
    pub fn context_path(&self, context_type: &str, resource_type: &str) -> Option<&'static str> {
        self.adapter.context_path(context_type, resource_type)
    }

    /// Ids of the `context_type` resources `resource` belongs to
    pub fn context_ids(&self, context_type: &str, resource: &Value) -> Vec<String> {
        let Some(kind) = resource_type(resource) else {
            return Vec::new();
        };
        let Some(path) = self.context_path(context_type, kind) else {
            return Vec::new();
        };
        if kind == context_type {
            return resource
                .get(path)
                .and_then(Value::as_str)
                .map(String::from)
                .into_iter()
                .collect();
        }

        self.resolve_path(resource, path)
            .iter()
            .filter_map(|value| value.get("reference").and_then(Value::as_str))
            .filter_map(|reference| Reference::parse(reference).ok())
            .filter(|reference| reference.resource_type().is_none_or(|t| t == context_type))
            .map(|reference| reference.id().to_string())
            .collect()
    }
}

fn child<'a>(value: &'a Value, segment: &str) -> Option<&'a Value> {
    let object = value.as_object()?;
    if let Some(found) = object.get(segment) {
        return Some(found);
    }
    object.iter().find_map(|(key, found)| {
        key.strip_prefix(segment)
            .filter(|rest| rest.chars().next().is_some_and(|c| c.is_ascii_uppercase()))
            .map(|_| found)
    })
}

fn flatten(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    }
}
