//! Input parameter resolution
//!
//! Builds the parameter set an evaluation starts with. Entries are appended
//! in a fixed order: the caller's parameters, then `%subject`,
//! `%encounter` and `%practitioner`, then two entries per resolved launch
//! context value (`%name` and `Name`).

use crate::parameters::{ParameterError, ParameterSet, ParameterValue};
use log::debug;
use octofhir_cr_diagnostics::Result;
use octofhir_cr_fhir::bundle::{entry_resources, find_resource};
use octofhir_cr_fhir::{
    DispatchError, DynRepository, LaunchContextDefinition, LaunchContextPolicy, Reference, VersionAdapter,
    adapter_for, read_optional, resource_id, resource_type,
};
use serde_json::Value;
use std::sync::Arc;

/// A value supplied for a named launch context, by reference or inline
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchContextValue {
    pub name: String,
    pub reference: Option<Reference>,
    pub resource: Option<Value>,
}

impl LaunchContextValue {
    pub fn reference(name: impl Into<String>, reference: Reference) -> Self {
        Self {
            name: name.into(),
            reference: Some(reference),
            resource: None,
        }
    }

    pub fn resource(name: impl Into<String>, resource: Value) -> Self {
        Self {
            name: name.into(),
            reference: None,
            resource: Some(resource),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct InputParameterRequest {
    pub subject: Option<String>,
    pub encounter: Option<String>,
    pub practitioner: Option<String>,
    pub parameters: ParameterSet,
    pub use_server_data: bool,
    /// Bundle searched before the repository
    pub data: Option<Value>,
    /// Launch context extensions declared by the artifact
    pub launch_contexts: Vec<Value>,
    pub context_values: Vec<LaunchContextValue>,
}

impl InputParameterRequest {
    pub fn new() -> Self {
        Self {
            use_server_data: true,
            ..Self::default()
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_encounter(mut self, encounter: impl Into<String>) -> Self {
        self.encounter = Some(encounter.into());
        self
    }

    pub fn with_practitioner(mut self, practitioner: impl Into<String>) -> Self {
        self.practitioner = Some(practitioner.into());
        self
    }

    pub fn with_parameters(mut self, parameters: ParameterSet) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_server_data(mut self, use_server_data: bool) -> Self {
        self.use_server_data = use_server_data;
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_launch_context(mut self, extension: Value) -> Self {
        self.launch_contexts.push(extension);
        self
    }

    pub fn with_context_value(mut self, value: LaunchContextValue) -> Self {
        self.context_values.push(value);
        self
    }
}

pub struct InputParameterResolver {
    adapter: Arc<dyn VersionAdapter>,
    repository: Option<DynRepository>,
}

impl InputParameterResolver {
    pub fn new(adapter: Arc<dyn VersionAdapter>) -> Self {
        Self {
            adapter,
            repository: None,
        }
    }

    /// Resolver for the FHIR version the repository serves
    pub fn for_repository(repository: DynRepository) -> std::result::Result<Self, DispatchError> {
        let adapter = adapter_for(repository.fhir_version())?;
        Ok(Self {
            adapter,
            repository: Some(repository),
        })
    }

    pub async fn resolve(&self, request: &InputParameterRequest) -> Result<ParameterSet> {
        let mut parameters = ParameterSet::new();
        parameters.extend_from(&request.parameters);

        let fixed = [
            ("%subject", request.subject.as_deref(), "Patient"),
            ("%encounter", request.encounter.as_deref(), "Encounter"),
            ("%practitioner", request.practitioner.as_deref(), "Practitioner"),
        ];
        for (name, id, default_type) in fixed {
            let Some(id) = id else { continue };
            let reference = Reference::parse(id)?.with_default_type(default_type);
            match self.fetch(&reference, request, true).await? {
                Some(resource) => parameters.push(name, ParameterValue::Resource(resource)),
                None => debug!("{name} {reference} not available, omitting"),
            }
        }

        for extension in &request.launch_contexts {
            self.resolve_launch_context(extension, request, &mut parameters).await?;
        }
        Ok(parameters)
    }

    async fn resolve_launch_context(
        &self,
        extension: &Value,
        request: &InputParameterRequest,
        parameters: &mut ParameterSet,
    ) -> Result<()> {
        let Some(definition) = self.adapter.launch_context(extension) else {
            debug!("ignoring extension that is not a launch context");
            return Ok(());
        };

        let mut resolved = Vec::new();
        for value in request.context_values.iter().filter(|v| v.name == definition.name) {
            if let Some(resource) = self.context_resource(&definition, value, request).await? {
                resolved.push(resource);
            }
        }

        if resolved.is_empty() {
            return match self.adapter.launch_context_policy() {
                LaunchContextPolicy::Skip => {
                    debug!("launch context {} has no resolvable content, skipping", definition.name);
                    Ok(())
                }
                LaunchContextPolicy::Fail => Err(ParameterError::LaunchContextNotResolved {
                    name: definition.name,
                }
                .into()),
            };
        }

        let alias = capitalize(&definition.name);
        for resource in resolved {
            parameters.push(format!("%{}", definition.name), ParameterValue::Resource(resource.clone()));
            parameters.push(alias.clone(), ParameterValue::Resource(resource));
        }
        Ok(())
    }

    async fn context_resource(
        &self,
        definition: &LaunchContextDefinition,
        value: &LaunchContextValue,
        request: &InputParameterRequest,
    ) -> Result<Option<Value>> {
        let accepts = |kind: Option<&str>| {
            definition.types.is_empty() || kind.is_some_and(|k| definition.types.iter().any(|t| t == k))
        };

        if let Some(resource) = &value.resource {
            return Ok(accepts(resource_type(resource)).then(|| resource.clone()));
        }
        let Some(reference) = &value.reference else {
            return Ok(None);
        };
        let reference = match (reference.resource_type(), definition.types.as_slice()) {
            (None, [only]) => reference.clone().with_default_type(only),
            _ => reference.clone(),
        };
        if !accepts(reference.resource_type()) {
            debug!("launch context {} does not accept {reference}", definition.name);
            return Ok(None);
        }
        // a missing resource leaves the decision to the launch context policy
        self.fetch(&reference, request, false).await
    }

    /// The data bundle first, then the repository when server data is
    /// enabled. Repository read failures propagate; not-found only does
    /// when `required`.
    async fn fetch(
        &self,
        reference: &Reference,
        request: &InputParameterRequest,
        required: bool,
    ) -> Result<Option<Value>> {
        if let Some(data) = &request.data {
            let found = match reference.resource_type() {
                Some(kind) => find_resource(data, kind, reference.id()),
                None => entry_resources(data).find(|r| resource_id(r) == Some(reference.id())),
            };
            if let Some(resource) = found {
                return Ok(Some(resource.clone()));
            }
        }

        match (&self.repository, reference.resource_type()) {
            (Some(repository), Some(kind)) if request.use_server_data && required => {
                Ok(Some(repository.read(kind, reference.id()).await?))
            }
            (Some(repository), Some(kind)) if request.use_server_data => {
                Ok(read_optional(repository.as_ref(), kind, reference.id()).await?)
            }
            _ => Ok(None),
        }
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use octofhir_cr_diagnostics::{CR0104, CR0108, ErrorCode};
    use octofhir_cr_fhir::bundle::collection;
    use octofhir_cr_fhir::{FhirVersion, Repository, RepositoryError, SDC_LAUNCH_CONTEXT_URL, SearchParams};
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    struct Resources {
        version: FhirVersion,
        resources: Vec<Value>,
    }

    #[async_trait]
    impl Repository for Resources {
        fn fhir_version(&self) -> FhirVersion {
            self.version
        }

        async fn read(&self, kind: &str, id: &str) -> std::result::Result<Value, RepositoryError> {
            self.resources
                .iter()
                .find(|r| resource_type(r) == Some(kind) && resource_id(r) == Some(id))
                .cloned()
                .ok_or_else(|| RepositoryError::not_found(kind, id))
        }

        async fn search(&self, _kind: &str, _params: &SearchParams) -> std::result::Result<Value, RepositoryError> {
            Err(RepositoryError::unsupported("search"))
        }

        async fn link(&self, _url: &str) -> std::result::Result<Value, RepositoryError> {
            Err(RepositoryError::unsupported("link"))
        }
    }

    fn resolver(version: FhirVersion) -> InputParameterResolver {
        let repository: DynRepository = Arc::new(Resources {
            version,
            resources: vec![
                json!({ "resourceType": "Patient", "id": "p1" }),
                json!({ "resourceType": "Practitioner", "id": "dr1" }),
            ],
        });
        InputParameterResolver::for_repository(repository).unwrap()
    }

    fn launch_context(name: &str, kind: &str) -> Value {
        json!({
            "url": SDC_LAUNCH_CONTEXT_URL,
            "extension": [
                { "url": "name", "valueCoding": { "code": name } },
                { "url": "type", "valueCode": kind }
            ]
        })
    }

    #[tokio::test]
    async fn test_fixed_parameter_order() {
        let request = InputParameterRequest::new()
            .with_subject("p1")
            .with_practitioner("Practitioner/dr1")
            .with_launch_context(launch_context("user", "Practitioner"))
            .with_context_value(LaunchContextValue::reference("user", Reference::parse("dr1").unwrap()));

        let parameters = resolver(FhirVersion::R4).resolve(&request).await.unwrap();
        assert_eq!(parameters.names(), vec!["%subject", "%practitioner", "%user", "User"]);
        assert_eq!(parameters.get("%user"), parameters.get("User"));
    }

    #[tokio::test]
    async fn test_base_parameters_come_first() {
        let base = ParameterSet::new().with("Measurement Period", ParameterValue::string("2024"));
        let request = InputParameterRequest::new().with_parameters(base).with_subject("p1");
        let parameters = resolver(FhirVersion::R4).resolve(&request).await.unwrap();
        assert_eq!(parameters.names(), vec!["Measurement Period", "%subject"]);
    }

    #[tokio::test]
    async fn test_subject_read_failure_propagates() {
        let request = InputParameterRequest::new().with_subject("missing");
        let err = resolver(FhirVersion::R4).resolve(&request).await.unwrap_err();
        assert_eq!(err.code(), CR0104);
    }

    #[tokio::test]
    async fn test_subject_omitted_without_server_data() {
        let request = InputParameterRequest::new()
            .with_subject("missing")
            .with_server_data(false)
            .with_data(collection([json!({ "resourceType": "Encounter", "id": "e1" })]))
            .with_encounter("e1");
        let parameters = resolver(FhirVersion::R4).resolve(&request).await.unwrap();
        assert_eq!(parameters.names(), vec!["%encounter"]);
    }

    #[tokio::test]
    async fn test_unresolved_launch_context_by_version() {
        let request = InputParameterRequest::new()
            .with_launch_context(launch_context("patient", "Patient"))
            .with_context_value(LaunchContextValue::resource(
                "patient",
                json!({ "resourceType": "Group", "id": "g1" }),
            ));

        let skipped = resolver(FhirVersion::R4).resolve(&request).await.unwrap();
        assert!(skipped.is_empty());

        let err = resolver(FhirVersion::R5).resolve(&request).await.unwrap_err();
        assert_eq!(err.code(), CR0108);
    }

    #[rstest]
    #[case::r4_skips(FhirVersion::R4, None)]
    #[case::r5_fails(FhirVersion::R5, Some(CR0108))]
    #[tokio::test]
    async fn test_launch_context_reference_to_missing_resource(
        #[case] version: FhirVersion,
        #[case] expected: Option<ErrorCode>,
    ) {
        let request = InputParameterRequest::new()
            .with_launch_context(launch_context("patient", "Patient"))
            .with_context_value(LaunchContextValue::reference("patient", Reference::parse("Patient/gone").unwrap()));

        match resolver(version).resolve(&request).await {
            Ok(parameters) => {
                assert_eq!(expected, None);
                assert!(parameters.is_empty());
            }
            Err(err) => assert_eq!(Some(err.code()), expected),
        }
    }

    #[tokio::test]
    async fn test_launch_context_missing_reference_keeps_resolved_values() {
        let request = InputParameterRequest::new()
            .with_launch_context(launch_context("patient", "Patient"))
            .with_context_value(LaunchContextValue::reference("patient", Reference::parse("Patient/gone").unwrap()))
            .with_context_value(LaunchContextValue::reference("patient", Reference::parse("p1").unwrap()));

        let parameters = resolver(FhirVersion::R5).resolve(&request).await.unwrap();
        assert_eq!(parameters.names(), vec!["%patient", "Patient"]);
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("patient"), "Patient");
        assert_eq!(capitalize(""), "");
    }
}
