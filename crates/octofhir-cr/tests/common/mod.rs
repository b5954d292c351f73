//! Shared fakes for processor tests

#![allow(dead_code)]

use async_trait::async_trait;
use octofhir_cr::cql::{
    CompiledLibrary, CqlEngine, EvaluationEnvironment, EvaluationResult, LibraryContentType, LibraryTranslator,
    ParameterSet, TranslatorOptions, VersionedIdentifier,
};
use octofhir_cr::diagnostics::{CR0300, CR0301, CrError, Result};
use octofhir_cr::fhir::bundle::searchset;
use octofhir_cr::fhir::{FhirVersion, Repository, RepositoryError, SearchParams, attachment, resource_id, resource_type};
use parking_lot::{Mutex, RwLock};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Single-page repository matching searches on `name` and `url`
pub struct MemoryRepository {
    version: FhirVersion,
    resources: RwLock<Vec<Value>>,
}

impl MemoryRepository {
    pub fn new(version: FhirVersion, resources: impl IntoIterator<Item = Value>) -> Self {
        Self {
            version,
            resources: RwLock::new(resources.into_iter().collect()),
        }
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    fn fhir_version(&self) -> FhirVersion {
        self.version
    }

    async fn read(&self, kind: &str, id: &str) -> std::result::Result<Value, RepositoryError> {
        self.resources
            .read()
            .iter()
            .find(|r| resource_type(r) == Some(kind) && resource_id(r) == Some(id))
            .cloned()
            .ok_or_else(|| RepositoryError::not_found(kind, id))
    }

    async fn search(&self, kind: &str, params: &SearchParams) -> std::result::Result<Value, RepositoryError> {
        let found: Vec<Value> = self
            .resources
            .read()
            .iter()
            .filter(|r| resource_type(r) == Some(kind))
            .filter(|r| {
                ["name", "url"].iter().all(|field| match params.first(field) {
                    Some(wanted) => r.get(*field).and_then(Value::as_str) == Some(wanted),
                    None => true,
                })
            })
            .cloned()
            .collect();
        Ok(searchset(found, None))
    }

    async fn link(&self, url: &str) -> std::result::Result<Value, RepositoryError> {
        Err(RepositoryError::InvalidRequest(format!("unknown page {url}")))
    }
}

/// Reads `library Name version 'x' include Other define Expr` headers
#[derive(Default)]
pub struct HeaderTranslator {
    translations: AtomicUsize,
}

impl HeaderTranslator {
    pub fn translations(&self) -> usize {
        self.translations.load(Ordering::SeqCst)
    }
}

impl LibraryTranslator for HeaderTranslator {
    fn translate(&self, source: &str, _options: &TranslatorOptions) -> Result<CompiledLibrary> {
        self.translations.fetch_add(1, Ordering::SeqCst);
        let mut library = CompiledLibrary::new(VersionedIdentifier::new("Anonymous"), Value::Null);
        let mut words = source.split_whitespace().map(|w| w.trim_matches('\''));
        while let Some(keyword) = words.next() {
            let Some(argument) = words.next() else {
                return Err(CrError::evaluation(CR0300, format!("dangling keyword {keyword}")));
            };
            match keyword {
                "library" => library.identifier = VersionedIdentifier::new(argument),
                "version" => library.identifier.version = Some(argument.to_string()),
                "include" => library.includes.push(VersionedIdentifier::new(argument)),
                "define" => library.expressions.push(argument.to_string()),
                other => return Err(CrError::evaluation(CR0300, format!("unexpected {other}"))),
            }
        }
        Ok(library)
    }

    fn load_elm(&self, _elm: &[u8], content_type: LibraryContentType) -> Result<CompiledLibrary> {
        Err(CrError::evaluation(CR0300, format!("{content_type} is not supported here")))
    }
}

/// What the engine saw on one call
#[derive(Debug, Clone)]
pub struct EngineCall {
    pub library: String,
    pub parameters: Vec<String>,
    pub subject: Option<String>,
}

/// Answers `Subject` with the `%subject` parameter, `Fails` with an
/// evaluation error and every other expression with `true`
#[derive(Default)]
pub struct FakeEngine {
    calls: Mutex<Vec<EngineCall>>,
}

impl FakeEngine {
    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl CqlEngine for FakeEngine {
    async fn evaluate(
        &self,
        library: &CompiledLibrary,
        expressions: &[String],
        parameters: &ParameterSet,
        environment: &EvaluationEnvironment,
    ) -> Result<EvaluationResult> {
        self.calls.lock().push(EngineCall {
            library: library.identifier.to_string(),
            parameters: parameters.names().into_iter().map(String::from).collect(),
            subject: environment.subject.as_ref().map(ToString::to_string),
        });

        let requested = if expressions.is_empty() { &library.expressions } else { expressions };
        let mut result = EvaluationResult::default();
        for expression in requested {
            let value = match expression.as_str() {
                "Fails" => return Err(CrError::evaluation(CR0301, "division by zero")),
                "Subject" => parameters
                    .get("%subject")
                    .and_then(|p| p.as_resource())
                    .cloned()
                    .unwrap_or(Value::Null),
                _ => Value::Bool(true),
            };
            result.expressions.insert(expression.clone(), value);
        }
        Ok(result)
    }
}

pub fn cql_library(name: &str, version: &str, source: &str) -> Value {
    json!({
        "resourceType": "Library",
        "id": format!("{}-{}", name.to_lowercase(), version.replace('.', "-")),
        "url": format!("http://example.org/fhir/Library/{name}"),
        "name": name,
        "version": version,
        "status": "active",
        "content": [attachment("text/cql", source.as_bytes())]
    })
}

pub fn patient(id: &str) -> Value {
    json!({ "resourceType": "Patient", "id": id, "gender": "female" })
}
