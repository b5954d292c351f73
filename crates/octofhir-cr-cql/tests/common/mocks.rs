//! Mock implementations of repositories, translators and terminology

use async_trait::async_trait;
use octofhir_cr_cql::{
    Code, CodeSystemInfo, CompiledLibrary, LibraryContentType, LibraryTranslator, ModelIdentifier,
    TerminologyProvider, TranslatorOptions, ValueSetInfo, VersionedIdentifier,
};
use octofhir_cr_diagnostics::{CR0202, CR0300, CrError, Result};
use octofhir_cr_fhir::bundle::searchset;
use octofhir_cr_fhir::{FhirVersion, Repository, RepositoryError, SearchParams, resource_id, resource_type};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Resources held in memory, searched by `name`, `url`, `identifier` and
/// `_id`, served in pages of `_count` (or the default page size)
pub struct InMemoryRepository {
    version: FhirVersion,
    resources: RwLock<Vec<Value>>,
    default_page_size: usize,
    pages: RwLock<HashMap<String, Value>>,
    pub searches: AtomicUsize,
    pub links_followed: AtomicUsize,
}

impl InMemoryRepository {
    pub fn new(version: FhirVersion) -> Self {
        Self {
            version,
            resources: RwLock::new(Vec::new()),
            default_page_size: 50,
            pages: RwLock::new(HashMap::new()),
            searches: AtomicUsize::new(0),
            links_followed: AtomicUsize::new(0),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.default_page_size = page_size;
        self
    }

    pub fn with_resources(self, resources: impl IntoIterator<Item = Value>) -> Self {
        self.resources.write().extend(resources);
        self
    }

    pub fn add(&self, resource: Value) {
        self.resources.write().push(resource);
    }

    fn matches(resource: &Value, params: &SearchParams) -> bool {
        params.iter().all(|(name, values)| match name {
            "name" | "url" => values
                .iter()
                .any(|v| resource.get(name).and_then(Value::as_str) == Some(v.as_str())),
            "_id" => values.iter().any(|v| resource_id(resource) == Some(v.as_str())),
            "identifier" => values.iter().any(|v| identifier_values(resource).any(|i| i == v)),
            _ => true,
        })
    }
}

fn identifier_values(resource: &Value) -> impl Iterator<Item = &str> {
    let identifier = resource.get("identifier");
    let many = identifier.and_then(Value::as_array).into_iter().flatten();
    let single = identifier.filter(|i| i.is_object()).into_iter();
    many.chain(single).filter_map(|i| i.get("value").and_then(Value::as_str))
}

#[async_trait]
impl Repository for InMemoryRepository {
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
        let search = self.searches.fetch_add(1, Ordering::SeqCst);
        let page_size = params
            .first("_count")
            .and_then(|c| c.parse().ok())
            .unwrap_or(self.default_page_size)
            .max(1);
        let found: Vec<Value> = self
            .resources
            .read()
            .iter()
            .filter(|r| resource_type(r) == Some(kind) && Self::matches(r, params))
            .cloned()
            .collect();

        let chunks: Vec<Vec<Value>> = found.chunks(page_size).map(<[Value]>::to_vec).collect();
        let page_count = chunks.len();
        let mut first = searchset(Vec::new(), None);
        for (index, chunk) in chunks.into_iter().enumerate() {
            let next = (index + 1 < page_count).then(|| format!("mem://search/{search}/{}", index + 1));
            let page = searchset(chunk, next.as_deref());
            if index == 0 {
                first = page;
            } else {
                self.pages.write().insert(format!("mem://search/{search}/{index}"), page);
            }
        }
        Ok(first)
    }

    async fn link(&self, url: &str) -> std::result::Result<Value, RepositoryError> {
        self.links_followed.fetch_add(1, Ordering::SeqCst);
        self.pages
            .read()
            .get(url)
            .cloned()
            .ok_or_else(|| RepositoryError::InvalidRequest(format!("unknown page {url}")))
    }
}

/// Reads `library Name version 'x' using M include Other` headers
#[derive(Default)]
pub struct HeaderTranslator {
    pub translations: AtomicUsize,
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
                "using" => library.usings.push(ModelIdentifier::new(argument, None)),
                "include" => library.includes.push(VersionedIdentifier::new(argument)),
                "define" => library.expressions.push(argument.to_string()),
                other => return Err(CrError::evaluation(CR0300, format!("unexpected {other}"))),
            }
        }
        Ok(library)
    }

    fn load_elm(&self, elm: &[u8], _content_type: LibraryContentType) -> Result<CompiledLibrary> {
        let elm: Value = serde_json::from_slice(elm).map_err(|e| CrError::evaluation(CR0300, e.to_string()))?;
        let id = elm.pointer("/library/identifier/id").and_then(Value::as_str).unwrap_or("Anonymous");
        Ok(CompiledLibrary::new(VersionedIdentifier::new(id), elm))
    }
}

/// Terminology that answers membership from a script and counts calls
pub struct ScriptedTerminology {
    version: FhirVersion,
    answer: std::result::Result<bool, String>,
    pub calls: AtomicUsize,
}

impl ScriptedTerminology {
    pub fn answering(version: FhirVersion, member: bool) -> Self {
        Self {
            version,
            answer: Ok(member),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(version: FhirVersion, message: &str) -> Self {
        Self {
            version,
            answer: Err(message.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TerminologyProvider for ScriptedTerminology {
    fn fhir_version(&self) -> FhirVersion {
        self.version
    }

    async fn in_value_set(&self, _code: &Code, _value_set: &ValueSetInfo) -> Result<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer
            .clone()
            .map_err(|message| CrError::terminology(CR0202, message))
    }

    async fn expand(&self, _value_set: &ValueSetInfo) -> Result<Vec<Code>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.answer {
            Ok(_) => Ok(Vec::new()),
            Err(message) => Err(CrError::terminology(CR0202, message.clone())),
        }
    }

    async fn lookup(&self, _code: &Code, _code_system: &CodeSystemInfo) -> Result<Option<Code>> {
        Ok(None)
    }
}
