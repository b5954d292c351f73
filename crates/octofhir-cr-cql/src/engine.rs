//! Translator and engine boundary
//!
//! CQL translation and execution live outside this crate. The traits here
//! describe what the resolution pipeline needs from them.

use crate::content::LibraryContentType;
use crate::data_provider::DataProvider;
use crate::identifier::{ModelIdentifier, VersionedIdentifier};
use crate::library_manager::LibraryManager;
use crate::parameters::ParameterSet;
use crate::settings::TranslatorOptions;
use async_trait::async_trait;
use indexmap::IndexMap;
use octofhir_cr_diagnostics::Result;
use octofhir_cr_fhir::Reference;
use serde_json::Value;
use std::sync::Arc;

/// A translated library
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledLibrary {
    pub identifier: VersionedIdentifier,
    pub usings: Vec<ModelIdentifier>,
    pub includes: Vec<VersionedIdentifier>,
    /// Names of the expression definitions, in declaration order
    pub expressions: Vec<String>,
    pub elm: Value,
}

impl CompiledLibrary {
    pub fn new(identifier: VersionedIdentifier, elm: Value) -> Self {
        Self {
            identifier,
            usings: Vec::new(),
            includes: Vec::new(),
            expressions: Vec::new(),
            elm,
        }
    }

    pub fn defines(&self, expression: &str) -> bool {
        self.expressions.iter().any(|e| e == expression)
    }
}

/// CQL-to-ELM translation
pub trait LibraryTranslator: Send + Sync {
    fn translate(&self, source: &str, options: &TranslatorOptions) -> Result<CompiledLibrary>;

    /// Load an already translated library
    fn load_elm(&self, elm: &[u8], content_type: LibraryContentType) -> Result<CompiledLibrary>;
}

/// Everything an evaluation can reach besides its parameters
#[derive(Clone)]
pub struct EvaluationEnvironment {
    pub library_manager: Arc<LibraryManager>,
    pub data_provider: Option<DataProvider>,
    /// Context subject, e.g. `Patient/123`
    pub subject: Option<Reference>,
}

impl EvaluationEnvironment {
    pub fn new(library_manager: Arc<LibraryManager>) -> Self {
        Self {
            library_manager,
            data_provider: None,
            subject: None,
        }
    }

    pub fn with_data_provider(mut self, data_provider: DataProvider) -> Self {
        self.data_provider = Some(data_provider);
        self
    }

    pub fn with_subject(mut self, subject: Reference) -> Self {
        self.subject = Some(subject);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationResult {
    /// Expression results keyed by name, in request order
    pub expressions: IndexMap<String, Value>,
}

impl EvaluationResult {
    pub fn get(&self, expression: &str) -> Option<&Value> {
        self.expressions.get(expression)
    }
}

#[async_trait]
pub trait CqlEngine: Send + Sync {
    /// Evaluate `expressions` of `library`; an empty list means every
    /// expression definition
    async fn evaluate(
        &self,
        library: &CompiledLibrary,
        expressions: &[String],
        parameters: &ParameterSet,
        environment: &EvaluationEnvironment,
    ) -> Result<EvaluationResult>;
}

pub type DynCqlEngine = Arc<dyn CqlEngine>;
