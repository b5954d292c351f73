//! Library `$evaluate`
//!
//! [`LibraryEvaluationProcessor`] wires the providers for one request,
//! resolves the library and its inputs, runs the engine and renders the
//! expression results as a FHIR `Parameters` resource. Every stage runs
//! inside a [`Try`], so the first failure skips the rest. Failures caused by
//! the request's data (a missing library, a translation or evaluation error)
//! come back as an `OperationOutcome` resource; configuration problems and
//! unsupported FHIR releases come back as errors.

use log::{debug, warn};
use octofhir_cr_cql::{
    CompiledLibrary, DataProvider, DynCqlEngine, DynTerminologyProvider, EvaluationEnvironment, EvaluationResult,
    EvaluationSettings, InputParameterRequest, InputParameterResolver, LibraryCache, LibraryManager,
    LibraryTranslator, ModelManager, ParameterSet, ParameterValue, PriorityTerminologyProvider, ProviderFactory,
    ResolutionError, VersionedIdentifier,
};
use octofhir_cr_diagnostics::{CR0004, CR0303, CR0500, CrError, OperationOutcome, Result};
use octofhir_cr_fhir::bundle::collection;
use octofhir_cr_fhir::{Canonical, DynRepository, FhirVersion, Reference, adapter_for, read_optional};
use octofhir_cr_utility::{Either3, Failure, Try};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

/// Library addressed by canonical URL, by resource id or supplied inline
pub type LibraryInput = Either3<Canonical, String, Value>;

/// Inputs of one `$evaluate` call
#[derive(Clone)]
pub struct EvaluateRequest {
    pub library: LibraryInput,
    /// Subject reference, `Patient/123` or a bare patient id
    pub subject: Option<String>,
    /// Expressions to evaluate; empty means all of them
    pub expressions: Vec<String>,
    /// A `Parameters` resource with values for the library's parameters
    pub parameters: Option<Value>,
    /// Bundle of additional resources: libraries, value sets, patient data
    pub data: Option<Value>,
    pub use_server_data: bool,
    pub content_endpoint: Option<DynRepository>,
    pub terminology_endpoint: Option<DynRepository>,
    pub data_endpoint: Option<DynRepository>,
}

impl EvaluateRequest {
    pub fn new(library: LibraryInput) -> Self {
        Self {
            library,
            subject: None,
            expressions: Vec::new(),
            parameters: None,
            data: None,
            use_server_data: true,
            content_endpoint: None,
            terminology_endpoint: None,
            data_endpoint: None,
        }
    }

    /// Build from the operation's `url`, `id` and `library` inputs; exactly
    /// one of them must be present
    pub fn from_inputs(url: Option<&str>, id: Option<&str>, library: Option<Value>) -> Result<Self> {
        let canonical = url.map(Canonical::parse).transpose()?;
        let library = Either3::from_options(canonical, id.map(String::from), library)?;
        Ok(Self::new(library))
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_expressions(mut self, expressions: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.expressions = expressions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_parameters(mut self, parameters: Value) -> Self {
        self.parameters = Some(parameters);
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_server_data(mut self, use_server_data: bool) -> Self {
        self.use_server_data = use_server_data;
        self
    }

    pub fn with_content_endpoint(mut self, endpoint: DynRepository) -> Self {
        self.content_endpoint = Some(endpoint);
        self
    }

    pub fn with_terminology_endpoint(mut self, endpoint: DynRepository) -> Self {
        self.terminology_endpoint = Some(endpoint);
        self
    }

    pub fn with_data_endpoint(mut self, endpoint: DynRepository) -> Self {
        self.data_endpoint = Some(endpoint);
        self
    }
}

/// Providers wired for one request
struct Session {
    content: DynRepository,
    library_manager: Arc<LibraryManager>,
    data_provider: DataProvider,
    inputs: InputParameterResolver,
    subject: Option<Reference>,
}

impl Session {
    fn environment(&self) -> EvaluationEnvironment {
        let environment =
            EvaluationEnvironment::new(self.library_manager.clone()).with_data_provider(self.data_provider.clone());
        match &self.subject {
            Some(subject) => environment.with_subject(subject.clone()),
            None => environment,
        }
    }
}

pub struct LibraryEvaluationProcessor {
    repository: DynRepository,
    translator: Arc<dyn LibraryTranslator>,
    engine: DynCqlEngine,
    factory: ProviderFactory,
    cache: Option<Arc<LibraryCache>>,
    model_manager: Option<Arc<ModelManager>>,
}

impl LibraryEvaluationProcessor {
    pub fn new(repository: DynRepository, translator: Arc<dyn LibraryTranslator>, engine: DynCqlEngine) -> Self {
        Self {
            repository,
            translator,
            engine,
            factory: ProviderFactory::default(),
            cache: Some(Arc::new(LibraryCache::new())),
            model_manager: None,
        }
    }

    pub fn with_settings(mut self, settings: EvaluationSettings) -> Self {
        self.cache = settings.cache_libraries.then(|| Arc::new(LibraryCache::new()));
        self.factory = ProviderFactory::new(settings);
        self
    }

    pub fn with_model_manager(mut self, model_manager: Arc<ModelManager>) -> Self {
        self.model_manager = Some(model_manager);
        self
    }

    pub fn fhir_version(&self) -> FhirVersion {
        self.repository.fhir_version()
    }

    /// Compiled libraries shared by requests that load libraries from the
    /// processor's repository
    pub fn cache(&self) -> Option<&Arc<LibraryCache>> {
        self.cache.as_ref()
    }

    /// Evaluate the requested library, returning a `Parameters` resource
    /// with the results or an `OperationOutcome` describing a data failure
    pub async fn evaluate(&self, request: &EvaluateRequest) -> Result<Value> {
        let session = Try::from_result(self.session(request));

        let inputs = and_then(session, |session| async move {
            let parameters = session.inputs.resolve(&input_request(request)?).await?;
            Ok::<_, CrError>((session, parameters))
        })
        .await;

        let loaded = and_then(inputs, |(session, parameters)| async move {
            let library = load_library(&session, &request.library).await?;
            Ok::<_, CrError>((session, parameters, library))
        })
        .await;

        let checked = loaded.try_map(|(session, parameters, library)| {
            check_expressions(&library, &request.expressions)?;
            Ok::<_, CrError>((session, parameters, library))
        });

        let evaluated = and_then(checked, |(session, parameters, library)| async move {
            debug!("evaluating library {}", library.identifier);
            self.engine
                .evaluate(&library, &request.expressions, &parameters, &session.environment())
                .await
        })
        .await;

        evaluated.map(|result| to_parameters(&result)).fold(report, Ok)
    }

    fn session(&self, request: &EvaluateRequest) -> Result<Session> {
        let version = self.repository.fhir_version();
        adapter_for(version)?;
        for endpoint in [&request.content_endpoint, &request.terminology_endpoint, &request.data_endpoint]
            .into_iter()
            .flatten()
        {
            if endpoint.fhir_version() != version {
                return Err(CrError::precondition(
                    CR0004,
                    format!(
                        "endpoint serves FHIR {} but the repository serves FHIR {version}",
                        endpoint.fhir_version()
                    ),
                ));
            }
        }

        let content = request.content_endpoint.clone().unwrap_or_else(|| self.repository.clone());
        let mut sources = Vec::new();
        if let Some(data) = &request.data {
            sources.push(self.factory.library_source_for_bundle(data, version)?);
        }
        sources.push(self.factory.library_source_for_repository(content.clone())?);

        let mut library_manager = LibraryManager::from_settings(sources, self.translator.clone(), self.factory.settings());
        if let Some(cache) = self.cache_for(request) {
            library_manager = library_manager.with_cache(cache);
        }
        if let Some(model_manager) = &self.model_manager {
            library_manager = library_manager.with_model_manager(model_manager.clone());
        }

        let terminology = self.terminology(request)?;
        let data_repository = request.data_endpoint.clone().unwrap_or_else(|| self.repository.clone());
        let data_provider = if request.use_server_data {
            self.factory
                .data_provider_for_repository(data_repository.clone(), Some(terminology))?
        } else {
            let empty = collection(Vec::new());
            let bundle = request.data.as_ref().unwrap_or(&empty);
            self.factory.data_provider_for_bundle(bundle, version, Some(terminology))?
        };

        let subject = request
            .subject
            .as_deref()
            .map(|subject| Reference::parse(subject).map(|r| r.with_default_type("Patient")))
            .transpose()?;

        Ok(Session {
            content,
            library_manager: Arc::new(library_manager),
            data_provider,
            inputs: InputParameterResolver::for_repository(data_repository)?,
            subject,
        })
    }

    /// The shared cache holds libraries from the processor's repository only.
    /// A request bringing its own content endpoint or data bundle gets a
    /// cache of its own.
    fn cache_for(&self, request: &EvaluateRequest) -> Option<Arc<LibraryCache>> {
        let shared = self.cache.as_ref()?;
        if request.content_endpoint.is_none() && request.data.is_none() {
            return Some(shared.clone());
        }
        debug!("request supplies its own library sources, using a request cache");
        Some(Arc::new(LibraryCache::new()))
    }

    /// The terminology endpoint ahead of the local repository, when given
    fn terminology(&self, request: &EvaluateRequest) -> Result<DynTerminologyProvider> {
        let local = self.factory.terminology_for_repository(self.repository.clone())?;
        match &request.terminology_endpoint {
            Some(endpoint) => {
                let remote = self.factory.terminology_for_repository(endpoint.clone())?;
                Ok(Arc::new(PriorityTerminologyProvider::new(vec![remote, local])?))
            }
            None => Ok(local),
        }
    }
}

/// Run an async stage on a successful [`Try`]
async fn and_then<T, U, F, Fut>(stage: Try<T>, f: F) -> Try<U>
where
    F: FnOnce(T) -> Fut,
    Fut: Future<Output = Result<U>>,
{
    match stage.into_result() {
        Ok(value) => Try::from_result(f(value).await),
        Err(failure) => Try::from_failure(failure),
    }
}

fn input_request(request: &EvaluateRequest) -> Result<InputParameterRequest> {
    let parameters = match &request.parameters {
        Some(resource) => ParameterSet::from_resource(resource)?,
        None => ParameterSet::new(),
    };
    let mut input = InputParameterRequest::new()
        .with_parameters(parameters)
        .with_server_data(request.use_server_data);
    if let Some(subject) = &request.subject {
        input = input.with_subject(subject.clone());
    }
    if let Some(data) = &request.data {
        input = input.with_data(data.clone());
    }
    Ok(input)
}

async fn load_library(session: &Session, library: &LibraryInput) -> Result<Arc<CompiledLibrary>> {
    match library {
        Either3::Left(canonical) => {
            session
                .library_manager
                .resolve(&VersionedIdentifier::from_canonical(canonical))
                .await
        }
        Either3::Middle(id) => {
            let resource = read_optional(session.content.as_ref(), "Library", id)
                .await?
                .ok_or_else(|| ResolutionError::LibraryNotFound { identifier: id.clone() })?;
            session.library_manager.resolve_resource(&resource).await
        }
        Either3::Right(resource) => session.library_manager.resolve_resource(resource).await,
    }
}

fn check_expressions(library: &CompiledLibrary, expressions: &[String]) -> Result<()> {
    match expressions.iter().find(|expression| !library.defines(expression)) {
        Some(missing) => Err(CrError::evaluation(
            CR0303,
            format!("library {} does not define expression {missing}", library.identifier),
        )
        .with_context(missing.clone())),
        None => Ok(()),
    }
}

fn report(failure: Failure) -> Result<Value> {
    match failure.downcast_ref::<CrError>() {
        Some(error) if error.is_data_error() => {
            warn!("evaluation failed: {error}");
            Ok(OperationOutcome::from_error(error).to_resource())
        }
        Some(error) => Err(error.clone()),
        None => Err(CrError::system(CR0500, failure.to_string())),
    }
}

/// Expression results as `Parameters`; lists repeat the parameter name and
/// null results are left out
fn to_parameters(result: &EvaluationResult) -> Value {
    let mut parameters = ParameterSet::new();
    for (name, value) in &result.expressions {
        push_result(&mut parameters, name, value);
    }
    parameters.to_resource()
}

fn push_result(parameters: &mut ParameterSet, name: &str, value: &Value) {
    let primitive = |kind: &str| ParameterValue::Primitive {
        kind: kind.to_string(),
        value: value.clone(),
    };
    match value {
        Value::Null => {}
        Value::Array(items) => {
            for item in items {
                push_result(parameters, name, item);
            }
        }
        Value::Object(object) if object.contains_key("resourceType") => {
            parameters.push(name, ParameterValue::Resource(value.clone()));
        }
        Value::Object(object) => {
            let kind = if object.contains_key("code") {
                "Coding"
            } else if object.contains_key("reference") {
                "Reference"
            } else if object.contains_key("start") || object.contains_key("end") {
                "Period"
            } else if object.contains_key("value") {
                "Quantity"
            } else {
                parameters.push(name, ParameterValue::string(value.to_string()));
                return;
            };
            parameters.push(name, primitive(kind));
        }
        Value::Bool(flag) => parameters.push(name, ParameterValue::boolean(*flag)),
        Value::Number(number) if number.is_f64() => parameters.push(name, primitive("Decimal")),
        Value::Number(_) => parameters.push(name, primitive("Integer")),
        Value::String(text) => parameters.push(name, ParameterValue::string(text.clone())),
    }
}
