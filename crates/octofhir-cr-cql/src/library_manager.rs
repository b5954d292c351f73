//! Library loading
//!
//! The [`LibraryManager`] asks its source providers in order for a library,
//! picks the first content representation it prefers, hands it to the
//! translator and then loads every included library the same way. Compiled
//! libraries are kept in a [`LibraryCache`] together with the translator
//! options they were built with.

use crate::content::{LibraryContentType, get_content};
use crate::engine::{CompiledLibrary, LibraryTranslator};
use crate::identifier::VersionedIdentifier;
use crate::model_manager::ModelManager;
use crate::settings::{EvaluationSettings, TranslatorOptions};
use crate::source::DynLibrarySourceProvider;
use futures::future::{BoxFuture, FutureExt};
use log::{debug, warn};
use octofhir_cr_diagnostics::{CR0100, CR0101, CR0103, CR0107, CR0300, CrError, Result};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("library {identifier} not found")]
    LibraryNotFound { identifier: String },

    #[error("library {identifier} has no content of type {}", preference.join(", "))]
    NoContent {
        identifier: String,
        preference: Vec<String>,
    },

    #[error("circular library include: {}", chain.join(" -> "))]
    CircularInclude { chain: Vec<String> },

    #[error("model info {model} not found")]
    ModelInfoNotFound { model: String },

    #[error("library {identifier} source is not valid UTF-8")]
    InvalidSource { identifier: String },
}

impl From<ResolutionError> for CrError {
    fn from(err: ResolutionError) -> Self {
        let message = err.to_string();
        match err {
            ResolutionError::LibraryNotFound { identifier } => {
                CrError::resolution(CR0100, message).with_context(identifier)
            }
            ResolutionError::NoContent { identifier, .. } => {
                CrError::resolution(CR0101, message).with_context(identifier)
            }
            ResolutionError::CircularInclude { .. } => CrError::resolution(CR0107, message),
            ResolutionError::ModelInfoNotFound { model } => {
                CrError::resolution(CR0103, message).with_context(model)
            }
            ResolutionError::InvalidSource { identifier } => {
                CrError::evaluation(CR0300, message).with_context(identifier)
            }
        }
    }
}

#[derive(Debug, Clone)]
struct CachedLibrary {
    library: Arc<CompiledLibrary>,
    options: TranslatorOptions,
}

/// Compiled libraries keyed by the identifier they were requested with
#[derive(Debug, Default)]
pub struct LibraryCache {
    entries: RwLock<HashMap<VersionedIdentifier, CachedLibrary>>,
}

impl LibraryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached library when it was translated with `options`.
    ///
    /// An entry built with other options is evicted.
    pub fn get(&self, identifier: &VersionedIdentifier, options: &TranslatorOptions) -> Option<Arc<CompiledLibrary>> {
        {
            let entries = self.entries.read();
            match entries.get(identifier) {
                None => return None,
                Some(cached) if cached.options == *options => return Some(cached.library.clone()),
                Some(_) => {}
            }
        }
        debug!("translator options changed, evicting cached library {identifier}");
        self.entries.write().remove(identifier);
        None
    }

    pub fn insert(&self, identifier: VersionedIdentifier, library: Arc<CompiledLibrary>, options: &TranslatorOptions) {
        self.entries.write().insert(
            identifier,
            CachedLibrary {
                library,
                options: options.clone(),
            },
        );
    }

    pub fn contains(&self, identifier: &VersionedIdentifier) -> bool {
        self.entries.read().contains_key(identifier)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

/// Loads and translates libraries and their includes
pub struct LibraryManager {
    providers: Vec<DynLibrarySourceProvider>,
    translator: Arc<dyn LibraryTranslator>,
    cache: Option<Arc<LibraryCache>>,
    model_manager: Option<Arc<ModelManager>>,
    content_preference: Vec<LibraryContentType>,
    options: TranslatorOptions,
}

impl LibraryManager {
    pub fn new(providers: Vec<DynLibrarySourceProvider>, translator: Arc<dyn LibraryTranslator>) -> Self {
        let settings = EvaluationSettings::default();
        Self {
            providers,
            translator,
            cache: Some(Arc::new(LibraryCache::new())),
            model_manager: None,
            content_preference: settings.content_preference,
            options: settings.translator_options,
        }
    }

    pub fn from_settings(
        providers: Vec<DynLibrarySourceProvider>,
        translator: Arc<dyn LibraryTranslator>,
        settings: &EvaluationSettings,
    ) -> Self {
        let manager = Self::new(providers, translator)
            .with_content_preference(settings.content_preference.clone())
            .with_options(settings.translator_options.clone());
        if settings.cache_libraries {
            manager
        } else {
            manager.without_cache()
        }
    }

    /// Share a cache between managers
    pub fn with_cache(mut self, cache: Arc<LibraryCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn without_cache(mut self) -> Self {
        self.cache = None;
        self
    }

    pub fn with_model_manager(mut self, model_manager: Arc<ModelManager>) -> Self {
        self.model_manager = Some(model_manager);
        self
    }

    pub fn with_content_preference(mut self, preference: Vec<LibraryContentType>) -> Self {
        self.content_preference = preference;
        self
    }

    pub fn with_options(mut self, options: TranslatorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &TranslatorOptions {
        &self.options
    }

    pub fn cache(&self) -> Option<&Arc<LibraryCache>> {
        self.cache.as_ref()
    }

    pub fn model_manager(&self) -> Option<&Arc<ModelManager>> {
        self.model_manager.as_ref()
    }

    /// Load `identifier` and everything it includes, translated with the
    /// manager's options
    pub async fn resolve(&self, identifier: &VersionedIdentifier) -> Result<Arc<CompiledLibrary>> {
        self.resolve_with_options(identifier, &self.options).await
    }

    pub async fn resolve_with_options(
        &self,
        identifier: &VersionedIdentifier,
        options: &TranslatorOptions,
    ) -> Result<Arc<CompiledLibrary>> {
        let mut loading = Vec::new();
        self.resolve_inner(identifier, options, &mut loading).await
    }

    /// Translate a Library resource supplied by the caller, then load its
    /// includes from the providers
    pub async fn resolve_resource(&self, library: &Value) -> Result<Arc<CompiledLibrary>> {
        let name = library.get("name").and_then(Value::as_str).unwrap_or("inline");
        let identifier = VersionedIdentifier::from_library(library).unwrap_or_else(|| VersionedIdentifier::new(name));
        let compiled = self
            .compile(library, &identifier, &self.options)?
            .ok_or_else(|| self.no_content(&identifier))?;

        let mut loading = vec![identifier.id.clone()];
        self.load_dependencies(&compiled, &self.options, &mut loading).await?;
        Ok(compiled)
    }

    fn resolve_inner<'a>(
        &'a self,
        identifier: &'a VersionedIdentifier,
        options: &'a TranslatorOptions,
        loading: &'a mut Vec<String>,
    ) -> BoxFuture<'a, Result<Arc<CompiledLibrary>>> {
        async move {
            if loading.contains(&identifier.id) {
                let mut chain = loading.clone();
                chain.push(identifier.id.clone());
                return Err(ResolutionError::CircularInclude { chain }.into());
            }
            if let Some(cached) = self.cache.as_ref().and_then(|cache| cache.get(identifier, options)) {
                return Ok(cached);
            }

            loading.push(identifier.id.clone());
            let library = self.load(identifier, options).await?;
            self.load_dependencies(&library, options, loading).await?;
            loading.pop();

            if let Some(cache) = &self.cache {
                cache.insert(identifier.clone(), library.clone(), options);
            }
            Ok(library)
        }
        .boxed()
    }

    async fn load_dependencies(
        &self,
        library: &CompiledLibrary,
        options: &TranslatorOptions,
        loading: &mut Vec<String>,
    ) -> Result<()> {
        if let Some(models) = &self.model_manager {
            for using in library.usings.iter().filter(|m| !ModelManager::is_built_in(m)) {
                models.resolve(using).await?;
            }
        }
        for include in &library.includes {
            self.resolve_inner(include, options, loading).await?;
        }
        Ok(())
    }

    /// First provider with the library wins; a provider whose library has
    /// none of the preferred content types is skipped
    async fn load(&self, identifier: &VersionedIdentifier, options: &TranslatorOptions) -> Result<Arc<CompiledLibrary>> {
        let mut found_without_content = false;
        for (index, provider) in self.providers.iter().enumerate() {
            let Some(library) = provider.library(identifier).await? else {
                debug!("library provider {index} has no {identifier}");
                continue;
            };
            match self.compile(&library, identifier, options)? {
                Some(compiled) => return Ok(compiled),
                None => {
                    warn!("library provider {index} returned {identifier} without usable content");
                    found_without_content = true;
                }
            }
        }

        if found_without_content {
            Err(self.no_content(identifier))
        } else {
            Err(ResolutionError::LibraryNotFound {
                identifier: identifier.to_string(),
            }
            .into())
        }
    }

    fn compile(
        &self,
        library: &Value,
        identifier: &VersionedIdentifier,
        options: &TranslatorOptions,
    ) -> Result<Option<Arc<CompiledLibrary>>> {
        for &content_type in &self.content_preference {
            let Some(content) = get_content(library, content_type)? else {
                continue;
            };
            let compiled = match content_type {
                LibraryContentType::Cql => {
                    let source = std::str::from_utf8(&content).map_err(|_| ResolutionError::InvalidSource {
                        identifier: identifier.to_string(),
                    })?;
                    self.translator.translate(source, options)?
                }
                elm => self.translator.load_elm(&content, elm)?,
            };
            debug!("loaded {identifier} from {content_type}");
            return Ok(Some(Arc::new(compiled)));
        }
        Ok(None)
    }

    fn no_content(&self, identifier: &VersionedIdentifier) -> CrError {
        ResolutionError::NoContent {
            identifier: identifier.to_string(),
            preference: self.content_preference.iter().map(ToString::to_string).collect(),
        }
        .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::ModelIdentifier;
    use crate::model_info::{ModelInfo, ModelInfoProvider};
    use crate::selector::LibraryVersionSelector;
    use crate::source::BundleLibrarySourceProvider;
    use async_trait::async_trait;
    use octofhir_cr_fhir::attachment;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Reads `library <Name> include <Other>...` lines
    #[derive(Default)]
    struct LineTranslator {
        calls: AtomicUsize,
    }

    impl LibraryTranslator for LineTranslator {
        fn translate(&self, source: &str, _options: &TranslatorOptions) -> Result<CompiledLibrary> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut words = source.split_whitespace();
            let mut library = CompiledLibrary::new(VersionedIdentifier::new("unnamed"), json!({}));
            while let Some(word) = words.next() {
                let Some(argument) = words.next() else { break };
                match word {
                    "library" => library.identifier = VersionedIdentifier::new(argument),
                    "include" => library.includes.push(VersionedIdentifier::new(argument)),
                    "using" => library.usings.push(ModelIdentifier::new(argument, None)),
                    _ => {}
                }
            }
            Ok(library)
        }

        fn load_elm(&self, elm: &[u8], _content_type: LibraryContentType) -> Result<CompiledLibrary> {
            let elm: Value = serde_json::from_slice(elm).map_err(|e| CrError::evaluation(CR0300, e.to_string()))?;
            let name = elm.pointer("/library/identifier/id").and_then(Value::as_str).unwrap_or("unnamed");
            Ok(CompiledLibrary::new(VersionedIdentifier::new(name), elm))
        }
    }

    fn cql_library(name: &str, source: &str) -> Value {
        json!({
            "resourceType": "Library",
            "name": name,
            "content": [attachment("text/cql", source.as_bytes())]
        })
    }

    fn manager(libraries: Vec<Value>) -> (LibraryManager, Arc<LineTranslator>) {
        let translator = Arc::new(LineTranslator::default());
        let provider: DynLibrarySourceProvider = Arc::new(BundleLibrarySourceProvider::from_libraries(
            libraries,
            LibraryVersionSelector::default(),
        ));
        (LibraryManager::new(vec![provider], translator.clone()), translator)
    }

    #[tokio::test]
    async fn test_resolves_includes() {
        let (manager, _) = manager(vec![
            cql_library("Main", "library Main include Common"),
            cql_library("Common", "library Common"),
        ]);
        let main = manager.resolve(&VersionedIdentifier::new("Main")).await.unwrap();
        assert_eq!(main.includes, vec![VersionedIdentifier::new("Common")]);
        let cache = manager.cache().unwrap();
        assert!(cache.contains(&VersionedIdentifier::new("Common")));
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn test_circular_include() {
        let (manager, _) = manager(vec![
            cql_library("A", "library A include B"),
            cql_library("B", "library B include A"),
        ]);
        let err = manager.resolve(&VersionedIdentifier::new("A")).await.unwrap_err();
        assert_eq!(err.code(), CR0107);
        assert!(err.message().contains("A -> B -> A"));
    }

    #[tokio::test]
    async fn test_missing_include_and_missing_content() {
        let (manager, _) = manager(vec![
            cql_library("Main", "library Main include Gone"),
            json!({ "resourceType": "Library", "name": "Empty", "content": [] }),
        ]);
        let err = manager.resolve(&VersionedIdentifier::new("Main")).await.unwrap_err();
        assert_eq!(err.code(), CR0100);
        assert_eq!(err.context(), Some("Gone"));

        let err = manager.resolve(&VersionedIdentifier::new("Empty")).await.unwrap_err();
        assert_eq!(err.code(), CR0101);
    }

    #[tokio::test]
    async fn test_prefers_elm_json() {
        let elm = json!({ "library": { "identifier": { "id": "FromElm" } } });
        let library = json!({
            "resourceType": "Library",
            "name": "Both",
            "content": [
                attachment("text/cql", b"library FromCql"),
                attachment("application/elm+json", elm.to_string().as_bytes())
            ]
        });
        let (manager, translator) = manager(vec![library]);
        let compiled = manager.resolve(&VersionedIdentifier::new("Both")).await.unwrap();
        assert_eq!(compiled.identifier.id, "FromElm");
        assert_eq!(translator.calls.load(Ordering::SeqCst), 0);

        let (manager, _) = self::manager(vec![cql_library("Both", "library FromCql")]);
        let manager = manager.with_content_preference(vec![LibraryContentType::ElmJson]);
        let err = manager.resolve(&VersionedIdentifier::new("Both")).await.unwrap_err();
        assert_eq!(err.code(), CR0101);
    }

    #[tokio::test]
    async fn test_cache_invalidated_by_options() {
        let (manager, translator) = manager(vec![cql_library("Main", "library Main")]);
        let id = VersionedIdentifier::new("Main");
        let options = TranslatorOptions::default();

        let first = manager.resolve_with_options(&id, &options).await.unwrap();
        let second = manager.resolve_with_options(&id, &options).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(translator.calls.load(Ordering::SeqCst), 1);

        let changed = TranslatorOptions {
            enable_annotations: false,
            ..TranslatorOptions::default()
        };
        let third = manager.resolve_with_options(&id, &changed).await.unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(translator.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_inline_resource_with_model() {
        struct NoModels;

        #[async_trait]
        impl ModelInfoProvider for NoModels {
            async fn load(&self, _identifier: &ModelIdentifier) -> Result<Option<ModelInfo>> {
                Ok(None)
            }
        }

        let (manager, _) = manager(vec![cql_library("Common", "library Common")]);
        let models: Arc<dyn ModelInfoProvider> = Arc::new(NoModels);
        let manager = manager.with_model_manager(Arc::new(ModelManager::new(vec![models])));

        let inline = cql_library("Inline", "library Inline using System include Common");
        let compiled = manager.resolve_resource(&inline).await.unwrap();
        assert_eq!(compiled.identifier.id, "Inline");

        let needs_fhir = cql_library("Fhir", "library Fhir using FHIR");
        let err = manager.resolve_resource(&needs_fhir).await.unwrap_err();
        assert_eq!(err.code(), CR0103);
    }
}
