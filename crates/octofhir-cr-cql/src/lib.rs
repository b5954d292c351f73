//! CQL library resolution for clinical reasoning
//!
//! Resolves CQL libraries, model infos and value sets out of FHIR
//! repositories and bundles, for any supported FHIR release:
//!
//! - [`LibraryVersionSelector`] picks the exact or latest version of a
//!   library among candidates found by name or canonical URL
//! - [`get_content`] extracts CQL or ELM attachments
//! - library, model info, terminology and retrieve providers wrap a
//!   [`Repository`](octofhir_cr_fhir::Repository) or a bundle
//! - [`ProviderFactory`] builds them for the FHIR version of their source
//! - [`LibraryManager`] loads libraries with their includes and caches the
//!   translated result
//! - [`InputParameterResolver`] assembles the parameters an evaluation
//!   starts with
//!
//! Translation and execution of CQL are external, reached through
//! [`LibraryTranslator`] and [`CqlEngine`].

pub mod content;
pub mod data_provider;
pub mod engine;
pub mod factory;
pub mod identifier;
pub mod input;
pub mod library_manager;
pub mod model_info;
pub mod model_manager;
pub mod model_resolver;
pub mod parameters;
pub mod retrieve;
pub mod selector;
pub mod settings;
pub mod source;
pub mod terminology;

pub use content::{ContentError, ContentType, LibraryContentType, ModelInfoContentType, get_content};
pub use data_provider::{DataProvider, DataProviderError};
pub use engine::{
    CompiledLibrary, CqlEngine, DynCqlEngine, EvaluationEnvironment, EvaluationResult, LibraryTranslator,
};
pub use factory::ProviderFactory;
pub use identifier::{ModelIdentifier, VersionedIdentifier};
pub use input::{InputParameterRequest, InputParameterResolver, LaunchContextValue};
pub use library_manager::{LibraryCache, LibraryManager, ResolutionError};
pub use model_info::{ModelInfo, ModelInfoError, ModelInfoProvider};
pub use model_manager::ModelManager;
pub use model_resolver::ModelResolver;
pub use parameters::{Parameter, ParameterError, ParameterSet, ParameterValue};
pub use retrieve::{
    BundleRetrieveProvider, DynRetrieveProvider, RepositoryRetrieveProvider, RetrieveProvider, RetrieveRequest,
};
pub use selector::{LibraryVersionSelector, SelectionError, VersionMissPolicy};
pub use settings::{EvaluationSettings, SettingsError, SignatureLevel, TranslatorOptions};
pub use source::{
    BundleLibrarySourceProvider, DynLibrarySourceProvider, LibrarySourceProvider, RepositoryLibrarySourceProvider,
};
pub use terminology::{
    BundleTerminologyProvider, Code, CodeSystemInfo, DynTerminologyProvider, PriorityTerminologyProvider,
    RepositoryTerminologyProvider, TerminologyError, TerminologyProvider, ValueSetInfo,
};
