//! Clinical reasoning over FHIR
//!
//! Resolves CQL libraries, model infos and terminology out of FHIR
//! repositories for DSTU3, R4 and R5, and evaluates libraries through an
//! external CQL engine:
//!
//! ```ignore
//! use octofhir_cr::{EvaluateRequest, LibraryEvaluationProcessor};
//!
//! let processor = LibraryEvaluationProcessor::new(repository, translator, engine);
//! let request = EvaluateRequest::from_inputs(Some("http://example.org/Library/Screening"), None, None)?
//!     .with_subject("Patient/123");
//! let parameters = processor.evaluate(&request).await?;
//! ```

// Re-export all public APIs from internal crates
pub use octofhir_cr_cql as cql;
pub use octofhir_cr_diagnostics as diagnostics;
pub use octofhir_cr_fhir as fhir;
pub use octofhir_cr_utility as utility;

pub mod processor;

// Convenience re-exports
pub use octofhir_cr_diagnostics::{CrError, OperationOutcome, Result};
pub use octofhir_cr_fhir::{FhirVersion, Repository};
pub use processor::{EvaluateRequest, LibraryEvaluationProcessor, LibraryInput};

// CLI module (only available with cli feature)
#[cfg(feature = "cli")]
pub mod cli;
