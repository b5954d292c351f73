//! Clinical reasoning diagnostics and error handling
//!
//! This crate provides the error handling infrastructure shared by the
//! resolution, terminology and evaluation crates: structured error codes,
//! diagnostics, the workspace-wide [`CrError`] and rendering of failures as
//! FHIR `OperationOutcome` resources.

mod error;
mod error_code;
mod outcome;

pub use error::*;
pub use error_code::*;
pub use outcome::*;

/// Result type for clinical reasoning operations
pub type Result<T> = std::result::Result<T, CrError>;
