//! CLI functionality for the `cr` tool
//!
//! Inspection commands over local FHIR bundles:
//! - Library version resolution
//! - Value set expansion
//! - Evaluation settings validation

pub mod bundle;
pub mod expand;
pub mod library;
pub mod output;
pub mod settings;
