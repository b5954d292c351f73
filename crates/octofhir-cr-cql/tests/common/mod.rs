//! Common test utilities for resolution tests
//!
//! - an in-memory, paging [`Repository`](octofhir_cr_fhir::Repository)
//! - a translator that reads library headers instead of full CQL
//! - terminology providers with scripted answers
//! - builders for Library and ValueSet resources

#![allow(dead_code)]

pub mod fhir_data;
pub mod mocks;

pub use fhir_data::*;
pub use mocks::*;
