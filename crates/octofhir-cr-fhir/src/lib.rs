//! FHIR boundary for clinical reasoning
//!
//! Resources are carried as `serde_json::Value` alongside an explicit
//! [`FhirVersion`] tag. Version-specific behavior is resolved once through
//! the validated [`VersionDispatch`] table into a [`VersionAdapter`], and
//! every store of resources is reached through the [`Repository`] trait.

pub mod adapter;
pub mod bundle;
pub mod canonical;
pub mod dispatch;
pub mod repository;
pub mod resource;
pub mod version;

pub use adapter::{
    LaunchContextDefinition, LaunchContextPolicy, SDC_LAUNCH_CONTEXT_URL, VersionAdapter,
    adapter_dispatch, adapter_for,
};
pub use canonical::{Canonical, CanonicalError, Reference};
pub use dispatch::{Branch, DispatchError, VersionDispatch, VersionDispatchBuilder, VersionRange};
pub use repository::{DynRepository, Repository, RepositoryError, SearchParams, read_optional, search_all};
pub use resource::{
    Attachment, AttachmentError, VersionedResource, attachment, attachments, resource_id,
    resource_type,
};
pub use version::FhirVersion;
