//! Library and model info version selection

use crate::identifier::VersionedIdentifier;
use log::debug;
use octofhir_cr_diagnostics::{CR0102, CrError};
use octofhir_cr_fhir::{Canonical, VersionedResource};
use octofhir_cr_utility::compare_versions;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use thiserror::Error;

/// What to do when a specific version is requested but not present
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VersionMissPolicy {
    /// Return the latest candidate with the requested name
    #[default]
    FallbackToLatest,
    /// Fail the selection
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("version {requested} of {name} not found (latest is {})", latest.as_deref().unwrap_or("unversioned"))]
    VersionNotFound {
        name: String,
        requested: String,
        latest: Option<String>,
    },
}

impl From<SelectionError> for CrError {
    fn from(err: SelectionError) -> Self {
        CrError::resolution(CR0102, err.to_string())
    }
}

/// Picks the exact or latest version out of a candidate list
#[derive(Debug, Clone, Copy, Default)]
pub struct LibraryVersionSelector {
    policy: VersionMissPolicy,
}

impl LibraryVersionSelector {
    pub fn new(policy: VersionMissPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> VersionMissPolicy {
        self.policy
    }

    /// Select by exact, case-sensitive `name`.
    ///
    /// `Ok(None)` when no candidate carries the requested name.
    pub fn select<'a, R: VersionedResource>(
        &self,
        identifier: &VersionedIdentifier,
        candidates: &'a [R],
    ) -> Result<Option<&'a R>, SelectionError> {
        let matches = candidates
            .iter()
            .filter(|c| c.name() == Some(identifier.id.as_str()));
        self.select_version(&identifier.id, identifier.version.as_deref(), matches)
    }

    /// Select by canonical URL, honoring the `|version` suffix
    pub fn select_by_url<'a, R: VersionedResource>(
        &self,
        canonical: &Canonical,
        candidates: &'a [R],
    ) -> Result<Option<&'a R>, SelectionError> {
        let matches = candidates
            .iter()
            .filter(|c| c.url() == Some(canonical.url()));
        self.select_version(canonical.url(), canonical.version(), matches)
    }

    fn select_version<'a, R: VersionedResource>(
        &self,
        label: &str,
        requested: Option<&str>,
        matches: impl Iterator<Item = &'a R>,
    ) -> Result<Option<&'a R>, SelectionError> {
        let mut latest: Option<&'a R> = None;

        for candidate in matches {
            if requested.is_some() && candidate.version() == requested {
                return Ok(Some(candidate));
            }
            let newer = latest
                .is_none_or(|current| compare_versions(candidate.version(), current.version()) == Ordering::Greater);
            if newer {
                latest = Some(candidate);
            }
        }

        let (Some(requested), Some(latest)) = (requested, latest) else {
            return Ok(latest);
        };

        match self.policy {
            VersionMissPolicy::FallbackToLatest => {
                debug!(
                    "{} version {} not found, using {}",
                    label,
                    requested,
                    latest.version().unwrap_or("unversioned")
                );
                Ok(Some(latest))
            }
            VersionMissPolicy::Fail => Err(SelectionError::VersionNotFound {
                name: label.to_string(),
                requested: requested.to_string(),
                latest: latest.version().map(String::from),
            }),
        }
    }
}
