//! Table-driven FHIR version dispatch
//!
//! A [`VersionDispatch`] maps half-open version ranges to either a supported
//! target or an explicit "not implemented" sentinel. The table is checked at
//! construction: every [`FhirVersion`] must be claimed by exactly one range,
//! so no release silently falls through to a neighbor.

use crate::FhirVersion;
use octofhir_cr_diagnostics::{CR0400, CR0401, CrError};
use std::fmt;
use thiserror::Error;

/// Half-open version interval `[from, until)`; `until = None` is unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VersionRange {
    from: FhirVersion,
    until: Option<FhirVersion>,
}

impl VersionRange {
    pub const fn new(from: FhirVersion, until: FhirVersion) -> Self {
        Self {
            from,
            until: Some(until),
        }
    }

    pub const fn starting_at(from: FhirVersion) -> Self {
        Self { from, until: None }
    }

    pub fn contains(&self, version: FhirVersion) -> bool {
        version.is_equal_or_newer_than(self.from)
            && self.until.is_none_or(|until| version.is_older_than(until))
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.until {
            Some(until) => write!(f, "[{}, {})", self.from, until),
            None => write!(f, "[{}, ..)", self.from),
        }
    }
}

/// Dispatch failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("{component} is not implemented for FHIR {version} (range {range})")]
    NotImplemented {
        component: String,
        version: FhirVersion,
        range: VersionRange,
    },

    #[error("{component} dispatch table does not cover FHIR {version}")]
    Gap {
        component: String,
        version: FhirVersion,
    },

    #[error("{component} dispatch table claims FHIR {version} {count} times")]
    Overlap {
        component: String,
        version: FhirVersion,
        count: usize,
    },
}

impl From<DispatchError> for CrError {
    fn from(err: DispatchError) -> Self {
        match &err {
            DispatchError::NotImplemented { component, .. } => {
                CrError::unsupported(CR0400, err.to_string()).with_context(component.clone())
            }
            DispatchError::Gap { component, .. } | DispatchError::Overlap { component, .. } => {
                CrError::unsupported(CR0401, err.to_string()).with_context(component.clone())
            }
        }
    }
}

/// Target of a dispatch range
#[derive(Debug, Clone)]
pub enum Branch<T> {
    Supported(T),
    NotImplemented,
}

/// Validated version dispatch table
#[derive(Debug, Clone)]
pub struct VersionDispatch<T> {
    component: String,
    branches: Vec<(VersionRange, Branch<T>)>,
}

impl<T> VersionDispatch<T> {
    pub fn builder(component: impl Into<String>) -> VersionDispatchBuilder<T> {
        VersionDispatchBuilder {
            component: component.into(),
            branches: Vec::new(),
        }
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    /// Select the target claiming `version`
    pub fn dispatch(&self, version: FhirVersion) -> Result<&T, DispatchError> {
        let (range, branch) = self
            .branches
            .iter()
            .find(|(range, _)| range.contains(version))
            .ok_or_else(|| DispatchError::Gap {
                component: self.component.clone(),
                version,
            })?;

        match branch {
            Branch::Supported(target) => Ok(target),
            Branch::NotImplemented => Err(DispatchError::NotImplemented {
                component: self.component.clone(),
                version,
                range: *range,
            }),
        }
    }

    /// Every range claiming `version` (exactly one in a validated table)
    pub fn ranges_for(&self, version: FhirVersion) -> Vec<VersionRange> {
        self.branches
            .iter()
            .filter(|(range, _)| range.contains(version))
            .map(|(range, _)| *range)
            .collect()
    }

    pub fn supports(&self, version: FhirVersion) -> bool {
        self.dispatch(version).is_ok()
    }

    /// Apply `f` to every supported target, keeping the ranges
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> VersionDispatch<U> {
        VersionDispatch {
            component: self.component,
            branches: self
                .branches
                .into_iter()
                .map(|(range, branch)| {
                    let branch = match branch {
                        Branch::Supported(target) => Branch::Supported(f(target)),
                        Branch::NotImplemented => Branch::NotImplemented,
                    };
                    (range, branch)
                })
                .collect(),
        }
    }
}

/// Builder for [`VersionDispatch`]
pub struct VersionDispatchBuilder<T> {
    component: String,
    branches: Vec<(VersionRange, Branch<T>)>,
}

impl<T> VersionDispatchBuilder<T> {
    pub fn supported(mut self, range: VersionRange, target: T) -> Self {
        self.branches.push((range, Branch::Supported(target)));
        self
    }

    pub fn not_implemented(mut self, range: VersionRange) -> Self {
        self.branches.push((range, Branch::NotImplemented));
        self
    }

    /// Validate that the ranges partition every known FHIR version
    pub fn build(self) -> Result<VersionDispatch<T>, DispatchError> {
        for version in FhirVersion::ALL {
            let count = self
                .branches
                .iter()
                .filter(|(range, _)| range.contains(version))
                .count();
            match count {
                1 => {}
                0 => {
                    return Err(DispatchError::Gap {
                        component: self.component,
                        version,
                    });
                }
                _ => {
                    return Err(DispatchError::Overlap {
                        component: self.component,
                        version,
                        count,
                    });
                }
            }
        }

        Ok(VersionDispatch {
            component: self.component,
            branches: self.branches,
        })
    }
}
