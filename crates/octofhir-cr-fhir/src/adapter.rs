//! Per-version capability adapters
//!
//! Everything that differs between FHIR releases for the resolution
//! pipeline lives behind [`VersionAdapter`]. The adapter for a release is
//! looked up once, through [`adapter_for`], at the boundary where a
//! repository or bundle enters the pipeline.

use crate::dispatch::{DispatchError, VersionDispatch, VersionRange};
use crate::FhirVersion;
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, LazyLock};

/// SDC launch context extension
pub const SDC_LAUNCH_CONTEXT_URL: &str =
    "http://hl7.org/fhir/uv/sdc/StructureDefinition/sdc-questionnaire-launchContext";

/// What input parameter resolution does with a launch context that has no
/// resolvable content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchContextPolicy {
    /// Leave the context out of the parameter set
    Skip,
    /// Fail the resolution
    Fail,
}

/// A launch context declared on a Questionnaire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchContextDefinition {
    pub name: String,
    /// Accepted resource types
    pub types: Vec<String>,
    pub description: Option<String>,
}

/// Version-specific behavior of the resolution pipeline
pub trait VersionAdapter: Send + Sync + fmt::Debug {
    fn fhir_version(&self) -> FhirVersion;

    /// Version of the FHIR ModelInfo matching this release
    fn model_info_version(&self) -> &'static str;

    fn launch_context_policy(&self) -> LaunchContextPolicy;

    /// Path from `resource_type` to the context resource (e.g. the patient
    /// reference of an Observation for the `Patient` context)
    fn context_path(&self, context_type: &str, resource_type: &str) -> Option<&'static str>;

    /// Decode a launch context extension
    fn launch_context(&self, extension: &Value) -> Option<LaunchContextDefinition> {
        decode_launch_context(extension)
    }
}

fn decode_launch_context(extension: &Value) -> Option<LaunchContextDefinition> {
    if extension.get("url").and_then(Value::as_str) != Some(SDC_LAUNCH_CONTEXT_URL) {
        return None;
    }
    let parts = extension.get("extension")?.as_array()?;

    let name = sub_extensions(parts, "name").find_map(|p| {
        p.pointer("/valueCoding/code")
            .or_else(|| p.get("valueId"))
            .or_else(|| p.get("valueCode"))
            .and_then(Value::as_str)
    })?;
    let types = sub_extensions(parts, "type")
        .filter_map(|p| p.get("valueCode").and_then(Value::as_str))
        .map(String::from)
        .collect();
    let description = sub_extensions(parts, "description")
        .find_map(|p| p.get("valueString").and_then(Value::as_str))
        .map(String::from);

    Some(LaunchContextDefinition {
        name: name.to_string(),
        types,
        description,
    })
}

fn sub_extensions<'a>(parts: &'a [Value], url: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
    parts
        .iter()
        .filter(move |p| p.get("url").and_then(Value::as_str) == Some(url))
}

/// Patient compartment paths shared by every supported release
fn common_patient_path(resource_type: &str) -> Option<&'static str> {
    match resource_type {
        "Patient" => Some("id"),
        "Observation" | "Condition" | "Procedure" | "Encounter" | "DiagnosticReport"
        | "MedicationRequest" | "MedicationAdministration" | "MedicationDispense"
        | "CarePlan" | "Goal" | "DocumentReference" | "QuestionnaireResponse" | "Flag" => {
            Some("subject")
        }
        "AllergyIntolerance" | "Immunization" | "Claim" => Some("patient"),
        "Coverage" => Some("beneficiary"),
        _ => None,
    }
}

#[derive(Debug)]
struct Dstu3Adapter;

impl VersionAdapter for Dstu3Adapter {
    fn fhir_version(&self) -> FhirVersion {
        FhirVersion::Dstu3
    }

    fn model_info_version(&self) -> &'static str {
        "3.0.0"
    }

    fn launch_context_policy(&self) -> LaunchContextPolicy {
        LaunchContextPolicy::Skip
    }

    fn context_path(&self, context_type: &str, resource_type: &str) -> Option<&'static str> {
        if context_type != "Patient" {
            return None;
        }
        match resource_type {
            "ProcedureRequest" | "ReferralRequest" | "MedicationStatement" => Some("subject"),
            "Coverage" => Some("beneficiary"),
            other => common_patient_path(other),
        }
    }
}

#[derive(Debug)]
struct R4Adapter {
    version: FhirVersion,
}

impl VersionAdapter for R4Adapter {
    fn fhir_version(&self) -> FhirVersion {
        self.version
    }

    fn model_info_version(&self) -> &'static str {
        "4.0.1"
    }

    fn launch_context_policy(&self) -> LaunchContextPolicy {
        LaunchContextPolicy::Skip
    }

    fn context_path(&self, context_type: &str, resource_type: &str) -> Option<&'static str> {
        if context_type != "Patient" {
            return None;
        }
        match resource_type {
            "ServiceRequest" | "MedicationStatement" | "DeviceRequest" => Some("subject"),
            other => common_patient_path(other),
        }
    }
}

#[derive(Debug)]
struct R5Adapter;

impl VersionAdapter for R5Adapter {
    fn fhir_version(&self) -> FhirVersion {
        FhirVersion::R5
    }

    fn model_info_version(&self) -> &'static str {
        "5.0.0"
    }

    fn launch_context_policy(&self) -> LaunchContextPolicy {
        LaunchContextPolicy::Fail
    }

    fn context_path(&self, context_type: &str, resource_type: &str) -> Option<&'static str> {
        if context_type != "Patient" {
            return None;
        }
        match resource_type {
            "ServiceRequest" | "MedicationStatement" | "DeviceRequest" | "NutritionIntake" => {
                Some("subject")
            }
            other => common_patient_path(other),
        }
    }
}

static ADAPTERS: LazyLock<Result<VersionDispatch<Arc<dyn VersionAdapter>>, DispatchError>> =
    LazyLock::new(|| {
        VersionDispatch::builder("FHIR version adapter")
            .not_implemented(VersionRange::new(FhirVersion::Dstu2, FhirVersion::Dstu3))
            .supported(
                VersionRange::new(FhirVersion::Dstu3, FhirVersion::R4),
                Arc::new(Dstu3Adapter) as Arc<dyn VersionAdapter>,
            )
            .supported(
                VersionRange::new(FhirVersion::R4, FhirVersion::R4B),
                Arc::new(R4Adapter {
                    version: FhirVersion::R4,
                }) as Arc<dyn VersionAdapter>,
            )
            .supported(
                VersionRange::new(FhirVersion::R4B, FhirVersion::R5),
                Arc::new(R4Adapter {
                    version: FhirVersion::R4B,
                }) as Arc<dyn VersionAdapter>,
            )
            .supported(
                VersionRange::starting_at(FhirVersion::R5),
                Arc::new(R5Adapter) as Arc<dyn VersionAdapter>,
            )
            .build()
    });

/// The process-wide, validated adapter table
pub fn adapter_dispatch() -> Result<&'static VersionDispatch<Arc<dyn VersionAdapter>>, DispatchError> {
    ADAPTERS.as_ref().map_err(Clone::clone)
}

/// Adapter for `version`, or a "not implemented" error for unsupported
/// releases
pub fn adapter_for(version: FhirVersion) -> Result<Arc<dyn VersionAdapter>, DispatchError> {
    adapter_dispatch()?.dispatch(version).cloned()
}
