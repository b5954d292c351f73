use super::valueset::{expand_value_set, select_value_set};
use super::{Code, CodeSystemInfo, TerminologyProvider, ValueSetInfo, in_expansion, lookup_in_system};
use async_trait::async_trait;
use octofhir_cr_diagnostics::Result;
use octofhir_cr_fhir::FhirVersion;
use octofhir_cr_fhir::bundle::resources_of_type;
use serde_json::Value;

/// Terminology over the ValueSets carried in a bundle
pub struct BundleTerminologyProvider {
    value_sets: Vec<Value>,
    fhir_version: FhirVersion,
}

impl BundleTerminologyProvider {
    pub fn new(bundle: &Value, fhir_version: FhirVersion) -> Self {
        Self {
            value_sets: resources_of_type(bundle, "ValueSet").cloned().collect(),
            fhir_version,
        }
    }
}

#[async_trait]
impl TerminologyProvider for BundleTerminologyProvider {
    fn fhir_version(&self) -> FhirVersion {
        self.fhir_version
    }

    async fn in_value_set(&self, code: &Code, value_set: &ValueSetInfo) -> Result<bool> {
        in_expansion(self, code, value_set).await
    }

    async fn expand(&self, value_set: &ValueSetInfo) -> Result<Vec<Code>> {
        let selected = select_value_set(value_set, &self.value_sets)?;
        Ok(expand_value_set(selected)?)
    }

    async fn lookup(&self, code: &Code, code_system: &CodeSystemInfo) -> Result<Option<Code>> {
        Ok(lookup_in_system(code, code_system))
    }
}
