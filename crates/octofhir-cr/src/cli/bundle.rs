//! Bundle and settings loading shared by the commands

use anyhow::{Context, Result, anyhow};
use octofhir_cr_cql::EvaluationSettings;
use octofhir_cr_fhir::FhirVersion;
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Read a JSON Bundle from disk
pub fn load_bundle(path: &Path) -> Result<Value> {
    let text = fs::read_to_string(path).with_context(|| format!("Failed to read bundle: {}", path.display()))?;
    let bundle: Value =
        serde_json::from_str(&text).with_context(|| format!("Failed to parse bundle: {}", path.display()))?;
    match bundle.get("resourceType").and_then(Value::as_str) {
        Some("Bundle") => Ok(bundle),
        other => Err(anyhow!(
            "{} is not a Bundle (resourceType {})",
            path.display(),
            other.unwrap_or("missing")
        )),
    }
}

pub fn parse_fhir_version(value: &str) -> Result<FhirVersion> {
    FhirVersion::parse(value).ok_or_else(|| anyhow!("Unknown FHIR version '{value}'"))
}

/// Settings from `path`, or the defaults
pub fn load_settings(path: Option<&Path>) -> Result<EvaluationSettings> {
    match path {
        Some(path) => EvaluationSettings::from_file(path)
            .with_context(|| format!("Invalid settings file: {}", path.display())),
        None => Ok(EvaluationSettings::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_bundle_rejects_other_resources() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"resourceType": "Patient"}}"#).unwrap();
        let err = load_bundle(file.path()).unwrap_err();
        assert!(err.to_string().contains("resourceType Patient"));
    }

    #[test]
    fn test_parse_fhir_version() {
        assert_eq!(parse_fhir_version("4.0.1").unwrap(), FhirVersion::R4);
        assert!(parse_fhir_version("r9").is_err());
    }
}
