//! Builders for FHIR test resources

use octofhir_cr_fhir::attachment;
use serde_json::{Value, json};

pub fn cql_library(name: &str, version: Option<&str>, source: &str) -> Value {
    let mut library = json!({
        "resourceType": "Library",
        "id": match version {
            Some(v) => format!("{name}-{}", v.replace('.', "-")),
            None => name.to_string(),
        },
        "url": format!("http://example.org/fhir/Library/{name}"),
        "name": name,
        "status": "active",
        "content": [attachment("text/cql", source.as_bytes())]
    });
    if let Some(version) = version {
        library["version"] = json!(version);
    }
    library
}

/// Library `name` at `version` whose CQL header names the same version
pub fn versioned_library(name: &str, version: &str) -> Value {
    cql_library(name, Some(version), &format!("library {name} version '{version}'"))
}

pub fn value_set(url: &str, version: Option<&str>, system: &str, codes: &[&str]) -> Value {
    let concepts: Vec<Value> = codes.iter().map(|code| json!({ "code": code })).collect();
    let mut value_set = json!({
        "resourceType": "ValueSet",
        "url": url,
        "compose": { "include": [{ "system": system, "concept": concepts }] }
    });
    if let Some(version) = version {
        value_set["version"] = json!(version);
    }
    value_set
}

pub fn patient(id: &str) -> Value {
    json!({ "resourceType": "Patient", "id": id })
}

pub fn observation(id: &str, patient: &str, system: &str, code: &str) -> Value {
    json!({
        "resourceType": "Observation",
        "id": id,
        "status": "final",
        "subject": { "reference": format!("Patient/{patient}") },
        "code": { "coding": [{ "system": system, "code": code }] }
    })
}
