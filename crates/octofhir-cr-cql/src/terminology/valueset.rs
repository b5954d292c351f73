//! ValueSet expansion and version selection

use super::{Code, TerminologyError, ValueSetInfo};
use octofhir_cr_fhir::{VersionedResource, resource_id};
use octofhir_cr_utility::compare_versions;
use serde_json::Value;
use std::cmp::Ordering;

const OID_PREFIX: &str = "urn:oid:";

/// How a [`ValueSetInfo`] id addresses its ValueSet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSetAddress<'a> {
    Url(&'a str),
    /// `urn:oid:` identifier
    Identifier(&'a str),
    Id(&'a str),
}

impl<'a> ValueSetAddress<'a> {
    pub fn of(info: &'a ValueSetInfo) -> Self {
        let id = info.id.as_str();
        if id.starts_with(OID_PREFIX) {
            ValueSetAddress::Identifier(id)
        } else if id.contains("://") {
            ValueSetAddress::Url(id)
        } else {
            ValueSetAddress::Id(id.rsplit('/').next().unwrap_or(id))
        }
    }

    pub fn matches(&self, value_set: &Value) -> bool {
        match *self {
            ValueSetAddress::Url(url) => value_set.url() == Some(url),
            ValueSetAddress::Id(id) => resource_id(value_set) == Some(id),
            ValueSetAddress::Identifier(oid) => identifiers(value_set).any(|value| value == oid),
        }
    }
}

fn identifiers(value_set: &Value) -> impl Iterator<Item = &str> {
    let identifier = value_set.get("identifier");
    // DSTU3 carries a single identifier, later releases a list
    let many = identifier.and_then(Value::as_array).into_iter().flatten();
    let single = identifier.filter(|i| i.is_object()).into_iter();
    many.chain(single).filter_map(|i| i.get("value").and_then(Value::as_str))
}

/// Pick the requested version, or the latest one when no version is
/// requested, among ValueSets matching `info`
pub fn select_value_set<'a>(info: &ValueSetInfo, candidates: &'a [Value]) -> Result<&'a Value, TerminologyError> {
    let address = ValueSetAddress::of(info);
    let matching = candidates.iter().filter(|vs| address.matches(vs));

    let selected = match info.version.as_deref() {
        Some(version) => matching.into_iter().find(|vs| vs.version() == Some(version)),
        None => matching.fold(None, |latest: Option<&Value>, vs| match latest {
            Some(current) if compare_versions(vs.version(), current.version()) != Ordering::Greater => Some(current),
            _ => Some(vs),
        }),
    };

    selected.ok_or_else(|| TerminologyError::ValueSetNotFound { id: describe(info) })
}

fn describe(info: &ValueSetInfo) -> String {
    match &info.version {
        Some(version) => format!("{}|{}", info.id, version),
        None => info.id.clone(),
    }
}

/// Codes of a ValueSet: the pre-computed expansion when present, else the
/// codes listed by a plain compose
pub fn expand_value_set(value_set: &Value) -> Result<Vec<Code>, TerminologyError> {
    if let Some(expansion) = value_set.get("expansion") {
        let mut codes = Vec::new();
        collect_contains(expansion, &mut codes);
        return Ok(codes);
    }

    let Some(compose) = value_set.get("compose") else {
        return Ok(Vec::new());
    };
    let label = value_set
        .url()
        .or_else(|| resource_id(value_set))
        .unwrap_or("(anonymous)")
        .to_string();

    let mut codes = Vec::new();
    for include in array(compose, "include") {
        codes.extend(concept_set(&label, include, "include")?);
    }
    let mut excluded = Vec::new();
    for exclude in array(compose, "exclude") {
        excluded.extend(concept_set(&label, exclude, "exclude")?);
    }
    codes.retain(|code| !excluded.iter().any(|ex| ex.matches(code)));
    Ok(codes)
}

fn collect_contains(node: &Value, codes: &mut Vec<Code>) {
    for entry in array(node, "contains") {
        if let Some(code) = entry.get("code").and_then(Value::as_str) {
            codes.push(Code {
                code: code.to_string(),
                system: str_field(entry, "system"),
                version: str_field(entry, "version"),
                display: str_field(entry, "display"),
            });
        }
        // Hierarchical expansions nest further entries
        collect_contains(entry, codes);
    }
}

fn concept_set(label: &str, set: &Value, kind: &str) -> Result<Vec<Code>, TerminologyError> {
    let unsupported = |reason: String| TerminologyError::UnsupportedCompose {
        id: label.to_string(),
        reason,
    };

    if array(set, "filter").next().is_some() {
        return Err(unsupported(format!("{kind} uses filters")));
    }
    if array(set, "valueSet").next().is_some() {
        return Err(unsupported(format!("{kind} imports other value sets")));
    }

    let system = str_field(set, "system");
    let version = str_field(set, "version");
    let concepts: Vec<&Value> = array(set, "concept").collect();
    if concepts.is_empty() {
        return Err(unsupported(format!(
            "{kind} of all of {} cannot be enumerated",
            system.as_deref().unwrap_or("an unnamed system")
        )));
    }

    Ok(concepts
        .into_iter()
        .filter_map(|concept| {
            Some(Code {
                code: concept.get("code")?.as_str()?.to_string(),
                system: system.clone(),
                version: version.clone(),
                display: str_field(concept, "display"),
            })
        })
        .collect())
}

fn array<'a>(node: &'a Value, key: &str) -> impl Iterator<Item = &'a Value> + use<'a> {
    node.get(key).and_then(Value::as_array).into_iter().flatten()
}

fn str_field(node: &Value, key: &str) -> Option<String> {
    node.get(key).and_then(Value::as_str).map(String::from)
}
