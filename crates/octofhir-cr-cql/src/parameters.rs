//! Evaluation parameters
//!
//! An ordered multiset of named values mirroring the FHIR `Parameters`
//! resource. Names may repeat and insertion order is kept.

use octofhir_cr_diagnostics::{CR0001, CR0002, CR0108, CrError};
use serde_json::{Map, Value, json};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParameterError {
    #[error("parameter at position {index} has no name")]
    MissingName { index: usize },

    #[error("parameter {name} carries neither a value, a resource nor parts")]
    MissingValue { name: String },

    #[error("expected a Parameters resource, found {found}")]
    NotParameters { found: String },

    #[error("launch context {name} could not be resolved")]
    LaunchContextNotResolved { name: String },
}

impl From<ParameterError> for CrError {
    fn from(err: ParameterError) -> Self {
        let message = err.to_string();
        match err {
            ParameterError::MissingName { .. } => CrError::precondition(CR0002, message),
            ParameterError::MissingValue { .. } | ParameterError::NotParameters { .. } => {
                CrError::precondition(CR0001, message)
            }
            ParameterError::LaunchContextNotResolved { name } => {
                CrError::resolution(CR0108, message).with_context(name)
            }
        }
    }
}

/// Value of one parameter
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    Resource(Value),
    /// A `value[x]` element; `kind` is the type suffix (`String`,
    /// `Reference`, `Coding`...)
    Primitive { kind: String, value: Value },
    Parts(Vec<Parameter>),
}

impl ParameterValue {
    pub fn string(value: impl Into<String>) -> Self {
        Self::Primitive {
            kind: "String".to_string(),
            value: Value::String(value.into()),
        }
    }

    pub fn boolean(value: bool) -> Self {
        Self::Primitive {
            kind: "Boolean".to_string(),
            value: Value::Bool(value),
        }
    }

    pub fn reference(reference: impl Into<String>) -> Self {
        Self::Primitive {
            kind: "Reference".to_string(),
            value: json!({ "reference": reference.into() }),
        }
    }

    pub fn as_resource(&self) -> Option<&Value> {
        match self {
            Self::Resource(resource) => Some(resource),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub value: ParameterValue,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: ParameterValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    fn from_json(index: usize, json: &Value) -> Result<Self, ParameterError> {
        let name = json
            .get("name")
            .and_then(Value::as_str)
            .ok_or(ParameterError::MissingName { index })?
            .to_string();

        if let Some(resource) = json.get("resource") {
            return Ok(Self::new(name, ParameterValue::Resource(resource.clone())));
        }
        if let Some(parts) = json.get("part").and_then(Value::as_array) {
            let parts = parts
                .iter()
                .enumerate()
                .map(|(i, part)| Parameter::from_json(i, part))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(Self::new(name, ParameterValue::Parts(parts)));
        }
        let primitive = json.as_object().and_then(|object| {
            object
                .iter()
                .find_map(|(key, value)| key.strip_prefix("value").map(|kind| (kind, value)))
        });
        match primitive {
            Some((kind, value)) if !kind.is_empty() => Ok(Self::new(
                name,
                ParameterValue::Primitive {
                    kind: kind.to_string(),
                    value: value.clone(),
                },
            )),
            _ => Err(ParameterError::MissingValue { name }),
        }
    }

    fn to_json(&self) -> Value {
        let mut object = Map::new();
        object.insert("name".to_string(), Value::String(self.name.clone()));
        match &self.value {
            ParameterValue::Resource(resource) => {
                object.insert("resource".to_string(), resource.clone());
            }
            ParameterValue::Primitive { kind, value } => {
                object.insert(format!("value{kind}"), value.clone());
            }
            ParameterValue::Parts(parts) => {
                object.insert("part".to_string(), parts.iter().map(Parameter::to_json).collect());
            }
        }
        Value::Object(object)
    }
}

/// Append-only ordered parameter list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSet {
    parameters: Vec<Parameter>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: ParameterValue) {
        self.parameters.push(Parameter::new(name, value));
    }

    pub fn with(mut self, name: impl Into<String>, value: ParameterValue) -> Self {
        self.push(name, value);
        self
    }

    pub fn extend_from(&mut self, other: &ParameterSet) {
        self.parameters.extend(other.parameters.iter().cloned());
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.iter()
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// First parameter named `name`
    pub fn get(&self, name: &str) -> Option<&ParameterValue> {
        self.parameters.iter().find(|p| p.name == name).map(|p| &p.value)
    }

    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a ParameterValue> + 'a {
        self.parameters
            .iter()
            .filter(move |p| p.name == name)
            .map(|p| &p.value)
    }

    pub fn names(&self) -> Vec<&str> {
        self.parameters.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn from_resource(resource: &Value) -> Result<Self, ParameterError> {
        let kind = resource.get("resourceType").and_then(Value::as_str).unwrap_or("nothing");
        if kind != "Parameters" {
            return Err(ParameterError::NotParameters {
                found: kind.to_string(),
            });
        }
        let parameters = resource
            .get("parameter")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .enumerate()
                    .map(|(index, entry)| Parameter::from_json(index, entry))
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?
            .unwrap_or_default();
        Ok(Self { parameters })
    }

    pub fn to_resource(&self) -> Value {
        let parameters: Vec<Value> = self.parameters.iter().map(Parameter::to_json).collect();
        json!({ "resourceType": "Parameters", "parameter": parameters })
    }
}

impl<'a> IntoIterator for &'a ParameterSet {
    type Item = &'a Parameter;
    type IntoIter = std::slice::Iter<'a, Parameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.parameters.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_from_resource_keeps_order_and_duplicates() {
        let resource = json!({
            "resourceType": "Parameters",
            "parameter": [
                { "name": "Measurement Period", "valuePeriod": { "start": "2024-01-01" } },
                { "name": "code", "valueString": "a" },
                { "name": "code", "valueString": "b" },
                { "name": "patient", "resource": { "resourceType": "Patient", "id": "p1" } },
                { "name": "group", "part": [{ "name": "flag", "valueBoolean": true }] }
            ]
        });
        let set = ParameterSet::from_resource(&resource).unwrap();
        assert_eq!(set.names(), vec!["Measurement Period", "code", "code", "patient", "group"]);
        assert_eq!(set.get("code"), Some(&ParameterValue::string("a")));
        assert_eq!(set.get_all("code").count(), 2);
        assert_eq!(set.get("patient").and_then(ParameterValue::as_resource).unwrap()["id"], "p1");
        assert_eq!(set.to_resource(), resource);
    }

    #[test]
    fn test_malformed_parameters() {
        let no_name = json!({ "resourceType": "Parameters", "parameter": [{ "valueString": "x" }] });
        assert_eq!(
            ParameterSet::from_resource(&no_name),
            Err(ParameterError::MissingName { index: 0 })
        );

        let no_value = json!({ "resourceType": "Parameters", "parameter": [{ "name": "x" }] });
        assert!(matches!(
            ParameterSet::from_resource(&no_value),
            Err(ParameterError::MissingValue { .. })
        ));

        let wrong_type = json!({ "resourceType": "Bundle" });
        assert!(matches!(
            ParameterSet::from_resource(&wrong_type),
            Err(ParameterError::NotParameters { .. })
        ));
    }

    #[test]
    fn test_append_only_builder() {
        let mut base = ParameterSet::new().with("a", ParameterValue::boolean(true));
        let other = ParameterSet::new().with("a", ParameterValue::boolean(false));
        base.extend_from(&other);
        assert_eq!(base.len(), 2);
        assert_eq!(base.get("a"), Some(&ParameterValue::boolean(true)));
    }
}
