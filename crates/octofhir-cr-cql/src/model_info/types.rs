//! ModelInfo document structure

use crate::identifier::ModelIdentifier;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A parsed ModelInfo document describing a data model (e.g. FHIR 4.0.1)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub name: String,
    pub version: Option<String>,
    /// Namespace URL of the model
    pub url: Option<String>,
    pub target_qualifier: Option<String>,
    pub patient_class_name: Option<String>,
    pub patient_birth_date_property_name: Option<String>,
    /// Models this one builds on (e.g. `System`)
    pub required_models: Vec<ModelIdentifier>,
    pub contexts: Vec<ContextInfo>,
    /// Types keyed by unqualified name, in document order
    pub types: IndexMap<String, TypeInfo>,
}

impl ModelInfo {
    pub fn new(name: impl Into<String>, version: Option<&str>) -> Self {
        Self {
            name: name.into(),
            version: version.map(String::from),
            url: None,
            target_qualifier: None,
            patient_class_name: None,
            patient_birth_date_property_name: None,
            required_models: Vec::new(),
            contexts: Vec::new(),
            types: IndexMap::new(),
        }
    }

    pub fn identifier(&self) -> ModelIdentifier {
        let identifier = ModelIdentifier::new(self.name.clone(), self.version.as_deref());
        match &self.url {
            Some(url) => identifier.with_system(url.clone()),
            None => identifier,
        }
    }

    /// Look a type up by plain (`Observation`) or qualified
    /// (`FHIR.Observation`) name
    pub fn get_type(&self, name: &str) -> Option<&TypeInfo> {
        self.types.get(self.unqualified(name))
    }

    pub fn context(&self, name: &str) -> Option<&ContextInfo> {
        self.contexts.iter().find(|c| c.name == name)
    }

    /// Element of `type_name`, searching base types
    pub fn get_element(&self, type_name: &str, element: &str) -> Option<&ElementInfo> {
        self.ancestry(type_name).find_map(|t| t.get_element(element))
    }

    pub fn is_retrievable(&self, type_name: &str) -> bool {
        self.get_type(type_name).is_some_and(|t| t.retrievable)
    }

    pub fn primary_code_path(&self, type_name: &str) -> Option<&str> {
        self.ancestry(type_name).find_map(|t| t.primary_code_path.as_deref())
    }

    pub fn is_derived_from(&self, child: &str, parent: &str) -> bool {
        let parent = self.unqualified(parent);
        self.ancestry(child).any(|t| t.name == parent)
    }

    pub fn retrievable_types(&self) -> impl Iterator<Item = &str> {
        self.types.values().filter(|t| t.retrievable).map(|t| t.name.as_str())
    }

    /// `type_name` followed by its base types; stops at the first base type
    /// outside this model
    fn ancestry<'a>(&'a self, type_name: &str) -> impl Iterator<Item = &'a TypeInfo> + 'a {
        let mut next = self.get_type(type_name);
        let mut remaining = self.types.len();
        std::iter::from_fn(move || {
            let current = next.take()?;
            // Guards against malformed cyclic base type chains
            remaining = remaining.checked_sub(1)?;
            next = current.base_type.as_deref().and_then(|base| self.get_type(base));
            Some(current)
        })
    }

    fn unqualified<'n>(&self, name: &'n str) -> &'n str {
        match name.split_once('.') {
            Some((qualifier, rest)) if qualifier == self.name => rest,
            _ => name,
        }
    }
}

/// A context (e.g. `Patient`) with its key element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextInfo {
    pub name: String,
    pub key_element: Option<String>,
    pub birth_date_element: Option<String>,
}

/// A type definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeInfo {
    pub name: String,
    pub namespace: Option<String>,
    pub base_type: Option<String>,
    pub retrievable: bool,
    pub primary_code_path: Option<String>,
    pub elements: Vec<ElementInfo>,
}

impl TypeInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            base_type: None,
            retrievable: false,
            primary_code_path: None,
            elements: Vec::new(),
        }
    }

    pub fn get_element(&self, name: &str) -> Option<&ElementInfo> {
        self.elements.iter().find(|e| e.name == name)
    }
}

/// An element of a type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementInfo {
    pub name: String,
    pub element_type: String,
    pub is_list: bool,
    pub target: Option<String>,
}

impl ElementInfo {
    /// Build from a declared type, unwrapping `list<T>`
    pub fn new(name: impl Into<String>, declared_type: &str) -> Self {
        let (element_type, is_list) = unwrap_list_type(declared_type);
        Self {
            name: name.into(),
            element_type: element_type.to_string(),
            is_list,
            target: None,
        }
    }
}

pub(crate) fn unwrap_list_type(declared: &str) -> (&str, bool) {
    declared
        .strip_prefix("list<")
        .or_else(|| declared.strip_prefix("List<"))
        .and_then(|inner| inner.strip_suffix('>'))
        .map_or((declared, false), |inner| (inner, true))
}
