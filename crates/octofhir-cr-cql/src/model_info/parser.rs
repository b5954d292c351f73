//! ModelInfo parsing for the XML and JSON representations
//!
//! Reference: http://cql.hl7.org/07-physicalrepresentation.html#modelinfo

use super::types::{ContextInfo, ElementInfo, ModelInfo, TypeInfo, unwrap_list_type};
use crate::content::ModelInfoContentType;
use crate::identifier::ModelIdentifier;
use octofhir_cr_diagnostics::{CR0106, CrError};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelInfoError {
    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML attribute error: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),

    #[error("XML escape error: {0}")]
    Escape(#[from] quick_xml::escape::EscapeError),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("model info is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    #[error("invalid model info structure: {0}")]
    InvalidStructure(String),
}

impl From<ModelInfoError> for CrError {
    fn from(err: ModelInfoError) -> Self {
        CrError::resolution(CR0106, err.to_string())
    }
}

/// Parse raw model info content of the given representation
pub fn parse(content: &[u8], content_type: ModelInfoContentType) -> Result<ModelInfo, ModelInfoError> {
    let text = std::str::from_utf8(content)?;
    match content_type {
        ModelInfoContentType::Xml => parse_xml(text),
        ModelInfoContentType::Json => parse_json(text),
    }
}

fn attributes(element: &BytesStart<'_>) -> Result<HashMap<String, String>, ModelInfoError> {
    let mut map = HashMap::new();
    for attr in element.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).to_string();
        let raw = String::from_utf8_lossy(&attr.value);
        let value = quick_xml::escape::unescape(&raw)?.into_owned();
        map.insert(key, value);
    }
    Ok(map)
}

fn local_name(element: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(element.local_name().as_ref()).to_string()
}

fn type_info_from(attrs: &HashMap<String, String>) -> TypeInfo {
    let mut type_info = TypeInfo::new(attrs.get("name").cloned().unwrap_or_default());
    type_info.namespace = attrs.get("namespace").cloned();
    type_info.base_type = attrs.get("baseType").cloned();
    type_info.retrievable = attrs.get("retrievable").is_some_and(|v| v == "true");
    type_info.primary_code_path = attrs.get("primaryCodePath").cloned();
    type_info
}

fn element_info_from(attrs: &HashMap<String, String>) -> ElementInfo {
    let declared = attrs
        .get("elementType")
        .or_else(|| attrs.get("type"))
        .map(String::as_str)
        .unwrap_or_default();
    let mut element = ElementInfo::new(attrs.get("name").cloned().unwrap_or_default(), declared);
    element.target = attrs.get("target").cloned();
    element
}

fn context_info_from(attrs: &HashMap<String, String>) -> ContextInfo {
    ContextInfo {
        name: attrs.get("name").cloned().unwrap_or_default(),
        key_element: attrs.get("keyElement").cloned(),
        birth_date_element: attrs.get("birthDateElement").cloned(),
    }
}

fn is_type_tag(tag: &str) -> bool {
    matches!(tag, "typeInfo" | "classInfo" | "simpleTypeInfo" | "profileInfo")
}

/// Parse the XML representation
pub fn parse_xml(xml: &str) -> Result<ModelInfo, ModelInfoError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut model: Option<ModelInfo> = None;
    let mut current_type: Option<TypeInfo> = None;
    let mut current_element: Option<ElementInfo> = None;

    loop {
        let event = reader.read_event()?;
        let (start, is_empty) = match &event {
            Event::Start(e) => (Some(e), false),
            Event::Empty(e) => (Some(e), true),
            Event::End(e) => {
                let tag = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                if tag == "element" {
                    if let (Some(element), Some(type_info)) = (current_element.take(), current_type.as_mut()) {
                        type_info.elements.push(element);
                    }
                } else if is_type_tag(&tag) {
                    if let (Some(type_info), Some(model)) = (current_type.take(), model.as_mut()) {
                        model.types.insert(type_info.name.clone(), type_info);
                    }
                }
                (None, false)
            }
            Event::Eof => break,
            _ => (None, false),
        };

        let Some(start) = start else { continue };
        let tag = local_name(start);
        let attrs = attributes(start)?;

        match tag.as_str() {
            "modelInfo" => {
                let mut info = ModelInfo::new(
                    attrs.get("name").cloned().unwrap_or_default(),
                    attrs.get("version").map(String::as_str),
                );
                info.url = attrs.get("url").cloned();
                info.target_qualifier = attrs.get("targetQualifier").cloned();
                info.patient_class_name = attrs.get("patientClassName").cloned();
                info.patient_birth_date_property_name = attrs.get("patientBirthDatePropertyName").cloned();
                model = Some(info);
            }
            "requiredModelInfo" => {
                if let (Some(model), Some(name)) = (model.as_mut(), attrs.get("name")) {
                    model
                        .required_models
                        .push(ModelIdentifier::new(name.clone(), attrs.get("version").map(String::as_str)));
                }
            }
            "contextInfo" => {
                if let Some(model) = model.as_mut() {
                    model.contexts.push(context_info_from(&attrs));
                }
            }
            t if is_type_tag(t) => {
                let type_info = type_info_from(&attrs);
                match (is_empty, model.as_mut()) {
                    (true, Some(model)) => {
                        model.types.insert(type_info.name.clone(), type_info);
                    }
                    _ => current_type = Some(type_info),
                }
            }
            "element" if current_type.is_some() => {
                let element = element_info_from(&attrs);
                match (is_empty, current_type.as_mut()) {
                    (true, Some(type_info)) => type_info.elements.push(element),
                    _ => current_element = Some(element),
                }
            }
            // Nested list specifier: <elementTypeSpecifier xsi:type="ListTypeSpecifier" elementType="FHIR.Coding"/>
            "elementTypeSpecifier" => {
                if let Some(element) = current_element.as_mut() {
                    let is_list = attrs.get("type").is_some_and(|t| t.ends_with("ListTypeSpecifier"));
                    if is_list {
                        element.is_list = true;
                        if let Some(inner) = attrs.get("elementType") {
                            element.element_type = inner.clone();
                        }
                    }
                }
            }
            _ => {}
        }
    }

    model.ok_or_else(|| ModelInfoError::InvalidStructure("missing modelInfo root element".to_string()))
}

/// Parse the JSON representation
pub fn parse_json(json: &str) -> Result<ModelInfo, ModelInfoError> {
    let root: Value = serde_json::from_str(json)?;
    let name = str_field(&root, "name")
        .ok_or_else(|| ModelInfoError::InvalidStructure("missing model name".to_string()))?;

    let mut model = ModelInfo::new(name, str_field(&root, "version"));
    model.url = str_field(&root, "url").map(String::from);
    model.target_qualifier = str_field(&root, "targetQualifier").map(String::from);
    model.patient_class_name = str_field(&root, "patientClassName").map(String::from);
    model.patient_birth_date_property_name = str_field(&root, "patientBirthDatePropertyName").map(String::from);

    for required in array_field(&root, "requiredModelInfo") {
        if let Some(name) = str_field(required, "name") {
            model
                .required_models
                .push(ModelIdentifier::new(name, str_field(required, "version")));
        }
    }

    for context in array_field(&root, "contextInfo") {
        model.contexts.push(ContextInfo {
            name: str_field(context, "name").unwrap_or_default().to_string(),
            key_element: str_field(context, "keyElement").map(String::from),
            birth_date_element: str_field(context, "birthDateElement").map(String::from),
        });
    }

    for type_json in array_field(&root, "typeInfo") {
        let type_info = parse_type_info_json(type_json)?;
        model.types.insert(type_info.name.clone(), type_info);
    }

    Ok(model)
}

fn parse_type_info_json(json: &Value) -> Result<TypeInfo, ModelInfoError> {
    let name = str_field(json, "name")
        .ok_or_else(|| ModelInfoError::InvalidStructure("missing type name".to_string()))?;

    let mut type_info = TypeInfo::new(name);
    type_info.namespace = str_field(json, "namespace").map(String::from);
    type_info.base_type = str_field(json, "baseType").map(String::from);
    type_info.retrievable = json.get("retrievable").and_then(Value::as_bool).unwrap_or(false);
    type_info.primary_code_path = str_field(json, "primaryCodePath").map(String::from);

    for element_json in array_field(json, "element") {
        let element_name = str_field(element_json, "name").ok_or_else(|| {
            ModelInfoError::InvalidStructure(format!("element without name in type {name}"))
        })?;
        let mut element = match str_field(element_json, "elementType").or_else(|| str_field(element_json, "type")) {
            Some(declared) => ElementInfo::new(element_name, declared),
            None => {
                let specifier = element_json.get("elementTypeSpecifier").ok_or_else(|| {
                    ModelInfoError::InvalidStructure(format!("element {name}.{element_name} has no type"))
                })?;
                let inner = str_field(specifier, "elementType").unwrap_or_default();
                let (inner, _) = unwrap_list_type(inner);
                let mut element = ElementInfo::new(element_name, inner);
                element.is_list = str_field(specifier, "type").is_some_and(|t| t.ends_with("ListTypeSpecifier"));
                element
            }
        };
        element.target = str_field(element_json, "target").map(String::from);
        type_info.elements.push(element);
    }

    Ok(type_info)
}

fn str_field<'a>(json: &'a Value, key: &str) -> Option<&'a str> {
    json.get(key).and_then(Value::as_str)
}

fn array_field<'a>(json: &'a Value, key: &str) -> impl Iterator<Item = &'a Value> + use<'a> {
    json.get(key).and_then(Value::as_array).into_iter().flatten()
}
