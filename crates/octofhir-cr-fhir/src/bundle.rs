//! Bundle helpers

use crate::resource::{resource_id, resource_type};
use serde_json::{Value, json};

/// Resources carried in `entry[].resource`
pub fn entry_resources(bundle: &Value) -> impl Iterator<Item = &Value> {
    bundle
        .get("entry")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|entry| entry.get("resource"))
}

/// URL of the `next` page link, if any
pub fn next_link(bundle: &Value) -> Option<&str> {
    bundle
        .get("link")
        .and_then(Value::as_array)?
        .iter()
        .find(|link| link.get("relation").and_then(Value::as_str) == Some("next"))
        .and_then(|link| link.get("url"))
        .and_then(Value::as_str)
}

/// Resources of `kind` in the bundle
pub fn resources_of_type<'a>(bundle: &'a Value, kind: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
    entry_resources(bundle).filter(move |r| resource_type(r) == Some(kind))
}

/// Resource with the given type and id
pub fn find_resource<'a>(bundle: &'a Value, kind: &str, id: &str) -> Option<&'a Value> {
    entry_resources(bundle).find(|r| resource_type(r) == Some(kind) && resource_id(r) == Some(id))
}

/// A `searchset` bundle holding `resources`, with an optional next link
pub fn searchset(resources: impl IntoIterator<Item = Value>, next: Option<&str>) -> Value {
    let entries: Vec<Value> = resources
        .into_iter()
        .map(|resource| json!({ "resource": resource }))
        .collect();
    let mut bundle = json!({
        "resourceType": "Bundle",
        "type": "searchset",
        "total": entries.len(),
        "entry": entries,
    });
    if let Some(url) = next {
        bundle["link"] = json!([{ "relation": "next", "url": url }]);
    }
    bundle
}

/// A `collection` bundle holding `resources`
pub fn collection(resources: impl IntoIterator<Item = Value>) -> Value {
    let entries: Vec<Value> = resources
        .into_iter()
        .map(|resource| json!({ "resource": resource }))
        .collect();
    json!({
        "resourceType": "Bundle",
        "type": "collection",
        "entry": entries,
    })
}
