//! Library command implementation

use super::{bundle, output};
use anyhow::{Result, anyhow};
use octofhir_cr_cql::{LibraryContentType, ProviderFactory, VersionMissPolicy, VersionedIdentifier, get_content};
use serde_json::{Value, json};
use std::path::PathBuf;

/// Configuration for library command
pub struct LibraryConfig {
    pub bundle: PathBuf,
    pub name: String,
    pub version: Option<String>,
    pub fhir_version: String,
    /// Fail instead of falling back to the latest version
    pub strict: bool,
    pub settings: Option<PathBuf>,
    pub output_file: Option<PathBuf>,
}

/// Resolve a library out of a bundle and describe the chosen version
pub async fn library(config: LibraryConfig) -> Result<()> {
    let version = bundle::parse_fhir_version(&config.fhir_version)?;
    let mut settings = bundle::load_settings(config.settings.as_deref())?;
    if config.strict {
        settings = settings.with_version_miss_policy(VersionMissPolicy::Fail);
    }
    let preference = settings.content_preference.clone();
    let data = bundle::load_bundle(&config.bundle)?;

    let provider = ProviderFactory::new(settings).library_source_for_bundle(&data, version)?;
    let mut identifier = VersionedIdentifier::new(config.name.clone());
    if let Some(requested) = &config.version {
        identifier = identifier.with_version(requested.clone());
    }

    let library = provider
        .library(&identifier)
        .await?
        .ok_or_else(|| anyhow!("Library {identifier} not found in {}", config.bundle.display()))?;

    let summary = describe(&library, &preference)?;
    if summary["selectedContent"].is_null() {
        eprintln!("{}", output::format_warning("no content matches the configured preference"));
    }
    output::write_output(&output::format_json(&summary, true)?, config.output_file.as_deref())
}

fn describe(library: &Value, preference: &[LibraryContentType]) -> Result<Value> {
    let mut selected = Value::Null;
    for content_type in preference {
        if get_content(library, *content_type)?.is_some() {
            selected = json!(content_type.to_string());
            break;
        }
    }
    let content: Vec<&Value> = library
        .get("content")
        .and_then(Value::as_array)
        .map(|content| content.iter().filter_map(|a| a.get("contentType")).collect())
        .unwrap_or_default();

    Ok(json!({
        "id": library.get("id"),
        "name": library.get("name"),
        "version": library.get("version"),
        "url": library.get("url"),
        "content": content,
        "selectedContent": selected,
    }))
}
