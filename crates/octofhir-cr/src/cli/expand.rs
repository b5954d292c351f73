//! Expand command implementation

use super::{bundle, output};
use anyhow::Result;
use octofhir_cr_cql::{ProviderFactory, ValueSetInfo};
use std::path::PathBuf;

/// Configuration for expand command
pub struct ExpandConfig {
    pub bundle: PathBuf,
    pub value_set: String,
    pub version: Option<String>,
    pub fhir_version: String,
    pub output_file: Option<PathBuf>,
}

/// Expand a value set held in a bundle
pub async fn expand(config: ExpandConfig) -> Result<()> {
    let version = bundle::parse_fhir_version(&config.fhir_version)?;
    let data = bundle::load_bundle(&config.bundle)?;
    let terminology = ProviderFactory::default().terminology_for_bundle(&data, version)?;

    let mut info = ValueSetInfo::new(config.value_set);
    if let Some(requested) = config.version {
        info = info.with_version(requested);
    }
    let codes = terminology.expand(&info).await?;
    if codes.is_empty() {
        eprintln!("{}", output::format_warning(&format!("{} expands to no codes", info.id)));
    }
    let rendered = output::format_json(&serde_json::to_value(&codes)?, true)?;
    output::write_output(&rendered, config.output_file.as_deref())
}
