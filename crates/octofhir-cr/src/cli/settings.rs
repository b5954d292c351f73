//! Settings command implementation

use super::{bundle, output};
use anyhow::Result;
use std::path::PathBuf;

/// Configuration for settings command
pub struct SettingsConfig {
    pub file: Option<PathBuf>,
    pub output_file: Option<PathBuf>,
}

/// Validate a settings file and print the effective settings
pub async fn settings(config: SettingsConfig) -> Result<()> {
    let settings = bundle::load_settings(config.file.as_deref())?;
    if let Some(file) = &config.file {
        eprintln!("{}", output::format_success(&format!("{} is valid", file.display())));
    }
    let rendered = output::format_json(&serde_json::to_value(&settings)?, true)?;
    output::write_output(&rendered, config.output_file.as_deref())
}
