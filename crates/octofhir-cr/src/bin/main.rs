//! Clinical reasoning command-line interface

use clap::{Parser, Subcommand};
use log::LevelFilter;
use octofhir_cr::cli::{expand, library, output, settings};
use std::path::PathBuf;

/// Clinical reasoning tool
#[derive(Parser)]
#[command(name = "cr")]
#[command(author, version, about = "CQL library and terminology resolution over FHIR bundles", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output file (default: stdout)
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    color: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a library out of a bundle
    Library {
        /// Bundle file (JSON)
        bundle: PathBuf,

        /// Library name
        name: String,

        /// Library version (default: latest)
        #[arg(short = 'V', long)]
        version: Option<String>,

        /// FHIR version of the bundle
        #[arg(long, default_value = "r4")]
        fhir_version: String,

        /// Fail when the requested version is missing
        #[arg(short, long)]
        strict: bool,

        /// Evaluation settings file (JSON)
        #[arg(long)]
        settings: Option<PathBuf>,
    },

    /// Expand a value set held in a bundle
    Expand {
        /// Bundle file (JSON)
        bundle: PathBuf,

        /// Value set URL, OID or id
        value_set: String,

        /// Value set version (default: latest)
        #[arg(short = 'V', long)]
        version: Option<String>,

        /// FHIR version of the bundle
        #[arg(long, default_value = "r4")]
        fhir_version: String,
    },

    /// Validate and print evaluation settings
    Settings {
        /// Settings file (JSON); defaults are printed when omitted
        file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    human_panic::setup_panic!();

    let cli = Cli::parse();

    output::setup_colors(&cli.color);

    let level = if cli.verbose { LevelFilter::Debug } else { LevelFilter::Warn };
    env_logger::Builder::new().filter_level(level).parse_default_env().init();

    let result = match cli.command {
        Commands::Library {
            bundle,
            name,
            version,
            fhir_version,
            strict,
            settings,
        } => {
            let config = library::LibraryConfig {
                bundle,
                name,
                version,
                fhir_version,
                strict,
                settings,
                output_file: cli.output.clone(),
            };
            library::library(config).await
        }

        Commands::Expand {
            bundle,
            value_set,
            version,
            fhir_version,
        } => {
            let config = expand::ExpandConfig {
                bundle,
                value_set,
                version,
                fhir_version,
                output_file: cli.output.clone(),
            };
            expand::expand(config).await
        }

        Commands::Settings { file } => {
            let config = settings::SettingsConfig {
                file,
                output_file: cli.output.clone(),
            };
            settings::settings(config).await
        }
    };

    if let Err(e) = result {
        eprintln!("{}", output::format_error(&e));
        std::process::exit(1);
    }
}
