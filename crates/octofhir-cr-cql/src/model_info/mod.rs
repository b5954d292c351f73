//! Model info documents, their parsing and their resolution from
//! repositories

pub mod parser;
pub mod provider;
pub mod types;

pub use parser::{ModelInfoError, parse, parse_json, parse_xml};
pub use provider::{BundleModelInfoProvider, ModelInfoProvider, RepositoryModelInfoProvider};
pub use types::{ContextInfo, ElementInfo, ModelInfo, TypeInfo};
