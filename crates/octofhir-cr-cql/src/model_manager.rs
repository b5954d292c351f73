//! Model info resolution across a chain of providers

use crate::identifier::ModelIdentifier;
use crate::library_manager::ResolutionError;
use crate::model_info::{ModelInfo, ModelInfoProvider};
use log::debug;
use octofhir_cr_diagnostics::Result;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Models that are built into every translator
const BUILT_IN_MODELS: [&str; 1] = ["System"];

/// Owns the loaded model infos for the libraries of one evaluation
pub struct ModelManager {
    providers: Vec<Arc<dyn ModelInfoProvider>>,
    models: RwLock<HashMap<ModelIdentifier, Arc<ModelInfo>>>,
}

impl ModelManager {
    pub fn new(providers: Vec<Arc<dyn ModelInfoProvider>>) -> Self {
        Self {
            providers,
            models: RwLock::new(HashMap::new()),
        }
    }

    pub fn is_built_in(identifier: &ModelIdentifier) -> bool {
        BUILT_IN_MODELS.contains(&identifier.id.as_str())
    }

    /// The model info for `identifier`, asking providers in order until one
    /// has it
    pub async fn resolve(&self, identifier: &ModelIdentifier) -> Result<Arc<ModelInfo>> {
        let cached = self.models.read().get(identifier).cloned();
        if let Some(model) = cached {
            return Ok(model);
        }

        for (index, provider) in self.providers.iter().enumerate() {
            match provider.load(identifier).await? {
                Some(model) => {
                    let model = Arc::new(model);
                    self.models.write().insert(identifier.clone(), model.clone());
                    return Ok(model);
                }
                None => debug!("model info provider {index} has no {identifier}"),
            }
        }

        Err(ResolutionError::ModelInfoNotFound {
            model: identifier.to_string(),
        }
        .into())
    }

    pub fn contains(&self, identifier: &ModelIdentifier) -> bool {
        self.models.read().contains_key(identifier)
    }

    pub fn len(&self) -> usize {
        self.models.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.read().is_empty()
    }
}
