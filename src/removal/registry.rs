use std::collections::HashMap;

use crate::{
    config::RemovalConfig,
    error::{RemovalError, Result},
    removal::{BackgroundRemover, ChromaKeyRemover},
};

type RemoverFactory = Box<dyn Fn(&RemovalConfig) -> Result<Box<dyn BackgroundRemover>> + Send + Sync>;

/// Registry for the available background-removal methods
///
/// Methods are registered by name as factories, so the worker pool can build
/// as many independent instances as its model policy asks for.
pub struct RemoverRegistry {
    factories: HashMap<String, RemoverFactory>,
}

impl RemoverRegistry {
    /// Create a new registry with all built-in removers
    pub fn new() -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
        };

        registry.register("chroma", |config| Ok(Box::new(ChromaKeyRemover::from_config(config))));
        registry
    }

    /// Register a custom remover under `name`, replacing any previous one
    pub fn register<N, F>(&mut self, name: N, factory: F)
    where
        N: Into<String>,
        F: Fn(&RemovalConfig) -> Result<Box<dyn BackgroundRemover>> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Box::new(factory));
    }

    /// Build and initialize a new instance of the remover named by `config.method`
    pub fn create(&self, config: &RemovalConfig) -> Result<Box<dyn BackgroundRemover>> {
        let factory = self
            .factories
            .get(&config.method)
            .ok_or_else(|| RemovalError::UnknownMethod {
                name: config.method.clone(),
            })?;

        let mut remover = factory(config)?;
        remover.initialize().map_err(|e| RemovalError::Initialization {
            name: config.method.clone(),
            reason: e.to_string(),
        })?;

        Ok(remover)
    }

    /// Get all available method names, sorted
    pub fn available_methods(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl Default for RemoverRegistry {
    fn default() -> Self {
        Self::new()
    }
}
