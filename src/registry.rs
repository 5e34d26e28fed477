use std::{collections::BTreeMap, sync::Arc};

use serde_json::Value;

use crate::{
    client::Config,
    descriptor::{PluginDescriptor, PluginManifest},
    errors::{Error, Result},
    providers,
};

/// Caller-owned collection of plugin descriptors keyed by id.
#[derive(Clone, Debug, Default)]
pub struct PluginRegistry {
    plugins: BTreeMap<&'static str, Arc<PluginDescriptor>>,
}

impl PluginRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with every bundled provider.
    pub fn with_builtin_plugins() -> Self {
        let mut registry = Self::new();
        for plugin in providers::all() {
            // Bundled ids are distinct, so this cannot collide.
            registry.plugins.insert(plugin.id, plugin);
        }
        registry
    }

    /// Add a plugin. Registering an id twice is an error.
    pub fn register(&mut self, plugin: Arc<PluginDescriptor>) -> Result<()> {
        if self.plugins.contains_key(plugin.id) {
            return Err(Error::Config(format!(
                "plugin {:?} is already registered",
                plugin.id
            )));
        }
        self.plugins.insert(plugin.id, plugin);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<Arc<PluginDescriptor>> {
        self.plugins.get(id).cloned()
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<&'static str> {
        self.plugins.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn manifests(&self) -> Vec<PluginManifest> {
        self.plugins.values().map(|p| p.manifest()).collect()
    }

    /// Run one action of one plugin.
    pub async fn execute(
        &self,
        plugin_id: &str,
        action: &str,
        input: Value,
        cfg: &Config,
    ) -> Result<Value> {
        let plugin = self
            .plugins
            .get(plugin_id)
            .ok_or_else(|| Error::UnknownPlugin(plugin_id.to_string()))?;
        let descriptor = plugin
            .action(action)
            .ok_or_else(|| Error::UnsupportedAction(action.to_string()))?;
        #[cfg(feature = "tracing")]
        tracing::debug!(plugin = plugin_id, action, "executing plugin action");
        descriptor.execute(input, cfg).await
    }
}
