//! Where plugins come from: the [`PluginSource`] contract and an
//! in-memory [`PluginCatalog`] implementation.

use std::sync::RwLock;

use indexmap::IndexMap;
use orrery_core::{Namespace, ParamTree, PluginError};

use crate::plugin::Plugin;

/// One entry of a namespace's plugin list.
#[derive(Clone, Debug, PartialEq)]
pub struct PluginConfig {
    /// Factory key used to construct the plugin.
    pub type_name: String,
    /// Instance name, unique within the namespace.
    pub name: String,
    /// Plugin-specific parameters.
    pub params: ParamTree,
}

impl PluginConfig {
    /// A config with no parameters.
    pub fn new(type_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            name: name.into(),
            params: ParamTree::new(),
        }
    }

    /// Attach parameters.
    pub fn with_params(mut self, params: ParamTree) -> Self {
        self.params = params;
        self
    }
}

/// Supplies plugin configuration and instances to environments.
///
/// Called from whichever thread reloads an environment, hence `Sync`.
pub trait PluginSource: Send + Sync {
    /// The current ordered plugin list for `namespace`.
    ///
    /// A namespace without configuration yields an empty list, not an
    /// error.
    fn plugin_configs(&self, namespace: &Namespace) -> Result<Vec<PluginConfig>, PluginError>;

    /// Construct a plugin instance from one configuration entry.
    fn instantiate(&self, config: &PluginConfig) -> Result<Box<dyn Plugin>, PluginError>;
}

/// Constructor registered for a plugin type.
pub type PluginFactory =
    Box<dyn Fn(&PluginConfig) -> Result<Box<dyn Plugin>, PluginError> + Send + Sync>;

/// Factory registry plus per-namespace plugin lists.
///
/// Factories are registered up front; plugin lists may be replaced at
/// any time and are picked up by the next environment reload.
#[derive(Default)]
pub struct PluginCatalog {
    factories: IndexMap<String, PluginFactory>,
    configs: RwLock<IndexMap<Namespace, Vec<PluginConfig>>>,
}

impl PluginCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor for `type_name`, replacing any previous one.
    pub fn register<F>(&mut self, type_name: impl Into<String>, factory: F)
    where
        F: Fn(&PluginConfig) -> Result<Box<dyn Plugin>, PluginError> + Send + Sync + 'static,
    {
        self.factories.insert(type_name.into(), Box::new(factory));
    }

    /// Whether a factory exists for `type_name`.
    pub fn has_type(&self, type_name: &str) -> bool {
        self.factories.contains_key(type_name)
    }

    /// Replace the plugin list of `namespace`.
    pub fn set_plugins(&self, namespace: Namespace, configs: Vec<PluginConfig>) {
        let mut table = self.configs.write().unwrap_or_else(|e| e.into_inner());
        table.insert(namespace, configs);
    }

    /// Append one entry to the plugin list of `namespace`.
    pub fn push_plugin(&self, namespace: Namespace, config: PluginConfig) {
        let mut table = self.configs.write().unwrap_or_else(|e| e.into_inner());
        table.entry(namespace).or_default().push(config);
    }
}

impl PluginSource for PluginCatalog {
    fn plugin_configs(&self, namespace: &Namespace) -> Result<Vec<PluginConfig>, PluginError> {
        let table = self.configs.read().unwrap_or_else(|e| e.into_inner());
        Ok(table.get(namespace).cloned().unwrap_or_default())
    }

    fn instantiate(&self, config: &PluginConfig) -> Result<Box<dyn Plugin>, PluginError> {
        let factory =
            self.factories
                .get(&config.type_name)
                .ok_or_else(|| PluginError::UnknownType {
                    type_name: config.type_name.clone(),
                })?;
        factory(config)
    }
}

impl std::fmt::Debug for PluginCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let namespaces = self
            .configs
            .read()
            .map(|t| t.len())
            .unwrap_or_default();
        f.debug_struct("PluginCatalog")
            .field("types", &self.factories.keys().collect::<Vec<_>>())
            .field("namespaces", &namespaces)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(String);

    impl Plugin for Named {
        fn name(&self) -> &str {
            &self.0
        }
    }

    fn catalog() -> PluginCatalog {
        let mut catalog = PluginCatalog::new();
        catalog.register("named", |cfg: &PluginConfig| {
            Ok(Box::new(Named(cfg.name.clone())) as Box<dyn Plugin>)
        });
        catalog.register("broken", |cfg: &PluginConfig| {
            Err(PluginError::InstantiationFailed {
                type_name: cfg.type_name.clone(),
                reason: "missing library".into(),
            })
        });
        catalog
    }

    #[test]
    fn unconfigured_namespace_is_empty() {
        let catalog = catalog();
        assert_eq!(catalog.plugin_configs(&Namespace::new("nobody")), Ok(vec![]));
    }

    #[test]
    fn configs_keep_order() {
        let catalog = catalog();
        let ns = Namespace::new("env0");
        catalog.push_plugin(ns.clone(), PluginConfig::new("named", "b"));
        catalog.push_plugin(ns.clone(), PluginConfig::new("named", "a"));
        let names: Vec<String> = catalog
            .plugin_configs(&ns)
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn instantiate_by_type() {
        let catalog = catalog();
        let plugin = catalog
            .instantiate(&PluginConfig::new("named", "sensors"))
            .unwrap();
        assert_eq!(plugin.name(), "sensors");
    }

    #[test]
    fn unknown_type_is_reported() {
        let catalog = catalog();
        let err = catalog
            .instantiate(&PluginConfig::new("ghost", "x"))
            .err()
            .unwrap();
        assert_eq!(
            err,
            PluginError::UnknownType {
                type_name: "ghost".into()
            }
        );
    }

    #[test]
    fn failing_factory_is_reported() {
        let catalog = catalog();
        assert!(matches!(
            catalog.instantiate(&PluginConfig::new("broken", "x")),
            Err(PluginError::InstantiationFailed { .. })
        ));
    }

    #[test]
    fn set_plugins_replaces_list() {
        let catalog = catalog();
        let ns = Namespace::new("env0");
        catalog.push_plugin(ns.clone(), PluginConfig::new("named", "old"));
        catalog.set_plugins(ns.clone(), vec![PluginConfig::new("named", "new")]);
        let configs = catalog.plugin_configs(&ns).unwrap();
        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].name, "new");
    }
}
