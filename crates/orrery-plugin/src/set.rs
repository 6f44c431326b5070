//! Registered and ready plugin lists with staged dispatch.
//!
//! [`PluginSet`] owns every plugin instantiated for one environment, in
//! configuration order, and records which of them loaded successfully.
//! Stage hooks only ever run over the ready subset; [`PluginSet::reset_all`]
//! runs over all of them.

use std::fmt;
use std::sync::Arc;

use orrery_core::{Namespace, RenderTarget, SimModel, SimState};
use tracing::{debug, warn};

use crate::plugin::Plugin;
use crate::source::PluginSource;

// ── Load report ────────────────────────────────────────────────────

/// Outcome of one [`PluginSet::reload`] pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Names of every instantiated plugin, in registration order.
    pub registered: Vec<String>,
    /// Names of plugins whose load succeeded, in registration order.
    pub ready: Vec<String>,
    /// Plugins that were instantiated but refused to load, with the reason.
    pub failed: Vec<(String, String)>,
    /// Configuration entries that never became a plugin, with the reason.
    pub skipped: Vec<(String, String)>,
}

impl LoadReport {
    /// Whether every configured plugin ended up ready.
    pub fn all_ready(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }
}

impl fmt::Display for LoadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} registered, {} ready, {} failed, {} skipped",
            self.registered.len(),
            self.ready.len(),
            self.failed.len(),
            self.skipped.len()
        )
    }
}

// ── PluginSet ──────────────────────────────────────────────────────

/// The plugins of one environment.
///
/// # Invariants
///
/// - `ready` holds strictly increasing indices into `plugins`, so the
///   ready subset preserves registration order and `ready ⊆ plugins`.
/// - [`clear`](Self::clear) drops the ready list before the plugins.
#[derive(Default)]
pub struct PluginSet {
    plugins: Vec<Box<dyn Plugin>>,
    ready: Vec<usize>,
}

impl PluginSet {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the set with a fresh instantiation of `namespace`'s
    /// configured plugins and attempt to load each one.
    ///
    /// Failures of individual entries are logged and recorded in the
    /// report; they never stop the remaining entries from loading. If
    /// the configuration itself is unavailable the set is left empty.
    pub fn reload(
        &mut self,
        source: &dyn PluginSource,
        namespace: &Namespace,
        model: &Arc<dyn SimModel>,
        state: &mut dyn SimState,
    ) -> LoadReport {
        self.clear();
        let mut report = LoadReport::default();

        let configs = match source.plugin_configs(namespace) {
            Ok(configs) => configs,
            Err(e) => {
                warn!(target: "orrery::plugin", %namespace, error = %e, "plugin configuration unavailable");
                return report;
            }
        };
        debug!(target: "orrery::plugin", %namespace, count = configs.len(), "instantiating plugins");

        for config in &configs {
            match source.instantiate(config) {
                Ok(plugin) => self.plugins.push(plugin),
                Err(e) => {
                    warn!(
                        target: "orrery::plugin",
                        %namespace,
                        plugin = %config.name,
                        type_name = %config.type_name,
                        error = %e,
                        "plugin could not be instantiated"
                    );
                    report.skipped.push((config.name.clone(), e.to_string()));
                }
            }
        }

        for (index, plugin) in self.plugins.iter_mut().enumerate() {
            report.registered.push(plugin.name().to_string());
            match plugin.load(model, state) {
                Ok(()) => {
                    self.ready.push(index);
                    report.ready.push(plugin.name().to_string());
                }
                Err(e) => {
                    warn!(target: "orrery::plugin", %namespace, plugin = plugin.name(), error = %e, "plugin failed to load");
                    report.failed.push((plugin.name().to_string(), e.to_string()));
                }
            }
        }

        debug!(target: "orrery::plugin", %namespace, %report, "plugins loaded");
        report
    }

    /// Call [`Plugin::reset`] on every registered plugin, ready or not,
    /// in registration order.
    pub fn reset_all(&mut self) {
        for plugin in &mut self.plugins {
            plugin.reset();
        }
    }

    /// Run control hooks of ready plugins.
    pub fn run_control(&mut self, model: &dyn SimModel, state: &mut dyn SimState) {
        for &i in &self.ready {
            if let Some(hook) = self.plugins[i].control_hook() {
                hook.on_control(model, state);
            }
        }
    }

    /// Run passive hooks of ready plugins.
    pub fn run_passive(&mut self, model: &dyn SimModel, state: &mut dyn SimState) {
        for &i in &self.ready {
            if let Some(hook) = self.plugins[i].passive_hook() {
                hook.on_passive(model, state);
            }
        }
    }

    /// Run render hooks of ready plugins against `target`.
    pub fn run_render(
        &mut self,
        model: &dyn SimModel,
        state: &dyn SimState,
        target: &mut dyn RenderTarget,
    ) {
        for &i in &self.ready {
            if let Some(hook) = self.plugins[i].render_hook() {
                hook.on_render(model, state, target);
            }
        }
    }

    /// Run last-stage hooks of ready plugins.
    pub fn run_last_stage(&mut self, model: &dyn SimModel, state: &mut dyn SimState) {
        for &i in &self.ready {
            if let Some(hook) = self.plugins[i].last_stage_hook() {
                hook.on_last_stage(model, state);
            }
        }
    }

    /// Ready plugins in registration order.
    pub fn ready(&self) -> impl Iterator<Item = &dyn Plugin> {
        self.ready.iter().map(|&i| self.plugins[i].as_ref())
    }

    /// Every registered plugin in registration order.
    pub fn registered(&self) -> impl Iterator<Item = &dyn Plugin> {
        self.plugins.iter().map(|p| p.as_ref())
    }

    /// Names of ready plugins.
    pub fn ready_names(&self) -> Vec<String> {
        self.ready().map(|p| p.name().to_string()).collect()
    }

    /// Number of ready plugins.
    pub fn ready_len(&self) -> usize {
        self.ready.len()
    }

    /// Number of registered plugins.
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Whether no plugin is registered.
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Whether no plugin is ready.
    pub fn is_ready_empty(&self) -> bool {
        self.ready.is_empty()
    }

    /// Drop every plugin. The ready list is cleared first, then the
    /// plugins are dropped in registration order.
    pub fn clear(&mut self) {
        self.ready.clear();
        self.plugins.clear();
    }
}

impl fmt::Debug for PluginSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginSet")
            .field("registered", &self.registered().map(|p| p.name()).collect::<Vec<_>>())
            .field("ready", &self.ready_names())
            .finish()
    }
}
