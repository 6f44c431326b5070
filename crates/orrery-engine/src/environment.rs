//! A single simulation environment and its staged step.
//!
//! # Step order
//!
//! ```text
//! control hooks ─▶ integrator ─▶ passive hooks ─▶ render hooks ─▶ cameras ─▶ last-stage hooks
//! ```
//!
//! Everything runs on the calling thread. Only ready plugins see
//! stage callbacks; `reset` reaches every registered plugin.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use orrery_core::{
    Integrator, Namespace, ParamTree, SimModel, SimState, SimTime, StateHandle, StepError,
};
use orrery_plugin::{LoadReport, Plugin, PluginSet, PluginSource};
use orrery_render::{ImagePublisher, OffscreenRenderScheduler, OverlayScene, RenderBackend};
use tracing::{debug, info};

use crate::config::{ConfigError, SimSettings};
use crate::metrics::StepMetrics;
use crate::registry::{EnvironmentInfo, EnvironmentRegistry};

/// Everything needed to construct an [`Environment`].
pub struct EnvConfig {
    /// Unique environment name; prefixes all of its channels.
    pub namespace: Namespace,
    /// Shared, immutable model.
    pub model: Arc<dyn SimModel>,
    /// State exclusively owned by the new environment.
    pub state: Box<dyn SimState>,
    /// Advances `state` by one timestep.
    pub integrator: Box<dyn Integrator>,
    /// Supplies plugin configuration and instances on every reload.
    pub plugin_source: Arc<dyn PluginSource>,
    /// Namespace parameters (settings and camera configuration).
    pub params: Arc<ParamTree>,
    /// Offscreen renderer. `None` disables camera output.
    pub backend: Option<Box<dyn RenderBackend>>,
    /// Destination of camera output.
    pub publisher: Arc<dyn ImagePublisher>,
}

/// One simulation instance with its plugins and cameras.
///
/// # Teardown
///
/// Dropping an environment clears the ready list, then drops every
/// plugin, then releases the render resources, the state, and finally
/// the model and namespace resources. Plugins therefore never outlive
/// the state they were loaded against.
pub struct Environment {
    // Field order is drop order.
    plugins: PluginSet,
    scheduler: OffscreenRenderScheduler,
    overlay: Option<OverlayScene>,
    backend: Option<Box<dyn RenderBackend>>,
    integrator: Box<dyn Integrator>,
    state: Box<dyn SimState>,
    model: Arc<dyn SimModel>,
    publisher: Arc<dyn ImagePublisher>,
    plugin_source: Arc<dyn PluginSource>,
    params: Arc<ParamTree>,
    info: Arc<EnvironmentInfo>,
    namespace: Namespace,
    settings: SimSettings,
    steps: u64,
}

impl Environment {
    /// Construct an environment, register its state handle, and load it.
    ///
    /// The render backend is kept only if the resolved settings enable
    /// offscreen rendering.
    pub fn new(config: EnvConfig, registry: &EnvironmentRegistry) -> Result<Self, ConfigError> {
        let timestep = config.model.timestep();
        if !timestep.is_finite() || timestep <= 0.0 {
            return Err(ConfigError::InvalidTimestep { value: timestep });
        }
        let settings = SimSettings::resolve(&config.params, config.backend.is_some())?;
        let backend = if settings.render_offscreen {
            config.backend
        } else {
            None
        };

        let handle = config.state.handle();
        let info = Arc::new(EnvironmentInfo::new(config.namespace.clone(), handle));
        registry.assign(handle, &info);

        let mut env = Self {
            plugins: PluginSet::new(),
            scheduler: OffscreenRenderScheduler::empty(config.namespace.clone()),
            overlay: None,
            backend,
            integrator: config.integrator,
            state: config.state,
            model: config.model,
            publisher: config.publisher,
            plugin_source: config.plugin_source,
            params: config.params,
            info,
            namespace: config.namespace,
            settings,
            steps: 0,
        };
        info!(
            target: "orrery::env",
            namespace = %env.namespace,
            model = env.model.name(),
            %handle,
            headless = settings.headless,
            render_offscreen = settings.render_offscreen,
            "environment created"
        );
        env.reload();
        Ok(env)
    }

    /// Rebuild the plugin set and camera scheduler from current
    /// configuration.
    ///
    /// Plugin load failures are reported, never fatal.
    pub fn reload(&mut self) -> LoadReport {
        debug!(target: "orrery::env", namespace = %self.namespace, "reload");
        let report = self.plugins.reload(
            self.plugin_source.as_ref(),
            &self.namespace,
            &self.model,
            self.state.as_mut(),
        );
        self.scheduler = OffscreenRenderScheduler::build(
            &self.namespace,
            self.model.as_ref(),
            &self.params,
            self.backend.is_some(),
            self.state.time(),
        );
        self.info.record_load(
            self.plugins.len(),
            self.plugins.ready_len(),
            self.scheduler.len(),
        );
        report
    }

    /// Reset every registered plugin, ready or not, in registration order.
    pub fn reset(&mut self) {
        debug!(target: "orrery::env", namespace = %self.namespace, "reset");
        self.plugins.reset_all();
    }

    /// Run control hooks of ready plugins.
    pub fn run_control_stage(&mut self) {
        self.plugins.run_control(self.model.as_ref(), self.state.as_mut());
    }

    /// Run passive hooks of ready plugins.
    pub fn run_passive_stage(&mut self) {
        self.plugins.run_passive(self.model.as_ref(), self.state.as_mut());
    }

    /// Run render hooks of ready plugins, then fire due cameras.
    ///
    /// Returns immediately, without building the overlay or evaluating
    /// cameras, when no plugin is ready. The check is on the ready list,
    /// not the registered one: if every registered plugin failed to
    /// load, cameras do not publish either. Returns the number of
    /// cameras fired.
    pub fn run_render_stage(&mut self) -> usize {
        if self.plugins.is_ready_empty() {
            return 0;
        }
        let overlay = self.overlay.get_or_insert_with(OverlayScene::default);
        overlay.clear();
        self.plugins
            .run_render(self.model.as_ref(), self.state.as_ref(), overlay);
        match self.backend.as_mut() {
            Some(backend) => self.scheduler.evaluate(
                self.model.as_ref(),
                self.state.as_ref(),
                overlay,
                backend.as_mut(),
                self.publisher.as_ref(),
            ),
            None => 0,
        }
    }

    /// Run last-stage hooks of ready plugins.
    pub fn run_last_stage(&mut self) {
        self.plugins
            .run_last_stage(self.model.as_ref(), self.state.as_mut());
    }

    /// Advance by one timestep through every stage.
    ///
    /// If integration fails, the step stops there: passive, render and
    /// last-stage hooks do not run and the step count is unchanged.
    pub fn step(&mut self) -> Result<StepMetrics, StepError> {
        let start = Instant::now();
        let mut metrics = StepMetrics::default();

        let t = Instant::now();
        self.run_control_stage();
        metrics.control_us = t.elapsed().as_micros() as u64;

        let t = Instant::now();
        self.integrator
            .integrate(self.model.as_ref(), self.state.as_mut())?;
        metrics.integrate_us = t.elapsed().as_micros() as u64;

        let t = Instant::now();
        self.run_passive_stage();
        metrics.passive_us = t.elapsed().as_micros() as u64;

        let t = Instant::now();
        metrics.cameras_fired = self.run_render_stage();
        metrics.render_us = t.elapsed().as_micros() as u64;

        let t = Instant::now();
        self.run_last_stage();
        metrics.last_stage_us = t.elapsed().as_micros() as u64;

        self.steps += 1;
        self.info.record_step(self.state.time(), self.steps);
        metrics.total_us = start.elapsed().as_micros() as u64;
        Ok(metrics)
    }

    /// Run `n` steps. Returns the metrics of the last one.
    pub fn step_n(&mut self, n: u64) -> Result<StepMetrics, StepError> {
        let mut last = StepMetrics::default();
        for _ in 0..n {
            last = self.step()?;
        }
        Ok(last)
    }

    /// Ready plugins in registration order.
    pub fn plugins(&self) -> impl Iterator<Item = &dyn Plugin> {
        self.plugins.ready()
    }

    /// Every registered plugin, ready or not.
    pub fn registered_plugins(&self) -> impl Iterator<Item = &dyn Plugin> {
        self.plugins.registered()
    }

    /// Names of ready plugins.
    pub fn plugin_names(&self) -> Vec<String> {
        self.plugins.ready_names()
    }

    /// The camera scheduler built by the most recent load.
    pub fn scheduler(&self) -> &OffscreenRenderScheduler {
        &self.scheduler
    }

    /// The overlay scene, once a render stage has built it.
    pub fn overlay(&self) -> Option<&OverlayScene> {
        self.overlay.as_ref()
    }

    /// Environment namespace.
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Shared model.
    pub fn model(&self) -> &Arc<dyn SimModel> {
        &self.model
    }

    /// Owned state.
    pub fn state(&self) -> &dyn SimState {
        self.state.as_ref()
    }

    /// Mutable access to the owned state between steps.
    pub fn state_mut(&mut self) -> &mut dyn SimState {
        self.state.as_mut()
    }

    /// Handle of the owned state.
    pub fn handle(&self) -> StateHandle {
        self.info.handle()
    }

    /// Current simulation time.
    pub fn sim_time(&self) -> SimTime {
        self.state.time()
    }

    /// Steps completed since construction.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Resolved settings.
    pub fn settings(&self) -> SimSettings {
        self.settings
    }

    /// Status record shared with the registry.
    pub fn info(&self) -> &Arc<EnvironmentInfo> {
        &self.info
    }
}

impl Drop for Environment {
    fn drop(&mut self) {
        debug!(target: "orrery::env", namespace = %self.namespace, plugins = self.plugins.len(), "environment teardown");
        self.plugins.clear();
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("namespace", &self.namespace)
            .field("model", &self.model.name())
            .field("handle", &self.info.handle())
            .field("plugins", &self.plugins)
            .field("cameras", &self.scheduler.len())
            .field("settings", &self.settings)
            .field("steps", &self.steps)
            .finish()
    }
}
