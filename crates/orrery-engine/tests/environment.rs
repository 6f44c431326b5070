//! Environment lifecycle: reload, staged stepping, rendering, teardown.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;

use crossbeam_channel::Receiver;
use orrery_core::{Namespace, ParamTree, StepError};
use orrery_engine::{ConfigError, EnvConfig, Environment, EnvironmentRegistry};
use orrery_plugin::{PluginCatalog, PluginConfig, PluginSource};
use orrery_render::{ChannelPublisher, Publication, RenderBackend};
use orrery_test_utils::{
    scripted_catalog, EventJournal, FixedStepIntegrator, MockBackend, MockModel, MockState,
};

const DT: f64 = 0.002;

struct Fixture {
    journal: EventJournal,
    catalog: Arc<PluginCatalog>,
    registry: EnvironmentRegistry,
    rx: Receiver<Publication>,
}

impl Fixture {
    fn new(plugins: &[(&str, &str)]) -> Self {
        let journal = EventJournal::new();
        let catalog = Arc::new(scripted_catalog(&journal));
        catalog.set_plugins(
            Namespace::new("env0"),
            plugins
                .iter()
                .map(|(ty, name)| PluginConfig::new(*ty, *name))
                .collect(),
        );
        let (_, rx) = ChannelPublisher::unbounded();
        Self {
            journal,
            catalog,
            registry: EnvironmentRegistry::new(),
            rx,
        }
    }

    fn build(
        &mut self,
        params: ParamTree,
        backend: Option<Box<dyn RenderBackend>>,
        integrator: FixedStepIntegrator,
    ) -> Result<Environment, ConfigError> {
        let (publisher, rx) = ChannelPublisher::unbounded();
        self.rx = rx;
        let source: Arc<dyn PluginSource> = self.catalog.clone();
        Environment::new(
            EnvConfig {
                namespace: Namespace::new("env0"),
                model: MockModel::new(DT)
                    .with_camera("front", 45.0)
                    .with_journal(&self.journal)
                    .shared(),
                state: MockState::new(DT).with_journal(&self.journal).boxed(),
                integrator: integrator.boxed(),
                plugin_source: source,
                params: Arc::new(params),
                backend,
                publisher: Arc::new(publisher),
            },
            &self.registry,
        )
    }

    fn env(&mut self) -> Environment {
        self.build(ParamTree::new(), None, FixedStepIntegrator::new())
            .unwrap()
    }
}

fn headless() -> ParamTree {
    ParamTree::new().with("headless", true)
}

// ── Reload and reset ───────────────────────────────────────────────

#[test]
fn failed_plugin_is_registered_not_ready_and_still_reset() {
    let mut fx = Fixture::new(&[("failing", "a"), ("scripted", "b")]);
    let mut env = fx.env();

    assert_eq!(env.plugin_names(), ["b"]);
    let registered: Vec<&str> = env.registered_plugins().map(|p| p.name()).collect();
    assert_eq!(registered, ["a", "b"]);

    fx.journal.clear();
    env.reset();
    assert_eq!(fx.journal.events(), ["a:reset", "b:reset"]);
}

#[test]
fn reload_replaces_plugins_and_updates_status() {
    let mut fx = Fixture::new(&[("scripted", "old")]);
    let mut env = fx.env();
    assert_eq!(env.info().ready_plugins(), 1);

    fx.catalog.set_plugins(
        Namespace::new("env0"),
        vec![
            PluginConfig::new("scripted", "x"),
            PluginConfig::new("failing", "y"),
        ],
    );
    fx.journal.clear();
    let report = env.reload();

    assert_eq!(report.ready, ["x"]);
    assert_eq!(fx.journal.events()[0], "old:drop");
    assert_eq!(env.info().registered_plugins(), 2);
    assert_eq!(env.info().ready_plugins(), 1);
}

// ── Stepping ───────────────────────────────────────────────────────

#[test]
fn step_runs_stages_in_order() {
    let mut fx = Fixture::new(&[("scripted", "p")]);
    let mut env = fx.env();
    fx.journal.clear();

    env.step().unwrap();

    assert_eq!(
        fx.journal.events(),
        ["p:control", "p:passive", "p:render", "p:last_stage"]
    );
    assert_eq!(env.steps(), 1);
    assert!((env.sim_time().as_secs() - DT).abs() < 1e-12);
    assert_eq!(env.info().steps(), 1);
}

#[test]
fn integration_failure_stops_the_step() {
    let mut fx = Fixture::new(&[("scripted", "p")]);
    let mut env = fx
        .build(ParamTree::new(), None, FixedStepIntegrator::failing_on(2))
        .unwrap();
    env.step().unwrap();
    fx.journal.clear();

    let err = env.step().unwrap_err();
    assert!(matches!(err, StepError::IntegrationFailed { .. }));
    assert_eq!(fx.journal.events(), ["p:control"]);
    assert_eq!(env.steps(), 1);
}

#[test]
fn step_n_reports_last_metrics() {
    let mut fx = Fixture::new(&[]);
    let mut env = fx.env();
    let metrics = env.step_n(5).unwrap();
    assert_eq!(env.steps(), 5);
    assert!(metrics.stages_us() <= metrics.total_us);
}

// ── Rendering ──────────────────────────────────────────────────────

#[test]
fn default_camera_publishes_at_step_34() {
    let mut fx = Fixture::new(&[("scripted", "p")]);
    let backend = MockBackend::new();
    let overlays = backend.overlay_log();
    let mut env = fx
        .build(headless(), Some(backend.boxed()), FixedStepIntegrator::new())
        .unwrap();
    assert!(env.settings().render_offscreen);
    assert_eq!(env.info().cameras(), 1);

    let mut fired_at = Vec::new();
    for _ in 0..40 {
        if env.step().unwrap().cameras_fired > 0 {
            fired_at.push(env.steps());
        }
    }
    assert_eq!(fired_at, [34]);

    let images: Vec<Publication> = fx.rx.try_iter().collect();
    assert_eq!(images[0].channel(), "/env0/cameras/front/rgb");
    assert!((images[0].stamp().as_secs() - 0.068).abs() < 1e-12);
    // The plugin's render hook drew one marker before the camera rendered.
    assert_eq!(overlays.lock().unwrap().as_slice(), [1]);
}

#[test]
fn near_zero_camera_frequency_survives_reload() {
    let mut fx = Fixture::new(&[("scripted", "p")]);
    let params = headless().with("cam_config/front/frequency", 1e-20);
    let mut env = fx
        .build(params, Some(MockBackend::new().boxed()), FixedStepIntegrator::new())
        .unwrap();
    env.step_n(10).unwrap();
    env.reload();
    let metrics = env.step_n(10).unwrap();
    assert_eq!(metrics.cameras_fired, 0);
    assert_eq!(env.info().cameras(), 1);
}

#[test]
fn render_stage_is_skipped_without_ready_plugins() {
    let mut fx = Fixture::new(&[("failing", "a")]);
    let backend = MockBackend::new();
    let calls = backend.call_counter();
    let mut env = fx
        .build(headless(), Some(backend.boxed()), FixedStepIntegrator::new())
        .unwrap();
    assert_eq!(env.scheduler().len(), 1);

    env.step_n(40).unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(env.overlay().is_none());
    assert_eq!(fx.rx.try_iter().count(), 0);
}

#[test]
fn windowed_mode_drops_backend() {
    let mut fx = Fixture::new(&[("scripted", "p")]);
    let env = fx
        .build(ParamTree::new(), Some(MockBackend::new().boxed()), FixedStepIntegrator::new())
        .unwrap();
    assert!(!env.settings().render_offscreen);
    assert!(env.scheduler().is_empty());
}

#[test]
fn no_render_disables_cameras() {
    let mut fx = Fixture::new(&[("scripted", "p")]);
    let params = ParamTree::new().with("no_render", true);
    let env = fx
        .build(params, Some(MockBackend::new().boxed()), FixedStepIntegrator::new())
        .unwrap();
    assert!(env.settings().headless);
    assert!(env.scheduler().is_empty());
}

// ── Registry and teardown ──────────────────────────────────────────

#[test]
fn registry_resolves_from_another_thread() {
    let mut fx = Fixture::new(&[]);
    let env = fx.env();
    let handle = env.handle();
    let registry = &fx.registry;

    let ns = thread::scope(|s| {
        s.spawn(|| registry.lookup(handle).map(|info| info.namespace().clone()))
            .join()
            .unwrap()
    });
    assert_eq!(ns, Some(Namespace::new("env0")));
    drop(env);
    assert!(fx.registry.lookup(handle).is_none());
}

#[test]
fn teardown_drops_plugins_before_state_and_model() {
    let mut fx = Fixture::new(&[("scripted", "a"), ("failing", "b")]);
    let env = fx.env();
    fx.journal.clear();

    drop(env);

    assert_eq!(
        fx.journal.events(),
        ["a:drop", "b:drop", "state:drop", "model:drop"]
    );
}

#[test]
fn invalid_timestep_is_rejected() {
    let journal = EventJournal::new();
    let registry = EnvironmentRegistry::new();
    let (publisher, _rx) = ChannelPublisher::unbounded();
    let result = Environment::new(
        EnvConfig {
            namespace: Namespace::new("bad"),
            model: MockModel::new(0.0).shared(),
            state: MockState::new(0.0).boxed(),
            integrator: FixedStepIntegrator::new().boxed(),
            plugin_source: Arc::new(scripted_catalog(&journal)),
            params: Arc::new(ParamTree::new()),
            backend: None,
            publisher: Arc::new(publisher),
        },
        &registry,
    );
    assert!(matches!(result, Err(ConfigError::InvalidTimestep { .. })));
    assert!(registry.is_empty());
}
