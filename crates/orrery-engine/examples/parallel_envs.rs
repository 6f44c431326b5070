//! Orrery parallel environments: several ballistic bodies, each
//! stepped on its own thread with a fixed overhead camera.
//!
//! Demonstrates:
//!   1. Implementing the engine seams (`SimModel`, `SimState`, `Integrator`)
//!   2. Registering a plugin type in a `PluginCatalog`
//!   3. Offscreen camera publishing through a `ChannelPublisher`
//!   4. Spawning `ParallelEnvironment`s and sending control requests
//!   5. Looking environments up by state handle in the registry
//!
//! No provisioning service is running, so each environment continues
//! unmanaged after the bootstrap attempt.
//!
//! Run with:
//!   cargo run --example parallel_envs

use std::any::Any;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use orrery_core::{
    CameraDescriptor, Integrator, Marker, MarkerKind, Namespace, ParamTree, PluginError,
    RenderError, RenderTarget, SimModel, SimState, SimTime, StateHandle, StepError,
};
use orrery_engine::{
    ControlReply, ControlRequest, EnvConfig, Environment, EnvironmentRegistry, ParallelConfig,
    ParallelEnvironment, Unmanaged,
};
use orrery_plugin::{ControlHook, Plugin, PluginCatalog, PluginConfig, RenderHook};
use orrery_render::{
    ChannelPublisher, OverlayScene, Publication, RawFrame, RenderBackend, ViewRequest,
};

const DT: f64 = 0.002;
const GRAVITY: f64 = -9.81;

// ─── Model and state ────────────────────────────────────────────

struct Ballistic;

impl SimModel for Ballistic {
    fn name(&self) -> &str {
        "ballistic"
    }

    fn timestep(&self) -> f64 {
        DT
    }

    fn cameras(&self) -> Vec<CameraDescriptor> {
        vec![CameraDescriptor {
            id: 0,
            name: "overhead".into(),
            fovy_deg: 60.0,
        }]
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct Body {
    handle: StateHandle,
    steps: u64,
    height: f64,
    velocity: f64,
    thrust: f64,
}

impl SimState for Body {
    fn handle(&self) -> StateHandle {
        self.handle
    }

    fn time(&self) -> SimTime {
        SimTime::from_steps(self.steps, DT)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

struct Euler;

impl Integrator for Euler {
    fn integrate(&mut self, _model: &dyn SimModel, state: &mut dyn SimState) -> Result<(), StepError> {
        let body = state
            .as_any_mut()
            .downcast_mut::<Body>()
            .ok_or_else(|| StepError::IntegrationFailed {
                reason: "unexpected state type".into(),
            })?;
        body.velocity += (GRAVITY + body.thrust) * DT;
        body.height = (body.height + body.velocity * DT).max(0.0);
        body.steps += 1;
        Ok(())
    }
}

// ─── Plugin: proportional hover controller ──────────────────────

struct Hover {
    name: String,
    target: f64,
    gain: f64,
}

impl ControlHook for Hover {
    fn on_control(&mut self, _model: &dyn SimModel, state: &mut dyn SimState) {
        if let Some(body) = state.as_any_mut().downcast_mut::<Body>() {
            let error = self.target - body.height;
            body.thrust = -GRAVITY + self.gain * error - 2.0 * body.velocity;
        }
    }
}

impl RenderHook for Hover {
    fn on_render(&mut self, _model: &dyn SimModel, _state: &dyn SimState, target: &mut dyn RenderTarget) {
        target.push_marker(Marker {
            kind: MarkerKind::Sphere,
            pos: [0.0, 0.0, self.target],
            size: [0.05; 3],
            rgba: [0.0, 1.0, 0.0, 0.5],
            label: None,
        });
    }
}

impl Plugin for Hover {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&mut self, _model: &Arc<dyn SimModel>, _state: &mut dyn SimState) -> Result<(), PluginError> {
        if self.target <= 0.0 {
            return Err(PluginError::LoadFailed {
                plugin: self.name.clone(),
                reason: "target height must be positive".into(),
            });
        }
        Ok(())
    }

    fn control_hook(&mut self) -> Option<&mut dyn ControlHook> {
        Some(self)
    }

    fn render_hook(&mut self) -> Option<&mut dyn RenderHook> {
        Some(self)
    }
}

// ─── Render backend: flat shading by height ─────────────────────

struct FlatShader;

impl RenderBackend for FlatShader {
    fn render(
        &mut self,
        _model: &dyn SimModel,
        state: &dyn SimState,
        _overlay: &OverlayScene,
        view: &ViewRequest<'_>,
    ) -> Result<RawFrame, RenderError> {
        let body = state
            .as_any()
            .downcast_ref::<Body>()
            .ok_or_else(|| RenderError::BackendFailed {
                camera: view.camera.to_string(),
                reason: "unexpected state type".into(),
            })?;
        let shade = (body.height * 50.0).clamp(0.0, 255.0) as u8;
        let pixels = (view.width * view.height) as usize;
        Ok(RawFrame {
            rgb: view.rgb.then(|| vec![shade; pixels * 3]),
            depth: view.depth.then(|| vec![0.5; pixels]),
            segmentation: view.segmentation.then(|| vec![1; pixels]),
        })
    }
}

// ─── Main ───────────────────────────────────────────────────────

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Orrery Parallel Environments Example ===\n");

    // 1. One catalog shared by every environment.
    let mut catalog = PluginCatalog::new();
    catalog.register("hover", |cfg: &PluginConfig| {
        let param = |key: &str, default: f64| {
            cfg.params
                .get_f64(key)
                .map(|v| v.unwrap_or(default))
                .map_err(|e| PluginError::InstantiationFailed {
                    type_name: cfg.type_name.clone(),
                    reason: e.to_string(),
                })
        };
        Ok(Box::new(Hover {
            name: cfg.name.clone(),
            target: param("target", 1.0)?,
            gain: param("gain", 20.0)?,
        }) as Box<dyn Plugin>)
    });
    let catalog = Arc::new(catalog);

    // 2. Headless rendering, a small 10 Hz overhead camera.
    let params = Arc::new(
        ParamTree::new()
            .with("headless", true)
            .with("cam_config/overhead/width", 64_i64)
            .with("cam_config/overhead/height", 48_i64)
            .with("cam_config/overhead/frequency", 10.0),
    );

    let registry = EnvironmentRegistry::new();
    let (publisher, images) = ChannelPublisher::unbounded();
    let publisher = Arc::new(publisher);
    let parallel = ParallelConfig {
        launchfile: Some("hover.launch".into()),
        provisioning_timeout: Duration::from_millis(10),
        step_rate_hz: Some(500.0),
        ..ParallelConfig::default()
    };

    // 3. Three environments hovering at different heights.
    let mut envs = Vec::new();
    for (i, target) in [0.5, 1.0, 1.5].into_iter().enumerate() {
        let ns = Namespace::new(format!("env{i}"));
        catalog.set_plugins(
            ns.clone(),
            vec![PluginConfig::new("hover", "hover")
                .with_params(ParamTree::new().with("target", target))],
        );
        let env = Environment::new(
            EnvConfig {
                namespace: ns,
                model: Arc::new(Ballistic),
                state: Box::new(Body {
                    handle: StateHandle::next(),
                    steps: 0,
                    height: 0.0,
                    velocity: 0.0,
                    thrust: 0.0,
                }),
                integrator: Box::new(Euler),
                plugin_source: catalog.clone(),
                params: Arc::clone(&params),
                backend: Some(Box::new(FlatShader)),
                publisher: publisher.clone(),
            },
            &registry,
        )?;
        let env = ParallelEnvironment::spawn(env, parallel.clone(), Arc::new(Unmanaged))?;
        println!("{}: provisioning {}", env.namespace(), env.provision_outcome());
        envs.push(env);
    }

    // 4. Let them run, then reload one environment mid-flight.
    thread::sleep(Duration::from_millis(500));
    if let ControlReply::Reloaded(report) = envs[1].request(ControlRequest::Reload)? {
        println!("{}: reloaded ({report})", envs[1].namespace());
    }
    thread::sleep(Duration::from_millis(500));

    // 5. Status from the registry, keyed by state handle.
    println!();
    for env in &envs {
        if let Some(info) = registry.lookup(env.info().handle()) {
            println!(
                "{}: {} steps, t = {:.3}s, {}/{} plugins ready, {} camera(s)",
                info.namespace(),
                info.steps(),
                info.sim_time().as_secs(),
                info.ready_plugins(),
                info.registered_plugins(),
                info.cameras(),
            );
        }
    }

    // 6. Recover the environments and summarize what was published.
    for env in envs {
        let env = env.stop()?;
        if let Some(body) = env.state().as_any().downcast_ref::<Body>() {
            println!("{}: final height {:.3} m", env.namespace(), body.height);
        }
    }
    let published: Vec<Publication> = images.try_iter().collect();
    let frames = published
        .iter()
        .filter(|p| matches!(p, Publication::Image { .. }))
        .count();
    println!("\n{frames} frames published on {} messages", published.len());
    Ok(())
}
