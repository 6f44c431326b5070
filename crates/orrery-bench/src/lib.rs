//! Benchmark profiles and utilities for the Orrery environment orchestrator.
//!
//! Provides allocation-light stand-ins for the physics engine, plugins,
//! and render backend so benchmarks measure orchestration overhead only:
//!
//! - [`profile`]: an [`EnvConfig`] with `plugins` busy plugins and
//!   `cameras` headless cameras
//! - [`camera_params`]: per-camera rate and resolution overrides

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::any::Any;
use std::sync::Arc;

use orrery_core::{
    CameraDescriptor, Integrator, Namespace, ParamTree, PluginError, RenderError, SimModel,
    SimState, SimTime, StateHandle, StepError, TransportError,
};
use orrery_engine::EnvConfig;
use orrery_plugin::{ControlHook, PassiveHook, Plugin, PluginCatalog, PluginConfig};
use orrery_render::{CameraInfo, Image, ImagePublisher, OverlayScene, RawFrame, RenderBackend, ViewRequest};

/// Timestep used by every profile.
pub const DT: f64 = 0.002;

/// Model with `n` cameras named `cam0..cam{n-1}`.
pub struct BenchModel {
    cameras: Vec<CameraDescriptor>,
}

impl BenchModel {
    /// A model with `n` cameras.
    pub fn new(n: u32) -> Self {
        Self {
            cameras: (0..n)
                .map(|id| CameraDescriptor {
                    id,
                    name: format!("cam{id}"),
                    fovy_deg: 45.0,
                })
                .collect(),
        }
    }
}

impl SimModel for BenchModel {
    fn name(&self) -> &str {
        "bench"
    }

    fn timestep(&self) -> f64 {
        DT
    }

    fn cameras(&self) -> Vec<CameraDescriptor> {
        self.cameras.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// State holding a step counter and one accumulator.
pub struct BenchState {
    handle: StateHandle,
    steps: u64,
    /// Written by [`BusyPlugin`] every control stage.
    pub acc: f64,
}

impl BenchState {
    /// A fresh state at time zero.
    pub fn new() -> Self {
        Self {
            handle: StateHandle::next(),
            steps: 0,
            acc: 0.0,
        }
    }
}

impl Default for BenchState {
    fn default() -> Self {
        Self::new()
    }
}

impl SimState for BenchState {
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

/// Integrator that only advances the step counter.
pub struct CountingIntegrator;

impl Integrator for CountingIntegrator {
    fn integrate(&mut self, _model: &dyn SimModel, state: &mut dyn SimState) -> Result<(), StepError> {
        let state = state
            .as_any_mut()
            .downcast_mut::<BenchState>()
            .ok_or_else(|| StepError::IntegrationFailed {
                reason: "not a BenchState".into(),
            })?;
        state.steps += 1;
        Ok(())
    }
}

/// Plugin with trivial control and passive hooks.
pub struct BusyPlugin {
    name: String,
}

impl ControlHook for BusyPlugin {
    fn on_control(&mut self, _model: &dyn SimModel, state: &mut dyn SimState) {
        if let Some(state) = state.as_any_mut().downcast_mut::<BenchState>() {
            state.acc += 1.0;
        }
    }
}

impl PassiveHook for BusyPlugin {
    fn on_passive(&mut self, _model: &dyn SimModel, state: &mut dyn SimState) {
        if let Some(state) = state.as_any_mut().downcast_mut::<BenchState>() {
            state.acc *= 0.5;
        }
    }
}

impl Plugin for BusyPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&mut self, _model: &Arc<dyn SimModel>, _state: &mut dyn SimState) -> Result<(), PluginError> {
        Ok(())
    }

    fn control_hook(&mut self) -> Option<&mut dyn ControlHook> {
        Some(self)
    }

    fn passive_hook(&mut self) -> Option<&mut dyn PassiveHook> {
        Some(self)
    }
}

/// Backend returning zeroed buffers of the requested size.
pub struct ZeroBackend;

impl RenderBackend for ZeroBackend {
    fn render(
        &mut self,
        _model: &dyn SimModel,
        _state: &dyn SimState,
        _overlay: &OverlayScene,
        view: &ViewRequest<'_>,
    ) -> Result<RawFrame, RenderError> {
        let pixels = (view.width * view.height) as usize;
        Ok(RawFrame {
            rgb: view.rgb.then(|| vec![0; pixels * 3]),
            depth: view.depth.then(|| vec![0.5; pixels]),
            segmentation: view.segmentation.then(|| vec![0; pixels]),
        })
    }
}

/// Publisher that discards everything.
pub struct NullPublisher;

impl ImagePublisher for NullPublisher {
    fn publish_image(&self, _channel: &str, _image: Image) -> Result<(), TransportError> {
        Ok(())
    }

    fn publish_camera_info(&self, _channel: &str, _info: CameraInfo) -> Result<(), TransportError> {
        Ok(())
    }
}

/// Headless parameters giving every camera `stream_type` at
/// `frequency` Hz and `width`x`height` pixels.
pub fn camera_params(cameras: u32, stream_type: &str, frequency: f64, width: u32, height: u32) -> ParamTree {
    let mut params = ParamTree::new();
    params.set("headless", true);
    for id in 0..cameras {
        let prefix = format!("cam_config/cam{id}");
        params
            .set(&format!("{prefix}/stream_type"), stream_type)
            .set(&format!("{prefix}/frequency"), frequency)
            .set(&format!("{prefix}/width"), width)
            .set(&format!("{prefix}/height"), height);
    }
    params
}

/// Build an environment config in namespace `bench` with `plugins`
/// busy plugins and the cameras described by `params`.
pub fn profile(plugins: usize, cameras: u32, params: ParamTree) -> EnvConfig {
    let mut catalog = PluginCatalog::new();
    catalog.register("busy", |cfg: &PluginConfig| {
        Ok(Box::new(BusyPlugin {
            name: cfg.name.clone(),
        }) as Box<dyn Plugin>)
    });
    let ns = Namespace::new("bench");
    catalog.set_plugins(
        ns.clone(),
        (0..plugins)
            .map(|i| PluginConfig::new("busy", format!("busy{i}")))
            .collect(),
    );
    EnvConfig {
        namespace: ns,
        model: Arc::new(BenchModel::new(cameras)),
        state: Box::new(BenchState::new()),
        integrator: Box::new(CountingIntegrator),
        plugin_source: Arc::new(catalog),
        params: Arc::new(params),
        backend: Some(Box::new(ZeroBackend)),
        publisher: Arc::new(NullPublisher),
    }
}
