//! Traits implemented by the external physics engine.
//!
//! The orchestrator never integrates or renders on its own. It sees the
//! physics engine through three seams: a read-mostly [`SimModel`] that may
//! be shared by several environments, one exclusively owned [`SimState`]
//! per environment, and an [`Integrator`] that advances a state by one
//! fixed timestep.

use std::any::Any;

use crate::error::StepError;
use crate::id::{SimTime, StateHandle};

/// A camera declared by the simulation model.
#[derive(Clone, Debug, PartialEq)]
pub struct CameraDescriptor {
    /// Index of the camera inside the model.
    pub id: u32,
    /// Unique camera name. Channels are derived from it.
    pub name: String,
    /// Vertical field of view in degrees.
    pub fovy_deg: f64,
}

/// Clipping planes used to linearize rendered depth.
///
/// The near and far planes are expressed as fractions of the model
/// extent, matching how the depth buffer was produced.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DepthClip {
    /// Spatial extent of the model in meters.
    pub extent: f64,
    /// Near plane as a fraction of `extent`.
    pub znear: f64,
    /// Far plane as a fraction of `extent`.
    pub zfar: f64,
}

impl DepthClip {
    /// Near plane distance in meters.
    pub fn near(&self) -> f64 {
        self.extent * self.znear
    }

    /// Far plane distance in meters.
    pub fn far(&self) -> f64 {
        self.extent * self.zfar
    }

    /// Convert a normalized window depth in `[0, 1]` to metric depth.
    pub fn linearize(&self, window_depth: f32) -> f32 {
        let f = self.far() as f32;
        let n = self.near() as f32;
        -f * n / (window_depth * (f - n) - f)
    }
}

impl Default for DepthClip {
    fn default() -> Self {
        Self {
            extent: 1.0,
            znear: 0.01,
            zfar: 50.0,
        }
    }
}

/// Immutable description of a simulated system.
///
/// # Contract
///
/// - A model never changes after construction; environments share it
///   through `Arc<dyn SimModel>`.
/// - `timestep()` is fixed and strictly positive.
pub trait SimModel: Send + Sync + 'static {
    /// Human-readable model name for logging.
    fn name(&self) -> &str;

    /// Fixed integration timestep in seconds.
    fn timestep(&self) -> f64;

    /// Cameras declared by the model, in model order.
    fn cameras(&self) -> Vec<CameraDescriptor>;

    /// Depth clipping used by the render backend.
    fn depth_clip(&self) -> DepthClip {
        DepthClip::default()
    }

    /// Downcast hook for plugins that need the concrete model type.
    fn as_any(&self) -> &dyn Any;
}

/// Mutable simulation state owned by exactly one environment.
pub trait SimState: Send + 'static {
    /// Registry key for this state object. Stable for its lifetime.
    fn handle(&self) -> StateHandle;

    /// Current simulation time.
    fn time(&self) -> SimTime;

    /// Downcast hook for plugins that need the concrete state type.
    fn as_any(&self) -> &dyn Any;

    /// Mutable downcast hook.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Advances a [`SimState`] by one fixed timestep of its [`SimModel`].
pub trait Integrator: Send + 'static {
    /// Integrate one step.
    ///
    /// On error the state must be left as it was before the call or in
    /// a state the engine can keep stepping from; the orchestrator does
    /// not attempt a rollback.
    fn integrate(&mut self, model: &dyn SimModel, state: &mut dyn SimState)
        -> Result<(), StepError>;
}
