//! Orrery: multi-environment orchestration for physics simulation.
//!
//! This is the top-level facade crate that re-exports the public API from all
//! Orrery sub-crates. For most users, adding `orrery` as a single dependency is
//! sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use std::any::Any;
//! use std::sync::Arc;
//! use orrery::prelude::*;
//!
//! struct Model;
//! impl SimModel for Model {
//!     fn name(&self) -> &str { "point" }
//!     fn timestep(&self) -> f64 { 0.01 }
//!     fn cameras(&self) -> Vec<CameraDescriptor> { Vec::new() }
//!     fn as_any(&self) -> &dyn Any { self }
//! }
//!
//! struct State { handle: StateHandle, steps: u64 }
//! impl SimState for State {
//!     fn handle(&self) -> StateHandle { self.handle }
//!     fn time(&self) -> SimTime { SimTime::from_steps(self.steps, 0.01) }
//!     fn as_any(&self) -> &dyn Any { self }
//!     fn as_any_mut(&mut self) -> &mut dyn Any { self }
//! }
//!
//! struct Tick;
//! impl Integrator for Tick {
//!     fn integrate(&mut self, _: &dyn SimModel, state: &mut dyn SimState) -> Result<(), StepError> {
//!         if let Some(s) = state.as_any_mut().downcast_mut::<State>() {
//!             s.steps += 1;
//!         }
//!         Ok(())
//!     }
//! }
//!
//! let (publisher, _images) = ChannelPublisher::unbounded();
//! let registry = EnvironmentRegistry::new();
//! let mut env = Environment::new(
//!     EnvConfig {
//!         namespace: Namespace::new("env0"),
//!         model: Arc::new(Model),
//!         state: Box::new(State { handle: StateHandle::next(), steps: 0 }),
//!         integrator: Box::new(Tick),
//!         plugin_source: Arc::new(PluginCatalog::new()),
//!         params: Arc::new(ParamTree::new()),
//!         backend: None,
//!         publisher: Arc::new(publisher),
//!     },
//!     &registry,
//! )
//! .unwrap();
//! env.step_n(10).unwrap();
//! assert_eq!(env.steps(), 10);
//! assert!(registry.lookup(env.handle()).is_some());
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `orrery-core` | IDs, errors, parameter tree, engine seams |
//! | [`plugin`] | `orrery-plugin` | Plugin trait, stage hooks, catalogs, plugin sets |
//! | [`render`] | `orrery-render` | Camera configs, schedules, offscreen scheduler, publishing |
//! | [`engine`] | `orrery-engine` | Environments, registry, parallel stepping, provisioning |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, traits, and IDs (`orrery-core`).
///
/// Contains the parameter tree, error types, and the seams to the
/// physics engine ([`types::SimModel`], [`types::SimState`],
/// [`types::Integrator`]).
pub use orrery_core as types;

/// Plugin trait and lifecycle management (`orrery-plugin`).
///
/// The [`plugin::Plugin`] trait is the main extension point for
/// environment behaviour; [`plugin::PluginSet`] runs the staged hooks.
pub use orrery_plugin as plugin;

/// Offscreen camera rendering (`orrery-render`).
///
/// [`render::OffscreenRenderScheduler`] decides which cameras fire on
/// each step and publishes their images.
pub use orrery_render as render;

/// Environment lifecycle (`orrery-engine`).
///
/// [`engine::Environment`] for caller-driven stepping,
/// [`engine::ParallelEnvironment`] for a dedicated stepping thread.
pub use orrery_engine as engine;

/// Common imports for typical Orrery usage.
///
/// ```rust
/// use orrery::prelude::*;
/// ```
pub mod prelude {
    // Core types and traits
    pub use orrery_core::{
        CameraDescriptor, Integrator, Namespace, ParamTree, RenderTarget, SimModel, SimState,
        SimTime, StateHandle,
    };

    // Errors
    pub use orrery_core::{PluginError, RenderError, StepError};

    // Plugins
    pub use orrery_plugin::{
        ControlHook, LastStageHook, PassiveHook, Plugin, PluginCatalog, PluginConfig,
        PluginSource, RenderHook,
    };

    // Rendering
    pub use orrery_render::{ChannelPublisher, ImagePublisher, RenderBackend, StreamType};

    // Engine
    pub use orrery_engine::{
        EnvConfig, Environment, EnvironmentRegistry, ParallelConfig, ParallelEnvironment,
        StepMetrics,
    };
}
