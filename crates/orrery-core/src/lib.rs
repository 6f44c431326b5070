//! Core types and traits for the Orrery environment orchestrator.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the identifiers, error types, parameter tree, and the traits through
//! which the rest of the workspace talks to the external physics engine
//! (`SimModel`, `SimState`, `Integrator`) and to render targets.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod id;
pub mod params;
pub mod scene;
pub mod traits;

pub use error::{ParamError, PluginError, RenderError, StepError, TransportError};
pub use id::{Namespace, SimTime, StateHandle};
pub use params::{ParamTree, ParamValue};
pub use scene::{Marker, MarkerKind, RenderTarget};
pub use traits::{CameraDescriptor, DepthClip, Integrator, SimModel, SimState};
