//! Offscreen multi-camera rendering for Orrery environments.
//!
//! An [`OffscreenRenderScheduler`] is built once per environment load
//! from the model's cameras and the namespace parameters. After every
//! committed physics step it checks each camera's [`CameraSchedule`],
//! asks the [`RenderBackend`] for the buffers the camera's
//! [`StreamType`] requires, and hands the resulting images to an
//! [`ImagePublisher`] stamped with simulation time.
//!
//! Trigger times live on the simulation step grid: a camera at
//! frequency `f` on a model with timestep `dt` fires every
//! `ceil(1 / (f * dt))` steps, never on wall-clock time.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod backend;
pub mod camera;
pub mod overlay;
pub mod publish;
pub mod schedule;
pub mod scheduler;
pub mod stream;

pub use backend::{RawFrame, RenderBackend, ViewRequest};
pub use camera::{CameraConfig, CameraInfo};
pub use overlay::OverlayScene;
pub use publish::{ChannelPublisher, Encoding, Image, ImagePublisher, Publication};
pub use schedule::CameraSchedule;
pub use scheduler::OffscreenRenderScheduler;
pub use stream::{StreamKind, StreamType};
