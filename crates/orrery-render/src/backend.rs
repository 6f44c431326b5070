//! The render backend seam.

use orrery_core::{RenderError, SimModel, SimState};

use crate::overlay::OverlayScene;

/// What to render for one camera fire.
///
/// All requested buffers come from a single evaluation of the camera
/// pose and scene.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViewRequest<'a> {
    /// Index of the camera in the model.
    pub camera_id: u32,
    /// Camera name, for error reporting.
    pub camera: &'a str,
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Produce an RGB buffer.
    pub rgb: bool,
    /// Produce a depth buffer.
    pub depth: bool,
    /// Produce a segmentation buffer.
    pub segmentation: bool,
    /// Color segmentation by object id.
    pub use_segid: bool,
}

/// Buffers returned by a backend, rows ordered bottom-up.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawFrame {
    /// `width * height * 3` bytes of RGB.
    pub rgb: Option<Vec<u8>>,
    /// `width * height` normalized window depths in `[0, 1]`.
    pub depth: Option<Vec<f32>>,
    /// `width * height` segmentation labels.
    pub segmentation: Option<Vec<u8>>,
}

/// An offscreen rasterizer owned by one environment.
///
/// Implementations are driven from the environment's stepping thread
/// only and must not retain `state` beyond the call.
pub trait RenderBackend: Send + 'static {
    /// Render the buffers named in `view` with `overlay` composited in.
    fn render(
        &mut self,
        model: &dyn SimModel,
        state: &dyn SimState,
        overlay: &OverlayScene,
        view: &ViewRequest<'_>,
    ) -> Result<RawFrame, RenderError>;
}
