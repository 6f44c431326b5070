//! Per-camera configuration and sensor intrinsics.

use orrery_core::{CameraDescriptor, ParamError, ParamTree, ParamValue, SimTime};

use crate::stream::StreamType;

/// Default publish frequency in Hz.
pub const DEFAULT_FREQUENCY: f64 = 15.0;
/// Default image width in pixels.
pub const DEFAULT_WIDTH: u32 = 720;
/// Default image height in pixels.
pub const DEFAULT_HEIGHT: u32 = 480;

/// Stream settings for one model camera, fixed for one load cycle.
#[derive(Clone, Debug, PartialEq)]
pub struct CameraConfig {
    /// Camera name, unique within the environment.
    pub name: String,
    /// Index of the camera in the model.
    pub camera_id: u32,
    /// Vertical field of view in degrees.
    pub fovy_deg: f64,
    /// Enabled sub-streams.
    pub stream_type: StreamType,
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Requested publish frequency in Hz.
    pub frequency: f64,
    /// Color the segmentation buffer by object id instead of object type.
    pub use_segid: bool,
}

impl CameraConfig {
    /// Default settings for a model camera.
    pub fn for_camera(camera: &CameraDescriptor) -> Self {
        Self {
            name: camera.name.clone(),
            camera_id: camera.id,
            fovy_deg: camera.fovy_deg,
            stream_type: StreamType::default(),
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            frequency: DEFAULT_FREQUENCY,
            use_segid: false,
        }
    }

    /// Settings for a model camera, overridden from
    /// `cam_config/<name>/{stream_type,width,height,frequency,use_segid}`.
    ///
    /// Absent keys keep their default. `stream_type` is either the
    /// integer mask `1..=7` or a mask name such as `"RGB_D"`.
    pub fn from_params(camera: &CameraDescriptor, params: &ParamTree) -> Result<Self, ParamError> {
        let mut config = Self::for_camera(camera);
        let prefix = format!("cam_config/{}", camera.name);
        let scoped = params.scoped(&prefix);
        let key = |k: &str| format!("{prefix}/{k}");

        if let Some(value) = scoped.get("stream_type") {
            config.stream_type = parse_stream_type(value).ok_or_else(|| ParamError::OutOfRange {
                key: key("stream_type"),
                reason: format!("{value:?} is not a stream type"),
            })?;
        }
        if let Some(w) = scoped.get_u32("width").map_err(|e| rescope(e, &prefix))? {
            config.width = w;
        }
        if let Some(h) = scoped.get_u32("height").map_err(|e| rescope(e, &prefix))? {
            config.height = h;
        }
        if let Some(f) = scoped.get_f64("frequency").map_err(|e| rescope(e, &prefix))? {
            config.frequency = f;
        }
        if let Some(s) = scoped.get_bool("use_segid").map_err(|e| rescope(e, &prefix))? {
            config.use_segid = s;
        }

        if config.width == 0 || config.height == 0 {
            return Err(ParamError::OutOfRange {
                key: key("width"),
                reason: format!("resolution {}x{} is empty", config.width, config.height),
            });
        }
        if !config.frequency.is_finite() || config.frequency <= 0.0 {
            return Err(ParamError::OutOfRange {
                key: key("frequency"),
                reason: format!("{} Hz is not a positive frequency", config.frequency),
            });
        }
        Ok(config)
    }

    /// Pixel count of one image.
    pub fn pixels(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Channel of sub-stream `suffix` relative to the environment namespace.
    pub fn channel(&self, suffix: &str) -> String {
        format!("cameras/{}/{}", self.name, suffix)
    }

    /// Frame id attached to every image from this camera.
    pub fn frame_id(&self) -> String {
        format!("{}_optical_frame", self.name)
    }
}

fn parse_stream_type(value: &ParamValue) -> Option<StreamType> {
    match value {
        ParamValue::Int(bits) => StreamType::from_bits(*bits),
        ParamValue::Str(name) => StreamType::parse(name),
        _ => None,
    }
}

// Scoped lookups report the short key; restore the full path.
fn rescope(err: ParamError, prefix: &str) -> ParamError {
    match err {
        ParamError::Missing { key } => ParamError::Missing {
            key: format!("{prefix}/{key}"),
        },
        ParamError::TypeMismatch { key, expected } => ParamError::TypeMismatch {
            key: format!("{prefix}/{key}"),
            expected,
        },
        ParamError::OutOfRange { key, reason } => ParamError::OutOfRange {
            key: format!("{prefix}/{key}"),
            reason,
        },
    }
}

// ── Camera info ────────────────────────────────────────────────────

/// Pinhole intrinsics published alongside every camera fire.
#[derive(Clone, Debug, PartialEq)]
pub struct CameraInfo {
    /// Frame id, `<name>_optical_frame`.
    pub frame_id: String,
    /// Simulation time of the fire.
    pub stamp: SimTime,
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Row-major 3x3 intrinsic matrix.
    pub k: [f64; 9],
    /// Row-major 3x4 projection matrix.
    pub p: [f64; 12],
}

impl CameraInfo {
    /// Intrinsics of `config` with the focal length derived from its
    /// vertical field of view.
    pub fn from_config(config: &CameraConfig, stamp: SimTime) -> Self {
        let half_fovy = config.fovy_deg.to_radians() / 2.0;
        let focal = (1.0 / half_fovy.tan()) * f64::from(config.height) / 2.0;
        let cx = (f64::from(config.width) - 1.0) / 2.0;
        let cy = (f64::from(config.height) - 1.0) / 2.0;
        Self {
            frame_id: config.frame_id(),
            stamp,
            width: config.width,
            height: config.height,
            k: [focal, 0.0, cx, 0.0, focal, cy, 0.0, 0.0, 1.0],
            p: [focal, 0.0, cx, 0.0, 0.0, focal, cy, 0.0, 0.0, 0.0, 1.0, 0.0],
        }
    }

    /// Focal length in pixels.
    pub fn focal(&self) -> f64 {
        self.k[0]
    }
}
