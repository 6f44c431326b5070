//! Per-step camera evaluation for one environment.

use orrery_core::{
    DepthClip, Namespace, ParamTree, RenderError, SimModel, SimState, SimTime,
};
use smallvec::SmallVec;
use tracing::{debug, warn};

use crate::backend::{RawFrame, RenderBackend, ViewRequest};
use crate::camera::{CameraConfig, CameraInfo};
use crate::overlay::OverlayScene;
use crate::publish::{Encoding, Image, ImagePublisher};
use crate::schedule::CameraSchedule;
use crate::stream::{StreamKind, StreamType};

/// A camera and its trigger state.
#[derive(Clone, Debug)]
struct ScheduledCamera {
    config: CameraConfig,
    schedule: CameraSchedule,
}

/// Decides, after every committed step, which cameras render and publish.
///
/// Built from scratch on every environment load. Camera identity,
/// resolution and stream type are fixed until the next build.
#[derive(Debug)]
pub struct OffscreenRenderScheduler {
    namespace: Namespace,
    timestep: f64,
    clip: DepthClip,
    cameras: Vec<ScheduledCamera>,
}

impl OffscreenRenderScheduler {
    /// A scheduler with no cameras.
    pub fn empty(namespace: Namespace) -> Self {
        Self {
            namespace,
            timestep: 0.0,
            clip: DepthClip::default(),
            cameras: Vec::new(),
        }
    }

    /// Build the camera list of one environment.
    ///
    /// Every model camera gets a [`CameraConfig`] from `params`; cameras
    /// whose configuration is invalid are logged and left out. Without a
    /// render backend the scheduler holds no cameras and a single warning
    /// is logged. First triggers lie one period after `current_time`.
    pub fn build(
        namespace: &Namespace,
        model: &dyn SimModel,
        params: &ParamTree,
        backend_available: bool,
        current_time: SimTime,
    ) -> Self {
        let mut scheduler = Self::empty(namespace.clone());
        if !backend_available {
            warn!(
                target: "orrery::render",
                %namespace,
                "no render backend available, offscreen cameras disabled"
            );
            return scheduler;
        }

        scheduler.timestep = model.timestep();
        scheduler.clip = model.depth_clip();
        let current_step = current_time.to_steps(scheduler.timestep);

        for camera in model.cameras() {
            let config = match CameraConfig::from_params(&camera, params) {
                Ok(config) => config,
                Err(e) => {
                    warn!(target: "orrery::render", %namespace, camera = %camera.name, error = %e, "skipping camera");
                    continue;
                }
            };
            let schedule = CameraSchedule::new(config.frequency, scheduler.timestep, current_step);
            debug!(
                target: "orrery::render",
                %namespace,
                camera = %config.name,
                stream_type = %config.stream_type,
                width = config.width,
                height = config.height,
                steps_per_period = schedule.steps_per_period(),
                effective_hz = schedule.effective_frequency(),
                "camera scheduled"
            );
            scheduler.cameras.push(ScheduledCamera { config, schedule });
        }
        scheduler
    }

    /// Scheduled camera configurations in model order.
    pub fn cameras(&self) -> impl Iterator<Item = &CameraConfig> {
        self.cameras.iter().map(|c| &c.config)
    }

    /// Trigger state of the camera called `name`.
    pub fn schedule(&self, name: &str) -> Option<&CameraSchedule> {
        self.cameras
            .iter()
            .find(|c| c.config.name == name)
            .map(|c| &c.schedule)
    }

    /// Number of scheduled cameras.
    pub fn len(&self) -> usize {
        self.cameras.len()
    }

    /// Whether no camera is scheduled.
    pub fn is_empty(&self) -> bool {
        self.cameras.is_empty()
    }

    /// Fire every camera whose trigger time has been reached.
    ///
    /// Returns the number of cameras that rendered and published. A
    /// camera whose render fails is logged and counted as not fired;
    /// its schedule still advances.
    pub fn evaluate(
        &mut self,
        model: &dyn SimModel,
        state: &dyn SimState,
        overlay: &OverlayScene,
        backend: &mut dyn RenderBackend,
        publisher: &dyn ImagePublisher,
    ) -> usize {
        if self.cameras.is_empty() {
            return 0;
        }
        let current_step = state.time().to_steps(self.timestep);
        let mut fired = 0;
        for camera in &mut self.cameras {
            let Some(stamp) = camera.schedule.poll(current_step) else {
                continue;
            };
            match render_camera(&camera.config, self.clip, stamp, model, state, overlay, backend) {
                Ok(images) => {
                    publish(&self.namespace, &camera.config, stamp, images, publisher);
                    fired += 1;
                }
                Err(e) => {
                    warn!(target: "orrery::render", namespace = %self.namespace, camera = %camera.config.name, %stamp, error = %e, "camera render failed");
                }
            }
        }
        fired
    }
}

type Images = SmallVec<[(StreamKind, Image); 3]>;

fn render_camera(
    config: &CameraConfig,
    clip: DepthClip,
    stamp: SimTime,
    model: &dyn SimModel,
    state: &dyn SimState,
    overlay: &OverlayScene,
    backend: &mut dyn RenderBackend,
) -> Result<Images, RenderError> {
    let view = ViewRequest {
        camera_id: config.camera_id,
        camera: &config.name,
        width: config.width,
        height: config.height,
        rgb: config.stream_type.contains(StreamType::RGB),
        depth: config.stream_type.contains(StreamType::DEPTH),
        segmentation: config.stream_type.contains(StreamType::SEGMENTED),
        use_segid: config.use_segid,
    };
    let mut frame = backend.render(model, state, overlay, &view)?;

    // Validate every buffer before anything is published.
    let mut images = Images::new();
    for kind in config.stream_type.kinds() {
        let image = convert(config, clip, stamp, kind, &mut frame)?;
        images.push((kind, image));
    }
    Ok(images)
}

fn convert(
    config: &CameraConfig,
    clip: DepthClip,
    stamp: SimTime,
    kind: StreamKind,
    frame: &mut RawFrame,
) -> Result<Image, RenderError> {
    let width = config.width as usize;
    let pixels = config.pixels();
    let missing = || RenderError::MissingBuffer {
        camera: config.name.clone(),
        stream: kind.channel(),
    };
    let (encoding, data) = match kind {
        StreamKind::Rgb => {
            let rgb = frame.rgb.take().ok_or_else(missing)?;
            check_len(config, kind, pixels * 3, rgb.len())?;
            (Encoding::Rgb8, flip_rows(&rgb, width * 3))
        }
        StreamKind::Depth => {
            let depth = frame.depth.take().ok_or_else(missing)?;
            check_len(config, kind, pixels, depth.len())?;
            let bytes = flip_rows(&depth, width)
                .into_iter()
                .flat_map(|d| clip.linearize(d).to_le_bytes())
                .collect();
            (Encoding::Float32C1, bytes)
        }
        StreamKind::Segmented => {
            let seg = frame.segmentation.take().ok_or_else(missing)?;
            check_len(config, kind, pixels, seg.len())?;
            (Encoding::Mono8, flip_rows(&seg, width))
        }
    };
    Ok(Image {
        frame_id: config.frame_id(),
        stamp,
        width: config.width,
        height: config.height,
        encoding,
        step: width * encoding.bytes_per_pixel(),
        data,
    })
}

fn check_len(
    config: &CameraConfig,
    kind: StreamKind,
    expected: usize,
    actual: usize,
) -> Result<(), RenderError> {
    if expected == actual {
        Ok(())
    } else {
        Err(RenderError::BufferSizeMismatch {
            camera: config.name.clone(),
            stream: kind.channel(),
            expected,
            actual,
        })
    }
}

/// Reverse row order: bottom-up readback to top-down images.
fn flip_rows<T: Copy>(buf: &[T], row_len: usize) -> Vec<T> {
    if row_len == 0 {
        return Vec::new();
    }
    buf.chunks_exact(row_len)
        .rev()
        .flat_map(|row| row.iter().copied())
        .collect()
}

fn publish(
    namespace: &Namespace,
    config: &CameraConfig,
    stamp: SimTime,
    images: Images,
    publisher: &dyn ImagePublisher,
) {
    for (kind, image) in images {
        let channel = namespace.join(&config.channel(kind.channel()));
        if let Err(e) = publisher.publish_image(&channel, image) {
            warn!(target: "orrery::render", %channel, error = %e, "image publish failed");
        }
    }
    let channel = namespace.join(&config.channel("camera_info"));
    if let Err(e) = publisher.publish_camera_info(&channel, CameraInfo::from_config(config, stamp)) {
        warn!(target: "orrery::render", %channel, error = %e, "camera info publish failed");
    }
}
