//! Image messages and the publisher seam.

use std::fmt;

use crossbeam_channel::{Receiver, Sender, TrySendError};
use orrery_core::{SimTime, TransportError};

use crate::camera::CameraInfo;

/// Pixel encoding of an [`Image`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Encoding {
    /// 8-bit, 3-channel color.
    Rgb8,
    /// 32-bit float, 1 channel, little-endian.
    Float32C1,
    /// 8-bit, 1 channel.
    Mono8,
}

impl Encoding {
    /// Bytes per pixel.
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgb8 => 3,
            Self::Float32C1 => 4,
            Self::Mono8 => 1,
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rgb8 => write!(f, "rgb8"),
            Self::Float32C1 => write!(f, "32FC1"),
            Self::Mono8 => write!(f, "mono8"),
        }
    }
}

/// One published image, rows ordered top-down.
#[derive(Clone, Debug, PartialEq)]
pub struct Image {
    /// Frame id, `<camera>_optical_frame`.
    pub frame_id: String,
    /// Simulation time of the camera trigger.
    pub stamp: SimTime,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel encoding.
    pub encoding: Encoding,
    /// Row length in bytes.
    pub step: usize,
    /// Pixel bytes, `step * height` long.
    pub data: Vec<u8>,
}

impl Image {
    /// Decode [`Encoding::Float32C1`] data. `None` for other encodings.
    pub fn depth_values(&self) -> Option<Vec<f32>> {
        if self.encoding != Encoding::Float32C1 {
            return None;
        }
        Some(
            self.data
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect(),
        )
    }
}

/// Sink for camera output.
///
/// Channels passed in are already resolved against the environment
/// namespace.
pub trait ImagePublisher: Send + Sync {
    /// Publish one sub-stream image.
    fn publish_image(&self, channel: &str, image: Image) -> Result<(), TransportError>;

    /// Publish the intrinsics accompanying a camera fire.
    fn publish_camera_info(&self, channel: &str, info: CameraInfo) -> Result<(), TransportError>;
}

// ── Channel-backed publisher ───────────────────────────────────────

/// A message emitted by [`ChannelPublisher`].
#[derive(Clone, Debug, PartialEq)]
pub enum Publication {
    /// A sub-stream image.
    Image {
        /// Fully qualified channel.
        channel: String,
        /// The image.
        image: Image,
    },
    /// Camera intrinsics.
    CameraInfo {
        /// Fully qualified channel.
        channel: String,
        /// The intrinsics.
        info: CameraInfo,
    },
}

impl Publication {
    /// Channel the message was published on.
    pub fn channel(&self) -> &str {
        match self {
            Self::Image { channel, .. } | Self::CameraInfo { channel, .. } => channel,
        }
    }

    /// Simulation-time stamp of the message.
    pub fn stamp(&self) -> SimTime {
        match self {
            Self::Image { image, .. } => image.stamp,
            Self::CameraInfo { info, .. } => info.stamp,
        }
    }
}

/// Publisher that forwards every message into a crossbeam channel.
///
/// The receiving end is handed out at construction; dropping it makes
/// every later publish fail with [`TransportError::Unreachable`].
#[derive(Clone, Debug)]
pub struct ChannelPublisher {
    tx: Sender<Publication>,
}

impl ChannelPublisher {
    /// A publisher with an unbounded queue.
    pub fn unbounded() -> (Self, Receiver<Publication>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self { tx }, rx)
    }

    /// A publisher whose queue rejects messages beyond `capacity`.
    pub fn bounded(capacity: usize) -> (Self, Receiver<Publication>) {
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        (Self { tx }, rx)
    }

    fn send(&self, publication: Publication) -> Result<(), TransportError> {
        self.tx.try_send(publication).map_err(|e| match e {
            TrySendError::Full(p) => TransportError::CallFailed {
                service: p.channel().to_string(),
                reason: "publish queue full".into(),
            },
            TrySendError::Disconnected(p) => TransportError::Unreachable {
                service: p.channel().to_string(),
            },
        })
    }
}

impl ImagePublisher for ChannelPublisher {
    fn publish_image(&self, channel: &str, image: Image) -> Result<(), TransportError> {
        self.send(Publication::Image {
            channel: channel.to_string(),
            image,
        })
    }

    fn publish_camera_info(&self, channel: &str, info: CameraInfo) -> Result<(), TransportError> {
        self.send(Publication::CameraInfo {
            channel: channel.to_string(),
            info,
        })
    }
}
