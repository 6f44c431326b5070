//! Camera stream-type bitmask.

use std::fmt;

use smallvec::SmallVec;

/// One image sub-stream a camera can produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StreamKind {
    /// 8-bit, 3-channel color.
    Rgb,
    /// 32-bit float metric depth.
    Depth,
    /// 8-bit, 1-channel segmentation.
    Segmented,
}

impl StreamKind {
    /// Channel suffix under `cameras/<name>/`.
    pub fn channel(self) -> &'static str {
        match self {
            Self::Rgb => "rgb",
            Self::Depth => "depth",
            Self::Segmented => "segmented",
        }
    }

    /// The single-bit mask for this kind.
    pub fn bit(self) -> StreamType {
        match self {
            Self::Rgb => StreamType::RGB,
            Self::Depth => StreamType::DEPTH,
            Self::Segmented => StreamType::SEGMENTED,
        }
    }
}

/// Combination of RGB, DEPTH and SEGMENTED sub-streams.
///
/// ```
/// use orrery_render::{StreamKind, StreamType};
///
/// let t = StreamType::parse("RGB_D").unwrap();
/// assert!(t.contains(StreamType::RGB));
/// assert!(t.contains(StreamType::DEPTH));
/// assert_eq!(t.kinds().as_slice(), &[StreamKind::Rgb, StreamKind::Depth]);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamType(u8);

impl StreamType {
    /// Color only.
    pub const RGB: Self = Self(1);
    /// Depth only.
    pub const DEPTH: Self = Self(2);
    /// Segmentation only.
    pub const SEGMENTED: Self = Self(4);
    /// Color and depth.
    pub const RGB_D: Self = Self(1 | 2);
    /// Color and segmentation.
    pub const RGB_S: Self = Self(1 | 4);
    /// Depth and segmentation.
    pub const DEPTH_S: Self = Self(2 | 4);
    /// All three sub-streams.
    pub const RGB_D_S: Self = Self(1 | 2 | 4);

    const NAMED: [(&'static str, StreamType); 7] = [
        ("RGB", Self::RGB),
        ("DEPTH", Self::DEPTH),
        ("SEGMENTED", Self::SEGMENTED),
        ("RGB_D", Self::RGB_D),
        ("RGB_S", Self::RGB_S),
        ("DEPTH_S", Self::DEPTH_S),
        ("RGB_D_S", Self::RGB_D_S),
    ];

    /// Build from raw bits. Only `1..=7` is a valid mask.
    pub fn from_bits(bits: i64) -> Option<Self> {
        match bits {
            1..=7 => Some(Self(bits as u8)),
            _ => None,
        }
    }

    /// Parse one of the names `RGB`, `DEPTH`, `SEGMENTED`, `RGB_D`,
    /// `RGB_S`, `DEPTH_S`, `RGB_D_S` (case-insensitive).
    pub fn parse(name: &str) -> Option<Self> {
        Self::NAMED
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name.trim()))
            .map(|(_, t)| *t)
    }

    /// Raw bits.
    pub fn bits(self) -> u8 {
        self.0
    }

    /// Whether every bit of `other` is set.
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Enabled sub-streams in channel order (rgb, depth, segmented).
    pub fn kinds(self) -> SmallVec<[StreamKind; 3]> {
        [StreamKind::Rgb, StreamKind::Depth, StreamKind::Segmented]
            .into_iter()
            .filter(|k| self.contains(k.bit()))
            .collect()
    }

    /// Number of enabled sub-streams.
    pub fn count(self) -> usize {
        self.0.count_ones() as usize
    }
}

impl Default for StreamType {
    fn default() -> Self {
        Self::RGB
    }
}

impl fmt::Display for StreamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match Self::NAMED.iter().find(|(_, t)| t == self) {
            Some((name, _)) => write!(f, "{name}"),
            None => write!(f, "0x{:02x}", self.0),
        }
    }
}

impl fmt::Debug for StreamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StreamType({self})")
    }
}
