//! Bounded marker buffer that plugin render hooks draw into.

use orrery_core::{Marker, RenderTarget};

/// Default marker capacity of an [`OverlayScene`].
pub const DEFAULT_OVERLAY_CAPACITY: usize = 1000;

/// Decorative geometry added to every camera view rendered in a step.
///
/// Cleared at the start of each render stage; markers beyond the
/// capacity are dropped and counted.
#[derive(Clone, Debug)]
pub struct OverlayScene {
    markers: Vec<Marker>,
    capacity: usize,
    dropped: u64,
}

impl OverlayScene {
    /// An empty scene holding at most `capacity` markers.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            markers: Vec::with_capacity(capacity.min(DEFAULT_OVERLAY_CAPACITY)),
            capacity,
            dropped: 0,
        }
    }

    /// Remove every marker. The dropped counter is kept.
    pub fn clear(&mut self) {
        self.markers.clear();
    }

    /// Current markers in insertion order.
    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    /// Maximum number of markers held.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Markers rejected for lack of capacity since construction.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl Default for OverlayScene {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_OVERLAY_CAPACITY)
    }
}

impl RenderTarget for OverlayScene {
    fn push_marker(&mut self, marker: Marker) -> bool {
        if self.markers.len() >= self.capacity {
            self.dropped += 1;
            return false;
        }
        self.markers.push(marker);
        true
    }

    fn marker_count(&self) -> usize {
        self.markers.len()
    }
}
