//! Render targets and the overlay markers plugins draw into them.

/// Shape of an overlay marker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MarkerKind {
    /// Sphere; `size[0]` is the radius.
    Sphere,
    /// Axis-aligned box; `size` holds the half extents.
    Box,
    /// Arrow from `pos` along `size`.
    Arrow,
    /// Text label anchored at `pos`.
    Label,
}

/// One piece of decorative geometry added to a rendered scene.
#[derive(Clone, Debug, PartialEq)]
pub struct Marker {
    /// Shape.
    pub kind: MarkerKind,
    /// World position in meters.
    pub pos: [f64; 3],
    /// Shape-dependent size.
    pub size: [f64; 3],
    /// Color as linear RGBA.
    pub rgba: [f32; 4],
    /// Optional text, used by [`MarkerKind::Label`].
    pub label: Option<String>,
}

/// Destination for plugin render hooks.
///
/// Implementations have a fixed capacity; `push_marker` returns `false`
/// once it is reached and the marker is dropped.
pub trait RenderTarget {
    /// Add one marker to the scene.
    fn push_marker(&mut self, marker: Marker) -> bool;

    /// Number of markers currently held.
    fn marker_count(&self) -> usize;
}
