//! Mock render backend and provisioning service.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use orrery_core::{RenderError, SimModel, SimState, TransportError};
use orrery_engine::{BootstrapRequest, ProvisioningService, ShutdownRequest};
use orrery_render::{OverlayScene, RawFrame, RenderBackend, ViewRequest};

use crate::EventJournal;

// ── MockBackend ────────────────────────────────────────────────────

/// Render backend producing deterministic bottom-up buffers.
///
/// Row `r` of the RGB and segmentation buffers (counted from the
/// bottom) is filled with the byte `r`; depth is a constant
/// normalized value.
#[derive(Clone)]
pub struct MockBackend {
    pub depth: f32,
    pub fail: bool,
    /// Return RGB buffers one byte short.
    pub short_rgb: bool,
    calls: Arc<AtomicUsize>,
    overlay_markers: Arc<Mutex<Vec<usize>>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            depth: 0.5,
            fail: false,
            short_rgb: false,
            calls: Arc::new(AtomicUsize::new(0)),
            overlay_markers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    /// Returns RGB buffers one byte short.
    pub fn truncating() -> Self {
        Self {
            short_rgb: true,
            ..Self::new()
        }
    }

    /// Shared counter of `render` calls, readable after the backend is moved.
    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    /// Shared log of the overlay marker count seen by each render call.
    pub fn overlay_log(&self) -> Arc<Mutex<Vec<usize>>> {
        Arc::clone(&self.overlay_markers)
    }

    pub fn boxed(self) -> Box<dyn RenderBackend> {
        Box::new(self)
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderBackend for MockBackend {
    fn render(
        &mut self,
        _model: &dyn SimModel,
        _state: &dyn SimState,
        overlay: &OverlayScene,
        view: &ViewRequest<'_>,
    ) -> Result<RawFrame, RenderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.overlay_markers
            .lock()
            .unwrap()
            .push(overlay.markers().len());
        if self.fail {
            return Err(RenderError::BackendFailed {
                camera: view.camera.to_string(),
                reason: "scripted failure".into(),
            });
        }
        let (w, h) = (view.width as usize, view.height as usize);
        let rows = |bytes_per_pixel: usize| -> Vec<u8> {
            (0..h)
                .flat_map(|r| std::iter::repeat(r as u8).take(w * bytes_per_pixel))
                .collect()
        };
        let mut frame = RawFrame::default();
        if view.rgb {
            let mut rgb = rows(3);
            if self.short_rgb {
                rgb.pop();
            }
            frame.rgb = Some(rgb);
        }
        if view.depth {
            frame.depth = Some(vec![self.depth; w * h]);
        }
        if view.segmentation {
            frame.segmentation = Some(rows(1));
        }
        Ok(frame)
    }
}

// ── MockProvisioner ────────────────────────────────────────────────

/// Provisioning service with scripted reachability and answers.
///
/// `wait_for_service` returns immediately; it never sleeps.
pub struct MockProvisioner {
    pub reachable: bool,
    pub answer: Result<bool, TransportError>,
    pub bootstraps: Mutex<Vec<BootstrapRequest>>,
    pub shutdowns: Mutex<Vec<ShutdownRequest>>,
    pub waited: Mutex<Vec<Duration>>,
    journal: Option<EventJournal>,
}

impl MockProvisioner {
    /// Reachable and provisions successfully.
    pub fn reachable() -> Self {
        Self {
            reachable: true,
            answer: Ok(true),
            bootstraps: Mutex::new(Vec::new()),
            shutdowns: Mutex::new(Vec::new()),
            waited: Mutex::new(Vec::new()),
            journal: None,
        }
    }

    pub fn unreachable() -> Self {
        Self {
            reachable: false,
            ..Self::reachable()
        }
    }

    /// Reachable but answers `false`.
    pub fn rejecting() -> Self {
        Self {
            answer: Ok(false),
            ..Self::reachable()
        }
    }

    /// Reachable but every call fails in transport.
    pub fn broken() -> Self {
        Self {
            answer: Err(TransportError::CallFailed {
                service: "/bootstrap_ns".into(),
                reason: "connection reset".into(),
            }),
            ..Self::reachable()
        }
    }

    /// Record `"teardown"` in `journal` on every shutdown call.
    pub fn with_journal(mut self, journal: &EventJournal) -> Self {
        self.journal = Some(journal.clone());
        self
    }

    pub fn bootstrap_count(&self) -> usize {
        self.bootstraps.lock().unwrap().len()
    }

    pub fn shutdown_count(&self) -> usize {
        self.shutdowns.lock().unwrap().len()
    }
}

impl ProvisioningService for MockProvisioner {
    fn wait_for_service(&self, _service: &str, timeout: Duration) -> bool {
        self.waited.lock().unwrap().push(timeout);
        self.reachable
    }

    fn bootstrap(&self, request: &BootstrapRequest) -> Result<bool, TransportError> {
        self.bootstraps.lock().unwrap().push(request.clone());
        self.answer.clone()
    }

    fn shutdown(&self, request: &ShutdownRequest) -> Result<bool, TransportError> {
        self.shutdowns.lock().unwrap().push(request.clone());
        if let Some(journal) = &self.journal {
            journal.record("teardown");
        }
        if self.reachable {
            Ok(true)
        } else {
            Err(TransportError::Unreachable {
                service: "/shutdown_ns".into(),
            })
        }
    }
}
