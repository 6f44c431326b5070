//! Test utilities and mock types for Orrery development.
//!
//! Provides mock implementations of the physics-engine seams
//! ([`SimModel`], [`SimState`], [`Integrator`]), an [`EventJournal`]
//! for asserting callback and teardown order, scripted plugins in
//! [`fixtures`], and mock render/provisioning services in [`services`].

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;
pub mod services;

use std::any::Any;
use std::sync::{Arc, Mutex};

use orrery_core::{
    CameraDescriptor, DepthClip, Integrator, SimModel, SimState, SimTime, StateHandle, StepError,
};

pub use fixtures::{scripted_catalog, ScriptedPlugin};
pub use services::{MockBackend, MockProvisioner};

// ── EventJournal ───────────────────────────────────────────────────

/// Shared, ordered log of test events such as `"a:load"` or `"state:drop"`.
#[derive(Clone, Debug, Default)]
pub struct EventJournal {
    events: Arc<Mutex<Vec<String>>>,
}

impl EventJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, event: impl Into<String>) {
        self.events.lock().unwrap().push(event.into());
    }

    /// Snapshot of every event so far.
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    /// Events that end with `suffix`, e.g. `":reset"`.
    pub fn matching(&self, suffix: &str) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|e| e.ends_with(suffix))
            .collect()
    }

    /// Index of the first occurrence of `event`.
    pub fn position(&self, event: &str) -> Option<usize> {
        self.events.lock().unwrap().iter().position(|e| e == event)
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

// ── MockModel ──────────────────────────────────────────────────────

/// Model with a fixed timestep and a configurable camera list.
pub struct MockModel {
    pub name: String,
    pub timestep: f64,
    pub cameras: Vec<CameraDescriptor>,
    pub depth_clip: DepthClip,
    journal: Option<EventJournal>,
}

impl MockModel {
    pub fn new(timestep: f64) -> Self {
        Self {
            name: "mock".into(),
            timestep,
            cameras: Vec::new(),
            depth_clip: DepthClip::default(),
            journal: None,
        }
    }

    /// Add a camera with the next free id.
    pub fn with_camera(mut self, name: &str, fovy_deg: f64) -> Self {
        self.cameras.push(CameraDescriptor {
            id: self.cameras.len() as u32,
            name: name.into(),
            fovy_deg,
        });
        self
    }

    /// Record `"model:drop"` in `journal` when dropped.
    pub fn with_journal(mut self, journal: &EventJournal) -> Self {
        self.journal = Some(journal.clone());
        self
    }

    pub fn shared(self) -> Arc<dyn SimModel> {
        Arc::new(self)
    }
}

impl SimModel for MockModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn timestep(&self) -> f64 {
        self.timestep
    }

    fn cameras(&self) -> Vec<CameraDescriptor> {
        self.cameras.clone()
    }

    fn depth_clip(&self) -> DepthClip {
        self.depth_clip
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for MockModel {
    fn drop(&mut self) {
        if let Some(journal) = &self.journal {
            journal.record("model:drop");
        }
    }
}

// ── MockState ──────────────────────────────────────────────────────

/// State whose time is `steps * timestep`.
pub struct MockState {
    pub handle: StateHandle,
    pub timestep: f64,
    pub steps: u64,
    /// Free-form value plugins may write to.
    pub value: f64,
    journal: Option<EventJournal>,
}

impl MockState {
    pub fn new(timestep: f64) -> Self {
        Self {
            handle: StateHandle::next(),
            timestep,
            steps: 0,
            value: 0.0,
            journal: None,
        }
    }

    /// Record `"state:drop"` in `journal` when dropped.
    pub fn with_journal(mut self, journal: &EventJournal) -> Self {
        self.journal = Some(journal.clone());
        self
    }

    pub fn boxed(self) -> Box<dyn SimState> {
        Box::new(self)
    }
}

impl SimState for MockState {
    fn handle(&self) -> StateHandle {
        self.handle
    }

    fn time(&self) -> SimTime {
        SimTime::from_steps(self.steps, self.timestep)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl Drop for MockState {
    fn drop(&mut self) {
        if let Some(journal) = &self.journal {
            journal.record("state:drop");
        }
    }
}

// ── FixedStepIntegrator ────────────────────────────────────────────

/// Advances a [`MockState`] by one step; optionally fails on a given call.
#[derive(Default)]
pub struct FixedStepIntegrator {
    /// 1-based call number that fails. `None` = never fail.
    pub fail_on_call: Option<u64>,
    calls: u64,
}

impl FixedStepIntegrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(call: u64) -> Self {
        Self {
            fail_on_call: Some(call),
            calls: 0,
        }
    }

    pub fn boxed(self) -> Box<dyn Integrator> {
        Box::new(self)
    }
}

impl Integrator for FixedStepIntegrator {
    fn integrate(&mut self, _model: &dyn SimModel, state: &mut dyn SimState) -> Result<(), StepError> {
        self.calls += 1;
        if self.fail_on_call == Some(self.calls) {
            return Err(StepError::IntegrationFailed {
                reason: format!("scripted failure on call {}", self.calls),
            });
        }
        let state = state
            .as_any_mut()
            .downcast_mut::<MockState>()
            .ok_or_else(|| StepError::IntegrationFailed {
                reason: "state is not a MockState".into(),
            })?;
        state.steps += 1;
        Ok(())
    }
}
