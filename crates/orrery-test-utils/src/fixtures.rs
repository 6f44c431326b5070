//! Reusable plugin test fixtures.
//!
//! [`ScriptedPlugin`] records every lifecycle event in an
//! [`EventJournal`] as `"<name>:<event>"`:
//!
//! - `load`, `reset`, `drop`
//! - `control`, `passive`, `render`, `last_stage` for each declared stage

use std::sync::Arc;

use orrery_core::{
    Marker, MarkerKind, PluginError, RenderTarget, SimModel, SimState,
};
use orrery_plugin::{
    ControlHook, LastStageHook, PassiveHook, Plugin, PluginCatalog, PluginConfig, RenderHook,
    Stage,
};

use crate::{EventJournal, MockState};

/// Plugin with a scripted load outcome and a configurable stage set.
pub struct ScriptedPlugin {
    pub name: String,
    pub load_ok: bool,
    pub stages: Vec<Stage>,
    journal: EventJournal,
}

impl ScriptedPlugin {
    /// A plugin that loads successfully and declares every stage.
    pub fn new(name: &str, journal: &EventJournal) -> Self {
        Self {
            name: name.into(),
            load_ok: true,
            stages: vec![Stage::Control, Stage::Passive, Stage::Render, Stage::LastStage],
            journal: journal.clone(),
        }
    }

    pub fn failing_load(mut self) -> Self {
        self.load_ok = false;
        self
    }

    pub fn with_stages(mut self, stages: &[Stage]) -> Self {
        self.stages = stages.to_vec();
        self
    }

    pub fn boxed(self) -> Box<dyn Plugin> {
        Box::new(self)
    }

    fn record(&self, event: &str) {
        self.journal.record(format!("{}:{event}", self.name));
    }

    fn declares(&self, stage: Stage) -> bool {
        self.stages.contains(&stage)
    }
}

impl ControlHook for ScriptedPlugin {
    fn on_control(&mut self, _model: &dyn SimModel, state: &mut dyn SimState) {
        if let Some(state) = state.as_any_mut().downcast_mut::<MockState>() {
            state.value += 1.0;
        }
        self.record("control");
    }
}

impl PassiveHook for ScriptedPlugin {
    fn on_passive(&mut self, _model: &dyn SimModel, _state: &mut dyn SimState) {
        self.record("passive");
    }
}

impl RenderHook for ScriptedPlugin {
    fn on_render(&mut self, _model: &dyn SimModel, _state: &dyn SimState, target: &mut dyn RenderTarget) {
        target.push_marker(Marker {
            kind: MarkerKind::Label,
            pos: [0.0; 3],
            size: [0.1; 3],
            rgba: [1.0; 4],
            label: Some(self.name.clone()),
        });
        self.record("render");
    }
}

impl LastStageHook for ScriptedPlugin {
    fn on_last_stage(&mut self, _model: &dyn SimModel, _state: &mut dyn SimState) {
        self.record("last_stage");
    }
}

impl Plugin for ScriptedPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&mut self, _model: &Arc<dyn SimModel>, _state: &mut dyn SimState) -> Result<(), PluginError> {
        self.record("load");
        if self.load_ok {
            Ok(())
        } else {
            Err(PluginError::LoadFailed {
                plugin: self.name.clone(),
                reason: "scripted failure".into(),
            })
        }
    }

    fn reset(&mut self) {
        self.record("reset");
    }

    fn control_hook(&mut self) -> Option<&mut dyn ControlHook> {
        if self.declares(Stage::Control) {
            Some(self)
        } else {
            None
        }
    }

    fn passive_hook(&mut self) -> Option<&mut dyn PassiveHook> {
        if self.declares(Stage::Passive) {
            Some(self)
        } else {
            None
        }
    }

    fn render_hook(&mut self) -> Option<&mut dyn RenderHook> {
        if self.declares(Stage::Render) {
            Some(self)
        } else {
            None
        }
    }

    fn last_stage_hook(&mut self) -> Option<&mut dyn LastStageHook> {
        if self.declares(Stage::LastStage) {
            Some(self)
        } else {
            None
        }
    }
}

impl Drop for ScriptedPlugin {
    fn drop(&mut self) {
        self.record("drop");
    }
}

/// Catalog with two plugin types writing to `journal`:
///
/// - `"scripted"`: loads, declares every stage.
/// - `"failing"`: refuses to load, declares every stage.
pub fn scripted_catalog(journal: &EventJournal) -> PluginCatalog {
    let mut catalog = PluginCatalog::new();
    let ok = journal.clone();
    catalog.register("scripted", move |cfg: &PluginConfig| {
        Ok(ScriptedPlugin::new(&cfg.name, &ok).boxed())
    });
    let bad = journal.clone();
    catalog.register("failing", move |cfg: &PluginConfig| {
        Ok(ScriptedPlugin::new(&cfg.name, &bad).failing_load().boxed())
    });
    catalog
}
