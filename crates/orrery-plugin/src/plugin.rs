//! The [`Plugin`] trait and its capability hooks.
//!
//! A plugin declares which stages it participates in by returning
//! `Some(self)` from the matching hook accessor. The dispatcher asks
//! each ready plugin for the hook of the stage being run and skips
//! plugins that answer `None`.

use std::fmt;
use std::sync::Arc;

use orrery_core::{PluginError, RenderTarget, SimModel, SimState};

/// A stage of the simulation step at which plugin hooks run.
///
/// Stages run in declaration order within one step; integration happens
/// between [`Stage::Control`] and [`Stage::Passive`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Before integration: compute actuator commands.
    Control,
    /// After integration: apply passive effects.
    Passive,
    /// After the physics step commits: decorate the render target.
    Render,
    /// End of the step: publish sensor readings and similar.
    LastStage,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Control => write!(f, "control"),
            Self::Passive => write!(f, "passive"),
            Self::Render => write!(f, "render"),
            Self::LastStage => write!(f, "last_stage"),
        }
    }
}

/// Hook run before integration.
pub trait ControlHook {
    /// Called once per step with the environment's model and state.
    fn on_control(&mut self, model: &dyn SimModel, state: &mut dyn SimState);
}

/// Hook run after integration.
pub trait PassiveHook {
    /// Called once per step with the environment's model and state.
    fn on_passive(&mut self, model: &dyn SimModel, state: &mut dyn SimState);
}

/// Hook run during the render stage.
pub trait RenderHook {
    /// Add geometry to `target`. The state is read-only here.
    fn on_render(&mut self, model: &dyn SimModel, state: &dyn SimState, target: &mut dyn RenderTarget);
}

/// Hook run at the end of every step.
pub trait LastStageHook {
    /// Called once per step with the environment's model and state.
    fn on_last_stage(&mut self, model: &dyn SimModel, state: &mut dyn SimState);
}

/// An externally supplied environment extension.
///
/// # Lifecycle
///
/// 1. Constructed from a [`PluginConfig`](crate::PluginConfig) by a
///    [`PluginSource`](crate::PluginSource).
/// 2. [`load`](Plugin::load) is attempted once per environment (re)load.
///    Only plugins whose load succeeds receive stage callbacks.
/// 3. [`reset`](Plugin::reset) is called on every registered plugin,
///    whether or not its load succeeded, so a plugin may use it to
///    recover from a failed load.
/// 4. Teardown is the plugin's own `Drop`. The environment guarantees
///    the plugin is dropped before the model and state it was loaded
///    with are released.
///
/// # Examples
///
/// A plugin that counts control callbacks:
///
/// ```
/// use orrery_core::{SimModel, SimState};
/// use orrery_plugin::{ControlHook, Plugin};
///
/// struct Counter {
///     calls: u64,
/// }
///
/// impl ControlHook for Counter {
///     fn on_control(&mut self, _model: &dyn SimModel, _state: &mut dyn SimState) {
///         self.calls += 1;
///     }
/// }
///
/// impl Plugin for Counter {
///     fn name(&self) -> &str { "counter" }
///     fn reset(&mut self) { self.calls = 0; }
///     fn control_hook(&mut self) -> Option<&mut dyn ControlHook> { Some(self) }
/// }
///
/// let mut plugin = Counter { calls: 3 };
/// plugin.reset();
/// assert_eq!(plugin.calls, 0);
/// assert!(plugin.control_hook().is_some());
/// assert!(plugin.passive_hook().is_none());
/// ```
pub trait Plugin: Send + 'static {
    /// Name for logging and load reports.
    fn name(&self) -> &str;

    /// Bind the plugin to a model/state pair.
    ///
    /// The model is shared and may be retained; the state is borrowed
    /// for the duration of the call only. Default: always succeeds.
    fn load(
        &mut self,
        _model: &Arc<dyn SimModel>,
        _state: &mut dyn SimState,
    ) -> Result<(), PluginError> {
        Ok(())
    }

    /// Return to the post-load state. Default: no-op.
    fn reset(&mut self) {}

    /// Control-stage capability.
    fn control_hook(&mut self) -> Option<&mut dyn ControlHook> {
        None
    }

    /// Passive-stage capability.
    fn passive_hook(&mut self) -> Option<&mut dyn PassiveHook> {
        None
    }

    /// Render-stage capability.
    fn render_hook(&mut self) -> Option<&mut dyn RenderHook> {
        None
    }

    /// Last-stage capability.
    fn last_stage_hook(&mut self) -> Option<&mut dyn LastStageHook> {
        None
    }
}

/// The set of stages a plugin has declared hooks for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// Implements [`ControlHook`].
    pub control: bool,
    /// Implements [`PassiveHook`].
    pub passive: bool,
    /// Implements [`RenderHook`].
    pub render: bool,
    /// Implements [`LastStageHook`].
    pub last_stage: bool,
}

impl Capabilities {
    /// Inspect a plugin's hook accessors.
    pub fn of(plugin: &mut dyn Plugin) -> Self {
        Self {
            control: plugin.control_hook().is_some(),
            passive: plugin.passive_hook().is_some(),
            render: plugin.render_hook().is_some(),
            last_stage: plugin.last_stage_hook().is_some(),
        }
    }

    /// Whether the plugin participates in `stage`.
    pub fn has(&self, stage: Stage) -> bool {
        match stage {
            Stage::Control => self.control,
            Stage::Passive => self.passive,
            Stage::Render => self.render,
            Stage::LastStage => self.last_stage,
        }
    }
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stages: Vec<String> = [Stage::Control, Stage::Passive, Stage::Render, Stage::LastStage]
            .into_iter()
            .filter(|s| self.has(*s))
            .map(|s| s.to_string())
            .collect();
        if stages.is_empty() {
            write!(f, "none")
        } else {
            write!(f, "{}", stages.join("|"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Bare;

    impl Plugin for Bare {
        fn name(&self) -> &str {
            "bare"
        }
    }

    struct Drawer;

    impl RenderHook for Drawer {
        fn on_render(&mut self, _: &dyn SimModel, _: &dyn SimState, _: &mut dyn RenderTarget) {}
    }

    impl LastStageHook for Drawer {
        fn on_last_stage(&mut self, _: &dyn SimModel, _: &mut dyn SimState) {}
    }

    impl Plugin for Drawer {
        fn name(&self) -> &str {
            "drawer"
        }
        fn render_hook(&mut self) -> Option<&mut dyn RenderHook> {
            Some(self)
        }
        fn last_stage_hook(&mut self) -> Option<&mut dyn LastStageHook> {
            Some(self)
        }
    }

    #[test]
    fn bare_plugin_declares_nothing() {
        let caps = Capabilities::of(&mut Bare);
        assert_eq!(caps, Capabilities::default());
        assert_eq!(caps.to_string(), "none");
    }

    #[test]
    fn declared_hooks_are_detected() {
        let caps = Capabilities::of(&mut Drawer);
        assert!(!caps.has(Stage::Control));
        assert!(!caps.has(Stage::Passive));
        assert!(caps.has(Stage::Render));
        assert!(caps.has(Stage::LastStage));
        assert_eq!(caps.to_string(), "render|last_stage");
    }
}
