//! Simulation settings, parallel-environment configuration, and errors.

use std::error::Error;
use std::fmt;
use std::time::Duration;

use orrery_core::{ParamError, ParamTree};
use tracing::warn;

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected while constructing or running environments.
#[derive(Debug, PartialEq)]
pub enum ConfigError {
    /// A parallel environment needs a non-root namespace.
    EmptyNamespace,
    /// The model timestep is NaN, infinite, zero, or negative.
    InvalidTimestep {
        /// The invalid value.
        value: f64,
    },
    /// `step_rate_hz` is NaN, infinite, zero, or negative.
    InvalidStepRate {
        /// The invalid value.
        value: f64,
    },
    /// The control channel capacity is zero.
    CommandCapacityZero,
    /// A parameter could not be read.
    Param(ParamError),
    /// A background thread could not be spawned.
    ThreadSpawnFailed {
        /// Description of which thread failed.
        reason: String,
    },
    /// The environment could not be recovered from its stepping thread
    /// (e.g. the thread panicked).
    EnvironmentRecoveryFailed,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyNamespace => write!(f, "parallel environments need a namespace"),
            Self::InvalidTimestep { value } => {
                write!(f, "model timestep must be finite and positive, got {value}")
            }
            Self::InvalidStepRate { value } => {
                write!(f, "step_rate_hz must be finite and positive, got {value}")
            }
            Self::CommandCapacityZero => write!(f, "command_capacity must be at least 1"),
            Self::Param(e) => write!(f, "parameter: {e}"),
            Self::ThreadSpawnFailed { reason } => write!(f, "thread spawn failed: {reason}"),
            Self::EnvironmentRecoveryFailed => {
                write!(f, "environment could not be recovered from stepping thread")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Param(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ParamError> for ConfigError {
    fn from(e: ParamError) -> Self {
        Self::Param(e)
    }
}

// ── SimSettings ────────────────────────────────────────────────────

/// Display and run-state flags of one environment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SimSettings {
    /// No interactive viewer. Default: false.
    pub headless: bool,
    /// Disable all rendering. Implies `headless`. Default: false.
    pub no_render: bool,
    /// Render cameras offscreen. Derived; see [`resolve`](Self::resolve).
    pub render_offscreen: bool,
    /// Start stepping immediately instead of paused. Default: true.
    pub unpause: bool,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            headless: false,
            no_render: false,
            render_offscreen: false,
            unpause: true,
        }
    }
}

impl SimSettings {
    /// Read `headless`, `no_render`, `render_offscreen` and `unpause`.
    ///
    /// - `no_render` forces `headless = true` and `render_offscreen = false`.
    /// - Otherwise `render_offscreen` is `headless && backend_available`,
    ///   unless the parameter is set explicitly; an explicit `true` still
    ///   needs a backend.
    pub fn resolve(params: &ParamTree, backend_available: bool) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let mut settings = Self {
            headless: params.get_bool("headless")?.unwrap_or(defaults.headless),
            no_render: params.get_bool("no_render")?.unwrap_or(defaults.no_render),
            render_offscreen: false,
            unpause: params.get_bool("unpause")?.unwrap_or(defaults.unpause),
        };
        let explicit_offscreen = params.get_bool("render_offscreen")?;

        if settings.no_render {
            settings.headless = true;
            return Ok(settings);
        }
        if !settings.headless {
            warn!(target: "orrery::env", "no interactive viewer available, running without one");
        }
        settings.render_offscreen = match explicit_offscreen {
            Some(false) => false,
            Some(true) => backend_available,
            None => settings.headless && backend_available,
        };
        Ok(settings)
    }
}

// ── ParallelConfig ─────────────────────────────────────────────────

/// Configuration for [`ParallelEnvironment`](crate::ParallelEnvironment).
#[derive(Clone, Debug, PartialEq)]
pub struct ParallelConfig {
    /// Launch description sent with the provisioning request. `None`
    /// skips provisioning at spawn time.
    pub launchfile: Option<String>,
    /// Launch arguments sent with the provisioning request.
    pub launch_args: Vec<String>,
    /// How long to wait for the provisioning service. Default: 5 s.
    pub provisioning_timeout: Duration,
    /// Target step rate. `None` = step as fast as possible.
    pub step_rate_hz: Option<f64>,
    /// Control requests buffered for the stepping thread. Default: 16.
    pub command_capacity: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            launchfile: None,
            launch_args: Vec::new(),
            provisioning_timeout: Duration::from_secs(5),
            step_rate_hz: None,
            command_capacity: 16,
        }
    }
}

impl ParallelConfig {
    /// Defaults overridden by `launchfile`, `launch_args` and
    /// `step_rate_hz` from `params`. An empty launchfile means none.
    pub fn from_params(params: &ParamTree) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.launchfile = params
            .get_str("launchfile")?
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        if let Some(args) = params.get_str_list("launch_args")? {
            config.launch_args = args;
        }
        config.step_rate_hz = params.get_f64("step_rate_hz")?;
        config.validate()?;
        Ok(config)
    }

    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(rate) = self.step_rate_hz {
            if !rate.is_finite() || rate <= 0.0 {
                return Err(ConfigError::InvalidStepRate { value: rate });
            }
        }
        if self.command_capacity == 0 {
            return Err(ConfigError::CommandCapacityZero);
        }
        Ok(())
    }

    /// Time budget of one step, if rate-limited.
    pub fn step_budget(&self) -> Option<Duration> {
        self.step_rate_hz.map(|hz| Duration::from_secs_f64(1.0 / hz))
    }
}
