//! Error types for the Orrery workspace.
//!
//! Organized by subsystem: plugin lifecycle, stepping, rendering,
//! parameter lookup, and the remote-service transport.

use std::error::Error;
use std::fmt;

/// Errors from plugin instantiation and loading.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PluginError {
    /// The plugin's `load()` refused the model/state pair.
    LoadFailed {
        /// Name of the failing plugin.
        plugin: String,
        /// Human-readable description of the failure.
        reason: String,
    },
    /// No factory is registered for the configured plugin type.
    UnknownType {
        /// The type name found in the configuration.
        type_name: String,
    },
    /// A factory was found but could not build the plugin.
    InstantiationFailed {
        /// The type name found in the configuration.
        type_name: String,
        /// Human-readable description of the failure.
        reason: String,
    },
    /// The plugin configuration for a namespace could not be read.
    ConfigUnavailable {
        /// Namespace whose configuration was requested.
        namespace: String,
        /// Human-readable description of the failure.
        reason: String,
    },
}

impl fmt::Display for PluginError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LoadFailed { plugin, reason } => {
                write!(f, "plugin '{plugin}' failed to load: {reason}")
            }
            Self::UnknownType { type_name } => write!(f, "unknown plugin type '{type_name}'"),
            Self::InstantiationFailed { type_name, reason } => {
                write!(f, "could not instantiate plugin type '{type_name}': {reason}")
            }
            Self::ConfigUnavailable { namespace, reason } => {
                write!(f, "plugin configuration for '{namespace}' unavailable: {reason}")
            }
        }
    }
}

impl Error for PluginError {}

/// Errors from advancing an environment by one step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StepError {
    /// The external integrator reported a failure.
    IntegrationFailed {
        /// Human-readable description of the failure.
        reason: String,
    },
    /// The environment is shutting down and no longer steps.
    ShuttingDown,
}

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IntegrationFailed { reason } => write!(f, "integration failed: {reason}"),
            Self::ShuttingDown => write!(f, "environment is shutting down"),
        }
    }
}

impl Error for StepError {}

/// Errors from rendering one camera.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RenderError {
    /// The render backend failed to produce the requested buffers.
    BackendFailed {
        /// Camera being rendered.
        camera: String,
        /// Human-readable description of the failure.
        reason: String,
    },
    /// A returned buffer does not match the requested resolution.
    BufferSizeMismatch {
        /// Camera being rendered.
        camera: String,
        /// Sub-stream whose buffer is wrong (`rgb`, `depth`, `segmented`).
        stream: &'static str,
        /// Expected element count.
        expected: usize,
        /// Actual element count.
        actual: usize,
    },
    /// A requested sub-stream buffer was not returned at all.
    MissingBuffer {
        /// Camera being rendered.
        camera: String,
        /// Sub-stream whose buffer is missing.
        stream: &'static str,
    },
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BackendFailed { camera, reason } => {
                write!(f, "render backend failed for camera '{camera}': {reason}")
            }
            Self::BufferSizeMismatch {
                camera,
                stream,
                expected,
                actual,
            } => write!(
                f,
                "camera '{camera}' {stream} buffer has {actual} elements, expected {expected}"
            ),
            Self::MissingBuffer { camera, stream } => {
                write!(f, "camera '{camera}' returned no {stream} buffer")
            }
        }
    }
}

impl Error for RenderError {}

/// Errors from typed parameter lookup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParamError {
    /// A required key is absent.
    Missing {
        /// The fully qualified key.
        key: String,
    },
    /// The key holds a value of a different type.
    TypeMismatch {
        /// The fully qualified key.
        key: String,
        /// The type the caller asked for.
        expected: &'static str,
    },
    /// The value has the right type but is not acceptable.
    OutOfRange {
        /// The fully qualified key.
        key: String,
        /// Description of the accepted range.
        reason: String,
    },
}

impl fmt::Display for ParamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing { key } => write!(f, "parameter '{key}' is missing"),
            Self::TypeMismatch { key, expected } => {
                write!(f, "parameter '{key}' is not of type {expected}")
            }
            Self::OutOfRange { key, reason } => {
                write!(f, "parameter '{key}' out of range: {reason}")
            }
        }
    }
}

impl Error for ParamError {}

/// Errors from calling a remote service (provisioning, teardown).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportError {
    /// The service did not become reachable in time.
    Unreachable {
        /// Service name.
        service: String,
    },
    /// The call reached the service but did not complete.
    CallFailed {
        /// Service name.
        service: String,
        /// Human-readable description of the failure.
        reason: String,
    },
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreachable { service } => write!(f, "service '{service}' unreachable"),
            Self::CallFailed { service, reason } => {
                write!(f, "call to '{service}' failed: {reason}")
            }
        }
    }
}

impl Error for TransportError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_plugin() {
        let e = PluginError::LoadFailed {
            plugin: "sensors".into(),
            reason: "no sensors in model".into(),
        };
        assert_eq!(
            e.to_string(),
            "plugin 'sensors' failed to load: no sensors in model"
        );
    }

    #[test]
    fn display_buffer_mismatch() {
        let e = RenderError::BufferSizeMismatch {
            camera: "front".into(),
            stream: "depth",
            expected: 12,
            actual: 4,
        };
        assert_eq!(
            e.to_string(),
            "camera 'front' depth buffer has 4 elements, expected 12"
        );
    }
}
