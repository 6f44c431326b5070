//! Remote namespace provisioning and teardown.
//!
//! Provisioning is advisory: an environment works the same whether or
//! not its namespace was stood up remotely. Every failure here is
//! logged and turned into a [`ProvisionOutcome`], never an error.

use std::fmt;
use std::time::Duration;

use orrery_core::{Namespace, TransportError};
use tracing::{error, info, warn};

/// Service that stands up a namespace.
pub const BOOTSTRAP_SERVICE: &str = "/bootstrap_ns";
/// Service that tears a namespace down.
pub const SHUTDOWN_SERVICE: &str = "/shutdown_ns";

/// Request to stand up infrastructure for a namespace.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BootstrapRequest {
    /// Namespace to provision.
    pub namespace: String,
    /// Launch description to start inside it.
    pub launchfile: String,
    /// Launch arguments.
    pub args: Vec<String>,
}

/// Request to tear down a namespace.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShutdownRequest {
    /// Namespace to tear down.
    pub namespace: String,
}

/// Client side of the provisioning services.
///
/// Calls block the caller; they are only made from construction and
/// teardown, never from inside a step.
pub trait ProvisioningService: Send + Sync {
    /// Block until `service` is reachable or `timeout` elapses.
    fn wait_for_service(&self, service: &str, timeout: Duration) -> bool;

    /// Call the bootstrap service. `Ok(false)` means the service
    /// answered but could not provision the namespace.
    fn bootstrap(&self, request: &BootstrapRequest) -> Result<bool, TransportError>;

    /// Call the teardown service.
    fn shutdown(&self, request: &ShutdownRequest) -> Result<bool, TransportError>;
}

/// Provisioning service for environments nobody manages remotely.
///
/// Never reachable; teardown is a no-op.
#[derive(Clone, Copy, Debug, Default)]
pub struct Unmanaged;

impl ProvisioningService for Unmanaged {
    fn wait_for_service(&self, _service: &str, _timeout: Duration) -> bool {
        false
    }

    fn bootstrap(&self, _request: &BootstrapRequest) -> Result<bool, TransportError> {
        Err(TransportError::Unreachable {
            service: BOOTSTRAP_SERVICE.to_string(),
        })
    }

    fn shutdown(&self, _request: &ShutdownRequest) -> Result<bool, TransportError> {
        Ok(false)
    }
}

/// Result of one provisioning attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProvisionOutcome {
    /// No launch description configured; nothing was requested.
    Skipped,
    /// The service provisioned the namespace.
    Provisioned,
    /// The service did not become reachable within the timeout.
    Unreachable,
    /// The service answered but refused.
    Rejected,
    /// The call itself failed.
    Failed {
        /// Description of the failure.
        reason: String,
    },
}

impl ProvisionOutcome {
    /// Whether the namespace is remotely provisioned.
    pub fn is_provisioned(&self) -> bool {
        matches!(self, Self::Provisioned)
    }
}

impl fmt::Display for ProvisionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skipped => write!(f, "skipped"),
            Self::Provisioned => write!(f, "provisioned"),
            Self::Unreachable => write!(f, "service unreachable"),
            Self::Rejected => write!(f, "rejected by service"),
            Self::Failed { reason } => write!(f, "failed: {reason}"),
        }
    }
}

/// Ask `service` to provision `namespace`, waiting at most `timeout`
/// for it to become reachable.
pub fn bootstrap_namespace(
    service: &dyn ProvisioningService,
    namespace: &Namespace,
    launchfile: &str,
    args: &[String],
    timeout: Duration,
) -> ProvisionOutcome {
    if !service.wait_for_service(BOOTSTRAP_SERVICE, timeout) {
        error!(
            target: "orrery::parallel",
            %namespace,
            service = BOOTSTRAP_SERVICE,
            timeout_ms = timeout.as_millis() as u64,
            "provisioning service unreachable, continuing unmanaged"
        );
        return ProvisionOutcome::Unreachable;
    }
    let request = BootstrapRequest {
        namespace: namespace.as_str().to_string(),
        launchfile: launchfile.to_string(),
        args: args.to_vec(),
    };
    match service.bootstrap(&request) {
        Ok(true) => {
            info!(target: "orrery::parallel", %namespace, launchfile, "namespace provisioned");
            ProvisionOutcome::Provisioned
        }
        Ok(false) => {
            error!(target: "orrery::parallel", %namespace, launchfile, "provisioning rejected, continuing unmanaged");
            ProvisionOutcome::Rejected
        }
        Err(e) => {
            error!(target: "orrery::parallel", %namespace, error = %e, "provisioning failed, continuing unmanaged");
            ProvisionOutcome::Failed {
                reason: e.to_string(),
            }
        }
    }
}

/// Fire the teardown request for `namespace`. The result is logged
/// at most and never returned.
pub fn teardown_namespace(service: &dyn ProvisioningService, namespace: &Namespace) {
    let request = ShutdownRequest {
        namespace: namespace.as_str().to_string(),
    };
    if let Err(e) = service.shutdown(&request) {
        warn!(target: "orrery::parallel", %namespace, error = %e, "namespace teardown failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmanaged_is_unreachable() {
        let outcome = bootstrap_namespace(
            &Unmanaged,
            &Namespace::new("env0"),
            "arm.launch",
            &[],
            Duration::from_millis(1),
        );
        assert_eq!(outcome, ProvisionOutcome::Unreachable);
        assert!(!outcome.is_provisioned());
    }

    #[test]
    fn unmanaged_teardown_is_silent() {
        teardown_namespace(&Unmanaged, &Namespace::new("env0"));
    }

    #[test]
    fn outcome_display() {
        assert_eq!(ProvisionOutcome::Provisioned.to_string(), "provisioned");
        assert_eq!(
            ProvisionOutcome::Failed {
                reason: "boom".into()
            }
            .to_string(),
            "failed: boom"
        );
    }
}
