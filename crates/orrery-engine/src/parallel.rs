//! Environments stepped on their own thread.
//!
//! # Architecture
//!
//! ```text
//! Owner thread                       Stepping thread (orrery-step-<ns>)
//!     |                                   |
//!     |--request(Reload)----------------->| cmd_rx.try_recv()
//!     |   [cmd_tx: bounded(capacity)]     | env.reload()
//!     |<--ControlReply via reply_tx-------|
//!     |                                   | env.step()
//!     |                                   | park_timeout(budget - elapsed)
//!     |--stop()-------------------------->| stop_flag checked at step boundary
//!     |<--Environment via JoinHandle------|
//!     |--teardown(/shutdown_ns)           |
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{RecvTimeoutError, Sender, TrySendError};
use orrery_core::Namespace;
use orrery_plugin::LoadReport;
use tracing::debug;

use crate::config::{ConfigError, ParallelConfig};
use crate::environment::Environment;
use crate::provisioning::{self, ProvisionOutcome, ProvisioningService};
use crate::registry::EnvironmentInfo;
use crate::stepper::{ControlEnvelope, StepperState};

const REPLY_POLL: Duration = Duration::from_millis(50);

// ── Control requests ───────────────────────────────────────────────

/// Requests applied by the stepping thread at the next step boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlRequest {
    /// Rebuild plugins and cameras.
    Reload,
    /// Reset every registered plugin.
    Reset,
    /// Stop stepping until [`ControlRequest::Unpause`].
    Pause,
    /// Resume stepping.
    Unpause,
}

/// Answer to a [`ControlRequest`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ControlReply {
    /// The request was applied.
    Done,
    /// The environment reloaded.
    Reloaded(LoadReport),
}

/// Error submitting a control request.
#[derive(Debug, PartialEq, Eq)]
pub enum ControlError {
    /// The stepping thread has stopped.
    Stopped,
    /// The control channel is full (back-pressure).
    ChannelFull,
}

impl fmt::Display for ControlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => write!(f, "stepping thread has stopped"),
            Self::ChannelFull => write!(f, "control channel full"),
        }
    }
}

impl std::error::Error for ControlError {}

// ── ParallelEnvironment ────────────────────────────────────────────

/// An [`Environment`] stepped continuously on a dedicated thread.
///
/// The environment's namespace may be provisioned remotely at spawn;
/// provisioning failure leaves a fully working, unmanaged environment.
/// Dropping a `ParallelEnvironment` stops the thread at the next step
/// boundary, drops the environment, and then fires a teardown request.
pub struct ParallelEnvironment {
    namespace: Namespace,
    info: Arc<EnvironmentInfo>,
    config: ParallelConfig,
    provisioner: Arc<dyn ProvisioningService>,
    provision: ProvisionOutcome,
    cmd_tx: Option<Sender<ControlEnvelope>>,
    stop_flag: Arc<AtomicBool>,
    stopped: Arc<AtomicBool>,
    steps: Arc<AtomicU64>,
    thread: Option<JoinHandle<Environment>>,
    torn_down: bool,
}

impl ParallelEnvironment {
    /// Provision the namespace (if a launchfile is configured) and move
    /// `env` onto a new stepping thread.
    ///
    /// The thread starts paused when the environment's `unpause`
    /// setting is false.
    pub fn spawn(
        env: Environment,
        config: ParallelConfig,
        provisioner: Arc<dyn ProvisioningService>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        if env.namespace().is_root() {
            return Err(ConfigError::EmptyNamespace);
        }

        let namespace = env.namespace().clone();
        let info = Arc::clone(env.info());
        let stop_flag = Arc::new(AtomicBool::new(false));
        let stopped = Arc::new(AtomicBool::new(false));
        let steps = Arc::new(AtomicU64::new(env.steps()));
        let (cmd_tx, cmd_rx) = crossbeam_channel::bounded(config.command_capacity);

        let mut this = Self {
            namespace,
            info,
            config,
            provisioner,
            provision: ProvisionOutcome::Skipped,
            cmd_tx: Some(cmd_tx),
            stop_flag: Arc::clone(&stop_flag),
            stopped: Arc::clone(&stopped),
            steps: Arc::clone(&steps),
            thread: None,
            torn_down: false,
        };
        if this.config.launchfile.is_some() {
            this.provision = this.bootstrap_namespace();
        }

        let state = StepperState::new(env, cmd_rx, stop_flag, stopped, steps, this.config.step_budget());
        let handle = thread::Builder::new()
            .name(format!("orrery-step-{}", this.namespace.as_str()))
            .spawn(move || state.run())
            .map_err(|e| ConfigError::ThreadSpawnFailed {
                reason: format!("stepping thread: {e}"),
            })?;
        this.thread = Some(handle);
        Ok(this)
    }

    /// Ask the provisioning service to stand up this namespace.
    ///
    /// Waits up to `provisioning_timeout` for the service. Failures are
    /// logged and reported in the outcome; they are never fatal.
    pub fn bootstrap_namespace(&mut self) -> ProvisionOutcome {
        let launchfile = self.config.launchfile.as_deref().unwrap_or_default();
        let outcome = provisioning::bootstrap_namespace(
            self.provisioner.as_ref(),
            &self.namespace,
            launchfile,
            &self.config.launch_args,
            self.config.provisioning_timeout,
        );
        self.provision = outcome.clone();
        outcome
    }

    /// Outcome of the most recent provisioning attempt.
    pub fn provision_outcome(&self) -> &ProvisionOutcome {
        &self.provision
    }

    /// Submit a control request and wait for the stepping thread to
    /// apply it at the next step boundary.
    pub fn request(&self, request: ControlRequest) -> Result<ControlReply, ControlError> {
        let cmd_tx = self.cmd_tx.as_ref().ok_or(ControlError::Stopped)?;
        if self.stopped.load(Ordering::Acquire) {
            return Err(ControlError::Stopped);
        }
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        cmd_tx
            .try_send(ControlEnvelope {
                request,
                reply: reply_tx,
            })
            .map_err(|e| match e {
                TrySendError::Full(_) => ControlError::ChannelFull,
                TrySendError::Disconnected(_) => ControlError::Stopped,
            })?;
        if let Some(handle) = &self.thread {
            handle.thread().unpark();
        }
        // The thread may stop with our request still queued.
        loop {
            match reply_rx.recv_timeout(REPLY_POLL) {
                Ok(reply) => return Ok(reply),
                Err(RecvTimeoutError::Disconnected) => return Err(ControlError::Stopped),
                Err(RecvTimeoutError::Timeout) => {
                    if self.stopped.load(Ordering::Acquire) {
                        return reply_rx.try_recv().map_err(|_| ControlError::Stopped);
                    }
                }
            }
        }
    }

    /// Stop stepping, recover the environment, and tear down the
    /// namespace.
    pub fn stop(mut self) -> Result<Environment, ConfigError> {
        let env = self.halt().ok_or(ConfigError::EnvironmentRecoveryFailed);
        self.teardown();
        env
    }

    /// Steps completed by the stepping thread.
    pub fn steps(&self) -> u64 {
        self.steps.load(Ordering::Acquire)
    }

    /// Whether the stepping thread is still looping.
    pub fn is_running(&self) -> bool {
        self.thread.is_some() && !self.stopped.load(Ordering::Acquire)
    }

    /// Environment namespace.
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Status record shared with the registry.
    pub fn info(&self) -> &Arc<EnvironmentInfo> {
        &self.info
    }

    fn halt(&mut self) -> Option<Environment> {
        self.stop_flag.store(true, Ordering::Release);
        self.cmd_tx.take();
        let handle = self.thread.take()?;
        handle.thread().unpark();
        handle.join().ok()
    }

    fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        debug!(target: "orrery::parallel", namespace = %self.namespace, "tearing down namespace");
        provisioning::teardown_namespace(self.provisioner.as_ref(), &self.namespace);
    }
}

impl Drop for ParallelEnvironment {
    fn drop(&mut self) {
        drop(self.halt());
        self.teardown();
    }
}

impl fmt::Debug for ParallelEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParallelEnvironment")
            .field("namespace", &self.namespace)
            .field("provision", &self.provision)
            .field("steps", &self.steps())
            .field("running", &self.is_running())
            .finish()
    }
}
