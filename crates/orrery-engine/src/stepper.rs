//! Stepping loop and control-request draining for parallel environments.
//!
//! The stepping thread owns its [`Environment`] exclusively (moved in
//! via `thread::Builder::spawn`). Control requests arrive over a
//! bounded crossbeam channel and are applied between steps; replies go
//! back over per-request channels.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, error};

use crate::environment::Environment;
use crate::parallel::{ControlReply, ControlRequest};

// Upper bound on how long a paused thread sleeps between checks.
const IDLE_POLL: Duration = Duration::from_millis(10);

/// A control request paired with its reply channel.
pub(crate) struct ControlEnvelope {
    pub request: ControlRequest,
    pub reply: Sender<ControlReply>,
}

/// State held by the stepping thread's main loop.
pub(crate) struct StepperState {
    env: Environment,
    cmd_rx: Receiver<ControlEnvelope>,
    stop_flag: Arc<AtomicBool>,
    stopped: Arc<AtomicBool>,
    steps: Arc<AtomicU64>,
    step_budget: Option<Duration>,
    paused: bool,
}

impl StepperState {
    pub fn new(
        env: Environment,
        cmd_rx: Receiver<ControlEnvelope>,
        stop_flag: Arc<AtomicBool>,
        stopped: Arc<AtomicBool>,
        steps: Arc<AtomicU64>,
        step_budget: Option<Duration>,
    ) -> Self {
        let paused = !env.settings().unpause;
        Self {
            env,
            cmd_rx,
            stop_flag,
            stopped,
            steps,
            step_budget,
            paused,
        }
    }

    /// Main loop. Runs until the stop flag is set or integration fails.
    ///
    /// Consumes self and returns the `Environment` so the owner can
    /// recover it through the `JoinHandle`.
    pub fn run(mut self) -> Environment {
        debug!(target: "orrery::parallel", namespace = %self.env.namespace(), paused = self.paused, "stepping thread started");
        loop {
            if self.stop_flag.load(Ordering::Acquire) {
                break;
            }
            let step_start = Instant::now();

            // 1. Apply pending control requests at the step boundary.
            self.drain_control_channel();

            // 2. Idle while paused; unpark() wakes us early.
            if self.paused {
                thread::park_timeout(IDLE_POLL);
                continue;
            }

            // 3. Step.
            if let Err(e) = self.env.step() {
                error!(
                    target: "orrery::parallel",
                    namespace = %self.env.namespace(),
                    steps = self.env.steps(),
                    error = %e,
                    "step failed, stopping stepping thread"
                );
                break;
            }
            self.steps.store(self.env.steps(), Ordering::Release);

            // 4. Sleep out the remaining budget.
            if let Some(budget) = self.step_budget {
                if let Some(remaining) = budget.checked_sub(step_start.elapsed()) {
                    thread::park_timeout(remaining);
                }
            }
        }

        self.stopped.store(true, Ordering::Release);
        debug!(target: "orrery::parallel", namespace = %self.env.namespace(), steps = self.env.steps(), "stepping thread stopped");
        self.env
    }

    fn drain_control_channel(&mut self) {
        while let Ok(envelope) = self.cmd_rx.try_recv() {
            let reply = self.apply(envelope.request);
            // Best-effort reply; the requester may have given up.
            let _ = envelope.reply.send(reply);
        }
    }

    fn apply(&mut self, request: ControlRequest) -> ControlReply {
        debug!(target: "orrery::parallel", namespace = %self.env.namespace(), ?request, "control request");
        match request {
            ControlRequest::Reload => ControlReply::Reloaded(self.env.reload()),
            ControlRequest::Reset => {
                self.env.reset();
                ControlReply::Done
            }
            ControlRequest::Pause => {
                self.paused = true;
                ControlReply::Done
            }
            ControlRequest::Unpause => {
                self.paused = false;
                ControlReply::Done
            }
        }
    }
}
