//! Per-step timing for one environment.
//!
//! [`StepMetrics`] is returned by every [`Environment::step`](crate::Environment::step)
//! and broken down by stage, so slow plugins or cameras show up in the
//! stage they run in.

/// Timing collected during a single step.
///
/// All durations are wall-clock microseconds.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StepMetrics {
    /// The whole step.
    pub total_us: u64,
    /// Control hooks.
    pub control_us: u64,
    /// The external integrator.
    pub integrate_us: u64,
    /// Passive hooks.
    pub passive_us: u64,
    /// Render hooks plus camera evaluation.
    pub render_us: u64,
    /// Last-stage hooks.
    pub last_stage_us: u64,
    /// Cameras that rendered and published in this step.
    pub cameras_fired: usize,
}

impl StepMetrics {
    /// Sum of the per-stage durations.
    pub fn stages_us(&self) -> u64 {
        self.control_us + self.integrate_us + self.passive_us + self.render_us + self.last_stage_us
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_metrics_are_zero() {
        let m = StepMetrics::default();
        assert_eq!(m.total_us, 0);
        assert_eq!(m.stages_us(), 0);
        assert_eq!(m.cameras_fired, 0);
    }

    #[test]
    fn stages_sum() {
        let m = StepMetrics {
            total_us: 100,
            control_us: 10,
            integrate_us: 50,
            passive_us: 5,
            render_us: 30,
            last_stage_us: 2,
            cameras_fired: 1,
        };
        assert_eq!(m.stages_us(), 97);
        assert!(m.stages_us() <= m.total_us);
    }
}
