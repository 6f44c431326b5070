//! Step-grid trigger timing for one camera.

use orrery_core::SimTime;

// Absorbs float noise in 1 / (f * dt) so exact ratios do not round up.
const PERIOD_EPSILON: f64 = 1e-9;

// Longest period, reached only by near-zero frequencies. About 50 days
// of simulated time at 1 kHz.
const MAX_STEPS_PER_PERIOD: u64 = u32::MAX as u64;

/// When one camera is next due to fire.
///
/// Timing is kept in whole simulation steps: the period is
/// `ceil(1 / (frequency * timestep))` steps, and trigger times are
/// always integer multiples of the timestep. Render latency never
/// feeds back into the schedule.
///
/// ```
/// use orrery_core::SimTime;
/// use orrery_render::CameraSchedule;
///
/// // 30 Hz on a 500 Hz model: every 17 steps, not every 16.67.
/// let mut schedule = CameraSchedule::new(30.0, 0.002, 0);
/// assert_eq!(schedule.steps_per_period(), 17);
/// assert_eq!(schedule.poll(16), None);
/// let stamp = schedule.poll(17).unwrap();
/// assert!((stamp.as_secs() - 0.034).abs() < 1e-12);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct CameraSchedule {
    timestep: f64,
    steps_per_period: u64,
    next_trigger_step: u64,
}

impl CameraSchedule {
    /// A schedule whose first trigger is one period after `current_step`.
    ///
    /// A non-positive timestep is treated as one step per period.
    pub fn new(frequency: f64, timestep: f64, current_step: u64) -> Self {
        let steps_per_period = steps_per_period(frequency, timestep);
        Self {
            timestep,
            steps_per_period,
            next_trigger_step: current_step.saturating_add(steps_per_period),
        }
    }

    /// Fixed period length in steps. Always at least 1, and capped for
    /// near-zero frequencies.
    pub fn steps_per_period(&self) -> u64 {
        self.steps_per_period
    }

    /// Period length in simulated seconds.
    pub fn period(&self) -> f64 {
        self.steps_per_period as f64 * self.timestep
    }

    /// Publish rate actually achieved on the step grid.
    pub fn effective_frequency(&self) -> f64 {
        1.0 / self.period()
    }

    /// Step index of the next trigger.
    pub fn next_trigger_step(&self) -> u64 {
        self.next_trigger_step
    }

    /// Simulation time of the next trigger.
    pub fn next_trigger_time(&self) -> SimTime {
        SimTime::from_steps(self.next_trigger_step, self.timestep)
    }

    /// Decide whether the camera fires at `current_step`.
    ///
    /// Returns the trigger stamp and advances the trigger by whole
    /// periods until it lies strictly after `current_step`. If the
    /// simulation clock moved backwards past the previous trigger, the
    /// schedule is re-armed one period after `current_step` instead.
    pub fn poll(&mut self, current_step: u64) -> Option<SimTime> {
        let last_trigger = self.next_trigger_step.saturating_sub(self.steps_per_period);
        if current_step < last_trigger {
            self.rearm(current_step);
            return None;
        }
        if current_step < self.next_trigger_step {
            return None;
        }
        let stamp = self.next_trigger_time();
        let behind = (current_step - self.next_trigger_step) / self.steps_per_period;
        self.next_trigger_step = self
            .next_trigger_step
            .saturating_add((behind + 1).saturating_mul(self.steps_per_period));
        Some(stamp)
    }

    /// Place the next trigger one period after `current_step`.
    pub fn rearm(&mut self, current_step: u64) {
        self.next_trigger_step = current_step.saturating_add(self.steps_per_period);
    }
}

fn steps_per_period(frequency: f64, timestep: f64) -> u64 {
    if timestep <= 0.0 || frequency <= 0.0 || !frequency.is_finite() {
        return 1;
    }
    let ideal = 1.0 / (frequency * timestep);
    ((ideal - PERIOD_EPSILON).ceil() as u64).clamp(1, MAX_STEPS_PER_PERIOD)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn thirty_hz_at_500_hz_rounds_up_to_17_steps() {
        let schedule = CameraSchedule::new(30.0, 0.002, 0);
        assert_eq!(schedule.steps_per_period(), 17);
        assert!((schedule.period() - 0.034).abs() < 1e-12);
        assert!(schedule.effective_frequency() < 30.0);
    }

    #[test]
    fn default_rate_first_fires_at_step_34() {
        let mut schedule = CameraSchedule::new(15.0, 0.002, 0);
        for step in 0..34 {
            assert_eq!(schedule.poll(step), None, "fired early at step {step}");
        }
        let stamp = schedule.poll(34).unwrap();
        assert!((stamp.as_secs() - 0.068).abs() < 1e-12);
        assert_eq!(schedule.next_trigger_step(), 68);
    }

    #[test]
    fn exact_ratio_does_not_round_up() {
        assert_eq!(CameraSchedule::new(50.0, 0.002, 0).steps_per_period(), 10);
        assert_eq!(CameraSchedule::new(500.0, 0.002, 0).steps_per_period(), 1);
    }

    #[test]
    fn faster_than_step_rate_fires_every_step() {
        let mut schedule = CameraSchedule::new(10_000.0, 0.002, 0);
        assert_eq!(schedule.steps_per_period(), 1);
        assert!(schedule.poll(1).is_some());
        assert!(schedule.poll(2).is_some());
    }

    #[test]
    fn missed_triggers_stay_on_grid() {
        let mut schedule = CameraSchedule::new(30.0, 0.002, 0);
        // Jump straight past three triggers.
        let stamp = schedule.poll(60).unwrap();
        assert_eq!(stamp.to_steps(0.002), 17);
        assert_eq!(schedule.next_trigger_step(), 68);
        assert_eq!(schedule.poll(61), None);
    }

    #[test]
    fn rewound_clock_rearms() {
        let mut schedule = CameraSchedule::new(30.0, 0.002, 0);
        assert!(schedule.poll(17).is_some());
        assert!(schedule.poll(34).is_some());
        assert_eq!(schedule.poll(0), None);
        assert_eq!(schedule.next_trigger_step(), 17);
        assert!(schedule.poll(17).is_some());
    }

    #[test]
    fn degenerate_inputs_use_one_step() {
        assert_eq!(CameraSchedule::new(15.0, 0.0, 0).steps_per_period(), 1);
        assert_eq!(CameraSchedule::new(f64::NAN, 0.002, 0).steps_per_period(), 1);
    }

    #[test]
    fn near_zero_frequency_caps_the_period() {
        let mut schedule = CameraSchedule::new(1e-20, 0.002, 100);
        assert_eq!(schedule.steps_per_period(), MAX_STEPS_PER_PERIOD);
        assert_eq!(schedule.next_trigger_step(), 100 + MAX_STEPS_PER_PERIOD);
        assert_eq!(schedule.poll(101), None);
        // Far past the trigger: fires once and saturates instead of wrapping.
        let stamp = schedule.poll(u64::MAX - 1).unwrap();
        assert_eq!(stamp, SimTime::from_steps(100 + MAX_STEPS_PER_PERIOD, 0.002));
        assert_eq!(schedule.next_trigger_step(), u64::MAX);
        assert_eq!(schedule.poll(0), None);
        assert_eq!(schedule.next_trigger_step(), MAX_STEPS_PER_PERIOD);
    }

    proptest! {
        #[test]
        fn fires_on_period_multiples(
            dt_us in 100u32..20_000,
            freq in 1.0f64..200.0,
            steps in 1u64..2_000,
        ) {
            let dt = f64::from(dt_us) * 1e-6;
            let mut schedule = CameraSchedule::new(freq, dt, 0);
            let period = schedule.steps_per_period();
            prop_assert!(period as f64 >= 1.0 / (freq * dt) - 1e-6);
            prop_assert!((period as f64) < 1.0 / (freq * dt) + 1.0);
            for step in 0..=steps {
                let fired = schedule.poll(step);
                prop_assert_eq!(fired.is_some(), step > 0 && step % period == 0);
                if let Some(stamp) = fired {
                    prop_assert_eq!(stamp, SimTime::from_steps(step, dt));
                }
            }
        }
    }
}
