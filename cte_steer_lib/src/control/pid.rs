use crate::error::{ControlError, ControlResult};
use crate::types::Gains;

/// Actuator limit of the simulator's steering input
pub const STEER_LIMIT: f64 = 0.6;

/// PID controller mapping a cross-track error sample to a steering command.
///
/// Besides the control terms it keeps a running cost of the samples it has
/// seen, which the tuner uses to score a set of gains.
#[derive(Debug, Clone, PartialEq)]
pub struct PidController {
    gains: Gains,

    // State
    prev_error: f64,
    integral_error: f64,
    sample_count: u64,
    cumulative_cost: f64,
}

impl PidController {
    /// Create a new PID controller with zeroed state
    pub fn new(gains: Gains) -> Self {
        Self {
            gains,
            prev_error: 0.0,
            integral_error: 0.0,
            sample_count: 0,
            cumulative_cost: 0.0,
        }
    }

    /// Install new gains and zero all running state
    pub fn init(&mut self, gains: Gains) {
        self.gains = gains;
        self.prev_error = 0.0;
        self.integral_error = 0.0;
        self.sample_count = 0;
        self.cumulative_cost = 0.0;
    }

    /// Feed one CTE sample and return the clamped steering value
    pub fn update(&mut self, cte: f64) -> f64 {
        self.sample_count += 1;

        // The derivative is taken per sample, not per second
        let derivative = cte - self.prev_error;
        self.prev_error = cte;

        self.integral_error += cte;

        let penalty = 1.0 + cte.abs();
        self.cumulative_cost += penalty * penalty;

        let steer = -self.gains.kp * cte - self.gains.kd * derivative - self.gains.ki * self.integral_error;

        // Opposite-signed terms overflowing to infinity give NaN
        if steer.is_nan() {
            return 0.0;
        }

        steer.clamp(-STEER_LIMIT, STEER_LIMIT)
    }

    /// Mean per-sample cost since the last `init`
    pub fn total_error(&self) -> ControlResult<f64> {
        if self.sample_count == 0 {
            return Err(ControlError::DivisionByZero);
        }
        Ok(self.cumulative_cost / self.sample_count as f64)
    }

    pub fn gains(&self) -> Gains {
        self.gains
    }

    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }

    pub fn cumulative_cost(&self) -> f64 {
        self.cumulative_cost
    }

    pub fn prev_error(&self) -> f64 {
        self.prev_error
    }

    pub fn integral_error(&self) -> f64 {
        self.integral_error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_pid_proportional_only() {
        let mut pid = PidController::new(Gains::new(1.0, 0.0, 0.0));

        // Derivative gain is zero, so the first sample is pure P
        let output = pid.update(0.25);
        assert!(approx_eq(output, -0.25));

        let output = pid.update(-0.5);
        assert!(approx_eq(output, 0.5));
    }

    #[test]
    fn test_pid_scenario_from_tuned_gains() {
        let mut pid = PidController::new(Gains::new(0.3, 0.0, 3.5));

        let first = pid.update(0.1);
        assert!(approx_eq(first, -0.38), "first = {}", first);

        let second = pid.update(0.1);
        assert!(approx_eq(second, -0.03), "second = {}", second);

        let third = pid.update(0.1);
        assert!(approx_eq(third, -0.03), "third = {}", third);

        let total = pid.total_error().unwrap();
        assert!(approx_eq(total, 1.21), "total = {}", total);
    }

    #[test]
    fn test_pid_integral_term() {
        let mut pid = PidController::new(Gains::new(0.0, 0.1, 0.0));

        assert!(approx_eq(pid.update(1.0), -0.1));
        assert!(approx_eq(pid.update(1.0), -0.2));
        assert!(approx_eq(pid.update(1.0), -0.3));
        assert!(approx_eq(pid.integral_error(), 3.0));
    }

    #[test]
    fn test_pid_output_limits() {
        let mut pid = PidController::new(Gains::new(2.0, 0.5, 10.0));

        let inputs = [
            -100.0, -7.5, -1.0, -0.31, -0.01, 0.0, 0.01, 0.2, 0.9, 3.0, 42.0, 1e6, -1e6,
        ];
        for cte in inputs.iter().cycle().take(200) {
            let steer = pid.update(*cte);
            assert!((-STEER_LIMIT..=STEER_LIMIT).contains(&steer), "steer {} out of range", steer);
        }
    }

    #[test]
    fn test_pid_output_limits_near_overflow() {
        let mut pid = PidController::new(Gains::new(2.0, 1.0, 0.0));

        for cte in [-1e308, -1e308, 1e308, f64::MAX, -f64::MAX, 1e308] {
            let steer = pid.update(cte);
            assert!((-STEER_LIMIT..=STEER_LIMIT).contains(&steer), "steer {} out of range", steer);
        }
    }

    #[test]
    fn test_pid_output_limits_nan_input() {
        let mut pid = PidController::new(Gains::new(0.3, 0.0, 3.5));

        for cte in [0.1, f64::NAN, 0.2] {
            let steer = pid.update(cte);
            assert!((-STEER_LIMIT..=STEER_LIMIT).contains(&steer), "steer {} out of range", steer);
        }
        assert_eq!(pid.sample_count(), 3);
    }

    #[test]
    fn test_total_error_single_sample() {
        for cte in [-2.0, -0.4, 0.0, 0.7, 3.0] {
            let mut pid = PidController::new(Gains::new(0.3, 0.0, 3.5));
            pid.update(cte);
            let expected = (1.0 + f64::abs(cte)).powi(2);
            assert!(approx_eq(pid.total_error().unwrap(), expected));
        }
    }

    #[test]
    fn test_total_error_without_samples() {
        let mut pid = PidController::new(Gains::new(0.3, 0.0, 3.5));
        assert_eq!(pid.sample_count(), 0);
        assert_eq!(pid.total_error(), Err(ControlError::DivisionByZero));

        pid.update(0.5);
        pid.init(Gains::new(0.3, 0.0, 3.5));
        assert_eq!(pid.total_error(), Err(ControlError::DivisionByZero));
    }

    #[test]
    fn test_pid_reset() {
        let gains = Gains::new(0.2, 0.01, 2.0);
        let mut pid = PidController::new(gains);

        pid.update(0.5);
        pid.update(-0.3);

        pid.init(gains);
        let once = pid.clone();
        pid.init(gains);

        assert_eq!(pid, once);
        assert_eq!(pid.sample_count(), 0);
        assert_eq!(pid.prev_error(), 0.0);
        assert_eq!(pid.integral_error(), 0.0);
        assert_eq!(pid.cumulative_cost(), 0.0);
    }

    #[test]
    fn test_pid_is_deterministic() {
        let gains = Gains::new(0.13, 0.002, 2.7);
        let mut a = PidController::new(gains);
        let mut b = PidController::new(gains);

        let mut cte = 0.8_f64;
        for i in 0..500 {
            cte = (cte * 1.37 + i as f64 * 0.011).sin();
            assert_eq!(a.update(cte).to_bits(), b.update(cte).to_bits());
        }
        assert_eq!(a.total_error().unwrap().to_bits(), b.total_error().unwrap().to_bits());
    }
}
