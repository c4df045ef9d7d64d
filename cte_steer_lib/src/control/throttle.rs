use serde::{Deserialize, Serialize};

use crate::error::{ControlError, ControlResult};
use crate::types::Telemetry;

/// How the host picks a throttle value for each steering command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum ThrottlePolicy {
    /// Always the same throttle
    Constant { throttle: f64 },

    /// Full throttle, braking while fast and off course
    BrakeOnThreshold {
        throttle: f64,
        brake: f64,
        speed_limit: f64, // mph
        cte_limit: f64,
        angle_limit: f64, // degrees, reported by the simulator
        steer_limit: f64,
    },
}

impl Default for ThrottlePolicy {
    fn default() -> Self {
        Self::BrakeOnThreshold {
            throttle: 1.0,
            brake: -1.0,
            speed_limit: 28.0,
            cte_limit: 0.4,
            angle_limit: 5.0,
            steer_limit: 0.5,
        }
    }
}

impl ThrottlePolicy {
    pub fn throttle(&self, telemetry: &Telemetry, steer: f64) -> f64 {
        match *self {
            Self::Constant { throttle } => throttle,
            Self::BrakeOnThreshold {
                throttle,
                brake,
                speed_limit,
                cte_limit,
                angle_limit,
                steer_limit,
            } => {
                let off_course = telemetry.cte.abs() >= cte_limit
                    || telemetry.steering_angle.abs() > angle_limit
                    || steer.abs() >= steer_limit;

                if off_course && telemetry.speed >= speed_limit {
                    brake
                } else {
                    throttle
                }
            }
        }
    }

    pub fn validate(&self) -> ControlResult<()> {
        let values: Vec<(&str, f64)> = match *self {
            Self::Constant { throttle } => vec![("throttle", throttle)],
            Self::BrakeOnThreshold {
                throttle,
                brake,
                speed_limit,
                cte_limit,
                angle_limit,
                steer_limit,
            } => vec![
                ("throttle", throttle),
                ("brake", brake),
                ("speed_limit", speed_limit),
                ("cte_limit", cte_limit),
                ("angle_limit", angle_limit),
                ("steer_limit", steer_limit),
            ],
        };

        for (name, value) in values {
            if !value.is_finite() {
                return Err(ControlError::Configuration(format!(
                    "throttle policy {} must be finite, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}
