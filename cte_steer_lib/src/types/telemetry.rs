use eyre::{eyre, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One telemetry sample from the driving simulator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Telemetry {
    /// Signed lateral distance to the reference path
    pub cte: f64,
    /// Vehicle speed (mph)
    pub speed: f64,
    /// Steering angle reported by the simulator (degrees)
    pub steering_angle: f64,
    /// Unix milliseconds
    pub timestamp: i64,
}

impl Telemetry {
    pub fn new(cte: f64, speed: f64, steering_angle: f64) -> Self {
        Self {
            cte,
            speed,
            steering_angle,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Parse the payload of a simulator `telemetry` event.
    ///
    /// The simulator sends every value as a decimal string; plain JSON
    /// numbers are accepted as well.
    pub fn from_sim_payload(payload: &Value) -> Result<Self> {
        let object = payload
            .as_object()
            .ok_or_else(|| eyre!("telemetry payload is not an object: {}", payload))?;

        let field = |name: &str| -> Result<f64> {
            let value = object
                .get(name)
                .ok_or_else(|| eyre!("telemetry field '{}' missing", name))?;
            let parsed = match value {
                Value::String(s) => s.trim().parse::<f64>().ok(),
                Value::Number(n) => n.as_f64(),
                _ => None,
            };
            match parsed {
                Some(v) if v.is_finite() => Ok(v),
                _ => Err(eyre!("telemetry field '{}' is not a number: {}", name, value)),
            }
        };

        Ok(Self::new(field("cte")?, field("speed")?, field("steering_angle")?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_string_fields() {
        let payload = json!({
            "cte": "0.7598",
            "speed": "0.4380",
            "steering_angle": "-1.25",
            "throttle": "0.0000",
            "image": ""
        });

        let telemetry = Telemetry::from_sim_payload(&payload).unwrap();
        assert_eq!(telemetry.cte, 0.7598);
        assert_eq!(telemetry.speed, 0.438);
        assert_eq!(telemetry.steering_angle, -1.25);
    }

    #[test]
    fn test_parse_numeric_fields() {
        let payload = json!({ "cte": -0.5, "speed": 30, "steering_angle": 2.5 });

        let telemetry = Telemetry::from_sim_payload(&payload).unwrap();
        assert_eq!(telemetry.cte, -0.5);
        assert_eq!(telemetry.speed, 30.0);
    }

    #[test]
    fn test_reject_malformed_payloads() {
        assert!(Telemetry::from_sim_payload(&Value::Null).is_err());
        assert!(Telemetry::from_sim_payload(&json!({ "cte": "0.1", "speed": "1" })).is_err());
        assert!(Telemetry::from_sim_payload(&json!({
            "cte": "abc", "speed": "1", "steering_angle": "0"
        }))
        .is_err());
        assert!(Telemetry::from_sim_payload(&json!({
            "cte": "NaN", "speed": "1", "steering_angle": "0"
        }))
        .is_err());
    }
}
