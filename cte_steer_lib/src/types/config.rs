use eyre::Result;
use serde::{Deserialize, Serialize};
use std::fs;

use crate::control::ThrottlePolicy;
use crate::error::{ControlError, ControlResult};
use crate::types::{Coordinate, Gains};

/// Environment variable naming a TOML configuration file
pub const CONFIG_PATH_ENV: &str = "STEERING_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub gains: Gains,
    pub tuning: TuningConfig,
    pub throttle: ThrottlePolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TuningConfig {
    pub enabled: bool,
    /// Samples per evaluation window
    pub window: u64,
    /// Tuning stops once the tuned deltas sum to this or less
    pub tolerance: f64,
    /// Initial step size per gain, Kp, Ki, Kd order
    pub deltas: [f64; 3],
    /// Gains the search perturbs, visited in this order
    pub tunable: Vec<Coordinate>,
    /// End a trial early once it is worse than the best after this many samples
    pub early_abort_after: Option<u64>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            gains: Gains::default(),
            tuning: TuningConfig::default(),
            throttle: ThrottlePolicy::default(),
        }
    }
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            window: 500,
            tolerance: 0.2,
            deltas: [1.0, 1.0, 1.0],
            tunable: Coordinate::ALL.to_vec(),
            early_abort_after: None,
        }
    }
}

impl ControllerConfig {
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: ControllerConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Defaults or the file named by `STEERING_CONFIG`, then environment overrides
    pub fn from_env() -> Result<Self> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::load_from_file(&path)?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Overlay individual settings; unparsable values leave the setting alone
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // Gains
        if let Some(val) = lookup("PID_KP") {
            self.gains.kp = val.parse().unwrap_or(self.gains.kp);
        }
        if let Some(val) = lookup("PID_KI") {
            self.gains.ki = val.parse().unwrap_or(self.gains.ki);
        }
        if let Some(val) = lookup("PID_KD") {
            self.gains.kd = val.parse().unwrap_or(self.gains.kd);
        }

        // Tuning
        if let Some(val) = lookup("TWIDDLE") {
            self.tuning.enabled = val.parse().unwrap_or(self.tuning.enabled);
        }
        if let Some(val) = lookup("TWIDDLE_WINDOW") {
            self.tuning.window = val.parse().unwrap_or(self.tuning.window);
        }
        if let Some(val) = lookup("TWIDDLE_TOLERANCE") {
            self.tuning.tolerance = val.parse().unwrap_or(self.tuning.tolerance);
        }
        if let Some(val) = lookup("TWIDDLE_EARLY_ABORT") {
            self.tuning.early_abort_after = match val.trim() {
                "" | "off" | "none" => None,
                other => other.parse().ok().or(self.tuning.early_abort_after),
            };
        }
    }

    pub fn validate(&self) -> ControlResult<()> {
        self.gains.validate()?;
        self.tuning.validate()?;
        self.throttle.validate()?;
        Ok(())
    }
}

impl TuningConfig {
    pub fn validate(&self) -> ControlResult<()> {
        if self.window == 0 {
            return Err(ControlError::Configuration(
                "evaluation window must be at least one sample".to_string(),
            ));
        }

        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return Err(ControlError::Configuration(format!(
                "tolerance must be positive, got {}",
                self.tolerance
            )));
        }

        for (coordinate, delta) in Coordinate::ALL.iter().zip(self.deltas.iter()) {
            if !delta.is_finite() || *delta <= 0.0 {
                return Err(ControlError::Configuration(format!(
                    "delta for {} must be positive, got {}",
                    coordinate, delta
                )));
            }
        }

        if self.tunable.is_empty() {
            return Err(ControlError::Configuration(
                "at least one gain must be tunable".to_string(),
            ));
        }

        for (i, coordinate) in self.tunable.iter().enumerate() {
            if self.tunable[..i].contains(coordinate) {
                return Err(ControlError::Configuration(format!(
                    "gain {} listed twice in tunable set",
                    coordinate
                )));
            }
        }

        if self.early_abort_after == Some(0) {
            return Err(ControlError::Configuration(
                "early abort needs at least one sample".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let config = ControllerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.gains, Gains::new(0.3, 0.0, 3.5));
        assert!(!config.tuning.enabled);
        assert_eq!(config.tuning.window, 500);
    }

    #[test]
    fn test_rejects_bad_tuning() {
        let cases: [fn(&mut TuningConfig); 9] = [
            |c| c.window = 0,
            |c| c.tolerance = 0.0,
            |c| c.tolerance = -0.2,
            |c| c.tolerance = f64::NAN,
            |c| c.deltas[1] = 0.0,
            |c| c.deltas[2] = f64::INFINITY,
            |c| c.tunable.clear(),
            |c| c.tunable = vec![Coordinate::Kp, Coordinate::Kp],
            |c| c.early_abort_after = Some(0),
        ];

        for mutate in cases {
            let mut tuning = TuningConfig::default();
            mutate(&mut tuning);
            match tuning.validate() {
                Err(ControlError::Configuration(_)) => {}
                other => panic!("expected configuration error for {:?}, got {:?}", tuning, other),
            }
        }
    }

    #[test]
    fn test_rejects_non_finite_gains() {
        let mut config = ControllerConfig::default();
        config.gains.kd = f64::NAN;
        assert!(matches!(
            config.validate(),
            Err(ControlError::InvalidGain { coordinate: Coordinate::Kd, .. })
        ));
    }

    #[test]
    fn test_parse_toml() {
        let content = r#"
            [gains]
            kp = 0.2
            ki = 0.0
            kd = 3.0

            [tuning]
            enabled = true
            window = 300
            tunable = ["kp", "kd"]
            early_abort_after = 100

            [throttle]
            policy = "constant"
            throttle = 0.4
        "#;

        let config: ControllerConfig = toml::from_str(content).unwrap();
        assert_eq!(config.gains, Gains::new(0.2, 0.0, 3.0));
        assert!(config.tuning.enabled);
        assert_eq!(config.tuning.window, 300);
        assert_eq!(config.tuning.tolerance, 0.2);
        assert_eq!(config.tuning.deltas, [1.0, 1.0, 1.0]);
        assert_eq!(config.tuning.tunable, vec![Coordinate::Kp, Coordinate::Kd]);
        assert_eq!(config.tuning.early_abort_after, Some(100));
        assert_eq!(config.throttle, ThrottlePolicy::Constant { throttle: 0.4 });
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_shipped_config_file() {
        let content = include_str!("../../../config/steering.toml");

        let config: ControllerConfig = toml::from_str(content).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.gains, Gains::default());
        assert_eq!(config.tuning.tunable, vec![Coordinate::Kp, Coordinate::Kd]);
        assert_eq!(config.throttle, ThrottlePolicy::default());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: ControllerConfig = toml::from_str("[tuning]\nenabled = true\n").unwrap();
        assert_eq!(config.gains, Gains::default());
        assert_eq!(config.throttle, ThrottlePolicy::default());
        assert_eq!(config.tuning.window, 500);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("PID_KP", "0.25"),
            ("PID_KD", "not-a-number"),
            ("TWIDDLE", "true"),
            ("TWIDDLE_WINDOW", "250"),
            ("TWIDDLE_EARLY_ABORT", "100"),
        ]
        .into_iter()
        .collect();

        let mut config = ControllerConfig::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.gains.kp, 0.25);
        assert_eq!(config.gains.kd, 3.5);
        assert!(config.tuning.enabled);
        assert_eq!(config.tuning.window, 250);
        assert_eq!(config.tuning.early_abort_after, Some(100));

        config.apply_overrides(|key| (key == "TWIDDLE_EARLY_ABORT").then(|| "off".to_string()));
        assert_eq!(config.tuning.early_abort_after, None);
    }
}
