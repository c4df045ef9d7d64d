use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};

use crate::error::{ControlError, ControlResult};

/// One of the three PID gains, in Kp, Ki, Kd order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Coordinate {
    Kp,
    Ki,
    Kd,
}

impl Coordinate {
    pub const ALL: [Coordinate; 3] = [Coordinate::Kp, Coordinate::Ki, Coordinate::Kd];

    pub fn index(self) -> usize {
        match self {
            Coordinate::Kp => 0,
            Coordinate::Ki => 1,
            Coordinate::Kd => 2,
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Coordinate::Kp => "Kp",
            Coordinate::Ki => "Ki",
            Coordinate::Kd => "Kd",
        };
        f.write_str(name)
    }
}

/// Proportional, integral and derivative gains
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

impl Gains {
    pub fn new(kp: f64, ki: f64, kd: f64) -> Self {
        Self { kp, ki, kd }
    }

    pub fn validate(&self) -> ControlResult<()> {
        for coordinate in Coordinate::ALL {
            let value = self[coordinate];
            if !value.is_finite() {
                return Err(ControlError::InvalidGain { coordinate, value });
            }
        }
        Ok(())
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }
}

impl Default for Gains {
    /// Hand-tuned gains for the lake track; the integral term is unused
    fn default() -> Self {
        Self::new(0.3, 0.0, 3.5)
    }
}

impl Index<Coordinate> for Gains {
    type Output = f64;

    fn index(&self, coordinate: Coordinate) -> &f64 {
        match coordinate {
            Coordinate::Kp => &self.kp,
            Coordinate::Ki => &self.ki,
            Coordinate::Kd => &self.kd,
        }
    }
}

impl IndexMut<Coordinate> for Gains {
    fn index_mut(&mut self, coordinate: Coordinate) -> &mut f64 {
        match coordinate {
            Coordinate::Kp => &mut self.kp,
            Coordinate::Ki => &mut self.ki,
            Coordinate::Kd => &mut self.kd,
        }
    }
}

impl fmt::Display for Gains {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Kp = {}, Ki = {}, Kd = {}", self.kp, self.ki, self.kd)
    }
}
