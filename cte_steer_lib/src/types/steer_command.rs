use serde::{Deserialize, Serialize};

/// Steering and throttle sent back to the simulator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SteerCommand {
    pub steering_angle: f64, // [-0.6, 0.6]
    pub throttle: f64,       // negative brakes
}

impl SteerCommand {
    pub fn new(steering_angle: f64, throttle: f64) -> Self {
        Self {
            steering_angle,
            throttle,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandMetadata {
    pub command_id: String,
    pub timestamp: i64,
}

impl CommandMetadata {
    pub fn new() -> Self {
        Self {
            command_id: uuid::Uuid::new_v4().to_string(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }
}

impl Default for CommandMetadata {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SteerCommandWithMetadata {
    pub command: SteerCommand,
    /// Ask the simulator to put the car back on the start line first
    pub reset_simulator: bool,
    pub metadata: CommandMetadata,
}

impl SteerCommandWithMetadata {
    pub fn new(command: SteerCommand, reset_simulator: bool) -> Self {
        Self {
            command,
            reset_simulator,
            metadata: CommandMetadata::new(),
        }
    }
}
