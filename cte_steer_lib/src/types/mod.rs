pub mod config;
pub mod gains;
pub mod sim_events;
pub mod steer_command;
pub mod telemetry;
pub mod tuning_types;

pub use config::*;
pub use gains::*;
pub use sim_events::*;
pub use steer_command::*;
pub use telemetry::*;
pub use tuning_types::*;
