//! # CTE Steering Library
//!
//! PID steering for the driving simulator with online twiddle tuning, plus
//! the message types and configuration shared by the nodes of the dataflow.

pub mod control;
pub mod error;
pub mod types;
pub mod utils;

// Re-export everything for convenience
pub use control::*;
pub use error::*;
pub use types::*;
pub use utils::*;
