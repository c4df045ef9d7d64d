//! Socket.IO event names used by the driving simulator.

/// Simulator -> controller, payload is a telemetry object or null in manual mode
pub const TELEMETRY_EVENT: &str = "telemetry";

/// Controller -> simulator, payload `{steering_angle, throttle}`
pub const STEER_EVENT: &str = "steer";

/// Controller -> simulator, put the car back at the start, empty payload
pub const RESET_EVENT: &str = "reset";

/// Controller -> simulator, hand control back to the keyboard, empty payload
pub const MANUAL_EVENT: &str = "manual";

/// Default port the simulator connects to
pub const DEFAULT_SIM_PORT: u16 = 4567;
