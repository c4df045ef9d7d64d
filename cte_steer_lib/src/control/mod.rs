pub mod control_loop;
pub mod pid;
pub mod throttle;
pub mod twiddle;

pub use control_loop::*;
pub use pid::*;
pub use throttle::*;
pub use twiddle::*;
