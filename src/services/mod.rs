pub mod lifecycle;
pub mod process_supervisor;
pub mod readiness_probe;
pub mod shell_config;
pub mod surface;
pub mod window_coordinator;

pub use lifecycle::*;
pub use process_supervisor::*;
pub use readiness_probe::*;
pub use shell_config::*;
pub use surface::*;
pub use window_coordinator::*;
