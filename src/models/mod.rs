pub mod backend;
pub mod lifecycle;
pub mod window;

pub use backend::*;
pub use lifecycle::*;
pub use window::*;
