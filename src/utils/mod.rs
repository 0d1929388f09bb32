pub mod app_paths;
pub mod process_killer;

pub use app_paths::*;
pub use process_killer::*;
