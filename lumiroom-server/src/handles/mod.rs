mod building_handle;
mod mode_handle;

pub use building_handle::*;
pub use mode_handle::*;
