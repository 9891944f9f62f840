pub mod bus;
mod controller_service;
mod mode_service;
mod room_service;
mod sensor_service;
mod topology_service;

pub use controller_service::*;
pub use mode_service::*;
pub use room_service::*;
pub use sensor_service::*;
pub use topology_service::*;
