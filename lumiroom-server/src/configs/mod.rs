pub mod settings;

pub use settings::{Gateway, GatewayAuth, Logger, Reconnect, Server, Settings, Simulation};
