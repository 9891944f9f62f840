use std::env;
use std::path::Path;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File, FileFormat};
use lumiroom_api::models::Mode;
use serde::{Deserialize, Serialize};

const DEFAULT_CONFIG: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/../", "configs/default.toml"));

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    pub host: String,
    pub port: u16,
    /// Directory of the operator dashboard, relative to the working directory
    pub static_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logger {
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gateway {
    pub host: String,
    pub port: u16,
    /// Keep alive interval in seconds
    pub keep_alive: u64,
    pub auth: Option<GatewayAuth>,
    pub reconnect: Reconnect,
    /// Route every client through the in-process bus instead of the broker
    #[serde(default)]
    pub in_process: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayAuth {
    pub username: String,
    pub password: String,
}

/// Connection level retry policy of every bus client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reconnect {
    pub first_ms: u64,
    pub max_ms: u64,
    pub factor: f64,
    pub max_attempts: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Simulation {
    /// Delay between two sensor readings in milliseconds
    pub sensor_interval_ms: u64,
    /// Building wide mode at startup
    pub global_mode: Mode,
    /// Override given to every newly created room
    pub room_mode: Mode,
}

impl Simulation {
    pub fn sensor_interval(&self) -> Duration {
        Duration::from_millis(self.sensor_interval_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub server: Server,
    pub logger: Logger,
    pub gateway: Gateway,
    pub simulation: Simulation,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or("development".into());

        Self::load(
            &Path::new("configs").join(run_mode),
            Environment::default().separator("_"),
        )
    }

    /// Embedded defaults, then `overlay` if it exists, then `environment`.
    pub fn load(overlay: &Path, environment: Environment) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .add_source(File::from(overlay).required(false))
            .add_source(environment)
            .build()?
            .try_deserialize()
    }
}
