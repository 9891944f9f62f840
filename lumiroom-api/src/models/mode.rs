use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Sensor behaviour selector.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Uniformly random brightness
    Test,
    /// Time-of-day brightness curve
    #[default]
    Normal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseModeError(pub String);

impl fmt::Display for ParseModeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "invalid mode `{}`, expected `test` or `normal`", self.0)
    }
}

impl std::error::Error for ParseModeError {}

impl FromStr for Mode {
    type Err = ParseModeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "test" => Ok(Mode::Test),
            "normal" => Ok(Mode::Normal),
            other => Err(ParseModeError(other.to_string())),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Mode::Test => write!(f, "test"),
            Mode::Normal => write!(f, "normal"),
        }
    }
}
