//! TOML configuration shared by the arena and its agents.

use std::{fmt, fs, path::Path, str::FromStr};

use ctf_core::ControllerConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid TOML for the expected layout.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Error returned when a difficulty name is not recognised.
#[derive(Debug, Error)]
#[error("unknown difficulty `{0}`, expected easy, normal or hard")]
pub struct ParseDifficultyError(String);

/// Handicap applied to every tank except the reference tank.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// Opponents accelerate at 70% of the reference rate.
    Easy,
    /// Opponents accelerate at the reference rate.
    #[default]
    Normal,
    /// Opponents accelerate at 130% of the reference rate.
    Hard,
}

impl Difficulty {
    /// Multiplier applied to the acceleration of handicapped tanks.
    #[must_use]
    pub const fn acceleration_modifier(self) -> f32 {
        match self {
            Self::Easy => 0.7,
            Self::Normal => 1.0,
            Self::Hard => 1.3,
        }
    }
}

impl FromStr for Difficulty {
    type Err = ParseDifficultyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "normal" => Ok(Self::Normal),
            "hard" => Ok(Self::Hard),
            _ => Err(ParseDifficultyError(value.to_owned())),
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Easy => "easy",
            Self::Normal => "normal",
            Self::Hard => "hard",
        };
        f.write_str(name)
    }
}

/// Kinematic parameters of the arena's tank bodies.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Handicap for every tank except the first.
    pub difficulty: Difficulty,
    /// Rotation applied per tick while steering, in degrees.
    pub turn_rate_degrees: f32,
    /// Speed gained per tick under throttle, in tiles per tick.
    pub acceleration: f32,
    /// Top speed, in tiles per tick.
    pub max_speed: f32,
}

impl WorldConfig {
    /// Rotation applied per tick while steering, in radians.
    #[must_use]
    pub fn turn_rate(&self) -> f32 {
        self.turn_rate_degrees.to_radians()
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::Normal,
            turn_rate_degrees: 2.0,
            acceleration: 0.01,
            max_speed: 0.05,
        }
    }
}

/// Complete configuration file layout with `[controller]` and `[world]` tables.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Tolerances used by every agent controller.
    pub controller: ControllerConfig,
    /// Arena kinematics.
    pub world: WorldConfig,
}

/// Parses configuration from TOML text; missing keys keep their defaults.
pub fn parse_config(text: &str) -> Result<GameConfig, ConfigError> {
    Ok(toml::from_str(text)?)
}

/// Reads and parses a TOML configuration file.
pub fn load_config(path: &Path) -> Result<GameConfig, ConfigError> {
    let text = fs::read_to_string(path)?;
    parse_config(&text)
}
