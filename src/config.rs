//! Simulation Configuration
//!
//! Movement tuning and world constants. Every field has a default matching
//! the shipped level, so a JSON override only needs the keys it changes.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::core::time::{Millis, MAX_FRAME_MS, NOMINAL_FRAME_MS};
use crate::core::vec2::Vec2;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config text is not valid JSON for `SimConfig`.
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Config file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        /// Path that failed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A quantity that must be strictly positive is not.
    #[error("{field} must be positive, got {value}")]
    NonPositive {
        /// Offending field
        field: &'static str,
        /// Offending value
        value: f64,
    },

    /// Level grid has zero rows or columns.
    #[error("level grid must have at least one row and one column")]
    EmptyGrid,

    /// A quantity is outside its allowed range.
    #[error("{field} out of range: {value}")]
    OutOfRange {
        /// Offending field
        field: &'static str,
        /// Offending value
        value: f64,
    },
}

/// Player movement tuning.
///
/// Speeds and accelerations are in world units per frame at 60 Hz and get
/// scaled by the frame `dt`. Timers are in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    /// Top horizontal speed while grounded (ice included)
    pub max_speed_ground: f64,
    /// Top horizontal speed while airborne
    pub max_speed_air: f64,
    /// Acceleration toward target speed on normal ground
    pub accel_ground: f64,
    /// Deceleration toward zero on normal ground with no input
    pub friction_ground: f64,
    /// Acceleration toward target speed while airborne
    pub accel_air: f64,
    /// Downward acceleration
    pub gravity: f64,
    /// Terminal fall speed
    pub max_fall_speed: f64,
    /// Initial upward speed of a jump
    pub jump_power: f64,
    /// Factor applied to upward speed when jump is released early
    pub jump_cut_multiplier: f64,
    /// Acceleration on slippery ground
    pub accel_ice: f64,
    /// Deceleration on slippery ground with no input
    pub friction_ice: f64,
    /// Grace window after leaving ground
    pub coyote_time_ms: u64,
    /// How long a jump press is remembered
    pub jump_buffer_ms: u64,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            max_speed_ground: 4.5,
            max_speed_air: 4.5,
            accel_ground: 0.9,
            friction_ground: 0.8,
            accel_air: 0.15,
            gravity: 0.55,
            max_fall_speed: 14.0,
            jump_power: 12.6, // clears four tiles
            jump_cut_multiplier: 0.5,
            accel_ice: 0.25,
            friction_ice: 0.03,
            coyote_time_ms: 120,
            jump_buffer_ms: 150,
        }
    }
}

/// World layout and tile lifecycle constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Edge length of one tile in world units
    pub tile_size: f64,
    /// Grid rows
    pub rows: usize,
    /// Grid columns
    pub cols: usize,
    /// Player spawn (top-left corner)
    pub spawn: Vec2,
    /// Player box width and height
    pub player_size: Vec2,
    /// Gap left between a snapped edge and the tile boundary
    pub snap_epsilon: f64,
    /// Delay between landing on an unstable tile and its collapse
    pub break_delay_ms: Millis,
    /// Lifetime of falling debris
    pub debris_lifetime_ms: Millis,
    /// Initial vertical speed of debris knocked out from below
    pub debris_bump_velocity: f64,
    /// Gravity multiplier for debris
    pub debris_gravity_scale: f64,
    /// Largest frame delta fed to the integrator
    pub max_frame_ms: f64,
    /// Frame length that maps to `dt = 1.0`
    pub nominal_frame_ms: f64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            tile_size: 32.0,
            rows: 16,
            cols: 100,
            spawn: Vec2::new(40.0, 40.0),
            player_size: Vec2::splat(32.0),
            snap_epsilon: 0.001,
            break_delay_ms: 500,
            debris_lifetime_ms: 3000,
            debris_bump_velocity: -15.0,
            debris_gravity_scale: 10.0,
            max_frame_ms: MAX_FRAME_MS,
            nominal_frame_ms: NOMINAL_FRAME_MS,
        }
    }
}

/// Complete simulation configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Player movement tuning
    pub movement: MovementConfig,
    /// World constants
    pub world: WorldConfig,
}

impl SimConfig {
    /// Parse and validate a JSON config. Missing keys take defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Check that every value is usable by the integrator.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let m = &self.movement;
        let w = &self.world;

        if w.rows == 0 || w.cols == 0 {
            return Err(ConfigError::EmptyGrid);
        }

        for (field, value) in [
            ("world.tile_size", w.tile_size),
            ("world.player_size.x", w.player_size.x),
            ("world.player_size.y", w.player_size.y),
            ("world.max_frame_ms", w.max_frame_ms),
            ("world.nominal_frame_ms", w.nominal_frame_ms),
            ("movement.max_speed_ground", m.max_speed_ground),
            ("movement.max_speed_air", m.max_speed_air),
            ("movement.accel_ground", m.accel_ground),
            ("movement.accel_air", m.accel_air),
            ("movement.accel_ice", m.accel_ice),
            ("movement.gravity", m.gravity),
            ("movement.max_fall_speed", m.max_fall_speed),
            ("movement.jump_power", m.jump_power),
        ] {
            // `!(v > 0)` also rejects NaN
            if !(value > 0.0) || !value.is_finite() {
                return Err(ConfigError::NonPositive { field, value });
            }
        }

        for (field, value) in [
            ("movement.friction_ground", m.friction_ground),
            ("movement.friction_ice", m.friction_ice),
            ("world.snap_epsilon", w.snap_epsilon),
            ("world.debris_gravity_scale", w.debris_gravity_scale),
        ] {
            if !(value >= 0.0) || !value.is_finite() {
                return Err(ConfigError::OutOfRange { field, value });
            }
        }

        if !(m.jump_cut_multiplier > 0.0 && m.jump_cut_multiplier <= 1.0) {
            return Err(ConfigError::OutOfRange {
                field: "movement.jump_cut_multiplier",
                value: m.jump_cut_multiplier,
            });
        }

        // Leading-edge sampling only sees two points per axis, so a box
        // larger than a tile could straddle one unseen.
        if w.player_size.x > w.tile_size {
            return Err(ConfigError::OutOfRange {
                field: "world.player_size.x",
                value: w.player_size.x,
            });
        }
        if w.player_size.y > w.tile_size {
            return Err(ConfigError::OutOfRange {
                field: "world.player_size.y",
                value: w.player_size.y,
            });
        }

        if w.snap_epsilon >= w.tile_size {
            return Err(ConfigError::OutOfRange {
                field: "world.snap_epsilon",
                value: w.snap_epsilon,
            });
        }

        if !w.spawn.is_finite() {
            return Err(ConfigError::OutOfRange {
                field: "world.spawn",
                value: if w.spawn.x.is_finite() { w.spawn.y } else { w.spawn.x },
            });
        }
        if !w.debris_bump_velocity.is_finite() {
            return Err(ConfigError::OutOfRange {
                field: "world.debris_bump_velocity",
                value: w.debris_bump_velocity,
            });
        }

        Ok(())
    }
}
