//! # Tilerun
//!
//! Tile-behavior physics core for a small side-scrolling platformer.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          TILERUN                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  config.rs       - Movement tuning and world constants       │
//! │                                                              │
//! │  core/           - Primitives                                │
//! │  ├── vec2.rs     - f64 world-space vector                    │
//! │  ├── time.rs     - Millisecond clock and frame dt            │
//! │  └── hash.rs     - State hashing for replay checks           │
//! │                                                              │
//! │  game/           - Simulation                                │
//! │  ├── tile.rs     - Tile types and behavior flags             │
//! │  ├── grid.rs     - Level grid parsing and queries            │
//! │  ├── unstable.rs - Crumble / debris lifecycle                │
//! │  ├── input.rs    - Key edges, input frames, recordings       │
//! │  ├── physics.rs  - Acceleration, jump, gravity               │
//! │  ├── collision.rs- Axis-separated tile collision             │
//! │  ├── state.rs    - Player and simulation context             │
//! │  ├── events.rs   - Events for audio/effects layers           │
//! │  └── tick.rs     - Per-frame loop and replay                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism
//!
//! The simulation never reads a clock. Callers pass absolute `now`
//! milliseconds to [`game::tick::advance`], so a recorded session replays to
//! the same state hash:
//! - No HashMap (tracked cells live in a BTreeMap)
//! - No system time dependencies
//! - No randomness

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod core;
pub mod game;

// Re-export commonly used types
pub use config::{ConfigError, SimConfig};
pub use crate::core::vec2::Vec2;
pub use crate::core::time::Millis;
pub use game::input::{InputFrame, InputRecording, InputState, Key};
pub use game::state::{Player, Pose, Simulation};
pub use game::tick::{advance, TickResult};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Nominal simulation rate (Hz)
pub const TICK_RATE: u32 = 60;

/// Built-in 16×100 level.
pub const DEFAULT_LEVEL: &str = include_str!("../levels/default.txt");
