//! Game Logic Module
//!
//! All simulation code. Deterministic given inputs and frame times.
//!
//! ## Module Structure
//!
//! - `tile`: Tile catalog and behavior flags
//! - `grid`: Level grid built from text
//! - `unstable`: Crumbling and falling cell lifecycle
//! - `input`: Key edges, per-tick frames, recordings
//! - `physics`: Horizontal control, jump, gravity
//! - `collision`: Tile collision and behavior side effects
//! - `state`: Player and simulation context
//! - `tick`: Per-frame loop and replay
//! - `events`: Events for presentation layers

pub mod tile;
pub mod grid;
pub mod unstable;
pub mod input;
pub mod physics;
pub mod collision;
pub mod state;
pub mod tick;
pub mod events;

// Re-export key types
pub use tile::{BehaviorFlags, TileType};
pub use grid::{CellCoord, LevelGrid};
pub use unstable::{UnstableTileTracker, CellVisual};
pub use input::{InputFrame, InputState, InputRecording, Key};
pub use state::{Player, Pose, Simulation, SimSnapshot};
pub use tick::TickResult;
pub use events::{GameEvent, GameEventData};
