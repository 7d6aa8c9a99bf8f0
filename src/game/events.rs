//! Game Events
//!
//! Side effects the presentation layer reacts to (sounds, particles,
//! messages). The simulation queues them; the caller drains them once per
//! tick.

use serde::{Serialize, Deserialize};
use crate::core::vec2::Vec2;
use crate::game::grid::CellCoord;
use crate::game::tile::TileType;

/// Priority for event processing order.
///
/// Lower value = processed first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum EventPriority {
    /// Deaths and respawns first, they reset everything else
    Respawn = 0,
    /// Then grid changes
    TileChange = 1,
    /// Then player movement cues
    Movement = 2,
    /// Lowest priority
    Other = 255,
}

/// Why a tile left the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BreakCause {
    /// Crumble delay ran out after the player stood on it
    Collapsed,
    /// Player hit it from below
    Struck,
}

/// Game event data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum GameEventData {
    /// Level text was parsed into the grid
    LevelLoaded {
        /// Grid height in tiles
        rows: usize,
        /// Grid width in tiles
        cols: usize,
    },

    /// Player left the ground with a jump
    Jumped {
        /// Top-left of the player box at takeoff
        position: Vec2,
    },

    /// Player touched a kill tile
    Died {
        /// Cell that killed the player
        cell: CellCoord,
        /// Tile in that cell
        tile: TileType,
    },

    /// Player was put back at spawn and the level reset
    Respawned {
        /// Where the player reappeared
        spawn: Vec2,
    },

    /// Player landed on an unstable tile and it started to crumble
    CrumbleStarted {
        /// Crumbling cell
        cell: CellCoord,
        /// Tile in that cell
        tile: TileType,
    },

    /// Tile removed from the grid
    TileBroke {
        /// Cell that is now Void
        cell: CellCoord,
        /// Tile that was there
        tile: TileType,
        /// Collapse or strike
        cause: BreakCause,
    },

    /// Debris for a broken tile finished falling
    DebrisCleared {
        /// Cell the debris came from
        cell: CellCoord,
    },
}

/// A game event with timing and priority.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameEvent {
    /// Tick when event occurred
    pub tick: u64,

    /// Processing priority
    pub priority: EventPriority,

    /// Cell involved (for tie-breaking)
    pub cell: Option<CellCoord>,

    /// Event data
    pub data: GameEventData,
}

impl GameEvent {
    /// Create a new event.
    pub fn new(tick: u64, priority: EventPriority, data: GameEventData) -> Self {
        let cell = match &data {
            GameEventData::Died { cell, .. } => Some(*cell),
            GameEventData::CrumbleStarted { cell, .. } => Some(*cell),
            GameEventData::TileBroke { cell, .. } => Some(*cell),
            GameEventData::DebrisCleared { cell } => Some(*cell),
            _ => None,
        };

        Self {
            tick,
            priority,
            cell,
            data,
        }
    }

    /// Create level loaded event.
    pub fn level_loaded(tick: u64, rows: usize, cols: usize) -> Self {
        Self::new(tick, EventPriority::Other, GameEventData::LevelLoaded { rows, cols })
    }

    /// Create jumped event.
    pub fn jumped(tick: u64, position: Vec2) -> Self {
        Self::new(tick, EventPriority::Movement, GameEventData::Jumped { position })
    }

    /// Create died event.
    pub fn died(tick: u64, cell: CellCoord, tile: TileType) -> Self {
        Self::new(tick, EventPriority::Respawn, GameEventData::Died { cell, tile })
    }

    /// Create respawned event.
    pub fn respawned(tick: u64, spawn: Vec2) -> Self {
        Self::new(tick, EventPriority::Respawn, GameEventData::Respawned { spawn })
    }

    /// Create crumble started event.
    pub fn crumble_started(tick: u64, cell: CellCoord, tile: TileType) -> Self {
        Self::new(tick, EventPriority::TileChange, GameEventData::CrumbleStarted { cell, tile })
    }

    /// Create tile broke event.
    pub fn tile_broke(tick: u64, cell: CellCoord, tile: TileType, cause: BreakCause) -> Self {
        Self::new(
            tick,
            EventPriority::TileChange,
            GameEventData::TileBroke { cell, tile, cause },
        )
    }

    /// Create debris cleared event.
    pub fn debris_cleared(tick: u64, cell: CellCoord) -> Self {
        Self::new(tick, EventPriority::Other, GameEventData::DebrisCleared { cell })
    }

    /// Is this a death?
    pub fn is_death(&self) -> bool {
        matches!(self.data, GameEventData::Died { .. })
    }

    /// Is this the respawn signal?
    pub fn is_respawn(&self) -> bool {
        matches!(self.data, GameEventData::Respawned { .. })
    }
}

impl PartialEq for GameEvent {
    fn eq(&self, other: &Self) -> bool {
        self.tick == other.tick
            && self.priority == other.priority
            && self.cell == other.cell
    }
}

impl Eq for GameEvent {}

impl PartialOrd for GameEvent {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GameEvent {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Sort by: tick, then priority, then cell
        self.tick
            .cmp(&other.tick)
            .then(self.priority.cmp(&other.priority))
            .then(self.cell.cmp(&other.cell))
    }
}
