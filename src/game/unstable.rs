//! Unstable Tile Tracker
//!
//! Per-cell lifecycle for tiles that collapse or shatter:
//!
//! ```text
//!   land on UNSTABLE ──► Crumbling ──(now >= break_at)──► Fallen ──(now >= expire_at)──► removed
//!                                     cell becomes Void
//!   hit BREAKABLE from below ─────────────────────────► Fallen (cell cleared by the resolver)
//!   hit a Crumbling cell from below ──────────────────► Fallen (no later collapse)
//! ```
//!
//! Broken cells stay Void until the level is reset on respawn. The tracker
//! is the sole owner of cell state; grid mutation happens only through
//! `update` (collapse) or the collision resolver (strike from below).

use std::collections::BTreeMap;

use serde::{Serialize, Deserialize};
use tracing::debug;

use crate::core::time::{Millis, deadline};
use crate::game::grid::{CellCoord, LevelGrid};
use crate::game::tile::TileType;

/// Lifecycle phase of a tracked cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellPhase {
    /// Wobbling, still solid
    Crumbling,
    /// Gone from the grid, debris falling
    Fallen,
}

/// State of one tracked cell.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnstableCell {
    /// Current phase
    pub phase: CellPhase,
    /// When the crumble (or strike) began
    pub started_at: Millis,
    /// When the tile leaves the grid
    pub break_at: Millis,
    /// Debris offset below the cell, world units
    pub fall_offset: f64,
    /// Debris vertical speed
    pub fall_velocity: f64,
    /// When the debris disappears (set once Fallen)
    pub expire_at: Option<Millis>,
    /// Tile that occupied the cell
    pub original: TileType,
}

impl UnstableCell {
    /// Crumble progress in [0, 1], for wobble/fade effects.
    pub fn progress(&self, now: Millis) -> f64 {
        let span = self.break_at.saturating_sub(self.started_at).max(1) as f64;
        let elapsed = now.saturating_sub(self.started_at) as f64;
        (elapsed / span).clamp(0.0, 1.0)
    }

    /// Render-facing view of this cell.
    pub fn visual(&self, now: Millis) -> CellVisual {
        match self.phase {
            CellPhase::Crumbling => CellVisual::Crumbling { progress: self.progress(now) },
            CellPhase::Fallen => CellVisual::Fallen { fall_offset: self.fall_offset },
        }
    }
}

/// What a renderer needs to draw a tracked cell.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum CellVisual {
    /// Tile still in place, `progress` from 0 (fresh) to 1 (about to break)
    Crumbling {
        /// Fraction of the break delay elapsed
        progress: f64,
    },
    /// Debris falling `fall_offset` units below the cell
    Fallen {
        /// Offset below the cell's rest position
        fall_offset: f64,
    },
}

/// Timing for debris created by the tracker.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DebrisParams {
    /// How long debris stays visible
    pub lifetime_ms: Millis,
    /// Gravity multiplier so debris drops visibly faster than the player
    pub gravity_scale: f64,
}

/// Transition reported by `UnstableTileTracker::update`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackerTransition {
    /// A crumbling tile left the grid
    Collapsed {
        /// Cell that collapsed
        cell: CellCoord,
        /// Tile that was there
        original: TileType,
    },
    /// Debris expired and the entry was dropped
    Expired {
        /// Cell whose debris expired
        cell: CellCoord,
    },
}

/// Tracker for all unstable cells, ordered by cell for deterministic
/// iteration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UnstableTileTracker {
    cells: BTreeMap<CellCoord, UnstableCell>,
}

impl UnstableTileTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start crumbling a cell. Ignored (returns false) if already tracked.
    pub fn register_crumble(
        &mut self,
        cell: CellCoord,
        original: TileType,
        now: Millis,
        break_delay_ms: Millis,
    ) -> bool {
        if self.cells.contains_key(&cell) {
            return false;
        }
        self.cells.insert(cell, UnstableCell {
            phase: CellPhase::Crumbling,
            started_at: now,
            break_at: deadline(now, break_delay_ms),
            fall_offset: 0.0,
            fall_velocity: 0.0,
            expire_at: None,
            original,
        });
        true
    }

    /// Register debris for a cell that was just knocked out. Ignored
    /// (returns false) if already tracked.
    pub fn register_debris(
        &mut self,
        cell: CellCoord,
        original: TileType,
        now: Millis,
        bump_velocity: f64,
        lifetime_ms: Millis,
    ) -> bool {
        if self.cells.contains_key(&cell) {
            return false;
        }
        self.cells.insert(cell, UnstableCell {
            phase: CellPhase::Fallen,
            started_at: now,
            break_at: now,
            fall_offset: 0.0,
            fall_velocity: bump_velocity,
            expire_at: Some(deadline(now, lifetime_ms)),
            original,
        });
        true
    }

    /// Knock a cell out from below.
    ///
    /// An untracked cell gets fresh debris. A crumbling cell skips the rest
    /// of its delay and falls now, so it never collapses a second time.
    /// Returns false if the cell was already debris.
    pub fn strike(
        &mut self,
        cell: CellCoord,
        original: TileType,
        now: Millis,
        bump_velocity: f64,
        lifetime_ms: Millis,
    ) -> bool {
        let Some(state) = self.cells.get_mut(&cell) else {
            return self.register_debris(cell, original, now, bump_velocity, lifetime_ms);
        };
        if state.phase != CellPhase::Crumbling {
            return false;
        }

        state.phase = CellPhase::Fallen;
        state.break_at = now;
        state.fall_offset = 0.0;
        state.fall_velocity = bump_velocity;
        state.expire_at = Some(deadline(now, lifetime_ms));
        true
    }

    /// Advance every tracked cell.
    ///
    /// Crumbling cells whose `break_at` has arrived are cleared from the grid
    /// and start falling in the same call. Fallen debris integrates its fall
    /// and is dropped once `expire_at` has passed.
    pub fn update(
        &mut self,
        grid: &mut LevelGrid,
        now: Millis,
        dt: f64,
        gravity: f64,
        debris: DebrisParams,
    ) -> Vec<TrackerTransition> {
        let mut transitions = Vec::new();

        // BTreeMap iterates in cell order
        for (cell, state) in self.cells.iter_mut() {
            if state.phase == CellPhase::Crumbling && now >= state.break_at {
                if !grid.tile_at(*cell).is_void() {
                    grid.set_tile(*cell, TileType::Void);
                }
                state.phase = CellPhase::Fallen;
                state.fall_offset = 0.0;
                state.fall_velocity = 0.0;
                state.expire_at = Some(deadline(now, debris.lifetime_ms));
                debug!(row = cell.row, col = cell.col, original = ?state.original, "tile collapsed");
                transitions.push(TrackerTransition::Collapsed {
                    cell: *cell,
                    original: state.original,
                });
            }

            if state.phase == CellPhase::Fallen {
                state.fall_velocity += gravity * dt * debris.gravity_scale;
                state.fall_offset += state.fall_velocity * dt;

                if state.expire_at.is_some_and(|at| now >= at) {
                    transitions.push(TrackerTransition::Expired { cell: *cell });
                }
            }
        }

        for transition in &transitions {
            if let TrackerTransition::Expired { cell } = transition {
                self.cells.remove(cell);
                debug!(row = cell.row, col = cell.col, "debris cleared");
            }
        }

        transitions
    }

    /// Tracked state for a cell.
    pub fn get(&self, cell: CellCoord) -> Option<&UnstableCell> {
        self.cells.get(&cell)
    }

    /// Is the cell tracked?
    pub fn contains(&self, cell: CellCoord) -> bool {
        self.cells.contains_key(&cell)
    }

    /// Number of tracked cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// No tracked cells?
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Drop every tracked cell (level reset).
    pub fn clear(&mut self) {
        self.cells.clear();
    }

    /// Iterate tracked cells in cell order.
    pub fn iter(&self) -> impl Iterator<Item = (&CellCoord, &UnstableCell)> {
        self.cells.iter()
    }
}
