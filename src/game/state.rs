//! Simulation State
//!
//! `Simulation` owns everything a run needs: the player, the mutable grid,
//! the unstable-tile tracker and the pending event queue. Physics and
//! collision borrow it mutably, one tick at a time.

use serde::{Serialize, Deserialize};
use tracing::{info, warn};

use crate::config::{ConfigError, SimConfig};
use crate::core::hash::{StateHash, StateHasher, compute_state_hash};
use crate::core::time::Millis;
use crate::core::vec2::Vec2;
use crate::game::events::GameEvent;
use crate::game::grid::{CellCoord, LevelGrid};
use crate::game::tile::TileType;
use crate::game::unstable::{CellPhase, CellVisual, UnstableTileTracker};

/// Speed below which the player counts as standing still for animation.
pub const POSE_SPEED_THRESHOLD: f64 = 0.1;

// =============================================================================
// PLAYER
// =============================================================================

/// Animation pose derived from movement state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
#[derive(Default)]
pub enum Pose {
    /// Standing still
    #[default]
    Idle = 0,
    /// Moving along the ground
    Run = 1,
    /// Rising or falling
    Jump = 2,
}

/// The player's box and movement state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Player {
    /// Top-left corner, world units
    pub position: Vec2,

    /// Velocity in world units per nominal frame
    pub velocity: Vec2,

    /// Box width and height
    pub size: Vec2,

    /// Standing on something this tick
    pub on_ground: bool,

    /// Standing on a slippery tile this tick
    pub on_ice: bool,

    /// Last horizontal input was left
    pub facing_left: bool,

    /// A jump is still allowed until this time after leaving the ground
    pub coyote_until: Option<Millis>,

    /// A jump press is remembered until this time
    pub jump_buffer_until: Option<Millis>,
}

impl Player {
    /// Create a player at rest.
    pub fn new(position: Vec2, size: Vec2) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            size,
            on_ground: false,
            on_ice: false,
            facing_left: false,
            coyote_until: None,
            jump_buffer_until: None,
        }
    }

    /// Put the player back at `spawn`, motionless and airborne.
    ///
    /// The jump buffer survives so a press made just before dying still
    /// lands.
    pub fn respawn_at(&mut self, spawn: Vec2) {
        self.position = spawn;
        self.velocity = Vec2::ZERO;
        self.on_ground = false;
        self.on_ice = false;
        self.coyote_until = None;
    }

    /// Animation pose.
    pub fn pose(&self) -> Pose {
        if !self.on_ground && self.velocity.y.abs() > POSE_SPEED_THRESHOLD {
            Pose::Jump
        } else if self.on_ground && self.velocity.x.abs() > POSE_SPEED_THRESHOLD {
            Pose::Run
        } else {
            Pose::Idle
        }
    }

    /// Right edge.
    #[inline]
    pub fn right(&self) -> f64 {
        self.position.x + self.size.x
    }

    /// Bottom edge.
    #[inline]
    pub fn bottom(&self) -> f64 {
        self.position.y + self.size.y
    }

    /// Hash player state.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_vec2(self.position);
        hasher.update_vec2(self.velocity);
        hasher.update_vec2(self.size);
        hasher.update_bool(self.on_ground);
        hasher.update_bool(self.on_ice);
        hasher.update_bool(self.facing_left);
        hasher.update_opt_u64(self.coyote_until);
        hasher.update_opt_u64(self.jump_buffer_until);
    }
}

// =============================================================================
// SNAPSHOT
// =============================================================================

/// Tracked cell as seen by a renderer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnstableSnapshot {
    /// Cell position
    pub cell: CellCoord,
    /// Tile that occupied the cell
    pub original: TileType,
    /// How to draw it
    pub visual: CellVisual,
}

/// Serializable view of the whole simulation at one instant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimSnapshot {
    /// Ticks run so far
    pub tick: u64,
    /// Time the snapshot was taken for
    pub now: Millis,
    /// Player state
    pub player: Player,
    /// Animation pose
    pub pose: Pose,
    /// Grid rows as level-text digits
    pub rows: Vec<String>,
    /// Crumbling and falling cells, in cell order
    pub unstable: Vec<UnstableSnapshot>,
    /// Deaths so far
    pub deaths: u32,
}

// =============================================================================
// SIMULATION
// =============================================================================

/// Complete simulation context.
#[derive(Clone, Debug)]
pub struct Simulation {
    /// Validated configuration
    pub(crate) config: SimConfig,

    /// Level text, kept for full resets
    pub(crate) level_source: String,

    /// Current tiles (broken tiles are Void)
    pub(crate) grid: LevelGrid,

    /// Crumbling and falling cells
    pub(crate) tracker: UnstableTileTracker,

    /// The player
    pub(crate) player: Player,

    /// Ticks run so far
    pub(crate) tick: u64,

    /// `now` of the previous `advance`, for deriving `dt`
    pub(crate) last_frame_at: Option<Millis>,

    /// Deaths so far
    pub(crate) deaths: u32,

    /// Events generated this tick (drained by the tick loop)
    pub(crate) pending_events: Vec<GameEvent>,
}

impl Simulation {
    /// Validate `config`, parse `level_text` and place the player at spawn.
    pub fn new(config: SimConfig, level_text: &str) -> Result<Self, ConfigError> {
        config.validate()?;

        let world = &config.world;
        let (grid, report) = LevelGrid::parse_with_report(level_text, world.rows, world.cols);
        if !report.is_clean() {
            warn!(
                unknown = report.unknown_chars,
                overflow_chars = report.overflow_chars,
                overflow_rows = report.overflow_rows,
                "level text did not fit the grid cleanly"
            );
        }
        info!(rows = grid.rows(), cols = grid.cols(), "level loaded");

        let player = Player::new(world.spawn, world.player_size);
        let mut sim = Self {
            level_source: level_text.to_owned(),
            grid,
            tracker: UnstableTileTracker::new(),
            player,
            tick: 0,
            last_frame_at: None,
            deaths: 0,
            pending_events: Vec::new(),
            config,
        };
        let (rows, cols) = (sim.grid.rows(), sim.grid.cols());
        sim.push_event(GameEvent::level_loaded(0, rows, cols));
        Ok(sim)
    }

    /// Full reset: player to spawn, level re-parsed, tracker cleared.
    ///
    /// Emits `Respawned`.
    pub fn respawn(&mut self, now: Millis) {
        let world = &self.config.world;
        self.player.respawn_at(world.spawn);
        self.grid = LevelGrid::parse(&self.level_source, world.rows, world.cols);
        self.tracker.clear();

        info!(tick = self.tick, now, deaths = self.deaths, "player respawned");
        self.push_event(GameEvent::respawned(self.tick, world.spawn));
    }

    /// Player touched a deadly tile: emit `Died` and respawn.
    pub(crate) fn kill(&mut self, cell: CellCoord, tile: TileType, now: Millis) {
        self.deaths += 1;
        self.push_event(GameEvent::died(self.tick, cell, tile));
        self.respawn(now);
    }

    /// Configuration in use.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Player state.
    pub fn player(&self) -> &Player {
        &self.player
    }

    /// Current grid.
    pub fn grid(&self) -> &LevelGrid {
        &self.grid
    }

    /// Unstable-tile tracker.
    pub fn tracker(&self) -> &UnstableTileTracker {
        &self.tracker
    }

    /// Spawn point.
    pub fn spawn(&self) -> Vec2 {
        self.config.world.spawn
    }

    /// Level text the grid was built from.
    pub fn level_source(&self) -> &str {
        &self.level_source
    }

    /// Ticks run so far.
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Deaths so far.
    pub fn deaths(&self) -> u32 {
        self.deaths
    }

    /// `now` of the last advanced frame.
    pub fn last_frame_at(&self) -> Option<Millis> {
        self.last_frame_at
    }

    /// Render-facing view at `now`.
    pub fn snapshot(&self, now: Millis) -> SimSnapshot {
        SimSnapshot {
            tick: self.tick,
            now,
            player: self.player.clone(),
            pose: self.player.pose(),
            rows: self.grid.to_rows(),
            unstable: self
                .tracker
                .iter()
                .map(|(cell, state)| UnstableSnapshot {
                    cell: *cell,
                    original: state.original,
                    visual: state.visual(now),
                })
                .collect(),
            deaths: self.deaths,
        }
    }

    /// Compute state hash for replay verification.
    pub fn compute_hash(&self) -> StateHash {
        compute_state_hash(self.tick, |hasher| {
            self.player.hash_into(hasher);
            hasher.update_opt_u64(self.last_frame_at);
            hasher.update_u32(self.deaths);

            // Grid in row-major order
            for (_, tile) in self.grid.cells() {
                hasher.update_u8(tile as u8);
            }

            // Tracker in cell order (BTreeMap guarantees this)
            for (cell, state) in self.tracker.iter() {
                hasher.update_i32(cell.row);
                hasher.update_i32(cell.col);
                hasher.update_u8(match state.phase {
                    CellPhase::Crumbling => 0,
                    CellPhase::Fallen => 1,
                });
                hasher.update_u64(state.started_at);
                hasher.update_u64(state.break_at);
                hasher.update_f64(state.fall_offset);
                hasher.update_f64(state.fall_velocity);
                hasher.update_opt_u64(state.expire_at);
                hasher.update_u8(state.original as u8);
            }
        })
    }

    /// Take all pending events (clears the list).
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Push an event.
    pub fn push_event(&mut self, event: GameEvent) {
        self.pending_events.push(event);
    }
}

// =============================================================================
// TESTS
// =============================================================================
