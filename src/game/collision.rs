//! Collision Resolution
//!
//! Axis-separated resolution of the player box against the tile grid. Each
//! axis samples two points on the leading edge of the box, one pixel in from
//! each corner, and the first sample with a matching behavior wins.
//!
//! Side effects go through behavior flags only:
//! - KILL: full respawn
//! - landing on UNSTABLE: crumble starts
//! - striking BREAKABLE from below: tile removed, debris spawned

use tracing::debug;

use crate::core::time::{Millis, deadline};
use crate::game::events::{BreakCause, GameEvent};
use crate::game::grid::CellCoord;
use crate::game::state::Simulation;
use crate::game::tile::{BehaviorFlags, TileType};

/// Inset of the two edge samples from the box corners.
pub const SAMPLE_INSET: f64 = 1.0;

/// What resolving one axis did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AxisOutcome {
    /// Nothing in the way
    Clear,
    /// Stopped against a tile
    Blocked {
        /// Cell that stopped the player
        cell: CellCoord,
        /// Its behaviors
        flags: BehaviorFlags,
    },
    /// Touched a deadly tile; the simulation has respawned
    Killed {
        /// Cell that killed the player
        cell: CellCoord,
    },
}

impl AxisOutcome {
    /// Did this axis stop against a tile?
    #[inline]
    pub fn is_blocked(&self) -> bool {
        matches!(self, AxisOutcome::Blocked { .. })
    }

    /// Did this axis kill the player?
    #[inline]
    pub fn is_killed(&self) -> bool {
        matches!(self, AxisOutcome::Killed { .. })
    }
}

/// Direction of travel on one axis. Zero counts as positive.
#[inline]
fn leading_sign(velocity: f64) -> f64 {
    if velocity < 0.0 { -1.0 } else { 1.0 }
}

/// Resolve the player's box after horizontal displacement.
///
/// Solid, unstable and slippery tiles block; breakable-only tiles do not.
pub fn collide_horizontal(sim: &mut Simulation, now: Millis) -> AxisOutcome {
    let tile_size = sim.config.world.tile_size;
    let epsilon = sim.config.world.snap_epsilon;

    let player = &sim.player;
    let sign = leading_sign(player.velocity.x);
    let test_x = if sign > 0.0 { player.right() } else { player.position.x };
    let samples = [
        player.position.y + SAMPLE_INSET,
        player.bottom() - SAMPLE_INSET,
    ];

    for sample_y in samples {
        let cell = CellCoord::from_world(test_x, sample_y, tile_size);
        let tile = sim.grid.tile_at(cell);
        let flags = tile.behaviors();

        if flags.contains(BehaviorFlags::KILL) {
            sim.kill(cell, tile, now);
            return AxisOutcome::Killed { cell };
        }

        if flags.blocks_horizontal() {
            let player = &mut sim.player;
            player.position.x = if sign > 0.0 {
                cell.left(tile_size) - player.size.x - epsilon
            } else {
                cell.left(tile_size) + tile_size + epsilon
            };
            player.velocity.x = 0.0;
            return AxisOutcome::Blocked { cell, flags };
        }
    }

    AxisOutcome::Clear
}

/// Resolve the player's box after vertical displacement.
///
/// Ground contact is recomputed from scratch every call.
pub fn collide_vertical(sim: &mut Simulation, now: Millis) -> AxisOutcome {
    let tile_size = sim.config.world.tile_size;
    let epsilon = sim.config.world.snap_epsilon;

    sim.player.on_ground = false;
    sim.player.on_ice = false;

    let player = &sim.player;
    let sign = leading_sign(player.velocity.y);
    let test_y = if sign > 0.0 { player.bottom() } else { player.position.y };
    let samples = [
        player.position.x + SAMPLE_INSET,
        player.right() - SAMPLE_INSET,
    ];

    for sample_x in samples {
        let cell = CellCoord::from_world(sample_x, test_y, tile_size);
        let tile = sim.grid.tile_at(cell);
        let flags = tile.behaviors();

        if flags.contains(BehaviorFlags::KILL) {
            sim.kill(cell, tile, now);
            return AxisOutcome::Killed { cell };
        }

        if !flags.blocks_vertical() {
            continue;
        }

        if sign > 0.0 {
            land(sim, cell, tile, flags, now);
        } else {
            if flags.contains(BehaviorFlags::BREAKABLE) {
                strike(sim, cell, tile, now);
            }
            let player = &mut sim.player;
            player.position.y = cell.top(tile_size) + tile_size + epsilon;
            player.velocity.y = 0.0;
        }
        return AxisOutcome::Blocked { cell, flags };
    }

    AxisOutcome::Clear
}

/// Stand on top of `cell`.
fn land(sim: &mut Simulation, cell: CellCoord, tile: TileType, flags: BehaviorFlags, now: Millis) {
    let world = &sim.config.world;
    let movement = &sim.config.movement;

    let player = &mut sim.player;
    player.position.y = cell.top(world.tile_size) - player.size.y - world.snap_epsilon;
    player.on_ground = true;
    player.velocity.y = 0.0;
    player.on_ice = flags.contains(BehaviorFlags::SLIPPERY);
    player.coyote_until = Some(deadline(now, movement.coyote_time_ms));

    if flags.contains(BehaviorFlags::UNSTABLE)
        && sim.tracker.register_crumble(cell, tile, now, world.break_delay_ms)
    {
        let event = GameEvent::crumble_started(sim.tick, cell, tile);
        sim.push_event(event);
    }
}

/// Knock a breakable `cell` out from below.
fn strike(sim: &mut Simulation, cell: CellCoord, tile: TileType, now: Millis) {
    let world = &sim.config.world;
    let broke = sim.tracker.strike(
        cell,
        tile,
        now,
        world.debris_bump_velocity,
        world.debris_lifetime_ms,
    );
    sim.grid.set_tile(cell, TileType::Void);
    if !broke {
        return;
    }

    debug!(row = cell.row, col = cell.col, ?tile, "tile struck from below");
    let event = GameEvent::tile_broke(sim.tick, cell, tile, BreakCause::Struck);
    sim.push_event(event);
}

// =============================================================================
// TESTS
// =============================================================================
