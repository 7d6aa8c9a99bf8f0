//! Simulation Tick
//!
//! The per-frame loop. Given the same inputs and frame times, it produces
//! the same state bit for bit: no clock reads, no randomness, and every
//! collection iterates in a fixed order.

#[cfg(feature = "debug-tracing")]
use tracing::trace;

use crate::config::{ConfigError, SimConfig};
use crate::core::time::{Millis, frame_dt};
use crate::game::collision::{collide_horizontal, collide_vertical};
use crate::game::events::{BreakCause, GameEvent};
use crate::game::input::{InputFrame, InputRecording};
use crate::game::physics;
use crate::game::state::Simulation;
use crate::game::unstable::{DebrisParams, TrackerTransition};

/// Result of a tick.
#[derive(Debug, Default)]
pub struct TickResult {
    /// Tick number that just ran
    pub tick: u64,
    /// Frame-scaled delta used
    pub dt: f64,
    /// Events generated this tick
    pub events: Vec<GameEvent>,
    /// Whether the player respawned this tick
    pub respawned: bool,
}

/// Advance one frame at wall-clock time `now`.
///
/// `dt` comes from the gap since the previous call, capped at one nominal
/// frame. The first call (and a repeated `now`) counts as one full frame.
pub fn advance(sim: &mut Simulation, input: &InputFrame, now: Millis) -> TickResult {
    let delta = sim
        .last_frame_at
        .map_or(0, |last| now.saturating_sub(last));
    let world = &sim.config.world;
    let dt = frame_dt(delta, world.max_frame_ms, world.nominal_frame_ms);

    sim.last_frame_at = Some(now);
    step(sim, input, dt, now)
}

/// Run one simulation tick with an explicit `dt`.
///
/// Order:
/// 1. input edges (jump buffer, jump cut, facing)
/// 2. horizontal control, jump, gravity
/// 3. x integration and horizontal collision
/// 4. y integration and vertical collision
/// 5. horizontal speed clamp
/// 6. unstable-tile lifecycle
pub fn step(sim: &mut Simulation, input: &InputFrame, dt: f64, now: Millis) -> TickResult {
    // 0. Advance tick counter
    sim.tick += 1;

    let movement = &sim.config.movement;

    // 1. Input edges
    physics::apply_input_edges(&mut sim.player, input, now, movement);

    // 2. Velocity
    physics::apply_horizontal(&mut sim.player, input.axis(), dt, movement);
    if physics::try_jump(&mut sim.player, now, movement) {
        let event = GameEvent::jumped(sim.tick, sim.player.position);
        sim.push_event(event);
    }
    physics::apply_gravity(&mut sim.player, dt, &sim.config.movement);

    // 3. Horizontal
    sim.player.position.x += sim.player.velocity.x * dt;
    collide_horizontal(sim, now);

    // 4. Vertical (runs even after a horizontal kill, from spawn)
    sim.player.position.y += sim.player.velocity.y * dt;
    collide_vertical(sim, now);

    // 5. Clamp
    physics::clamp_horizontal(&mut sim.player, &sim.config.movement);

    // 6. Unstable tiles
    update_unstable_tiles(sim, now, dt);

    #[cfg(feature = "debug-tracing")]
    trace!(
        tick = sim.tick,
        x = sim.player.position.x,
        y = sim.player.position.y,
        vx = sim.player.velocity.x,
        vy = sim.player.velocity.y,
        on_ground = sim.player.on_ground,
        "tick"
    );

    // Collect events
    let events = sim.take_events();
    TickResult {
        tick: sim.tick,
        dt,
        respawned: events.iter().any(GameEvent::is_respawn),
        events,
    }
}

/// Advance crumbling and falling cells, turning transitions into events.
fn update_unstable_tiles(sim: &mut Simulation, now: Millis, dt: f64) {
    let debris = DebrisParams {
        lifetime_ms: sim.config.world.debris_lifetime_ms,
        gravity_scale: sim.config.world.debris_gravity_scale,
    };
    let transitions = sim.tracker.update(
        &mut sim.grid,
        now,
        dt,
        sim.config.movement.gravity,
        debris,
    );

    for transition in transitions {
        let event = match transition {
            TrackerTransition::Collapsed { cell, original } => {
                GameEvent::tile_broke(sim.tick, cell, original, BreakCause::Collapsed)
            }
            TrackerTransition::Expired { cell } => GameEvent::debris_cleared(sim.tick, cell),
        };
        sim.push_event(event);
    }
}

/// Replay a recording from a fresh simulation.
///
/// Returns the final simulation and every event, including the initial
/// `LevelLoaded`.
pub fn replay(
    config: SimConfig,
    level: &str,
    recording: &InputRecording,
) -> Result<(Simulation, Vec<GameEvent>), ConfigError> {
    let mut sim = Simulation::new(config, level)?;
    let mut all_events = sim.take_events();

    for (_, now, frame) in recording.replay_iter() {
        let result = advance(&mut sim, &frame, now);
        all_events.extend(result.events);
    }

    Ok((sim, all_events))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use crate::core::vec2::Vec2;
    use crate::game::events::GameEventData;
    use crate::game::grid::CellCoord;
    use crate::game::tile::TileType;
    use crate::game::unstable::CellVisual;
    use crate::DEFAULT_LEVEL;

    const FRAME_MS: Millis = 16;
    const REST_Y: f64 = 96.0 - 32.0 - 0.001;

    /// Four rows of four tiles, spawn at `(32, spawn_y)`.
    fn sim_with(level: &str, spawn_y: f64) -> Simulation {
        let mut config = SimConfig::default();
        config.world.rows = 4;
        config.world.cols = 4;
        config.world.spawn = Vec2::new(32.0, spawn_y);
        let mut sim = Simulation::new(config, level).unwrap();
        sim.take_events();
        sim
    }

    fn has_jump(result: &TickResult) -> bool {
        result
            .events
            .iter()
            .any(|e| matches!(e.data, GameEventData::Jumped { .. }))
    }

    #[test]
    fn test_comes_to_rest_on_floor() {
        let mut sim = sim_with("0000\n0000\n0000\n1111", 0.0);

        for i in 0..120 {
            advance(&mut sim, &InputFrame::new(), 1000 + i * FRAME_MS);
        }

        let p = sim.player();
        assert!(p.on_ground);
        assert_eq!(p.velocity.y, 0.0);
        assert!((p.position.y - REST_Y).abs() < 1e-9);
        assert_eq!(sim.tick_count(), 120);
    }

    #[test]
    fn test_dt_derivation() {
        let mut sim = sim_with("0000\n0000\n0000\n1111", 0.0);

        // First frame is a full nominal frame
        assert_eq!(advance(&mut sim, &InputFrame::new(), 1000).dt, 1.0);
        let dt = advance(&mut sim, &InputFrame::new(), 1016).dt;
        assert!((dt - 0.96).abs() < 1e-12);

        // Stall is capped
        let dt = advance(&mut sim, &InputFrame::new(), 9000).dt;
        assert!((dt - 0.96).abs() < 1e-12);

        // Duplicate timestamp counts as a full frame
        assert_eq!(advance(&mut sim, &InputFrame::new(), 9000).dt, 1.0);
        assert_eq!(sim.last_frame_at(), Some(9000));
    }

    #[test]
    fn test_lava_triggers_exactly_one_respawn() {
        let mut sim = sim_with("0000\n0000\n0000\n2222", 0.0);

        let mut now = 1000;
        let result = loop {
            let result = advance(&mut sim, &InputFrame::new(), now);
            if result.respawned {
                break result;
            }
            assert!(now < 3000, "never reached the lava");
            now += FRAME_MS;
        };

        assert_eq!(result.events.iter().filter(|e| e.is_death()).count(), 1);
        assert_eq!(result.events.iter().filter(|e| e.is_respawn()).count(), 1);

        let p = sim.player();
        assert_eq!(p.position, sim.spawn());
        assert_eq!(p.velocity, Vec2::ZERO);
        assert!(!p.on_ground);
        assert_eq!(sim.deaths(), 1);
    }

    #[test]
    fn test_jump_buffered_before_landing_fires() {
        // Ten units above resting height, lands on the sixth frame
        let mut sim = sim_with("0000\n0000\n0000\n1111", REST_Y - 10.0);

        let first = advance(&mut sim, &InputFrame::new().pressing_jump(), 1000);
        assert!(!has_jump(&first));

        let mut jumped_at = None;
        for i in 1..20 {
            let now = 1000 + i * FRAME_MS;
            if has_jump(&advance(&mut sim, &InputFrame::new(), now)) {
                jumped_at = Some(now);
                break;
            }
        }

        let jumped_at = jumped_at.expect("buffered jump should fire on landing");
        assert!(jumped_at < 1150);
        assert!(sim.player().velocity.y < 0.0);
        assert_eq!(sim.player().jump_buffer_until, None);
    }

    #[test]
    fn test_jump_buffer_expires_before_landing() {
        // Thirty units up takes longer than the buffer
        let mut sim = sim_with("0000\n0000\n0000\n1111", REST_Y - 30.0);

        advance(&mut sim, &InputFrame::new().pressing_jump(), 1000);
        for i in 1..40 {
            let result = advance(&mut sim, &InputFrame::new(), 1000 + i * FRAME_MS);
            assert!(!has_jump(&result), "stale press fired at tick {}", result.tick);
        }
        assert!(sim.player().on_ground);
    }

    #[test]
    fn test_coyote_jump_after_floor_vanishes() {
        let mut sim = sim_with("0000\n0000\n0000\n1111", REST_Y);

        // Land at t=1000, coyote open until 1120
        advance(&mut sim, &InputFrame::new(), 1000);
        assert!(sim.player().on_ground);
        assert_eq!(sim.player().coyote_until, Some(1120));

        sim.grid.set_tile(CellCoord::new(3, 1), TileType::Void);
        advance(&mut sim, &InputFrame::new(), 1016);
        assert!(!sim.player().on_ground);

        let mut late = sim.clone();

        // Inside the window
        let result = advance(&mut sim, &InputFrame::new().pressing_jump(), 1032);
        assert!(has_jump(&result));

        // Outside the window
        for i in 2..9 {
            advance(&mut late, &InputFrame::new(), 1000 + i * FRAME_MS);
        }
        let result = advance(&mut late, &InputFrame::new().pressing_jump(), 1144);
        assert!(!has_jump(&result));
    }

    #[test]
    fn test_release_cuts_jump() {
        let mut sim = sim_with("0000\n0000\n0000\n1111", REST_Y);
        advance(&mut sim, &InputFrame::new(), 1000);

        let result = advance(&mut sim, &InputFrame::new().pressing_jump(), 1016);
        assert!(has_jump(&result));
        let rising = sim.player().velocity.y;
        assert!(rising < 0.0);

        advance(&mut sim, &InputFrame::new().releasing_jump(), 1032);
        let gravity_step = sim.config().movement.gravity * 0.96;
        assert!((sim.player().velocity.y - (rising * 0.5 + gravity_step)).abs() < 1e-9);
    }

    #[test]
    fn test_crumble_collapses_under_player() {
        let mut sim = sim_with("0000\n0000\n0000\n1331", REST_Y);
        let cell = CellCoord::new(3, 1);

        let mut now = 1000;
        advance(&mut sim, &InputFrame::new(), now);
        assert!(sim.tracker().contains(cell));

        let mut collapsed = None;
        while now < 1600 {
            now += FRAME_MS;
            let result = advance(&mut sim, &InputFrame::new(), now);
            let broke = result.events.iter().any(|e| {
                e.data == GameEventData::TileBroke {
                    cell,
                    tile: TileType::Crumble,
                    cause: BreakCause::Collapsed,
                }
            });
            if broke {
                collapsed = Some(now);
                break;
            }
            assert_eq!(sim.grid().tile_at(cell), TileType::Crumble);
        }

        assert_eq!(collapsed, Some(1512));
        assert_eq!(sim.grid().tile_at(cell), TileType::Void);

        // Nothing holds the player up any more
        advance(&mut sim, &InputFrame::new(), now + FRAME_MS);
        assert!(!sim.player().on_ground);
    }

    #[test]
    fn test_striking_crumbling_ice_breaks_once() {
        let mut sim = sim_with("0000\n0600\n0000\n1111", REST_Y);
        let cell = CellCoord::new(1, 1);
        sim.tracker.register_crumble(cell, TileType::ThinIce, 1000, 500);

        let mut breaks = Vec::new();
        let mut now = 1000;
        let mut frame = InputFrame::new().pressing_jump();
        for _ in 0..40 {
            let result = advance(&mut sim, &frame, now);
            frame = InputFrame::new();

            for event in &result.events {
                if let GameEventData::TileBroke { cell: broken, cause, .. } = event.data {
                    assert_eq!(broken, cell);
                    breaks.push(cause);

                    // Debris straight away, not a wobbling tile over an empty cell
                    let snapshot = sim.snapshot(now);
                    let entry = snapshot.unstable.iter().find(|u| u.cell == cell).unwrap();
                    assert!(matches!(entry.visual, CellVisual::Fallen { .. }));
                    assert_eq!(sim.grid().tile_at(cell), TileType::Void);
                }
            }
            now += FRAME_MS;
        }

        assert!(now > 1500);
        assert_eq!(breaks, vec![BreakCause::Struck]);
    }

    #[test]
    fn test_step_is_deterministic() {
        let run = || {
            let mut sim = sim_with("0000\n0000\n0030\n1111", 0.0);
            for i in 0..200u64 {
                let frame = if i % 40 < 20 {
                    InputFrame::with_movement(1)
                } else {
                    InputFrame::with_movement(-1).pressing_jump()
                };
                step(&mut sim, &frame, 0.96, 1000 + i * FRAME_MS);
            }
            sim.compute_hash()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_replay_reproduces_hash() {
        let config = SimConfig::default();
        let mut sim = Simulation::new(config.clone(), DEFAULT_LEVEL).unwrap();
        let mut recorded_events = sim.take_events();
        let mut recording = InputRecording::new();
        let mut rng = StdRng::seed_from_u64(0x7115_2024);

        let mut now: Millis = 5_000;
        let mut frame = InputFrame::new();
        for _ in 0..900 {
            // Hold a direction for a while, tap jump now and then
            if rng.gen_ratio(1, 12) {
                frame.move_x = rng.gen_range(-1..=1);
            }
            let mut this_tick = InputFrame::with_movement(frame.move_x);
            this_tick.set_jump_pressed(rng.gen_ratio(1, 15));
            this_tick.set_jump_released(rng.gen_ratio(1, 10));

            now += rng.gen_range(8..=34);
            recording.record(now, this_tick);
            recorded_events.extend(advance(&mut sim, &this_tick, now).events);
        }

        let (replayed, replayed_events) = replay(config, DEFAULT_LEVEL, &recording).unwrap();

        assert_eq!(replayed.tick_count(), sim.tick_count());
        assert_eq!(replayed.compute_hash(), sim.compute_hash());
        assert_eq!(replayed_events.len(), recorded_events.len());
        for (a, b) in replayed_events.iter().zip(&recorded_events) {
            assert_eq!(a.data, b.data);
        }

        // And through the byte encoding
        let decoded = InputRecording::from_bytes(&recording.to_bytes().unwrap()).unwrap();
        let (from_bytes, _) = replay(SimConfig::default(), DEFAULT_LEVEL, &decoded).unwrap();
        assert_eq!(from_bytes.compute_hash(), sim.compute_hash());
    }

    #[test]
    fn test_replay_rejects_bad_config() {
        let mut config = SimConfig::default();
        config.world.tile_size = -1.0;
        assert!(replay(config, DEFAULT_LEVEL, &InputRecording::new()).is_err());
    }
}
