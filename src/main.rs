//! Tilerun Headless Runner
//!
//! Plays a scripted session on the built-in level, logs what happens, then
//! replays the recording and checks that the final state hashes agree.
//!
//! Usage: `tilerun [config.json]`

use anyhow::{bail, Context, Result};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use tilerun::{
    DEFAULT_LEVEL, TICK_RATE, VERSION,
    config::SimConfig,
    core::time::Millis,
    game::{
        events::{GameEvent, GameEventData},
        input::{InputRecording, InputState, Key},
        state::Simulation,
        tick::{advance, replay},
    },
};

/// Length of the scripted session.
const SESSION_MS: Millis = 12_000;

/// Arbitrary wall-clock origin, so the session does not start at zero.
const START_MS: Millis = 10_000;

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Tilerun v{}", VERSION);
    info!("Tick Rate: {} Hz", TICK_RATE);

    let config = match std::env::args().nth(1) {
        Some(path) => {
            info!("Loading config from {}", path);
            SimConfig::load(&path).with_context(|| format!("loading {}", path))?
        }
        None => SimConfig::default(),
    };

    demo_session(config)
}

/// Key transitions the script makes at a given time.
fn scripted_keys(elapsed: Millis) -> Vec<(Key, bool)> {
    let mut keys = Vec::new();

    match elapsed {
        0 => keys.push((Key::Right, true)),
        6_000 => {
            keys.push((Key::Right, false));
            keys.push((Key::Left, true));
        }
        7_500 => {
            keys.push((Key::Left, false));
            keys.push((Key::Right, true));
        }
        _ => {}
    }

    // Tap jump every 900 ms, holding it for a variable time
    let phase = elapsed % 900;
    let hold = if (elapsed / 900) % 2 == 0 { 320 } else { 90 };
    if elapsed > 0 && phase == 0 {
        keys.push((Key::Jump, true));
    } else if phase == hold {
        keys.push((Key::Jump, false));
    }

    keys
}

/// Run the demo and verify replay determinism.
fn demo_session(config: SimConfig) -> Result<()> {
    info!("=== Starting Demo Session ===");

    let mut sim = Simulation::new(config.clone(), DEFAULT_LEVEL)?;
    let mut input = InputState::new();
    let mut recording = InputRecording::new();

    for event in sim.take_events() {
        log_event(&event);
    }
    let spawn = sim.spawn();
    info!("Spawn at ({:.1}, {:.1})", spawn.x, spawn.y);

    let mut elapsed: Millis = 0;
    let mut frame_index: u64 = 0;
    let mut total_events = 0usize;

    while elapsed <= SESSION_MS {
        // Key events land between frames, at 1 ms resolution
        let next_frame = (frame_index + 1) * 1000 / TICK_RATE as u64;
        while elapsed < next_frame {
            for (key, down) in scripted_keys(elapsed) {
                if down {
                    input.key_down(key);
                } else {
                    input.key_up(key);
                }
            }
            elapsed += 1;
        }

        let now = START_MS + elapsed;
        let frame = input.sample();
        recording.record(now, frame);

        let result = advance(&mut sim, &frame, now);
        total_events += result.events.len();
        for event in &result.events {
            log_event(event);
        }

        // Report every 2 seconds
        if result.tick % (2 * TICK_RATE as u64) == 0 {
            let player = sim.player();
            info!(
                "Tick {}: pos {} ({} from spawn) vel {} pose {:?}, {} tracked cells",
                result.tick,
                player.position,
                player.position - spawn,
                player.velocity,
                player.pose(),
                sim.tracker().len()
            );
        }

        frame_index += 1;
    }

    let end = START_MS + elapsed;
    let snapshot = sim.snapshot(end);
    debug!("Final snapshot: {}", serde_json::to_string(&snapshot)?);

    // Print final results
    info!("=== Session Results ===");
    let hash = sim.compute_hash();
    info!("Ticks: {} (last frame at {:?} ms)", sim.tick_count(), sim.last_frame_at());
    info!("Deaths: {}", sim.deaths());
    info!("Total events: {}", total_events);
    info!("Final State Hash: {}", hex::encode(hash));

    // Verify determinism by replaying through the byte encoding
    info!("=== Verifying Determinism ===");
    let bytes = recording.to_bytes()?;
    info!(
        "Recording: {} ticks, {} input changes, {} bytes, digest {}",
        recording.tick_count(),
        recording.delta_count(),
        bytes.len(),
        hex::encode(&recording.digest()[..8])
    );

    let decoded = InputRecording::from_bytes(&bytes)?;
    let (replayed, _) = replay(config, sim.level_source(), &decoded)?;
    let replay_hash = replayed.compute_hash();

    info!("Replay State Hash: {}", hex::encode(replay_hash));

    if hash == replay_hash {
        info!("DETERMINISM VERIFIED: Hashes match!");
        Ok(())
    } else {
        warn!("DETERMINISM FAILURE: Hashes differ!");
        bail!("replay diverged from the recorded session")
    }
}

/// Log one event at a level matching its importance.
fn log_event(event: &GameEvent) {
    match &event.data {
        GameEventData::LevelLoaded { rows, cols } => {
            info!("Level loaded: {}x{}", rows, cols);
        }
        GameEventData::Died { cell, tile } => {
            info!("Tick {}: died on {:?} at ({}, {})", event.tick, tile, cell.row, cell.col);
        }
        GameEventData::Respawned { spawn } => {
            info!("Tick {}: respawned at {}", event.tick, spawn);
        }
        GameEventData::Jumped { position } => {
            debug!("Tick {}: jump from {}", event.tick, position);
        }
        GameEventData::CrumbleStarted { cell, tile } => {
            debug!("Tick {}: {:?} crumbling at ({}, {})", event.tick, tile, cell.row, cell.col);
        }
        GameEventData::TileBroke { cell, tile, cause } => {
            info!("Tick {}: {:?} broke at ({}, {}) ({:?})", event.tick, tile, cell.row, cell.col, cause);
        }
        GameEventData::DebrisCleared { cell } => {
            debug!("Tick {}: debris cleared at ({}, {})", event.tick, cell.row, cell.col);
        }
    }
}
