//! Frame Timing
//!
//! Timers in the simulation are absolute deadlines in milliseconds supplied
//! by the caller. The core never reads a system clock, so a recorded run
//! replays bit-for-bit.

/// Absolute time in milliseconds.
pub type Millis = u64;

/// Nominal frame length at 60 Hz, in milliseconds.
pub const NOMINAL_FRAME_MS: f64 = 1000.0 / 60.0;

/// Largest frame delta fed into the integrator, in milliseconds.
pub const MAX_FRAME_MS: f64 = 16.0;

/// Convert a wall-clock frame delta into the frame-scaled `dt` unit.
///
/// `dt` is 1.0 for a nominal 60 Hz frame. Deltas above `max_frame_ms` are
/// capped, so a stall moves the world by at most one frame. A zero delta
/// (first frame, duplicate timestamp) counts as one nominal frame.
#[inline]
pub fn frame_dt(delta_ms: Millis, max_frame_ms: f64, nominal_frame_ms: f64) -> f64 {
    let capped = (delta_ms as f64).min(max_frame_ms);
    let dt = capped / nominal_frame_ms;
    if dt > 0.0 {
        dt
    } else {
        1.0
    }
}

/// Deadline `offset_ms` after `now`, saturating at the end of time.
#[inline]
pub fn deadline(now: Millis, offset_ms: u64) -> Millis {
    now.saturating_add(offset_ms)
}
