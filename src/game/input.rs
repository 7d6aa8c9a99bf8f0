//! Input Capture and Recording
//!
//! Raw key edges are folded into one `InputFrame` per tick by `InputState`.
//! Frames carry only what affects the simulation: a horizontal axis and the
//! jump press/release edges.

use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::core::hash::{StateHash, StateHasher};
use crate::core::time::Millis;

// =============================================================================
// INPUT TYPES
// =============================================================================

/// Intent for a single tick.
///
/// NO tick or time field - those are stored separately for compression.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(C)]
pub struct InputFrame {
    /// Horizontal direction: -1 (left), 0, +1 (right)
    pub move_x: i8,

    /// Edge flags (packed bits):
    /// - Bit 0: Jump pressed since last tick
    /// - Bit 1: Jump released since last tick
    /// - Bit 2-7: Reserved
    pub flags: u8,
}

impl InputFrame {
    /// Size in bytes
    pub const SIZE: usize = 2;

    /// Jump pressed flag bit
    pub const FLAG_JUMP_PRESSED: u8 = 0x01;

    /// Jump released flag bit
    pub const FLAG_JUMP_RELEASED: u8 = 0x02;

    /// Create an idle frame.
    pub const fn new() -> Self {
        Self { move_x: 0, flags: 0 }
    }

    /// Create a frame with a horizontal direction.
    pub const fn with_movement(move_x: i8) -> Self {
        Self { move_x, flags: 0 }
    }

    /// Horizontal axis as -1.0, 0.0 or +1.0.
    ///
    /// Any out-of-range value is clamped to its sign.
    #[inline]
    pub fn axis(&self) -> f64 {
        self.move_x.signum() as f64
    }

    /// Check if jump was pressed since the last tick.
    #[inline]
    pub fn jump_pressed(&self) -> bool {
        self.flags & Self::FLAG_JUMP_PRESSED != 0
    }

    /// Check if jump was released since the last tick.
    #[inline]
    pub fn jump_released(&self) -> bool {
        self.flags & Self::FLAG_JUMP_RELEASED != 0
    }

    /// Check if this is an idle frame (no input).
    #[inline]
    pub fn is_idle(&self) -> bool {
        self.move_x == 0 && self.flags == 0
    }

    /// Set jump pressed flag.
    #[inline]
    pub fn set_jump_pressed(&mut self, pressed: bool) {
        if pressed {
            self.flags |= Self::FLAG_JUMP_PRESSED;
        } else {
            self.flags &= !Self::FLAG_JUMP_PRESSED;
        }
    }

    /// Set jump released flag.
    #[inline]
    pub fn set_jump_released(&mut self, released: bool) {
        if released {
            self.flags |= Self::FLAG_JUMP_RELEASED;
        } else {
            self.flags &= !Self::FLAG_JUMP_RELEASED;
        }
    }

    /// Builder form of `set_jump_pressed(true)`.
    pub const fn pressing_jump(mut self) -> Self {
        self.flags |= Self::FLAG_JUMP_PRESSED;
        self
    }

    /// Builder form of `set_jump_released(true)`.
    pub const fn releasing_jump(mut self) -> Self {
        self.flags |= Self::FLAG_JUMP_RELEASED;
        self
    }
}

/// Keys the simulation cares about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    /// Move left
    Left,
    /// Move right
    Right,
    /// Jump
    Jump,
}

/// Held keys and pending edges between two ticks.
///
/// Feed it key events as they arrive, then call `sample` once per tick.
#[derive(Clone, Debug, Default)]
pub struct InputState {
    left: bool,
    right: bool,
    jump_held: bool,
    pending: InputFrame,
}

impl InputState {
    /// Create with nothing held.
    pub fn new() -> Self {
        Self::default()
    }

    /// A key went down. Auto-repeat while held does not re-arm the jump.
    pub fn key_down(&mut self, key: Key) {
        match key {
            Key::Left => self.left = true,
            Key::Right => self.right = true,
            Key::Jump => {
                if !self.jump_held {
                    self.jump_held = true;
                    self.pending.set_jump_pressed(true);
                }
            }
        }
    }

    /// A key went up.
    pub fn key_up(&mut self, key: Key) {
        match key {
            Key::Left => self.left = false,
            Key::Right => self.right = false,
            Key::Jump => {
                if self.jump_held {
                    self.jump_held = false;
                    self.pending.set_jump_released(true);
                }
            }
        }
    }

    /// Is a key currently held?
    pub fn is_held(&self, key: Key) -> bool {
        match key {
            Key::Left => self.left,
            Key::Right => self.right,
            Key::Jump => self.jump_held,
        }
    }

    /// Produce this tick's frame and clear the pending edges.
    ///
    /// Left and right held together cancel out.
    pub fn sample(&mut self) -> InputFrame {
        let move_x = self.right as i8 - self.left as i8;
        let frame = InputFrame {
            move_x,
            flags: self.pending.flags,
        };
        self.pending = InputFrame::new();
        frame
    }
}

/// Delta-compressed input entry.
///
/// Only stored when input CHANGES (not every tick).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputDelta {
    /// Tick when this input state began
    pub tick: u64,
    /// The new input state
    pub frame: InputFrame,
}

impl InputDelta {
    /// Create new delta entry.
    pub fn new(tick: u64, frame: InputFrame) -> Self {
        Self { tick, frame }
    }
}

// =============================================================================
// RECORDING
// =============================================================================

/// Recording encode/decode errors.
#[derive(Debug, Error)]
pub enum RecordingError {
    /// bincode failed to encode
    #[error("failed to encode recording: {0}")]
    Encode(#[source] bincode::Error),

    /// bincode failed to decode
    #[error("failed to decode recording: {0}")]
    Decode(#[source] bincode::Error),

    /// Recording was written by an incompatible version
    #[error("unsupported recording version {found} (expected {expected})")]
    Version {
        /// Version in the data
        found: u8,
        /// Version this build reads
        expected: u8,
    },

    /// Decoded data is internally inconsistent
    #[error("corrupt recording: {0}")]
    Corrupt(&'static str),
}

/// Complete input recording of one session.
///
/// Ticks are numbered from 0 in recording order. Every tick stores the
/// `now` it was advanced with; frames are stored only when they change.
///
/// Used for:
/// - Replay playback
/// - Determinism checks (replayed hash == recorded hash)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InputRecording {
    /// Format version
    version: u8,

    /// Frame time for each tick, indexed by tick
    times: Vec<Millis>,

    /// Delta-compressed input data.
    /// Only stores ticks where input CHANGED.
    deltas: Vec<InputDelta>,

    /// Last recorded input (for delta comparison)
    #[serde(skip)]
    last_frame: InputFrame,
}

impl Default for InputRecording {
    fn default() -> Self {
        Self::new()
    }
}

impl InputRecording {
    /// Current format version.
    pub const VERSION: u8 = 1;

    /// Create an empty recording.
    pub fn new() -> Self {
        Self {
            version: Self::VERSION,
            times: Vec::with_capacity(1024),
            deltas: Vec::with_capacity(128),
            last_frame: InputFrame::new(),
        }
    }

    /// Record the next tick. Returns its tick number.
    ///
    /// Only stores the frame if it changed from the previous tick.
    pub fn record(&mut self, now: Millis, frame: InputFrame) -> u64 {
        let tick = self.times.len() as u64;
        self.times.push(now);

        if frame != self.last_frame {
            self.deltas.push(InputDelta::new(tick, frame));
            self.last_frame = frame;
        }
        tick
    }

    /// Get input at a specific tick.
    ///
    /// Uses binary search for efficiency.
    pub fn get_input_at(&self, tick: u64) -> InputFrame {
        // Binary search for the last delta at or before this tick
        let idx = self.deltas.partition_point(|d| d.tick <= tick);

        if idx == 0 {
            // Before first delta - idle
            InputFrame::new()
        } else {
            self.deltas[idx - 1].frame
        }
    }

    /// Frame time recorded for a tick.
    pub fn time_at(&self, tick: u64) -> Option<Millis> {
        usize::try_from(tick).ok().and_then(|i| self.times.get(i).copied())
    }

    /// Number of recorded ticks.
    pub fn tick_count(&self) -> u64 {
        self.times.len() as u64
    }

    /// Is the recording empty?
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Get all deltas.
    pub fn deltas(&self) -> &[InputDelta] {
        &self.deltas
    }

    /// Number of delta entries.
    pub fn delta_count(&self) -> usize {
        self.deltas.len()
    }

    /// Create iterator over all ticks for replay.
    pub fn replay_iter(&self) -> ReplayIterator<'_> {
        ReplayIterator {
            recording: self,
            current_tick: 0,
            delta_idx: 0,
            current_frame: InputFrame::new(),
        }
    }

    /// Digest of the recorded inputs and times.
    pub fn digest(&self) -> StateHash {
        let mut hasher = StateHasher::for_recording();
        hasher.update_u64(self.tick_count());
        for now in &self.times {
            hasher.update_u64(*now);
        }
        for delta in &self.deltas {
            hasher.update_u64(delta.tick);
            hasher.update_u8(delta.frame.move_x as u8);
            hasher.update_u8(delta.frame.flags);
        }
        hasher.finalize()
    }

    /// Encode with bincode.
    pub fn to_bytes(&self) -> Result<Vec<u8>, RecordingError> {
        bincode::serialize(self).map_err(RecordingError::Encode)
    }

    /// Decode with bincode and check consistency.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RecordingError> {
        let mut recording: Self = bincode::deserialize(bytes).map_err(RecordingError::Decode)?;

        if recording.version != Self::VERSION {
            return Err(RecordingError::Version {
                found: recording.version,
                expected: Self::VERSION,
            });
        }

        let ticks = recording.tick_count();
        if recording.deltas.windows(2).any(|w| w[0].tick >= w[1].tick) {
            return Err(RecordingError::Corrupt("input deltas out of order"));
        }
        if recording.deltas.last().is_some_and(|d| d.tick >= ticks) {
            return Err(RecordingError::Corrupt("input delta past last tick"));
        }
        if recording.times.windows(2).any(|w| w[0] > w[1]) {
            return Err(RecordingError::Corrupt("frame times go backwards"));
        }

        // Restore the delta baseline so recording can continue
        recording.last_frame = recording
            .deltas
            .last()
            .map(|d| d.frame)
            .unwrap_or_default();

        Ok(recording)
    }
}

/// Iterator for replaying inputs tick-by-tick.
///
/// Yields `(tick, now, frame)`.
pub struct ReplayIterator<'a> {
    recording: &'a InputRecording,
    current_tick: u64,
    delta_idx: usize,
    current_frame: InputFrame,
}

impl<'a> Iterator for ReplayIterator<'a> {
    type Item = (u64, Millis, InputFrame);

    fn next(&mut self) -> Option<Self::Item> {
        let now = self.recording.time_at(self.current_tick)?;

        // Check if we need to update current frame
        while self.delta_idx < self.recording.deltas.len() {
            let delta = &self.recording.deltas[self.delta_idx];
            if delta.tick <= self.current_tick {
                self.current_frame = delta.frame;
                self.delta_idx += 1;
            } else {
                break;
            }
        }

        let result = (self.current_tick, now, self.current_frame);
        self.current_tick += 1;
        Some(result)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.recording.times.len().saturating_sub(self.current_tick as usize);
        (remaining, Some(remaining))
    }
}

// =============================================================================
// TESTS
// =============================================================================
