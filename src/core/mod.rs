//! Core primitives.
//!
//! World-space vector, frame timing and state hashing. Nothing in this
//! module knows about tiles or players.

pub mod vec2;
pub mod time;
pub mod hash;

// Re-export core types
pub use vec2::Vec2;
pub use time::{Millis, frame_dt};
pub use hash::{StateHash, StateHasher, compute_state_hash};
