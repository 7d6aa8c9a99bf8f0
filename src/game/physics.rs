//! Movement Integrator
//!
//! Horizontal control, buffered/coyote jumping and gravity. Everything is
//! scaled by the frame `dt` (1.0 at 60 Hz). Position integration and
//! collision live in `tick` and `collision`.

use tracing::trace;

use crate::config::MovementConfig;
use crate::core::time::{Millis, deadline};
use crate::game::input::InputFrame;
use crate::game::state::Player;

/// Move `current` toward `target` by at most `max_delta`, without
/// overshooting.
#[inline]
pub fn approach(current: f64, target: f64, max_delta: f64) -> f64 {
    if current < target {
        (current + max_delta).min(target)
    } else if current > target {
        (current - max_delta).max(target)
    } else {
        current
    }
}

/// Surface the player is moving on this tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Surface {
    /// Grounded on a slippery tile
    Ice,
    /// Grounded on anything else
    Ground,
    /// Not touching the ground
    Air,
}

impl Surface {
    /// Classify the player's current contact.
    #[inline]
    pub fn of(player: &Player) -> Self {
        if player.on_ground && player.on_ice {
            Surface::Ice
        } else if player.on_ground {
            Surface::Ground
        } else {
            Surface::Air
        }
    }
}

/// Top horizontal speed for the player's contact state.
#[inline]
pub fn max_speed(player: &Player, cfg: &MovementConfig) -> f64 {
    if player.on_ground {
        cfg.max_speed_ground
    } else {
        cfg.max_speed_air
    }
}

/// Apply this tick's input edges.
///
/// A press arms the jump buffer. A release while rising cuts the upward
/// speed. Facing follows any non-zero horizontal input.
pub fn apply_input_edges(player: &mut Player, input: &InputFrame, now: Millis, cfg: &MovementConfig) {
    if input.jump_pressed() {
        player.jump_buffer_until = Some(deadline(now, cfg.jump_buffer_ms));
    }

    if input.jump_released() && player.velocity.y < 0.0 {
        player.velocity.y *= cfg.jump_cut_multiplier;
    }

    let axis = input.axis();
    if axis > 0.0 {
        player.facing_left = false;
    } else if axis < 0.0 {
        player.facing_left = true;
    }
}

/// Accelerate or decelerate horizontally toward the input direction.
pub fn apply_horizontal(player: &mut Player, axis: f64, dt: f64, cfg: &MovementConfig) {
    let vx = player.velocity.x;

    player.velocity.x = match Surface::of(player) {
        Surface::Ice if axis != 0.0 => {
            approach(vx, axis * cfg.max_speed_ground, cfg.accel_ice * dt)
        }
        Surface::Ice => approach(vx, 0.0, cfg.friction_ice * dt),
        Surface::Ground => {
            let vx = approach(vx, axis * cfg.max_speed_ground, cfg.accel_ground * dt);
            if axis == 0.0 {
                approach(vx, 0.0, cfg.friction_ground * dt)
            } else {
                vx
            }
        }
        // Airborne with no input still drifts to a stop at `accel_air`
        Surface::Air => approach(vx, axis * cfg.max_speed_air, cfg.accel_air * dt),
    };
}

/// Can a jump fire at `now`?
///
/// Needs an unexpired buffered press, and either ground contact or an open
/// coyote window.
#[inline]
pub fn can_jump(player: &Player, now: Millis) -> bool {
    let buffered = player.jump_buffer_until.is_some_and(|until| now < until);
    let supported = player.on_ground || player.coyote_until.is_some_and(|until| now <= until);
    buffered && supported
}

/// Fire a jump if allowed. Consumes the buffer and the coyote window.
///
/// Returns true if the jump fired.
pub fn try_jump(player: &mut Player, now: Millis, cfg: &MovementConfig) -> bool {
    if !can_jump(player, now) {
        return false;
    }

    player.velocity.y = -cfg.jump_power;
    player.on_ground = false;
    player.jump_buffer_until = None;
    player.coyote_until = None;

    trace!(x = player.position.x, y = player.position.y, now, "jump");
    true
}

/// Accelerate downward, capped at terminal speed.
#[inline]
pub fn apply_gravity(player: &mut Player, dt: f64, cfg: &MovementConfig) {
    player.velocity.y = (player.velocity.y + cfg.gravity * dt).min(cfg.max_fall_speed);
}

/// Clamp horizontal speed to the max for the current contact state.
#[inline]
pub fn clamp_horizontal(player: &mut Player, cfg: &MovementConfig) {
    let max = max_speed(player, cfg);
    player.velocity.x = player.velocity.x.clamp(-max, max);
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::vec2::Vec2;

    const EPS: f64 = 1e-9;

    fn player() -> Player {
        Player::new(Vec2::new(40.0, 40.0), Vec2::splat(32.0))
    }

    fn grounded() -> Player {
        let mut p = player();
        p.on_ground = true;
        p
    }

    fn cfg() -> MovementConfig {
        MovementConfig::default()
    }

    #[test]
    fn test_approach() {
        assert_eq!(approach(0.0, 4.5, 0.9), 0.9);
        assert_eq!(approach(4.0, 4.5, 0.9), 4.5);
        assert_eq!(approach(-1.0, 0.0, 0.3), -0.7);
        assert_eq!(approach(0.2, 0.0, 0.8), 0.0);
        assert_eq!(approach(2.0, 2.0, 1.0), 2.0);
    }

    #[test]
    fn test_ground_acceleration() {
        let mut p = grounded();
        apply_horizontal(&mut p, 1.0, 1.0, &cfg());
        assert!((p.velocity.x - 0.9).abs() < EPS);

        for _ in 0..10 {
            apply_horizontal(&mut p, 1.0, 1.0, &cfg());
        }
        assert_eq!(p.velocity.x, 4.5);
    }

    #[test]
    fn test_ground_friction_stacks_with_accel() {
        let mut p = grounded();
        p.velocity.x = 4.0;
        // 0.9 toward zero from accel, then 0.8 from friction
        apply_horizontal(&mut p, 0.0, 1.0, &cfg());
        assert!((p.velocity.x - 2.3).abs() < EPS);
    }

    #[test]
    fn test_air_drift_without_input() {
        let mut p = player();
        p.velocity.x = 4.0;
        apply_horizontal(&mut p, 0.0, 1.0, &cfg());
        assert!((p.velocity.x - 3.85).abs() < EPS);
    }

    #[test]
    fn test_ice_is_slippery() {
        let mut p = grounded();
        p.on_ice = true;
        p.velocity.x = 4.0;
        apply_horizontal(&mut p, 0.0, 1.0, &cfg());
        assert!((p.velocity.x - 3.97).abs() < EPS);

        let mut p = grounded();
        p.on_ice = true;
        apply_horizontal(&mut p, -1.0, 2.0, &cfg());
        assert!((p.velocity.x + 0.5).abs() < EPS);
    }

    #[test]
    fn test_on_ice_without_ground_is_air() {
        let mut p = player();
        p.on_ice = true;
        assert_eq!(Surface::of(&p), Surface::Air);
    }

    #[test]
    fn test_jump_needs_buffer_and_support() {
        let c = cfg();

        // Grounded, no press
        let mut p = grounded();
        assert!(!try_jump(&mut p, 1000, &c));

        // Grounded, fresh press
        apply_input_edges(&mut p, &InputFrame::new().pressing_jump(), 1000, &c);
        assert_eq!(p.jump_buffer_until, Some(1150));
        assert!(try_jump(&mut p, 1000, &c));
        assert_eq!(p.velocity.y, -c.jump_power);
        assert!(!p.on_ground);
        assert_eq!(p.jump_buffer_until, None);

        // Buffer consumed, no second jump
        p.on_ground = true;
        assert!(!try_jump(&mut p, 1016, &c));
    }

    #[test]
    fn test_jump_buffer_expires() {
        let c = cfg();
        let mut p = player();
        apply_input_edges(&mut p, &InputFrame::new().pressing_jump(), 1000, &c);

        // Lands while the buffer is live
        p.on_ground = true;
        assert!(can_jump(&p, 1149));
        // Strictly before the deadline
        assert!(!can_jump(&p, 1150));
    }

    #[test]
    fn test_coyote_window() {
        let c = cfg();
        let mut p = player();
        p.coyote_until = Some(1120);
        p.jump_buffer_until = Some(1200);

        assert!(can_jump(&p, 1120));
        assert!(!can_jump(&p, 1121));

        assert!(try_jump(&mut p, 1100, &c));
        assert_eq!(p.coyote_until, None);
    }

    #[test]
    fn test_jump_cut_once_per_release() {
        let c = cfg();
        let mut p = player();
        p.velocity.y = -10.0;

        let release = InputFrame::new().releasing_jump();
        apply_input_edges(&mut p, &release, 0, &c);
        assert_eq!(p.velocity.y, -5.0);

        // No release edge, no cut
        apply_input_edges(&mut p, &InputFrame::new(), 16, &c);
        assert_eq!(p.velocity.y, -5.0);

        // Falling: release does nothing
        p.velocity.y = 3.0;
        apply_input_edges(&mut p, &release, 32, &c);
        assert_eq!(p.velocity.y, 3.0);
    }

    #[test]
    fn test_facing_follows_input() {
        let c = cfg();
        let mut p = player();
        apply_input_edges(&mut p, &InputFrame::with_movement(-1), 0, &c);
        assert!(p.facing_left);
        apply_input_edges(&mut p, &InputFrame::new(), 0, &c);
        assert!(p.facing_left);
        apply_input_edges(&mut p, &InputFrame::with_movement(1), 0, &c);
        assert!(!p.facing_left);
    }

    #[test]
    fn test_gravity_capped() {
        let c = cfg();
        let mut p = player();
        apply_gravity(&mut p, 1.0, &c);
        assert!((p.velocity.y - 0.55).abs() < EPS);

        p.velocity.y = 13.9;
        apply_gravity(&mut p, 1.0, &c);
        assert_eq!(p.velocity.y, c.max_fall_speed);
    }

    #[test]
    fn test_clamp_horizontal() {
        let mut c = cfg();
        c.max_speed_air = 3.0;
        let mut p = player();
        p.velocity.x = -6.0;
        clamp_horizontal(&mut p, &c);
        assert_eq!(p.velocity.x, -3.0);

        p.on_ground = true;
        p.velocity.x = 6.0;
        clamp_horizontal(&mut p, &c);
        assert_eq!(p.velocity.x, 4.5);
    }
}
