//! Beam Maze - a 3D maze brawler
//!
//! Core modules:
//! - `physics`: rapier3d bridge (bodies, stepping, raycasts)
//! - `sim`: per-frame simulation (actors, projectiles, effects, scoring)
//! - `config`: data-driven tuning
//! - `assets` / `input`: contracts for the host-side collaborators

pub mod assets;
pub mod config;
pub mod error;
pub mod input;
pub mod physics;
pub mod sim;

pub use config::GameConfig;
pub use error::{ConfigError, PhysicsError, StartupError};

use glam::{Quat, Vec3};

/// Engine constants that are not exposed as tuning
pub mod consts {
    /// Upper bound on a single frame delta (protects against tab-switch spikes)
    pub const MAX_FRAME_DT: f32 = 0.1;

    /// Animation blend time when the active clip changes
    pub const CROSSFADE_DURATION: f32 = 0.2;
    /// Damping factor applied to `rotation_speed * delta` when turning the model
    pub const ROTATION_DAMPING: f32 = 5.0;
    /// Fraction of max speed above which the run clip plays
    pub const RUN_THRESHOLD_FRACTION: f32 = 0.01;

    /// How long a beam stays visible after a terminal hit (seconds)
    pub const POST_HIT_DISPLAY_DURATION: f64 = 0.15;
    /// Spiral beams raycast from this fraction of their length behind the leading edge
    pub const SPIRAL_RAY_BACKOFF: f32 = 0.1;

    /// Extra time granted to particle effects after their last particle expires
    pub const PARTICLE_GRACE: f64 = 0.1;
    /// Extra time granted to wave fields after their last ring ends
    pub const WAVE_FIELD_GRACE: f64 = 0.2;

    /// Minimum heading change when an enemy decides to turn (radians)
    pub const MIN_TURN_ANGLE: f32 = std::f32::consts::FRAC_PI_4;

    /// Collision groups (bit flags for rapier interaction groups)
    pub mod groups {
        pub const STATIC: u32 = 1 << 0;
        pub const CHARACTER: u32 = 1 << 1;
        pub const ENEMY: u32 = 1 << 2;
        pub const OBSTACLE: u32 = 1 << 3;
        pub const ALL: u32 = u32::MAX;
        /// What beams are allowed to hit
        pub const BEAM_MASK: u32 = STATIC | ENEMY | OBSTACLE;
    }
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Signed shortest rotation from `from` to `to` (radians, in [-π, π))
#[inline]
pub fn shortest_angle_delta(from: f32, to: f32) -> f32 {
    normalize_angle(to - from)
}

/// World-space forward direction for a model yawed by `yaw` around +Y
///
/// Yaw 0 faces +Z.
#[inline]
pub fn yaw_forward(yaw: f32) -> Vec3 {
    Vec3::new(yaw.sin(), 0.0, yaw.cos())
}

/// Yaw that makes a model face along the horizontal direction `dir`
#[inline]
pub fn yaw_of(dir: Vec3) -> f32 {
    dir.x.atan2(dir.z)
}

/// Yaw-only rotation quaternion
#[inline]
pub fn yaw_rotation(yaw: f32) -> Quat {
    Quat::from_rotation_y(yaw)
}

/// Extract the yaw from a rotation (assumes rotation is mostly about +Y)
#[inline]
pub fn rotation_yaw(rotation: Quat) -> f32 {
    yaw_of(rotation * Vec3::Z)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_normalize_angle_wraps() {
        assert!((normalize_angle(3.0 * PI) - (-PI)).abs() < 1e-5);
        assert!((normalize_angle(-PI / 2.0) + PI / 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_shortest_angle_delta_takes_short_path() {
        // 170° -> -170° is +20°, not -340°
        let from = 170f32.to_radians();
        let to = (-170f32).to_radians();
        let d = shortest_angle_delta(from, to);
        assert!((d - 20f32.to_radians()).abs() < 1e-4);
    }

    #[test]
    fn test_yaw_roundtrip() {
        let yaw = 0.7;
        assert!((yaw_of(yaw_forward(yaw)) - yaw).abs() < 1e-5);
        assert!((rotation_yaw(yaw_rotation(yaw)) - yaw).abs() < 1e-5);
    }
}
