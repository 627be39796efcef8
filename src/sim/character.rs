//! Player character controller
//!
//! Input becomes a camera-relative velocity for the capsule body; the model
//! turns toward the movement heading and picks kick > run > idle. A kick
//! locks out movement until its clip has played through and releases
//! exactly one beam `kick_beam_delay` seconds after the press, even when the
//! clip is shorter than the delay. No new kick starts while a beam is owed.

use glam::{Quat, Vec3};

use super::animation::AnimationPlayer;
use super::projectile::BeamSpec;
use super::scene::{NodeId, NodeKind, Scene};
use crate::assets::{AnimationKind, AssetBundle};
use crate::config::{BeamConfig, CharacterConfig, PowerLevelConfig, SpiralConfig};
use crate::consts::{CROSSFADE_DURATION, ROTATION_DAMPING, RUN_THRESHOLD_FRACTION, groups};
use crate::error::StartupError;
use crate::input::CameraView;
use crate::physics::{BodyHandle, PhysicsBridge, Surface, Transform};
use crate::{rotation_yaw, yaw_forward, yaw_of, yaw_rotation};

/// Movement and action buttons for one tick
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MoveInput {
    pub forward: bool,
    pub back: bool,
    pub left: bool,
    pub right: bool,
    /// Edge-triggered kick press
    pub kick: bool,
}

/// Horizontal unit direction for the held keys, relative to the camera
pub fn movement_direction(input: &MoveInput, camera: &CameraView) -> Vec3 {
    let forward = Vec3::new(camera.forward.x, 0.0, camera.forward.z)
        .try_normalize()
        .unwrap_or(Vec3::Z);
    let right = forward.cross(camera.up).normalize_or_zero();

    let axis = |pos: bool, neg: bool| pos as i32 as f32 - neg as i32 as f32;
    let dir = forward * axis(input.forward, input.back) + right * axis(input.right, input.left);
    dir.normalize_or_zero()
}

#[derive(Debug)]
pub struct Character {
    config: CharacterConfig,
    /// Foot position
    pub position: Vec3,
    pub rotation: Quat,
    animation: AnimationPlayer,
    body: Option<BodyHandle>,
    node: Option<NodeId>,
    /// Cleared while a kick plays
    can_play_action: bool,
    /// Set by a kick until its beam has fired
    kick_start: Option<f64>,
    move_speed: f32,
    power_level: u32,
    weapon: BeamSpec,
}

impl Character {
    /// Create the character at its spawn point
    ///
    /// Fails if the bundle lacks the idle or kick clip or the body cannot be made.
    pub fn spawn(
        config: &CharacterConfig,
        beam: &BeamConfig,
        bundle: &AssetBundle,
        physics: &mut PhysicsBridge,
        scene: &mut Scene,
    ) -> Result<Self, StartupError> {
        for animation in [AnimationKind::Idle, AnimationKind::Kick] {
            if !bundle.clips.get(&animation).is_some_and(|c| c.is_playable()) {
                return Err(StartupError::MissingAnimation {
                    asset: config.asset.clone(),
                    animation,
                });
            }
        }

        let body = physics.create_capsule_body(
            config.spawn,
            config.height,
            config.radius,
            config.mass,
            Surface {
                friction: config.friction,
                restitution: config.restitution,
                group: groups::CHARACTER,
            },
        )?;

        let mut animation = AnimationPlayer::new(config.asset.clone(), bundle.clips.clone());
        animation.play(AnimationKind::Idle, 0.0);

        let mut character = Self {
            config: config.clone(),
            position: config.spawn,
            rotation: Quat::IDENTITY,
            animation,
            body: Some(body),
            node: None,
            can_play_action: true,
            kick_start: None,
            move_speed: config.move_speed,
            power_level: 0,
            weapon: BeamSpec::standard(beam),
        };
        character.node = Some(scene.add(
            NodeKind::Model(bundle.model.instantiate(0)),
            character.transform(),
        ));
        log::info!("Character spawned at {:?}", config.spawn);
        Ok(character)
    }

    /// Apply this tick's input (before the physics step)
    pub fn update(
        &mut self,
        input: &MoveInput,
        camera: &CameraView,
        dt: f32,
        now: f64,
        physics: &mut PhysicsBridge,
    ) {
        if input.kick && self.can_play_action {
            self.start_kick(now);
        }

        let kicking = !self.can_play_action;
        let dir = if kicking {
            Vec3::ZERO
        } else {
            movement_direction(input, camera)
        };
        let horizontal = dir * self.move_speed;

        if let Some(body) = self.body {
            // Physics owns vertical motion
            let vertical = physics.linear_velocity(body).map(|v| v.y).unwrap_or(0.0);
            if let Err(e) = physics.set_linear_velocity(body, horizontal.with_y(vertical)) {
                log::debug!("Character velocity not applied: {}", e);
            }
        }

        if dir != Vec3::ZERO {
            let target = yaw_rotation(yaw_of(dir));
            let t = (self.config.rotation_speed * dt * ROTATION_DAMPING).min(1.0);
            self.rotation = self.rotation.slerp(target, t);
        }

        let animation = if kicking {
            AnimationKind::Kick
        } else if horizontal.length() > self.move_speed * RUN_THRESHOLD_FRACTION {
            AnimationKind::Run
        } else {
            AnimationKind::Idle
        };
        self.animation.play(animation, CROSSFADE_DURATION);
    }

    fn start_kick(&mut self, now: f64) {
        if self.kick_start.is_some() || !self.animation.play(AnimationKind::Kick, CROSSFADE_DURATION)
        {
            return;
        }
        self.can_play_action = false;
        self.kick_start = Some(now);
    }

    /// Advance clips and release the kick lock once the kick has played through
    ///
    /// A beam still owed to the kick stays scheduled.
    pub fn advance_animation(&mut self, dt: f32) {
        self.animation.advance(dt);
        if !self.can_play_action && self.animation.finished() {
            self.can_play_action = true;
            self.animation.play(AnimationKind::Idle, CROSSFADE_DURATION);
        }
    }

    /// True exactly once per kick, when the beam delay has elapsed
    pub fn take_beam_fire(&mut self, now: f64) -> bool {
        let Some(start) = self.kick_start else {
            return false;
        };
        if now - start < f64::from(self.config.kick_beam_delay) {
            return false;
        }
        self.kick_start = None;
        true
    }

    /// Move the model to the body (capsule center to feet)
    pub fn sync_from_physics(&mut self, physics: &PhysicsBridge, scene: &mut Scene) {
        let Some(t) = self.body.and_then(|b| physics.body_transform(b)) else {
            return;
        };
        self.position = t.translation - Vec3::Y * (self.config.height / 2.0);
        if let Some(node) = self.node {
            scene.set_transform(node, self.transform());
            scene.set_pose(node, self.animation.pose());
        }
    }

    /// Apply power level `level` (1-based)
    pub fn power_up(
        &mut self,
        level: u32,
        stats: &PowerLevelConfig,
        beam: &BeamConfig,
        spiral: &SpiralConfig,
    ) {
        self.power_level = level;
        self.weapon = BeamSpec::for_level(stats, beam, spiral);
        self.move_speed = self.config.move_speed * stats.move_speed_multiplier;
        log::info!(
            "Power level {} (damage {}, spiral {})",
            level,
            self.weapon.damage,
            self.weapon.spiral
        );
    }

    /// Release the body and model
    pub fn dispose(&mut self, physics: &mut PhysicsBridge, scene: &mut Scene) {
        if let Some(body) = self.body.take() {
            if let Err(e) = physics.remove_body(body) {
                log::debug!("Character body already gone: {}", e);
            }
        }
        if let Some(node) = self.node.take() {
            scene.remove(node);
        }
        self.animation.stop();
    }

    pub fn transform(&self) -> Transform {
        Transform {
            translation: self.position,
            rotation: self.rotation,
        }
    }

    /// Horizontal facing
    pub fn facing(&self) -> Vec3 {
        yaw_forward(rotation_yaw(self.rotation))
    }

    /// Where beams leave from
    pub fn beam_origin(&self) -> Vec3 {
        self.position
            + Vec3::Y * self.config.beam_height
            + self.facing() * self.config.beam_forward_offset
    }

    pub fn body(&self) -> Option<BodyHandle> {
        self.body
    }

    pub fn can_play_action(&self) -> bool {
        self.can_play_action
    }

    pub fn animation(&self) -> &AnimationPlayer {
        &self.animation
    }

    pub fn power_level(&self) -> u32 {
        self.power_level
    }

    pub fn weapon(&self) -> &BeamSpec {
        &self.weapon
    }

    pub fn move_speed(&self) -> f32 {
        self.move_speed
    }
}
