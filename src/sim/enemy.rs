//! Enemy actors and their wander AI
//!
//! The AI is a small timed state machine:
//! `Idle -> DecideNextAction -> Running -> Idle`, with a turning sub-state
//! that runs before the state switch and holds the enemy in place.

use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::animation::AnimationPlayer;
use super::scene::{NodeId, Scene};
use crate::assets::{AnimationKind, ModelInstance};
use crate::config::{DurationRange, EnemyTypeConfig};
use crate::consts::{CROSSFADE_DURATION, MIN_TURN_ANGLE};
use crate::physics::{BodyHandle, PhysicsBridge, Transform};
use crate::{normalize_angle, shortest_angle_delta, yaw_forward, yaw_rotation};

/// Closed set of enemy types
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EnemyKind {
    #[serde(rename = "enemy_001")]
    Enemy001,
    #[serde(rename = "enemy_002")]
    Enemy002,
}

impl EnemyKind {
    /// Tag reported to scoring
    pub fn tag(&self) -> &'static str {
        match self {
            EnemyKind::Enemy001 => "enemy_001",
            EnemyKind::Enemy002 => "enemy_002",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnemyAiState {
    Idle,
    DecideNextAction,
    Running,
    /// Reserved, behaves like `Idle`
    Chasing,
    /// Reserved, behaves like `Idle`
    Attacking,
}

/// What the AI wants this tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AiCommand {
    /// Desired horizontal velocity
    pub velocity: Vec3,
    pub animation: AnimationKind,
}

impl AiCommand {
    fn stand() -> Self {
        Self {
            velocity: Vec3::ZERO,
            animation: AnimationKind::Idle,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnemyAi {
    state: EnemyAiState,
    /// Clock time the current state began (shifted forward by turns)
    entered_at: f64,
    turn_started_at: f64,
    idle_duration: f32,
    run_duration: f32,
    is_turning: bool,
    target_yaw: f32,
    /// Model heading (radians about +Y)
    yaw: f32,
    consecutive_straights: u32,
}

/// Uniform draw from an inclusive range
fn draw_duration(range: DurationRange, rng: &mut impl Rng) -> f32 {
    if range.max > range.min {
        rng.random_range(range.min..=range.max)
    } else {
        range.min
    }
}

impl EnemyAi {
    /// Start idle with a random timer offset so enemies don't move in lockstep
    pub fn new(yaw: f32, now: f64, config: &EnemyTypeConfig, rng: &mut impl Rng) -> Self {
        let mut ai = Self {
            state: EnemyAiState::Idle,
            entered_at: now,
            turn_started_at: now,
            idle_duration: 0.0,
            run_duration: 0.0,
            is_turning: false,
            target_yaw: yaw,
            yaw: normalize_angle(yaw),
            consecutive_straights: 0,
        };
        ai.enter_idle(now, config, rng);
        ai.entered_at = now - f64::from(rng.random::<f32>() * ai.idle_duration);
        ai
    }

    pub fn enter_idle(&mut self, now: f64, config: &EnemyTypeConfig, rng: &mut impl Rng) {
        self.state = EnemyAiState::Idle;
        self.entered_at = now;
        self.idle_duration = draw_duration(config.idle_duration, rng);
    }

    fn enter_running(&mut self, now: f64, config: &EnemyTypeConfig, rng: &mut impl Rng) {
        self.state = EnemyAiState::Running;
        self.entered_at = now;
        self.run_duration = draw_duration(config.run_duration, rng);
    }

    /// Begin rotating toward `target_yaw`
    pub fn begin_turn(&mut self, target_yaw: f32, now: f64) {
        self.target_yaw = normalize_angle(target_yaw);
        self.is_turning = true;
        self.turn_started_at = now;
    }

    /// Seconds spent in the current state, turns excluded
    pub fn state_elapsed(&self, now: f64) -> f64 {
        now - self.entered_at
    }

    fn decide(&mut self, now: f64, config: &EnemyTypeConfig, rng: &mut impl Rng) {
        let forced = self.consecutive_straights >= config.max_consecutive_straights;
        if forced || rng.random::<f32>() < config.turn_chance {
            let offset = rng.random_range(MIN_TURN_ANGLE..=std::f32::consts::PI);
            let sign = if rng.random::<bool>() { 1.0 } else { -1.0 };
            self.begin_turn(self.yaw + sign * offset, now);
            self.consecutive_straights = 0;
        } else {
            self.consecutive_straights += 1;
        }
        self.enter_running(now, config, rng);
    }

    /// Rotate one step along the shortest path; snaps when within a step
    ///
    /// The state timer is paused for the length of the turn.
    fn turn_step(&mut self, max_step: f32, now: f64) {
        let delta = shortest_angle_delta(self.yaw, self.target_yaw);
        if delta.abs() <= max_step {
            self.yaw = self.target_yaw;
            self.is_turning = false;
            self.entered_at += now - self.turn_started_at;
        } else {
            self.yaw = normalize_angle(self.yaw + max_step * delta.signum());
        }
    }

    /// Step the AI at clock time `now`; `dt` only drives turning
    pub fn update(
        &mut self,
        now: f64,
        dt: f32,
        config: &EnemyTypeConfig,
        rng: &mut impl Rng,
    ) -> AiCommand {
        if self.is_turning {
            self.turn_step(config.turn_speed * dt, now);
            return AiCommand::stand();
        }

        let elapsed = self.state_elapsed(now);
        match self.state {
            EnemyAiState::Idle => {
                if elapsed >= f64::from(self.idle_duration) {
                    self.state = EnemyAiState::DecideNextAction;
                    self.decide(now, config, rng);
                }
            }
            EnemyAiState::DecideNextAction => self.decide(now, config, rng),
            EnemyAiState::Running => {
                if elapsed >= f64::from(self.run_duration) {
                    self.enter_idle(now, config, rng);
                }
            }
            EnemyAiState::Chasing | EnemyAiState::Attacking => {
                log::debug!("Unsupported AI state {:?}, falling back to idle", self.state);
                self.enter_idle(now, config, rng);
            }
        }

        if self.state == EnemyAiState::Running && !self.is_turning {
            AiCommand {
                velocity: yaw_forward(self.yaw) * config.move_speed,
                animation: AnimationKind::Run,
            }
        } else {
            AiCommand::stand()
        }
    }

    pub fn state(&self) -> EnemyAiState {
        self.state
    }

    pub fn is_turning(&self) -> bool {
        self.is_turning
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn target_yaw(&self) -> f32 {
        self.target_yaw
    }

    pub fn idle_duration(&self) -> f32 {
        self.idle_duration
    }

    pub fn run_duration(&self) -> f32 {
        self.run_duration
    }

    pub fn consecutive_straights(&self) -> u32 {
        self.consecutive_straights
    }
}

/// Result of [`Enemy::apply_damage`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DamageOutcome {
    /// Dead (or gone) before the hit; nothing changed
    AlreadyDead,
    Damaged { remaining: f32 },
    /// This hit killed it
    Killed,
}

/// A spawned enemy
#[derive(Debug)]
pub struct Enemy {
    pub id: u32,
    pub kind: EnemyKind,
    pub hp: f32,
    pub max_hp: f32,
    pub height: f32,
    pub radius: f32,
    pub alive: bool,
    /// Foot position
    pub position: Vec3,
    pub model: ModelInstance,
    pub animation: AnimationPlayer,
    pub ai: EnemyAi,
    pub(crate) body: Option<BodyHandle>,
    pub(crate) node: Option<NodeId>,
}

impl Enemy {
    pub fn body(&self) -> Option<BodyHandle> {
        self.body
    }

    /// Center of the capsule
    pub fn center(&self) -> Vec3 {
        self.position + Vec3::Y * (self.height / 2.0)
    }

    pub fn transform(&self) -> Transform {
        Transform {
            translation: self.position,
            rotation: yaw_rotation(self.ai.yaw()),
        }
    }

    pub fn apply_damage(&mut self, amount: f32) -> DamageOutcome {
        if !self.alive {
            return DamageOutcome::AlreadyDead;
        }
        self.hp -= amount;
        if self.hp <= 0.0 {
            self.hp = 0.0;
            self.alive = false;
            DamageOutcome::Killed
        } else {
            DamageOutcome::Damaged { remaining: self.hp }
        }
    }

    /// Run the AI and hand its velocity to physics (vertical velocity kept)
    pub fn update(
        &mut self,
        now: f64,
        dt: f32,
        config: &EnemyTypeConfig,
        physics: &mut PhysicsBridge,
        rng: &mut impl Rng,
    ) {
        let command = self.ai.update(now, dt, config, rng);
        self.animation.play(command.animation, CROSSFADE_DURATION);
        self.animation.advance(dt);

        let Some(body) = self.body else {
            return;
        };
        let vertical = physics.linear_velocity(body).map(|v| v.y).unwrap_or(0.0);
        let velocity = Vec3::new(command.velocity.x, vertical, command.velocity.z);
        if let Err(e) = physics.set_linear_velocity(body, velocity) {
            log::debug!("Enemy {} velocity not applied: {}", self.id, e);
        }
    }

    /// Move the model to the body (capsule center to feet)
    pub fn sync_from_physics(&mut self, physics: &PhysicsBridge, scene: &mut Scene) {
        let Some(t) = self.body.and_then(|b| physics.body_transform(b)) else {
            return;
        };
        self.position = t.translation - Vec3::Y * (self.height / 2.0);
        if let Some(node) = self.node {
            scene.set_transform(node, self.transform());
            scene.set_pose(node, self.animation.pose());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;
    use std::f32::consts::PI;

    use crate::sim::clock::SimClock;

    fn config() -> EnemyTypeConfig {
        crate::GameConfig::default().enemies[0].clone()
    }

    fn straight_runner() -> EnemyTypeConfig {
        let mut cfg = config();
        cfg.idle_duration = DurationRange::new(2.0, 2.0);
        cfg.run_duration = DurationRange::new(1.0, 1.0);
        cfg.turn_chance = 0.0;
        cfg.max_consecutive_straights = 100;
        cfg
    }

    #[test]
    fn test_idle_to_run_transition() {
        let cfg = straight_runner();
        let mut rng = Pcg32::seed_from_u64(1);
        let mut clock = SimClock::new();
        let mut ai = EnemyAi::new(0.0, clock.now(), &cfg, &mut rng);
        ai.enter_idle(clock.now(), &cfg, &mut rng);

        // 7 x 0.25 = 1.75s: still idle
        for _ in 0..7 {
            let cmd = ai.update(clock.advance(0.25), 0.25, &cfg, &mut rng);
            assert_eq!(ai.state(), EnemyAiState::Idle);
            assert_eq!(cmd.velocity, Vec3::ZERO);
        }
        // 2.0s reached
        let cmd = ai.update(clock.advance(0.25), 0.25, &cfg, &mut rng);
        assert_eq!(ai.state(), EnemyAiState::Running);
        assert_eq!(cmd.animation, AnimationKind::Run);
        assert!((cmd.velocity.length() - cfg.move_speed).abs() < 1e-4);
    }

    #[test]
    fn test_state_switches_on_time_at_sixty_hz() {
        let cfg = straight_runner();
        let dt = 1.0 / 60.0;
        let mut rng = Pcg32::seed_from_u64(1);
        let mut clock = SimClock::new();
        let mut ai = EnemyAi::new(0.0, clock.now(), &cfg, &mut rng);
        ai.enter_idle(clock.now(), &cfg, &mut rng);

        for _ in 0..119 {
            ai.update(clock.advance(dt), dt, &cfg, &mut rng);
            assert_eq!(ai.state(), EnemyAiState::Idle);
        }
        // Frame 120 lands on 2.0s
        ai.update(clock.advance(dt), dt, &cfg, &mut rng);
        assert_eq!(ai.state(), EnemyAiState::Running);

        // Running ends on frame 60 of its own second
        for _ in 0..59 {
            ai.update(clock.advance(dt), dt, &cfg, &mut rng);
            assert_eq!(ai.state(), EnemyAiState::Running);
        }
        ai.update(clock.advance(dt), dt, &cfg, &mut rng);
        assert_eq!(ai.state(), EnemyAiState::Idle);
    }

    #[test]
    fn test_turn_pauses_run_timer() {
        let mut cfg = straight_runner();
        cfg.turn_chance = 1.0;
        cfg.turn_speed = 1.0;
        let dt = 0.25;
        let mut rng = Pcg32::seed_from_u64(5);
        let mut clock = SimClock::new();
        let mut ai = EnemyAi::new(0.0, clock.now(), &cfg, &mut rng);
        ai.enter_idle(clock.now(), &cfg, &mut rng);

        while ai.state() == EnemyAiState::Idle {
            ai.update(clock.advance(dt), dt, &cfg, &mut rng);
        }
        assert!(ai.is_turning());
        while ai.is_turning() {
            ai.update(clock.advance(dt), dt, &cfg, &mut rng);
        }
        // The full run still lies ahead once the turn is done
        assert_eq!(ai.state(), EnemyAiState::Running);
        assert!(ai.state_elapsed(clock.now()).abs() < 1e-9);
    }

    #[test]
    fn test_forced_turn_after_max_straights() {
        let mut cfg = config();
        cfg.turn_chance = 0.0;
        cfg.max_consecutive_straights = 2;
        cfg.idle_duration = DurationRange::new(0.0, 0.0);
        cfg.run_duration = DurationRange::new(0.0, 0.0);
        let mut rng = Pcg32::seed_from_u64(7);
        let mut ai = EnemyAi::new(0.0, 0.0, &cfg, &mut rng);

        let mut turned = false;
        for step in 1..=10 {
            ai.update(f64::from(step) * 0.01, 0.01, &cfg, &mut rng);
            if ai.is_turning() {
                turned = true;
                let delta = shortest_angle_delta(ai.yaw(), ai.target_yaw()).abs();
                assert!(delta >= MIN_TURN_ANGLE - 1e-4);
                assert_eq!(ai.consecutive_straights(), 0);
                break;
            }
            assert!(ai.consecutive_straights() <= 2);
        }
        assert!(turned);
    }

    #[test]
    fn test_turning_holds_position() {
        let cfg = config();
        let mut rng = Pcg32::seed_from_u64(3);
        let mut ai = EnemyAi::new(0.0, 0.0, &cfg, &mut rng);
        ai.begin_turn(PI / 2.0, 0.0);
        let cmd = ai.update(1.0 / 60.0, 1.0 / 60.0, &cfg, &mut rng);
        assert_eq!(cmd.velocity, Vec3::ZERO);
        assert!(ai.is_turning());
    }

    #[test]
    fn test_reserved_states_fall_back_to_idle() {
        let cfg = config();
        let mut rng = Pcg32::seed_from_u64(3);
        let mut ai = EnemyAi::new(0.0, 0.0, &cfg, &mut rng);
        ai.state = EnemyAiState::Chasing;
        let cmd = ai.update(0.01, 0.01, &cfg, &mut rng);
        assert_eq!(ai.state(), EnemyAiState::Idle);
        assert_eq!(cmd.velocity, Vec3::ZERO);
    }

    #[test]
    fn test_damage_kills_once() {
        let cfg = config();
        let mut rng = Pcg32::seed_from_u64(3);
        let mut enemy = Enemy {
            id: 1,
            kind: cfg.kind,
            hp: 75.0,
            max_hp: 75.0,
            height: cfg.height,
            radius: cfg.radius,
            alive: true,
            position: Vec3::ZERO,
            model: crate::assets::ModelPrototype {
                key: "enemy_001".into(),
                skinned: false,
                bone_count: 0,
            }
            .instantiate(1),
            animation: AnimationPlayer::new("enemy_001", Default::default()),
            ai: EnemyAi::new(0.0, 0.0, &cfg, &mut rng),
            body: None,
            node: None,
        };

        assert_eq!(enemy.apply_damage(25.0), DamageOutcome::Damaged { remaining: 50.0 });
        assert_eq!(enemy.apply_damage(25.0), DamageOutcome::Damaged { remaining: 25.0 });
        assert_eq!(enemy.apply_damage(25.0), DamageOutcome::Killed);
        assert!(!enemy.alive);
        assert_eq!(enemy.apply_damage(25.0), DamageOutcome::AlreadyDead);
    }

    #[test]
    fn test_kind_tags_match_serde_names() {
        let json = serde_json::to_string(&EnemyKind::Enemy002).unwrap();
        assert_eq!(json, "\"enemy_002\"");
        assert_eq!(EnemyKind::Enemy001.tag(), "enemy_001");
    }

    #[test]
    fn test_durations_are_uniform() {
        let range = DurationRange::new(1.0, 3.0);
        let mut rng = Pcg32::seed_from_u64(2024);
        let samples: Vec<f32> = (0..10_000).map(|_| draw_duration(range, &mut rng)).collect();

        let mean = samples.iter().map(|&s| f64::from(s)).sum::<f64>() / samples.len() as f64;
        assert!((mean - 2.0).abs() < 0.03, "mean {mean}");

        // Ten equal buckets of ~1000; 5 sigma is about 150
        let mut buckets = [0u32; 10];
        for s in &samples {
            let index = (((s - 1.0) / 2.0) * 10.0) as usize;
            buckets[index.min(9)] += 1;
        }
        for (i, count) in buckets.iter().enumerate() {
            assert!((850..=1150).contains(count), "bucket {i} has {count}");
        }
    }

    proptest! {
        #[test]
        fn prop_durations_within_range(
            seed in any::<u64>(),
            min in 0.0f32..5.0,
            span in 0.0f32..5.0,
        ) {
            let mut cfg = config();
            cfg.idle_duration = DurationRange::new(min, min + span);
            cfg.run_duration = DurationRange::new(min, min + span);
            let mut rng = Pcg32::seed_from_u64(seed);
            let mut ai = EnemyAi::new(0.0, 0.0, &cfg, &mut rng);
            for _ in 0..20 {
                ai.enter_idle(0.0, &cfg, &mut rng);
                prop_assert!(ai.idle_duration() >= min && ai.idle_duration() <= min + span);
                ai.enter_running(0.0, &cfg, &mut rng);
                prop_assert!(ai.run_duration() >= min && ai.run_duration() <= min + span);
            }
        }

        #[test]
        fn prop_turn_converges(
            start in -PI..PI,
            target in -PI..PI,
            turn_speed in 0.5f32..10.0,
        ) {
            let mut cfg = config();
            cfg.turn_speed = turn_speed;
            let dt = 1.0 / 60.0;
            let mut rng = Pcg32::seed_from_u64(0);
            let mut ai = EnemyAi::new(start, 0.0, &cfg, &mut rng);
            ai.begin_turn(target, 0.0);

            let max_steps = (PI / (turn_speed * dt)).ceil() as usize + 2;
            let mut steps = 0;
            while ai.is_turning() {
                prop_assert!(steps <= max_steps, "turn did not converge");
                steps += 1;
                ai.update(f64::from(dt) * steps as f64, dt, &cfg, &mut rng);
            }
            let error = shortest_angle_delta(ai.yaw(), normalize_angle(target)).abs();
            prop_assert!(error <= turn_speed * dt + 1e-4);
        }
    }
}
