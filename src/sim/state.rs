//! Game state and scoring
//!
//! [`GameState`] owns every manager plus the physics world, scene and shared
//! raycast-target list. Managers are handed the pieces they need per call, so
//! nothing reaches for global state.

use std::collections::VecDeque;

use glam::Vec3;
use rand::SeedableRng;
use rand_pcg::Pcg32;

use super::character::Character;
use super::clock::SimClock;
use super::effects::EffectManager;
use super::enemy::EnemyKind;
use super::enemy_manager::EnemyManager;
use super::obstacles::ObstacleManager;
use super::projectile::ProjectileManager;
use super::resources::ResourceArena;
use super::scene::Scene;
use super::targets::{RaycastTargets, SharedTargets};
use crate::assets::AssetLibrary;
use crate::config::GameConfig;
use crate::error::StartupError;
use crate::physics::PhysicsBridge;

/// Current phase of gameplay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    Playing,
    /// Tick does nothing until unpaused
    Paused,
    /// Every enemy is dead; the world keeps running
    Cleared,
}

/// Side effects for the host (audio, HUD)
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    BeamFired { spiral: bool },
    WallHit { point: Vec3 },
    EnemyHit { enemy: u32, remaining: f32 },
    EnemyKilled { enemy: u32, kind: EnemyKind },
    ObjectDestroyed { tag: &'static str, points: u64 },
    PoweredUp { level: u32 },
    StageCleared,
}

/// Score and power-level bookkeeping
///
/// Level N unlocks once the score reaches `thresholds[N-1]`. At most one
/// level is granted per tick; a score that jumps several thresholds at once
/// is paid out over the following ticks, in order.
#[derive(Debug, Clone)]
pub struct Scoring {
    score: u64,
    level: u32,
    thresholds: Vec<u64>,
    granted_this_tick: bool,
}

impl Scoring {
    pub fn new(thresholds: Vec<u64>) -> Self {
        Self {
            score: 0,
            level: 0,
            thresholds,
            granted_this_tick: false,
        }
    }

    /// Start a new tick; grants a level still owed from earlier ticks
    pub fn begin_tick(&mut self) -> Option<u32> {
        self.granted_this_tick = false;
        self.try_grant()
    }

    /// Add points for a destroyed object; returns a newly reached level
    pub fn on_object_destroyed(&mut self, points: u64) -> Option<u32> {
        self.score += points;
        self.try_grant()
    }

    fn try_grant(&mut self) -> Option<u32> {
        if self.granted_this_tick {
            return None;
        }
        let next = *self.thresholds.get(self.level as usize)?;
        if self.score < next {
            return None;
        }
        self.level += 1;
        self.granted_this_tick = true;
        Some(self.level)
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn level(&self) -> u32 {
        self.level
    }
}

/// Complete game state
pub struct GameState {
    pub config: GameConfig,
    pub clock: SimClock,
    pub rng: Pcg32,
    pub phase: GamePhase,
    pub physics: PhysicsBridge,
    pub scene: Scene,
    pub targets: SharedTargets,
    pub resources: ResourceArena,
    pub character: Character,
    pub enemies: EnemyManager,
    pub obstacles: ObstacleManager,
    pub projectiles: ProjectileManager,
    pub effects: EffectManager,
    pub scoring: Scoring,
    pub events: VecDeque<GameEvent>,
}

impl GameState {
    /// Build the world: physics, maze, props, character, enemies
    ///
    /// Bad config, an unusable physics world or a missing required asset is
    /// fatal. Individual props or enemies that fail to spawn are skipped.
    pub fn new(config: GameConfig, assets: &AssetLibrary) -> Result<Self, StartupError> {
        config.validate()?;

        let mut physics = PhysicsBridge::new();
        physics.init(Vec3::new(0.0, config.physics.gravity, 0.0));
        let mut scene = Scene::new();
        let targets = RaycastTargets::shared();
        let mut resources = ResourceArena::new();
        let mut rng = Pcg32::seed_from_u64(config.seed);

        let mut obstacles = ObstacleManager::new(targets.clone());
        obstacles.build_maze(&config.maze, &mut physics, &mut scene)?;
        let props = obstacles.spawn_props(&config.obstacles, &mut physics, &mut scene);
        log::info!("Spawned {} props", props);

        let character = Character::spawn(
            &config.character,
            &config.beam,
            assets.require(&config.character.asset)?,
            &mut physics,
            &mut scene,
        )?;

        let mut enemies = EnemyManager::new(targets.clone());
        for enemy_type in &config.enemies {
            let bundle = assets.require(&enemy_type.asset)?;
            enemies.register_type(enemy_type.clone(), bundle.clone());
        }
        let clock = SimClock::new();
        enemies.spawn_all(clock.now(), &mut physics, &mut scene, &mut rng);

        let projectiles =
            ProjectileManager::new(config.spiral.clone(), config.ring.clone(), &mut resources);
        let effects = EffectManager::new(config.effects.clone(), &mut resources);
        let scoring = Scoring::new(config.scoring.thresholds.clone());

        Ok(Self {
            config,
            clock,
            rng,
            phase: GamePhase::Playing,
            physics,
            scene,
            targets,
            resources,
            character,
            enemies,
            obstacles,
            projectiles,
            effects,
            scoring,
            events: VecDeque::new(),
        })
    }

    /// Score a destroyed object and apply any power level it unlocks
    pub fn on_object_destroyed(&mut self, tag: &'static str, points: u64) {
        self.events
            .push_back(GameEvent::ObjectDestroyed { tag, points });
        if let Some(level) = self.scoring.on_object_destroyed(points) {
            self.power_up_character(level);
        }
    }

    /// Apply power level `level` (1-based) with its flash and field effects
    pub fn power_up_character(&mut self, level: u32) {
        let index = (level as usize).saturating_sub(1);
        let Some(stats) = self.config.power_levels.get(index) else {
            log::warn!("No power level {} configured", level);
            return;
        };
        self.character
            .power_up(level, stats, &self.config.beam, &self.config.spiral);

        let now = self.clock.now();
        let feet = self.character.position;
        let chest = feet + Vec3::Y * self.config.character.beam_height;
        self.effects
            .spawn_cross_burst(chest, now, &mut self.resources, &mut self.scene);
        self.effects
            .spawn_field_plane(feet, now, &mut self.resources, &mut self.scene);
        self.events.push_back(GameEvent::PoweredUp { level });
    }

    /// Take every queued event
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        self.events.drain(..).collect()
    }

    /// Release every body, node and per-instance resource
    pub fn shutdown(&mut self) {
        self.projectiles.clear(&mut self.resources, &mut self.scene);
        self.effects.clear(&mut self.resources, &mut self.scene);
        self.enemies.clear(&mut self.physics, &mut self.scene);
        self.obstacles.clear(&mut self.physics, &mut self.scene);
        self.character.dispose(&mut self.physics, &mut self.scene);
        log::info!(
            "Shut down with score {} at level {}",
            self.scoring.score(),
            self.scoring.level()
        );
    }
}
