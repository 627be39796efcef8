//! Per-frame simulation tick
//!
//! Order within a tick:
//! 1. actors turn input and AI into velocities (dead enemies and destroyed
//!    props from last tick are released first)
//! 2. physics steps
//! 3. actors read back transforms, kick timing fires beams
//! 4. projectiles advance and raycast; hits go through [`CollisionResolver`]
//! 5. scoring, effects, stage-cleared check

use std::collections::VecDeque;

use glam::Vec3;
use rand_pcg::Pcg32;

use super::character::MoveInput;
use super::effects::EffectManager;
use super::enemy::DamageOutcome;
use super::enemy_manager::EnemyManager;
use super::obstacles::{ObstacleKind, ObstacleManager};
use super::projectile::{BeamHit, HitHandler, HitResponse};
use super::resources::ResourceArena;
use super::scene::Scene;
use super::state::{GameEvent, GamePhase, GameState};
use super::targets::TargetId;
use crate::consts::MAX_FRAME_DT;
use crate::input::{CameraView, InputProvider, Key};

/// Input for a single tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    pub forward: bool,
    pub back: bool,
    pub left: bool,
    pub right: bool,
    /// Edge-triggered kick
    pub kick: bool,
    /// Edge-triggered pause toggle
    pub pause: bool,
    pub camera: CameraView,
}

impl TickInput {
    /// Sample held keys and consume pending presses
    pub fn from_provider(input: &mut impl InputProvider, camera: CameraView) -> Self {
        Self {
            forward: input.is_held(Key::Forward),
            back: input.is_held(Key::Back),
            left: input.is_held(Key::Left),
            right: input.is_held(Key::Right),
            kick: input.consume_press(Key::Kick),
            pause: input.consume_press(Key::Pause),
            camera,
        }
    }

    fn movement(&self) -> MoveInput {
        MoveInput {
            forward: self.forward,
            back: self.back,
            left: self.left,
            right: self.right,
            kick: self.kick,
        }
    }
}

/// Advance the game by one frame of `dt` seconds
pub fn tick(state: &mut GameState, input: &TickInput, dt: f32) {
    let dt = dt.clamp(0.0, MAX_FRAME_DT);

    if input.pause {
        match state.phase {
            GamePhase::Playing => {
                state.phase = GamePhase::Paused;
                return;
            }
            GamePhase::Paused => state.phase = GamePhase::Playing,
            GamePhase::Cleared => {}
        }
    }
    if state.phase == GamePhase::Paused {
        return;
    }

    let now = state.clock.advance(dt);

    if let Some(level) = state.scoring.begin_tick() {
        state.power_up_character(level);
    }

    // Actors set velocities
    state
        .character
        .update(&input.movement(), &input.camera, dt, now, &mut state.physics);
    state
        .enemies
        .update(now, dt, &mut state.physics, &mut state.scene, &mut state.rng);
    state.obstacles.sweep(&mut state.physics, &mut state.scene);

    let physics_cfg = &state.config.physics;
    if let Err(e) = state.physics.step_simulation(
        dt,
        physics_cfg.max_sub_steps,
        physics_cfg.fixed_time_step,
    ) {
        log::debug!("Physics step skipped: {}", e);
    }

    // Post-step transforms
    state.character.sync_from_physics(&state.physics, &mut state.scene);
    state.enemies.sync(&state.physics, &mut state.scene);
    state.character.advance_animation(dt);

    if state.character.take_beam_fire(now) {
        let origin = state.character.beam_origin();
        let direction = state.character.facing();
        let weapon = state.character.weapon();
        state.projectiles.fire_beam(
            origin,
            direction,
            weapon,
            state.character.body(),
            now,
            &mut state.resources,
            &mut state.scene,
        );
        state
            .projectiles
            .fire_ring(origin, direction, now, &mut state.resources, &mut state.scene);
        state.events.push_back(GameEvent::BeamFired {
            spiral: weapon.spiral,
        });
    }

    // Projectiles against the post-step world
    let destroyed = {
        let targets = state.targets.clone();
        let targets = targets.borrow();
        let mut resolver = CollisionResolver {
            now,
            enemies: &mut state.enemies,
            obstacles: &mut state.obstacles,
            effects: &mut state.effects,
            resources: &mut state.resources,
            scene: &mut state.scene,
            rng: &mut state.rng,
            events: &mut state.events,
            destroyed: Vec::new(),
        };
        state
            .projectiles
            .update(now, dt, &state.physics, &targets, &mut resolver);
        resolver.destroyed
    };
    state
        .projectiles
        .finish_tick(now, &mut state.resources, &mut state.scene);

    for (tag, points) in destroyed {
        state.on_object_destroyed(tag, points);
    }

    state
        .effects
        .update(now, dt, &mut state.resources, &mut state.scene);

    if state.phase == GamePhase::Playing && state.enemies.alive_count() == 0 {
        log::info!("Stage cleared with score {}", state.scoring.score());
        state.phase = GamePhase::Cleared;
        state.events.push_back(GameEvent::StageCleared);
    }
}

/// Turns beam hits into damage, destruction, effects and score
///
/// Scoring is collected in `destroyed` and applied after the projectile pass,
/// once the resolver's borrows are released.
pub struct CollisionResolver<'a> {
    pub now: f64,
    pub enemies: &'a mut EnemyManager,
    pub obstacles: &'a mut ObstacleManager,
    pub effects: &'a mut EffectManager,
    pub resources: &'a mut ResourceArena,
    pub scene: &'a mut Scene,
    pub rng: &'a mut Pcg32,
    pub events: &'a mut VecDeque<GameEvent>,
    /// `(kind tag, points)` per destroyed object
    pub destroyed: Vec<(&'static str, u64)>,
}

impl CollisionResolver<'_> {
    fn hit_wall(&mut self, hit: &BeamHit) -> HitResponse {
        self.effects.spawn_impact(
            hit.point,
            hit.normal,
            self.now,
            self.rng,
            self.resources,
            self.scene,
        );
        self.events.push_back(GameEvent::WallHit { point: hit.point });
        HitResponse::StopAndAdjust
    }

    fn hit_enemy(&mut self, id: u32, hit: &BeamHit) -> HitResponse {
        let outcome = self.enemies.apply_damage(id, hit.damage);
        let Some(enemy) = self.enemies.get(id) else {
            return HitResponse::Ignore;
        };
        let (kind, center, radius) = (enemy.kind, enemy.center(), enemy.radius);
        let Some(config) = self.enemies.enemy_type(kind).map(|t| &t.config) else {
            return HitResponse::Ignore;
        };

        match outcome {
            DamageOutcome::AlreadyDead => HitResponse::Ignore,
            DamageOutcome::Damaged { remaining } => {
                // Field on the side facing the shooter
                let toward = horizontal_direction(center, hit.origin);
                let at = center + toward * radius * config.at_field_offset_factor;
                self.effects
                    .spawn_wave_field(at, self.now, self.resources, self.scene);
                self.events.push_back(GameEvent::EnemyHit {
                    enemy: id,
                    remaining,
                });
                HitResponse::StopAndAdjust
            }
            DamageOutcome::Killed => {
                let points = config.points;
                self.effects
                    .spawn_debris(center, self.now, self.rng, self.resources, self.scene);
                self.effects
                    .spawn_sparks(center, self.now, self.rng, self.resources, self.scene);
                self.events
                    .push_back(GameEvent::EnemyKilled { enemy: id, kind });
                self.destroyed.push((kind.tag(), points));
                HitResponse::StopAndAdjust
            }
        }
    }

    fn hit_obstacle(&mut self, id: u32) -> HitResponse {
        let Some(obstacle) = self.obstacles.destroy(id) else {
            return HitResponse::Ignore;
        };
        let (kind, center, points) = (obstacle.kind, obstacle.center, obstacle.points);
        self.destroyed.push((kind.tag(), points));

        match kind {
            ObstacleKind::Sphere => {
                self.effects
                    .spawn_sparks(center, self.now, self.rng, self.resources, self.scene);
                HitResponse::DestroyTargetAndContinue
            }
            ObstacleKind::Crate => {
                self.effects
                    .spawn_debris(center, self.now, self.rng, self.resources, self.scene);
                HitResponse::StopAndAdjust
            }
        }
    }
}

impl HitHandler for CollisionResolver<'_> {
    fn on_hit(&mut self, hit: &BeamHit) -> HitResponse {
        match hit.target {
            TargetId::Wall(_) => self.hit_wall(hit),
            TargetId::Enemy(id) => self.hit_enemy(id, hit),
            TargetId::Obstacle(id) => self.hit_obstacle(id),
        }
    }
}

/// Frame delta for a 60 Hz host
pub const FRAME_DT: f32 = 1.0 / 60.0;

/// Direction from `from` to `to` on the XZ plane (zero if they coincide)
pub fn horizontal_direction(from: Vec3, to: Vec3) -> Vec3 {
    (to - from).with_y(0.0).normalize_or_zero()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GameConfig;
    use crate::assets::AssetLibrary;
    use crate::config::ObstacleConfig;
    use crate::physics::RayHit;
    use crate::sim::enemy::EnemyKind;
    use crate::sim::projectile::ProjectileKind;

    /// Small bordered room: character at (6,0,6) facing +Z, one idle enemy ahead
    fn duel_config() -> GameConfig {
        let mut config = GameConfig::default();
        config.maze.layout = ["#####", "#...#", "#...#", "#...#", "#####"]
            .iter()
            .map(|row| row.to_string())
            .collect();
        config.obstacles = ObstacleConfig {
            spheres: Vec::new(),
            crates: Vec::new(),
            ..Default::default()
        };
        let mut enemy = config.enemies[0].clone();
        enemy.move_speed = 0.0;
        enemy.spawn_points = vec![Vec3::new(6.0, 0.0, 14.0)];
        config.enemies = vec![enemy];
        config
    }

    fn duel() -> GameState {
        GameState::new(duel_config(), &AssetLibrary::builtin()).unwrap()
    }

    #[test]
    fn test_beam_kills_enemy_in_three_hits() {
        let mut state = duel();
        let kick = TickInput {
            kick: true,
            ..Default::default()
        };

        let mut events = Vec::new();
        for _ in 0..240 {
            tick(&mut state, &kick, FRAME_DT);
            events.extend(state.drain_events());
        }

        let hits = events
            .iter()
            .filter(|e| matches!(e, GameEvent::EnemyHit { .. }))
            .count();
        let destroyed: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, GameEvent::ObjectDestroyed { .. }))
            .collect();
        assert_eq!(hits, 2);
        assert_eq!(
            destroyed,
            vec![&GameEvent::ObjectDestroyed {
                tag: "enemy_001",
                points: 100
            }]
        );
        assert!(events.contains(&GameEvent::StageCleared));
        assert_eq!(state.phase, GamePhase::Cleared);
        assert_eq!(state.scoring.score(), 100);
        assert_eq!(state.character.power_level(), 1);
        // Removed on the tick after the kill
        assert!(state.enemies.is_empty());
    }

    #[test]
    fn test_tick_pause() {
        let mut state = duel();
        tick(&mut state, &TickInput::default(), FRAME_DT);
        let before = state.clock.now();

        let pause = TickInput {
            pause: true,
            ..Default::default()
        };
        tick(&mut state, &pause, FRAME_DT);
        assert_eq!(state.phase, GamePhase::Paused);

        tick(&mut state, &TickInput::default(), FRAME_DT);
        assert_eq!(state.clock.now(), before);

        tick(&mut state, &pause, FRAME_DT);
        assert_eq!(state.phase, GamePhase::Playing);
        assert!(state.clock.now() > before);
    }

    #[test]
    fn test_frame_delta_is_clamped() {
        let mut state = duel();
        tick(&mut state, &TickInput::default(), 5.0);
        assert!((state.clock.now() - f64::from(MAX_FRAME_DT)).abs() < 1e-6);
    }

    #[test]
    fn test_repeated_hits_score_one_kill() {
        let mut state = duel();
        let (id, body, center) = {
            let enemy = state.enemies.iter().next().unwrap();
            (enemy.id, enemy.body().unwrap(), enemy.center())
        };
        let hit = BeamHit {
            projectile: 1,
            kind: ProjectileKind::StandardBeam,
            target: TargetId::Enemy(id),
            point: center,
            normal: Vec3::NEG_Z,
            distance: 0.0,
            origin: Vec3::new(6.0, 1.0, 6.0),
            direction: Vec3::Z,
            damage: 50.0,
            ray: RayHit {
                point: center,
                normal: Vec3::NEG_Z,
                body,
                distance: 0.0,
            },
        };

        let mut resolver = CollisionResolver {
            now: 0.0,
            enemies: &mut state.enemies,
            obstacles: &mut state.obstacles,
            effects: &mut state.effects,
            resources: &mut state.resources,
            scene: &mut state.scene,
            rng: &mut state.rng,
            events: &mut state.events,
            destroyed: Vec::new(),
        };
        assert_eq!(resolver.on_hit(&hit), HitResponse::StopAndAdjust);
        assert_eq!(resolver.on_hit(&hit), HitResponse::StopAndAdjust);
        assert_eq!(resolver.on_hit(&hit), HitResponse::Ignore);
        assert_eq!(resolver.destroyed, vec![("enemy_001", 100)]);

        let events = state.drain_events();
        assert!(events.contains(&GameEvent::EnemyKilled {
            enemy: id,
            kind: EnemyKind::Enemy001
        }));
        // Wave field for the non-lethal hit, debris and sparks for the kill
        assert_eq!(state.effects.len(), 3);
    }

    #[test]
    fn test_props_resolve_by_kind() {
        let mut config = duel_config();
        config.obstacles.spheres = vec![Vec3::new(6.0, 1.0, 10.0)];
        config.obstacles.crates = vec![Vec3::new(10.0, 0.6, 10.0)];
        let mut state = GameState::new(config, &AssetLibrary::builtin()).unwrap();
        let props: Vec<_> = state
            .obstacles
            .iter()
            .map(|o| (o.id, o.kind, o.body().unwrap()))
            .collect();

        let mut responses = Vec::new();
        {
            let mut resolver = CollisionResolver {
                now: 0.0,
                enemies: &mut state.enemies,
                obstacles: &mut state.obstacles,
                effects: &mut state.effects,
                resources: &mut state.resources,
                scene: &mut state.scene,
                rng: &mut state.rng,
                events: &mut state.events,
                destroyed: Vec::new(),
            };
            for (id, _, body) in &props {
                let hit = BeamHit {
                    projectile: 1,
                    kind: ProjectileKind::StandardBeam,
                    target: TargetId::Obstacle(*id),
                    point: Vec3::ZERO,
                    normal: Vec3::Y,
                    distance: 0.0,
                    origin: Vec3::ZERO,
                    direction: Vec3::Z,
                    damage: 25.0,
                    ray: RayHit {
                        point: Vec3::ZERO,
                        normal: Vec3::Y,
                        body: *body,
                        distance: 0.0,
                    },
                };
                responses.push(resolver.on_hit(&hit));
                // A second hit on a destroyed prop is ignored
                assert_eq!(resolver.on_hit(&hit), HitResponse::Ignore);
            }
            assert_eq!(resolver.destroyed, vec![("sphere", 10), ("crate", 30)]);
        }

        let expected: Vec<_> = props
            .iter()
            .map(|(_, kind, _)| match kind {
                ObstacleKind::Sphere => HitResponse::DestroyTargetAndContinue,
                ObstacleKind::Crate => HitResponse::StopAndAdjust,
            })
            .collect();
        assert_eq!(responses, expected);

        // Released on the next tick's sweep
        tick(&mut state, &TickInput::default(), FRAME_DT);
        assert_eq!(state.obstacles.remaining(), 0);
    }

    #[test]
    fn test_determinism() {
        let mut a = duel();
        let mut b = duel();
        let inputs = [
            TickInput {
                forward: true,
                ..Default::default()
            },
            TickInput {
                kick: true,
                left: true,
                ..Default::default()
            },
            TickInput::default(),
        ];
        for _ in 0..40 {
            for input in &inputs {
                tick(&mut a, input, FRAME_DT);
                tick(&mut b, input, FRAME_DT);
            }
        }
        assert_eq!(a.character.position, b.character.position);
        let yaws = |s: &GameState| s.enemies.iter().map(|e| e.ai.yaw()).collect::<Vec<_>>();
        assert_eq!(yaws(&a), yaws(&b));
        assert_eq!(a.projectiles.len(), b.projectiles.len());
    }

    #[test]
    fn test_horizontal_direction_ignores_height() {
        let d = horizontal_direction(Vec3::ZERO, Vec3::new(3.0, 10.0, 4.0));
        assert!((d - Vec3::new(0.6, 0.0, 0.8)).length() < 1e-6);
        assert_eq!(horizontal_direction(Vec3::ONE, Vec3::ONE), Vec3::ZERO);
    }
}
