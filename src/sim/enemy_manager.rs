//! Enemy roster
//!
//! Owns every enemy and the removal protocol. Dead enemies stay in the
//! roster until the next [`EnemyManager::update`], which tears them down in
//! this order: physics body, raycast target, actor resources, roster entry.

use std::collections::BTreeMap;

use glam::Vec3;
use rand::Rng;

use super::animation::AnimationPlayer;
use super::enemy::{DamageOutcome, Enemy, EnemyAi, EnemyKind};
use super::scene::{NodeKind, Scene};
use super::targets::{SharedTargets, TargetId};
use crate::assets::{AnimationKind, AssetBundle};
use crate::config::EnemyTypeConfig;
use crate::consts::groups;
use crate::physics::{PhysicsBridge, Surface};

/// Registered enemy type: tuning plus the asset bundle to clone from
#[derive(Debug, Clone)]
pub struct EnemyType {
    pub config: EnemyTypeConfig,
    pub bundle: AssetBundle,
}

pub struct EnemyManager {
    types: BTreeMap<EnemyKind, EnemyType>,
    enemies: Vec<Enemy>,
    targets: SharedTargets,
    next_id: u32,
}

impl EnemyManager {
    pub fn new(targets: SharedTargets) -> Self {
        Self {
            types: BTreeMap::new(),
            enemies: Vec::new(),
            targets,
            next_id: 0,
        }
    }

    /// Register (or replace) an enemy type
    pub fn register_type(&mut self, config: EnemyTypeConfig, bundle: AssetBundle) {
        for kind in [AnimationKind::Idle, AnimationKind::Run] {
            if !bundle.clips.get(&kind).is_some_and(|c| c.is_playable()) {
                log::warn!(
                    "{}: no '{}' animation, it will stay unanimated",
                    config.kind.tag(),
                    kind.as_str()
                );
            }
        }
        self.types.insert(config.kind, EnemyType { config, bundle });
    }

    pub fn enemy_type(&self, kind: EnemyKind) -> Option<&EnemyType> {
        self.types.get(&kind)
    }

    /// Spawn every registered type at its configured spawn points
    ///
    /// An enemy whose body cannot be created is skipped; the rest still spawn.
    pub fn spawn_all(
        &mut self,
        now: f64,
        physics: &mut PhysicsBridge,
        scene: &mut Scene,
        rng: &mut impl Rng,
    ) -> usize {
        let spawns: Vec<(EnemyKind, Vec3)> = self
            .types
            .values()
            .flat_map(|t| t.config.spawn_points.iter().map(|p| (t.config.kind, *p)))
            .collect();

        let spawned = spawns
            .into_iter()
            .filter(|(kind, foot)| self.spawn(*kind, *foot, now, physics, scene, rng).is_some())
            .count();
        log::info!("Spawned {} enemies", spawned);
        spawned
    }

    /// Spawn one enemy with its feet at `foot`
    pub fn spawn(
        &mut self,
        kind: EnemyKind,
        foot: Vec3,
        now: f64,
        physics: &mut PhysicsBridge,
        scene: &mut Scene,
        rng: &mut impl Rng,
    ) -> Option<u32> {
        let Some(enemy_type) = self.types.get(&kind) else {
            log::warn!("Enemy type {} is not registered", kind.tag());
            return None;
        };
        let config = &enemy_type.config;

        let body = match physics.create_capsule_body(
            foot,
            config.height,
            config.radius,
            config.mass,
            Surface {
                friction: config.friction,
                restitution: config.restitution,
                group: groups::ENEMY,
            },
        ) {
            Ok(body) => body,
            Err(e) => {
                log::warn!("Skipping {} at {:?}: {}", kind.tag(), foot, e);
                return None;
            }
        };

        self.next_id += 1;
        let id = self.next_id;
        let model = enemy_type.bundle.model.instantiate(id);
        let mut animation = AnimationPlayer::new(config.asset.clone(), enemy_type.bundle.clips.clone());
        animation.play(AnimationKind::Idle, 0.0);

        let yaw = rng.random_range(-std::f32::consts::PI..std::f32::consts::PI);
        let mut enemy = Enemy {
            id,
            kind,
            hp: config.hp,
            max_hp: config.hp,
            height: config.height,
            radius: config.radius,
            alive: true,
            position: foot,
            model: model.clone(),
            animation,
            ai: EnemyAi::new(yaw, now, config, rng),
            body: Some(body),
            node: None,
        };
        enemy.node = Some(scene.add(NodeKind::Model(model), enemy.transform()));

        self.targets.borrow_mut().push(TargetId::Enemy(id), body);
        self.enemies.push(enemy);
        Some(id)
    }

    /// Damage an enemy; a kill only marks it dead, removal waits for the next update
    pub fn apply_damage(&mut self, id: u32, amount: f32) -> DamageOutcome {
        let Some(enemy) = self.enemies.iter_mut().find(|e| e.id == id) else {
            return DamageOutcome::AlreadyDead;
        };
        let outcome = enemy.apply_damage(amount);
        if outcome == DamageOutcome::Killed {
            log::debug!("{} #{} killed", enemy.kind.tag(), id);
        }
        outcome
    }

    /// Remove last tick's dead, then run AI for the living
    pub fn update(
        &mut self,
        now: f64,
        dt: f32,
        physics: &mut PhysicsBridge,
        scene: &mut Scene,
        rng: &mut impl Rng,
    ) {
        self.remove_dead(physics, scene);

        for enemy in &mut self.enemies {
            let Some(enemy_type) = self.types.get(&enemy.kind) else {
                continue;
            };
            enemy.update(now, dt, &enemy_type.config, physics, rng);
        }
    }

    /// Pull post-step transforms into the models
    pub fn sync(&mut self, physics: &PhysicsBridge, scene: &mut Scene) {
        for enemy in &mut self.enemies {
            enemy.sync_from_physics(physics, scene);
        }
    }

    fn remove_dead(&mut self, physics: &mut PhysicsBridge, scene: &mut Scene) {
        for index in (0..self.enemies.len()).rev() {
            if !self.enemies[index].alive {
                self.remove_at(index, physics, scene);
            }
        }
    }

    fn remove_at(&mut self, index: usize, physics: &mut PhysicsBridge, scene: &mut Scene) {
        let enemy = &mut self.enemies[index];
        if let Some(body) = enemy.body.take() {
            if let Err(e) = physics.remove_body(body) {
                log::debug!("Enemy {} body already gone: {}", enemy.id, e);
            }
        }
        self.targets.borrow_mut().remove(TargetId::Enemy(enemy.id));
        enemy.animation.stop();
        if let Some(node) = enemy.node.take() {
            scene.remove(node);
        }
        self.enemies.remove(index);
    }

    /// Tear down the whole roster
    pub fn clear(&mut self, physics: &mut PhysicsBridge, scene: &mut Scene) {
        for index in (0..self.enemies.len()).rev() {
            self.remove_at(index, physics, scene);
        }
    }

    pub fn get(&self, id: u32) -> Option<&Enemy> {
        self.enemies.iter().find(|e| e.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Enemy> {
        self.enemies.iter()
    }

    /// Enemies still in the roster (dead ones included until removed)
    pub fn len(&self) -> usize {
        self.enemies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.enemies.is_empty()
    }

    pub fn alive_count(&self) -> usize {
        self.enemies.iter().filter(|e| e.alive).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GameConfig;
    use crate::assets::AssetLibrary;
    use crate::sim::targets::RaycastTargets;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    struct Fixture {
        physics: PhysicsBridge,
        scene: Scene,
        targets: SharedTargets,
        manager: EnemyManager,
        rng: Pcg32,
    }

    fn fixture() -> Fixture {
        let config = GameConfig::default();
        let library = AssetLibrary::builtin();
        let targets = RaycastTargets::shared();
        let mut manager = EnemyManager::new(targets.clone());
        for t in &config.enemies {
            manager.register_type(t.clone(), library.get(&t.asset).unwrap().clone());
        }
        Fixture {
            physics: PhysicsBridge::with_gravity(Vec3::new(0.0, -9.81, 0.0)),
            scene: Scene::new(),
            targets,
            manager,
            rng: Pcg32::seed_from_u64(42),
        }
    }

    #[test]
    fn test_spawn_registers_everything() {
        let mut f = fixture();
        let count = f.manager.spawn_all(0.0, &mut f.physics, &mut f.scene, &mut f.rng);
        assert_eq!(count, 3);
        assert_eq!(f.physics.body_count(), 3);
        assert_eq!(f.targets.borrow().len(), 3);
        assert_eq!(f.scene.len(), 3);
        assert_eq!(f.manager.alive_count(), 3);
    }

    #[test]
    fn test_body_failure_skips_only_that_enemy() {
        let mut f = fixture();
        let mut broken = f.manager.enemy_type(EnemyKind::Enemy002).unwrap().clone();
        broken.config.radius = 0.0;
        f.manager.register_type(broken.config, broken.bundle);

        let count = f.manager.spawn_all(0.0, &mut f.physics, &mut f.scene, &mut f.rng);
        // Both Enemy001 spawn points still come up
        assert_eq!(count, 2);
        assert!(f.manager.iter().all(|e| e.kind == EnemyKind::Enemy001));
    }

    #[test]
    fn test_dead_enemy_removed_next_update() {
        let mut f = fixture();
        let id = f
            .manager
            .spawn(EnemyKind::Enemy001, Vec3::ZERO, 0.0, &mut f.physics, &mut f.scene, &mut f.rng)
            .unwrap();
        let body = f.manager.get(id).unwrap().body().unwrap();

        assert_eq!(f.manager.apply_damage(id, 1000.0), DamageOutcome::Killed);
        // Marked dead but nothing released yet
        assert!(f.physics.contains(body));
        assert!(f.targets.borrow().contains(TargetId::Enemy(id)));
        assert_eq!(f.manager.apply_damage(id, 10.0), DamageOutcome::AlreadyDead);

        f.manager.update(1.0 / 60.0, 1.0 / 60.0, &mut f.physics, &mut f.scene, &mut f.rng);
        assert!(!f.physics.contains(body));
        assert!(!f.targets.borrow().contains(TargetId::Enemy(id)));
        assert!(f.manager.get(id).is_none());
        assert!(f.scene.is_empty());
        assert_eq!(f.manager.apply_damage(id, 10.0), DamageOutcome::AlreadyDead);
    }

    #[test]
    fn test_clear_releases_every_body_once() {
        let mut f = fixture();
        f.manager.spawn_all(0.0, &mut f.physics, &mut f.scene, &mut f.rng);
        f.manager.clear(&mut f.physics, &mut f.scene);
        assert_eq!(f.physics.body_count(), 0);
        assert!(f.targets.borrow().is_empty());
        assert!(f.manager.is_empty());
    }

    #[test]
    fn test_missing_run_clip_degrades() {
        let mut f = fixture();
        // enemy_002 ships without a run clip
        let id = f
            .manager
            .spawn(EnemyKind::Enemy002, Vec3::ZERO, 0.0, &mut f.physics, &mut f.scene, &mut f.rng)
            .unwrap();
        for frame in 1..=600 {
            let now = f64::from(frame) / 60.0;
            f.manager.update(now, 1.0 / 60.0, &mut f.physics, &mut f.scene, &mut f.rng);
            let enemy = f.manager.get(id).unwrap();
            assert_eq!(enemy.animation.current(), Some(AnimationKind::Idle));
        }
    }
}
