//! Time-driven visual effects
//!
//! Each effect is a tagged variant advanced once per tick from its creation
//! timestamp. Removal waits until every particle, piece or ring has
//! finished. Per-instance materials are released on removal; the shared
//! geometries and materials created in [`EffectManager::new`] never are.

use glam::{Quat, Vec3};
use rand::Rng;

use super::resources::{ResourceArena, ResourceKind, ResourceSet, SharedResource};
use super::scene::{NodeId, NodeKind, Scene};
use crate::config::EffectConfig;
use crate::consts::{PARTICLE_GRACE, WAVE_FIELD_GRACE};
use crate::physics::Transform;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub position: Vec3,
    pub velocity: Vec3,
    /// Start delay after the effect's creation
    pub delay: f32,
    pub visible: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DebrisPiece {
    pub position: Vec3,
    pub velocity: Vec3,
    pub rotation: Quat,
    pub angular_velocity: Vec3,
    pub bounces: u32,
    pub visible: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveRing {
    pub spawn_time: f64,
    pub scale: f32,
    /// World radius: `scale * wave_radius`
    pub radius: f32,
    pub opacity: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BurstStyle {
    /// Falls under gravity
    Impact,
    /// Flies straight
    Spark,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EffectKind {
    Burst {
        style: BurstStyle,
        particles: Vec<Particle>,
        lifetime: f32,
    },
    Debris {
        pieces: Vec<DebrisPiece>,
    },
    CrossBurst {
        opacity: f32,
    },
    WaveField {
        rings: Vec<WaveRing>,
        /// Fixed at creation: last ring's end plus grace
        removal_time: f64,
    },
    FieldPlane {
        opacity: f32,
    },
}

#[derive(Debug)]
pub struct Effect {
    pub id: u32,
    pub origin: Vec3,
    pub created_at: f64,
    pub kind: EffectKind,
    node: Option<NodeId>,
    resources: ResourceSet,
}

/// Cross burst opacity for `ratio` = elapsed / lifetime
pub fn cross_envelope(ratio: f32, fade_in: f32, fade_out: f32, peak: f32) -> f32 {
    if ratio < 0.0 || ratio >= 1.0 {
        0.0
    } else if ratio < fade_in {
        peak * ratio / fade_in
    } else if ratio < 1.0 - fade_out {
        peak
    } else {
        peak * (1.0 - ratio) / fade_out
    }
}

/// Field plane opacity: full until `hold`, then linear to zero
pub fn field_envelope(ratio: f32, hold: f32) -> f32 {
    if ratio < hold {
        1.0
    } else {
        ((1.0 - ratio) / (1.0 - hold).max(f32::EPSILON)).clamp(0.0, 1.0)
    }
}

/// Ring scale and opacity at `local` seconds into its own life
pub fn ring_state(local: f32, duration: f32, start_scale: f32, fade_tail: f32) -> (f32, f32) {
    if local < 0.0 {
        return (start_scale, 0.0);
    }
    if local >= duration {
        return (1.0, 0.0);
    }
    let progress = local / duration;
    let scale = start_scale + (1.0 - start_scale) * progress;
    let opacity = if progress < 1.0 - fade_tail {
        1.0
    } else {
        (1.0 - progress) / fade_tail
    };
    (scale, opacity)
}

fn random_unit(rng: &mut impl Rng) -> Vec3 {
    let z: f32 = rng.random_range(-1.0..=1.0);
    let theta: f32 = rng.random_range(0.0..std::f32::consts::TAU);
    let r = (1.0 - z * z).max(0.0).sqrt();
    Vec3::new(r * theta.cos(), z, r * theta.sin())
}

impl Effect {
    /// Step the effect; true once it is finished
    fn advance(&mut self, now: f64, dt: f32, cfg: &EffectConfig) -> bool {
        let age = now - self.created_at;
        let t = age as f32;

        match &mut self.kind {
            EffectKind::Burst {
                style,
                particles,
                lifetime,
            } => {
                let mut last_end = 0.0f32;
                for p in particles.iter_mut() {
                    last_end = last_end.max(p.delay + *lifetime);
                    let local = t - p.delay;
                    if local < 0.0 {
                        continue;
                    }
                    if local >= *lifetime {
                        p.visible = false;
                        continue;
                    }
                    if *style == BurstStyle::Impact {
                        p.velocity.y -= cfg.gravity * dt;
                    }
                    p.position += p.velocity * dt;
                }
                age >= f64::from(last_end) + PARTICLE_GRACE
            }
            EffectKind::Debris { pieces } => {
                for piece in pieces.iter_mut().filter(|p| p.visible) {
                    piece.velocity.y -= cfg.gravity * dt;
                    piece.position += piece.velocity * dt;
                    piece.rotation =
                        (Quat::from_scaled_axis(piece.angular_velocity * dt) * piece.rotation)
                            .normalize();

                    if piece.position.y <= cfg.ground_level && piece.velocity.y < 0.0 {
                        piece.position.y = cfg.ground_level;
                        piece.bounces += 1;
                        if piece.bounces >= cfg.debris_max_bounces {
                            piece.velocity = Vec3::ZERO;
                            piece.angular_velocity = Vec3::ZERO;
                            piece.visible = false;
                        } else {
                            piece.velocity.y = -piece.velocity.y * cfg.debris_restitution;
                            piece.velocity.x *= cfg.debris_damping;
                            piece.velocity.z *= cfg.debris_damping;
                            piece.angular_velocity *= cfg.debris_damping;
                        }
                    }
                }
                pieces.iter().all(|p| !p.visible) || t >= cfg.debris_timeout
            }
            EffectKind::CrossBurst { opacity } => {
                *opacity = cross_envelope(
                    t / cfg.cross_lifetime,
                    cfg.cross_fade_in,
                    cfg.cross_fade_out,
                    cfg.cross_peak_opacity,
                );
                t >= cfg.cross_lifetime
            }
            EffectKind::WaveField {
                rings,
                removal_time,
            } => {
                for ring in rings.iter_mut() {
                    let local = (now - ring.spawn_time) as f32;
                    (ring.scale, ring.opacity) = ring_state(
                        local,
                        cfg.wave_ring_duration,
                        cfg.wave_start_scale,
                        cfg.wave_fade_tail,
                    );
                    ring.radius = ring.scale * cfg.wave_radius;
                }
                now >= *removal_time
            }
            EffectKind::FieldPlane { opacity } => {
                *opacity = field_envelope(t / cfg.field_duration, cfg.field_hold);
                t >= cfg.field_duration
            }
        }
    }

    /// Anything left to draw (finished parts stay hidden until removal)
    pub fn is_showing(&self) -> bool {
        match &self.kind {
            EffectKind::Burst { particles, .. } => particles.iter().any(|p| p.visible),
            EffectKind::Debris { pieces } => pieces.iter().any(|p| p.visible),
            EffectKind::CrossBurst { .. } | EffectKind::WaveField { .. } | EffectKind::FieldPlane { .. } => {
                true
            }
        }
    }

    fn dispose(self, arena: &mut ResourceArena, scene: &mut Scene) {
        if let Some(node) = self.node {
            scene.remove(node);
        }
        self.resources.dispose(arena);
    }

    /// Per-instance resources held
    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }
}

/// Shared geometries and materials, created once
#[derive(Debug)]
struct Palette {
    particle_material: SharedResource,
    debris_material: SharedResource,
    ring_material: SharedResource,
    cross_material: SharedResource,
    plane_material: SharedResource,
}

pub struct EffectManager {
    config: EffectConfig,
    effects: Vec<Effect>,
    palette: Palette,
    next_id: u32,
}

impl EffectManager {
    pub fn new(config: EffectConfig, arena: &mut ResourceArena) -> Self {
        // Geometries are shared as-is and never cloned
        for label in ["particle", "debris", "ring", "cross"] {
            arena.create_shared(ResourceKind::Geometry, label);
        }
        let palette = Palette {
            particle_material: arena.create_shared(ResourceKind::Material, "particle"),
            debris_material: arena.create_shared(ResourceKind::Material, "debris"),
            ring_material: arena.create_shared(ResourceKind::Material, "ring"),
            cross_material: arena.create_shared(ResourceKind::Material, "cross"),
            plane_material: arena.create_shared(ResourceKind::Material, "field_plane"),
        };
        Self {
            config,
            effects: Vec::new(),
            palette,
            next_id: 0,
        }
    }

    fn push(
        &mut self,
        origin: Vec3,
        now: f64,
        kind: EffectKind,
        resources: ResourceSet,
        scene: &mut Scene,
    ) -> u32 {
        self.next_id += 1;
        let node = scene.add(NodeKind::Effect, Transform::from_translation(origin));
        self.effects.push(Effect {
            id: self.next_id,
            origin,
            created_at: now,
            kind,
            node: Some(node),
            resources,
        });
        self.next_id
    }

    fn burst(
        &mut self,
        style: BurstStyle,
        origin: Vec3,
        normal: Option<Vec3>,
        now: f64,
        rng: &mut impl Rng,
        arena: &mut ResourceArena,
        scene: &mut Scene,
    ) -> u32 {
        let cfg = &self.config;
        let (count, speed, lifetime) = match style {
            BurstStyle::Impact => (cfg.impact_particles, cfg.impact_speed, cfg.impact_lifetime),
            BurstStyle::Spark => (cfg.spark_particles, cfg.spark_speed, cfg.spark_lifetime),
        };
        let particles = (0..count)
            .map(|_| {
                let dir = match normal {
                    // Hemisphere around the surface normal
                    Some(n) => (random_unit(rng) + n).try_normalize().unwrap_or(n),
                    None => random_unit(rng),
                };
                Particle {
                    position: origin,
                    velocity: dir * speed * rng.random_range(0.5..=1.0),
                    delay: cfg.particle_stagger * rng.random::<f32>(),
                    visible: true,
                }
            })
            .collect();

        let mut resources = ResourceSet::new();
        resources.push(arena.clone_shared(&self.palette.particle_material));
        let kind = EffectKind::Burst {
            style,
            particles,
            lifetime,
        };
        self.push(origin, now, kind, resources, scene)
    }

    /// Falling particles where a beam hit a surface
    pub fn spawn_impact(
        &mut self,
        origin: Vec3,
        normal: Vec3,
        now: f64,
        rng: &mut impl Rng,
        arena: &mut ResourceArena,
        scene: &mut Scene,
    ) -> u32 {
        let normal = normal.try_normalize().unwrap_or(Vec3::Y);
        self.burst(BurstStyle::Impact, origin, Some(normal), now, rng, arena, scene)
    }

    /// Straight-flying sparks in all directions
    pub fn spawn_sparks(
        &mut self,
        origin: Vec3,
        now: f64,
        rng: &mut impl Rng,
        arena: &mut ResourceArena,
        scene: &mut Scene,
    ) -> u32 {
        self.burst(BurstStyle::Spark, origin, None, now, rng, arena, scene)
    }

    /// Bouncing chunks
    pub fn spawn_debris(
        &mut self,
        origin: Vec3,
        now: f64,
        rng: &mut impl Rng,
        arena: &mut ResourceArena,
        scene: &mut Scene,
    ) -> u32 {
        let cfg = &self.config;
        let pieces = (0..cfg.debris_pieces)
            .map(|_| {
                let mut dir = random_unit(rng);
                dir.y = dir.y.abs();
                DebrisPiece {
                    position: origin,
                    velocity: dir * cfg.debris_speed * rng.random_range(0.5..=1.0),
                    rotation: Quat::IDENTITY,
                    angular_velocity: random_unit(rng) * rng.random_range(2.0..=8.0),
                    bounces: 0,
                    visible: true,
                }
            })
            .collect();

        let mut resources = ResourceSet::new();
        resources.push(arena.clone_shared(&self.palette.debris_material));
        self.push(origin, now, EffectKind::Debris { pieces }, resources, scene)
    }

    /// Power-up flash
    pub fn spawn_cross_burst(
        &mut self,
        origin: Vec3,
        now: f64,
        arena: &mut ResourceArena,
        scene: &mut Scene,
    ) -> u32 {
        let mut resources = ResourceSet::new();
        resources.push(arena.clone_shared(&self.palette.cross_material));
        self.push(origin, now, EffectKind::CrossBurst { opacity: 0.0 }, resources, scene)
    }

    /// Staggered expanding rings
    pub fn spawn_wave_field(
        &mut self,
        origin: Vec3,
        now: f64,
        arena: &mut ResourceArena,
        scene: &mut Scene,
    ) -> u32 {
        let cfg = &self.config;
        let interval = f64::from(cfg.wave_interval);
        let rings: Vec<_> = (0..cfg.wave_rings)
            .map(|i| WaveRing {
                spawn_time: now + f64::from(i) * interval,
                scale: cfg.wave_start_scale,
                radius: cfg.wave_start_scale * cfg.wave_radius,
                opacity: 0.0,
            })
            .collect();
        let last_spawn = rings.last().map(|r| r.spawn_time).unwrap_or(now);
        let removal_time = last_spawn + f64::from(cfg.wave_ring_duration) + WAVE_FIELD_GRACE;

        let mut resources = ResourceSet::new();
        for _ in &rings {
            resources.push(arena.clone_shared(&self.palette.ring_material));
        }
        let kind = EffectKind::WaveField {
            rings,
            removal_time,
        };
        self.push(origin, now, kind, resources, scene)
    }

    /// Flat field under the character on power-up
    pub fn spawn_field_plane(
        &mut self,
        origin: Vec3,
        now: f64,
        arena: &mut ResourceArena,
        scene: &mut Scene,
    ) -> u32 {
        let mut resources = ResourceSet::new();
        resources.push(arena.create_owned(ResourceKind::Geometry, "field_plane"));
        resources.push(arena.clone_shared(&self.palette.plane_material));
        self.push(origin, now, EffectKind::FieldPlane { opacity: 1.0 }, resources, scene)
    }

    /// Advance all effects and dispose the finished ones
    pub fn update(&mut self, now: f64, dt: f32, arena: &mut ResourceArena, scene: &mut Scene) {
        for index in (0..self.effects.len()).rev() {
            let effect = &mut self.effects[index];
            if effect.advance(now, dt, &self.config) {
                let effect = self.effects.remove(index);
                log::debug!("Effect {} finished", effect.id);
                effect.dispose(arena, scene);
            } else if let Some(node) = effect.node {
                scene.set_visible(node, effect.is_showing());
            }
        }
    }

    /// Dispose everything
    pub fn clear(&mut self, arena: &mut ResourceArena, scene: &mut Scene) {
        for effect in self.effects.drain(..) {
            effect.dispose(arena, scene);
        }
    }

    pub fn get(&self, id: u32) -> Option<&Effect> {
        self.effects.iter().find(|e| e.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Effect> {
        self.effects.iter()
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    pub fn config(&self) -> &EffectConfig {
        &self.config
    }
}
