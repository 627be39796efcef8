//! Beams and rings
//!
//! Beams move along their direction and raycast the distance they cover
//! each tick. Each hit goes to a [`HitHandler`], which answers with a
//! [`HitResponse`]:
//! - `StopAndAdjust`: the beam halts at the hit and is removed after the
//!   post-hit display time
//! - `DestroyTargetAndContinue`: the target is remembered so this beam never
//!   reports it again, and the beam keeps going
//! - `Ignore`: nothing happens
//!
//! Standard beams sweep a fan of rays across their width and height. Spiral
//! beams sweep one ray starting a little behind their leading edge. Rings are
//! decorative and never collide.

use std::collections::{HashMap, HashSet};
use std::f32::consts::TAU;

use glam::{Quat, Vec3};

use super::resources::{ResourceArena, ResourceKind, ResourceSet, SharedResource};
use super::scene::{NodeId, NodeKind, Scene};
use super::targets::{RaycastTargets, TargetId};
use crate::config::{BeamConfig, PowerLevelConfig, RingConfig, SpiralConfig};
use crate::consts::{POST_HIT_DISPLAY_DURATION, SPIRAL_RAY_BACKOFF, groups};
use crate::physics::{BodyHandle, PhysicsBridge, RayFilter, RayHit, Transform};

/// Beam parameters at the character's current power level
#[derive(Debug, Clone, PartialEq)]
pub struct BeamSpec {
    pub spiral: bool,
    pub damage: f32,
    pub speed: f32,
    pub length: f32,
    pub width: f32,
    pub height: f32,
    pub rays_horizontal: u32,
    pub rays_vertical: u32,
    pub lifetime: f32,
}

impl BeamSpec {
    pub fn standard(beam: &BeamConfig) -> Self {
        Self {
            spiral: false,
            damage: beam.damage,
            speed: beam.speed,
            length: beam.length,
            width: beam.width,
            height: beam.height,
            rays_horizontal: beam.rays_horizontal,
            rays_vertical: beam.rays_vertical,
            lifetime: beam.lifetime,
        }
    }

    pub fn for_level(level: &PowerLevelConfig, beam: &BeamConfig, spiral: &SpiralConfig) -> Self {
        let (length, lifetime) = if level.spiral {
            (spiral.length, spiral.lifetime)
        } else {
            (beam.length, beam.lifetime)
        };
        Self {
            spiral: level.spiral,
            damage: level.beam_damage,
            speed: level.beam_speed,
            length,
            width: level.beam_width,
            height: level.beam_height,
            rays_horizontal: level.rays_horizontal.max(1),
            rays_vertical: level.rays_vertical.max(1),
            lifetime,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProjectileKind {
    StandardBeam,
    SpiralBeam,
    Ring,
}

/// Answer from the hit handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitResponse {
    StopAndAdjust,
    DestroyTargetAndContinue,
    Ignore,
}

/// One beam intersection handed to the [`HitHandler`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeamHit {
    pub projectile: u32,
    pub kind: ProjectileKind,
    pub target: TargetId,
    pub point: Vec3,
    pub normal: Vec3,
    /// Distance ahead of the beam's leading edge
    pub distance: f32,
    /// Where the beam was fired from
    pub origin: Vec3,
    pub direction: Vec3,
    pub damage: f32,
    pub ray: RayHit,
}

/// Collision-outcome logic supplied by the game
pub trait HitHandler {
    fn on_hit(&mut self, hit: &BeamHit) -> HitResponse;
}

#[derive(Debug)]
pub struct Projectile {
    pub id: u32,
    pub kind: ProjectileKind,
    pub origin: Vec3,
    /// Leading edge
    pub position: Vec3,
    pub direction: Vec3,
    pub speed: f32,
    pub created_at: f64,
    pub lifetime: f32,
    pub damage: f32,
    pub length: f32,
    pub width: f32,
    pub height: f32,
    pub rays_horizontal: u32,
    pub rays_vertical: u32,
    /// Drawn length, shortened when the beam stops early
    pub visual_length: f32,
    pub has_hit: bool,
    pub hit_time: Option<f64>,
    /// Ring radius
    pub radius: f32,
    /// Spiral strand polylines, rebuilt every tick
    pub strands: Vec<Vec<Vec3>>,
    shooter: Option<BodyHandle>,
    destroyed: HashSet<TargetId>,
    node: Option<NodeId>,
    resources: ResourceSet,
}

impl Projectile {
    fn expired(&self, now: f64) -> bool {
        now - self.created_at > f64::from(self.lifetime)
            || self
                .hit_time
                .is_some_and(|hit| now - hit >= POST_HIT_DISPLAY_DURATION)
    }

    /// Halt `distance` ahead of the leading edge
    fn stop_at(&mut self, distance: f32, now: f64) {
        self.position += self.direction * distance;
        self.speed = 0.0;
        self.has_hit = true;
        self.hit_time = Some(now);
        self.visual_length = self.traveled().min(self.length);
    }

    fn traveled(&self) -> f32 {
        (self.position - self.origin).length()
    }

    /// Back end of the drawn beam
    pub fn tail(&self) -> Vec3 {
        self.position - self.direction * self.visual_length
    }

    /// Whether this beam already destroyed `target`
    pub fn has_destroyed(&self, target: TargetId) -> bool {
        self.destroyed.contains(&target)
    }

    fn ray_filter(&self) -> RayFilter {
        RayFilter {
            group: groups::CHARACTER,
            mask: groups::BEAM_MASK,
            ignore: self.shooter,
        }
    }

    /// Fan hits over this tick's travel, nearest per target, in distance order
    fn fan_hits(
        &self,
        travel: f32,
        physics: &PhysicsBridge,
        targets: &RaycastTargets,
    ) -> Vec<(TargetId, RayHit, f32)> {
        let (right, up) = beam_basis(self.direction);
        let spread = |count: u32, extent: f32, i: u32| {
            if count <= 1 {
                0.0
            } else {
                (i as f32 / (count - 1) as f32 - 0.5) * extent
            }
        };

        let mut nearest: HashMap<TargetId, RayHit> = HashMap::new();
        for i in 0..self.rays_horizontal {
            for j in 0..self.rays_vertical {
                let offset = right * spread(self.rays_horizontal, self.width, i)
                    + up * spread(self.rays_vertical, self.height, j);
                let from = self.position + offset;
                let to = from + self.direction * travel;
                for hit in physics.raycast_all(from, to, self.ray_filter()) {
                    let Some(target) = targets.lookup(hit.body) else {
                        continue;
                    };
                    if self.destroyed.contains(&target) {
                        continue;
                    }
                    nearest
                        .entry(target)
                        .and_modify(|best| {
                            if hit.distance < best.distance {
                                *best = hit;
                            }
                        })
                        .or_insert(hit);
                }
            }
        }

        let mut hits: Vec<_> = nearest
            .into_iter()
            .map(|(target, hit)| (target, hit, hit.distance))
            .collect();
        hits.sort_by(|a, b| a.2.total_cmp(&b.2));
        hits
    }

    /// Single ray from behind the leading edge, capped at the beam length
    fn spiral_hits(
        &self,
        travel: f32,
        physics: &PhysicsBridge,
        targets: &RaycastTargets,
    ) -> Vec<(TargetId, RayHit, f32)> {
        let backoff = self.length * SPIRAL_RAY_BACKOFF;
        let from = self.position - self.direction * backoff;
        let reach = (travel + backoff).min(self.length);
        let to = from + self.direction * reach;

        physics
            .raycast_all(from, to, self.ray_filter())
            .into_iter()
            .filter_map(|hit| {
                let target = targets.lookup(hit.body)?;
                (!self.destroyed.contains(&target))
                    .then_some((target, hit, (hit.distance - backoff).max(0.0)))
            })
            .fold(Vec::new(), |mut hits: Vec<(TargetId, RayHit, f32)>, hit| {
                // Already nearest-first; keep the first hit per target
                if !hits.iter().any(|h| h.0 == hit.0) {
                    hits.push(hit);
                }
                hits
            })
    }
}

/// Right and up vectors across a beam
fn beam_basis(direction: Vec3) -> (Vec3, Vec3) {
    let right = direction.cross(Vec3::Y).try_normalize().unwrap_or(Vec3::X);
    let up = right.cross(direction).normalize_or_zero();
    (right, up)
}

/// Helical strands wound around the beam axis
///
/// Strand `s` at distance `d` behind the leading edge sits at angle
/// `rotation_speed * age + d * TAU / pitch + s * TAU / strands`.
pub fn spiral_strands(
    leading_edge: Vec3,
    direction: Vec3,
    length: f32,
    age: f32,
    cfg: &SpiralConfig,
) -> Vec<Vec<Vec3>> {
    let (right, up) = beam_basis(direction);
    let points = cfg.points_per_strand.max(2);
    let pitch = cfg.pitch.max(f32::EPSILON);
    let strands = cfg.strands.max(1);

    (0..strands)
        .map(|s| {
            let phase = s as f32 * TAU / strands as f32;
            (0..points)
                .map(|k| {
                    let d = length * k as f32 / (points - 1) as f32;
                    let angle = cfg.rotation_speed * age + d * TAU / pitch + phase;
                    leading_edge - direction * d
                        + (right * angle.cos() + up * angle.sin()) * cfg.strand_radius
                })
                .collect()
        })
        .collect()
}

/// Shared materials and geometries for projectiles
#[derive(Debug)]
struct Palette {
    beam_material: SharedResource,
    spiral_material: SharedResource,
    ring_material: SharedResource,
}

pub struct ProjectileManager {
    spiral: SpiralConfig,
    ring: RingConfig,
    projectiles: Vec<Projectile>,
    palette: Palette,
    next_id: u32,
}

impl ProjectileManager {
    pub fn new(spiral: SpiralConfig, ring: RingConfig, arena: &mut ResourceArena) -> Self {
        arena.create_shared(ResourceKind::Geometry, "ring");
        let palette = Palette {
            beam_material: arena.create_shared(ResourceKind::Material, "beam"),
            spiral_material: arena.create_shared(ResourceKind::Material, "spiral"),
            ring_material: arena.create_shared(ResourceKind::Material, "ring"),
        };
        Self {
            spiral,
            ring,
            projectiles: Vec::new(),
            palette,
            next_id: 0,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn push(
        &mut self,
        kind: ProjectileKind,
        origin: Vec3,
        direction: Vec3,
        speed: f32,
        lifetime: f32,
        now: f64,
        resources: ResourceSet,
        scene: &mut Scene,
    ) -> &mut Projectile {
        self.next_id += 1;
        let node_kind = match kind {
            ProjectileKind::Ring => NodeKind::Ring,
            _ => NodeKind::Beam,
        };
        let node = scene.add(node_kind, projectile_transform(origin, direction));
        self.projectiles.push(Projectile {
            id: self.next_id,
            kind,
            origin,
            position: origin,
            direction,
            speed,
            created_at: now,
            lifetime,
            damage: 0.0,
            length: 0.0,
            width: 0.0,
            height: 0.0,
            rays_horizontal: 1,
            rays_vertical: 1,
            visual_length: 0.0,
            has_hit: false,
            hit_time: None,
            radius: 0.0,
            strands: Vec::new(),
            shooter: None,
            destroyed: HashSet::new(),
            node: Some(node),
            resources,
        });
        let index = self.projectiles.len() - 1;
        &mut self.projectiles[index]
    }

    /// Launch a standard or spiral beam (per `spec.spiral`)
    #[allow(clippy::too_many_arguments)]
    pub fn fire_beam(
        &mut self,
        origin: Vec3,
        direction: Vec3,
        spec: &BeamSpec,
        shooter: Option<BodyHandle>,
        now: f64,
        arena: &mut ResourceArena,
        scene: &mut Scene,
    ) -> u32 {
        let direction = direction.try_normalize().unwrap_or(Vec3::Z);
        let mut resources = ResourceSet::new();
        resources.push(arena.create_owned(ResourceKind::Geometry, "beam_core"));
        let kind = if spec.spiral {
            resources.push(arena.clone_shared(&self.palette.spiral_material));
            for _ in 0..self.spiral.strands.max(1) {
                resources.push(arena.create_owned(ResourceKind::Geometry, "spiral_tube"));
            }
            ProjectileKind::SpiralBeam
        } else {
            resources.push(arena.clone_shared(&self.palette.beam_material));
            ProjectileKind::StandardBeam
        };

        let beam = self.push(kind, origin, direction, spec.speed, spec.lifetime, now, resources, scene);
        beam.damage = spec.damage;
        beam.length = spec.length;
        beam.width = spec.width;
        beam.height = spec.height;
        beam.rays_horizontal = spec.rays_horizontal.max(1);
        beam.rays_vertical = spec.rays_vertical.max(1);
        beam.shooter = shooter;
        beam.id
    }

    /// Launch a decorative ring
    pub fn fire_ring(
        &mut self,
        origin: Vec3,
        direction: Vec3,
        now: f64,
        arena: &mut ResourceArena,
        scene: &mut Scene,
    ) -> u32 {
        let direction = direction.try_normalize().unwrap_or(Vec3::Z);
        let mut resources = ResourceSet::new();
        resources.push(arena.clone_shared(&self.palette.ring_material));
        let (speed, lifetime, radius) = (self.ring.speed, self.ring.lifetime, self.ring.start_radius);
        let ring = self.push(ProjectileKind::Ring, origin, direction, speed, lifetime, now, resources, scene);
        ring.radius = radius;
        ring.id
    }

    /// Move every projectile and resolve beam hits through `handler`
    pub fn update(
        &mut self,
        now: f64,
        dt: f32,
        physics: &PhysicsBridge,
        targets: &RaycastTargets,
        handler: &mut impl HitHandler,
    ) {
        for p in &mut self.projectiles {
            let age = (now - p.created_at) as f32;

            if p.kind == ProjectileKind::Ring {
                p.position += p.direction * p.speed * dt;
                p.radius = self.ring.start_radius + self.ring.growth * age;
                continue;
            }

            if !p.has_hit {
                let travel = p.speed * dt;
                let hits = match p.kind {
                    ProjectileKind::SpiralBeam => p.spiral_hits(travel, physics, targets),
                    _ => p.fan_hits(travel, physics, targets),
                };

                let mut stopped = false;
                for (target, ray, distance) in hits {
                    let hit = BeamHit {
                        projectile: p.id,
                        kind: p.kind,
                        target,
                        point: ray.point,
                        normal: ray.normal,
                        distance,
                        origin: p.origin,
                        direction: p.direction,
                        damage: p.damage,
                        ray,
                    };
                    match handler.on_hit(&hit) {
                        HitResponse::StopAndAdjust => {
                            p.stop_at(distance, now);
                            stopped = true;
                            break;
                        }
                        HitResponse::DestroyTargetAndContinue => {
                            p.destroyed.insert(target);
                        }
                        HitResponse::Ignore => {}
                    }
                }

                if !stopped {
                    p.position += p.direction * travel;
                    p.visual_length = p.traveled().min(p.length);
                }
            }

            if p.kind == ProjectileKind::SpiralBeam {
                p.strands = spiral_strands(p.position, p.direction, p.visual_length, age, &self.spiral);
            }
        }
    }

    /// Remove expired projectiles and push transforms to the scene
    pub fn finish_tick(&mut self, now: f64, arena: &mut ResourceArena, scene: &mut Scene) {
        for index in (0..self.projectiles.len()).rev() {
            if self.projectiles[index].expired(now) {
                let projectile = self.projectiles.remove(index);
                dispose(projectile, arena, scene);
            } else {
                let p = &self.projectiles[index];
                if let Some(node) = p.node {
                    scene.set_transform(node, projectile_transform(p.position, p.direction));
                }
            }
        }
    }

    /// Dispose everything
    pub fn clear(&mut self, arena: &mut ResourceArena, scene: &mut Scene) {
        for projectile in self.projectiles.drain(..) {
            dispose(projectile, arena, scene);
        }
    }

    pub fn get(&self, id: u32) -> Option<&Projectile> {
        self.projectiles.iter().find(|p| p.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Projectile> {
        self.projectiles.iter()
    }

    pub fn len(&self) -> usize {
        self.projectiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projectiles.is_empty()
    }
}

fn projectile_transform(position: Vec3, direction: Vec3) -> Transform {
    Transform {
        translation: position,
        rotation: Quat::from_rotation_arc(Vec3::Z, direction),
    }
}

fn dispose(projectile: Projectile, arena: &mut ResourceArena, scene: &mut Scene) {
    if let Some(node) = projectile.node {
        scene.remove(node);
    }
    projectile.resources.dispose(arena);
}
