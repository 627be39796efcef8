//! rapier3d physics bridge
//!
//! [`PhysicsBridge`] owns the rigid-body world and is the only code that
//! touches rapier types. Everything crossing this boundary is glam
//! [`Vec3`]/[`Quat`] or an opaque [`BodyHandle`].
//!
//! The bridge is the authoritative owner of every body. Actors keep a handle
//! as a non-owning reference and give it back through [`PhysicsBridge::remove_body`]
//! exactly once; rapier's generational handles make a second removal (or any
//! later query) fail instead of touching a recycled slot.

use glam::{Quat, Vec3};
use rapier3d::na;
use rapier3d::prelude::*;

use crate::error::PhysicsError;

/// Opaque reference to a rigid body owned by the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyHandle(RigidBodyHandle);

/// World-space placement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
}

impl Transform {
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            rotation: Quat::IDENTITY,
        }
    }
}

/// Surface response shared by every collider kind
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Surface {
    pub friction: f32,
    pub restitution: f32,
    /// Collision-group membership bits (see `consts::groups`)
    pub group: u32,
}

/// Source geometry for static tri-mesh colliders
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    /// Vertex positions in mesh-local space
    pub vertices: Vec<Vec3>,
    /// Triangle list; `None` when the source mesh is not indexed
    pub indices: Option<Vec<u32>>,
}

/// Raycast filtering
#[derive(Debug, Clone, Copy)]
pub struct RayFilter {
    /// Group the ray belongs to
    pub group: u32,
    /// Groups the ray may hit
    pub mask: u32,
    /// Body that never reports a hit (the shooter)
    pub ignore: Option<BodyHandle>,
}

impl Default for RayFilter {
    fn default() -> Self {
        Self {
            group: u32::MAX,
            mask: u32::MAX,
            ignore: None,
        }
    }
}

/// A raycast intersection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub point: Vec3,
    pub normal: Vec3,
    pub body: BodyHandle,
    /// Distance from the ray origin
    pub distance: f32,
}

/// rapier state, present once the bridge is initialized
struct World {
    pipeline: PhysicsPipeline,
    gravity: Vector<Real>,
    integration_params: IntegrationParameters,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    rigid_body_set: RigidBodySet,
    collider_set: ColliderSet,
    impulse_joint_set: ImpulseJointSet,
    multibody_joint_set: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
    /// Unsimulated time carried to the next step
    accumulator: f32,
}

impl World {
    fn new(gravity: Vec3) -> Self {
        Self {
            pipeline: PhysicsPipeline::new(),
            gravity: to_vector(gravity),
            integration_params: IntegrationParameters::default(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            accumulator: 0.0,
        }
    }

    fn insert(&mut self, body: RigidBody, collider: Collider) -> BodyHandle {
        let handle = self.rigid_body_set.insert(body);
        self.collider_set
            .insert_with_parent(collider, handle, &mut self.rigid_body_set);
        // Raycasts issued before the next step must already see the new collider
        self.query_pipeline.update(&self.collider_set);
        BodyHandle(handle)
    }

    fn step_once(&mut self, dt: f32) {
        self.integration_params.dt = dt;
        self.pipeline.step(
            &self.gravity,
            &self.integration_params,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
    }
}

/// Stateful wrapper around the rapier world
#[derive(Default)]
pub struct PhysicsBridge {
    world: Option<World>,
}

impl PhysicsBridge {
    /// Create an uninitialized bridge; every creation call fails until [`init`](Self::init)
    pub fn new() -> Self {
        Self { world: None }
    }

    /// Create and initialize in one go
    pub fn with_gravity(gravity: Vec3) -> Self {
        let mut bridge = Self::new();
        bridge.init(gravity);
        bridge
    }

    /// Build the simulation world (replaces any previous one)
    pub fn init(&mut self, gravity: Vec3) {
        self.world = Some(World::new(gravity));
        log::info!("Physics world initialized (gravity {:?})", gravity);
    }

    pub fn is_initialized(&self) -> bool {
        self.world.is_some()
    }

    fn world(&self) -> Result<&World, PhysicsError> {
        self.world.as_ref().ok_or(PhysicsError::NotInitialized)
    }

    fn world_mut(&mut self) -> Result<&mut World, PhysicsError> {
        self.world.as_mut().ok_or(PhysicsError::NotInitialized)
    }

    /// Dynamic capsule standing on `origin_foot`
    ///
    /// The collider is centered at `origin_foot.y + height / 2` and may only
    /// rotate about Y, so actors never tip over.
    pub fn create_capsule_body(
        &mut self,
        origin_foot: Vec3,
        height: f32,
        radius: f32,
        mass: f32,
        surface: Surface,
    ) -> Result<BodyHandle, PhysicsError> {
        let world = self.world_mut()?;
        if height <= 0.0 || radius <= 0.0 || mass <= 0.0 {
            return Err(PhysicsError::InvalidShape(format!(
                "capsule height={height} radius={radius} mass={mass}"
            )));
        }

        // Capsule half-height counts the cylinder part only
        let half_segment = ((height - 2.0 * radius) / 2.0).max(0.0);
        let center = origin_foot + Vec3::Y * (height / 2.0);

        let body = RigidBodyBuilder::dynamic()
            .translation(to_vector(center))
            .enabled_rotations(false, true, false)
            .build();
        let collider = with_surface(ColliderBuilder::capsule_y(half_segment, radius), surface)
            .mass(mass)
            .build();

        Ok(world.insert(body, collider))
    }

    /// Immovable box (walls, floor, crates)
    pub fn create_static_box_body(
        &mut self,
        transform: Transform,
        half_extents: Vec3,
        surface: Surface,
    ) -> Result<BodyHandle, PhysicsError> {
        let world = self.world_mut()?;
        if half_extents.min_element() <= 0.0 {
            return Err(PhysicsError::InvalidShape(format!(
                "box half extents {half_extents:?}"
            )));
        }

        let body = RigidBodyBuilder::fixed()
            .position(to_isometry(&transform))
            .build();
        let collider = with_surface(
            ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z),
            surface,
        )
        .build();

        Ok(world.insert(body, collider))
    }

    /// Immovable ball (destructible spheres)
    pub fn create_static_sphere_body(
        &mut self,
        center: Vec3,
        radius: f32,
        surface: Surface,
    ) -> Result<BodyHandle, PhysicsError> {
        let world = self.world_mut()?;
        if radius <= 0.0 {
            return Err(PhysicsError::InvalidShape(format!("sphere radius {radius}")));
        }

        let body = RigidBodyBuilder::fixed()
            .translation(to_vector(center))
            .build();
        let collider = with_surface(ColliderBuilder::ball(radius), surface).build();

        Ok(world.insert(body, collider))
    }

    /// Static tri-mesh for sloped or irregular geometry
    ///
    /// Meshes without usable triangle indices fall back to an oriented box
    /// around their vertices (oriented by `transform`).
    pub fn create_trimesh_body(
        &mut self,
        mesh: &MeshData,
        transform: Transform,
        surface: Surface,
    ) -> Result<BodyHandle, PhysicsError> {
        self.world()?;
        if mesh.vertices.is_empty() {
            return Err(PhysicsError::InvalidShape("tri-mesh has no vertices".into()));
        }

        let Some(triangles) = triangle_list(mesh) else {
            let (min, max) = mesh
                .vertices
                .iter()
                .fold((Vec3::splat(f32::MAX), Vec3::splat(f32::MIN)), |(lo, hi), v| {
                    (lo.min(*v), hi.max(*v))
                });
            // Flat meshes still need some thickness
            let half_extents = ((max - min) / 2.0).max(Vec3::splat(0.01));
            let local_center = (min + max) / 2.0;
            log::debug!("Mesh has no indexed triangles, using bounding box {half_extents:?}");
            let obb = Transform {
                translation: transform.translation + transform.rotation * local_center,
                rotation: transform.rotation,
            };
            return self.create_static_box_body(obb, half_extents, surface);
        };

        let world = self.world_mut()?;
        let vertices = mesh.vertices.iter().map(|v| to_point(*v)).collect();
        let body = RigidBodyBuilder::fixed()
            .position(to_isometry(&transform))
            .build();
        let collider = with_surface(ColliderBuilder::trimesh(vertices, triangles), surface).build();

        Ok(world.insert(body, collider))
    }

    /// Advance the world by `delta` seconds using fixed substeps
    ///
    /// Runs at most `max_sub_steps` steps of `fixed_time_step`; leftover time
    /// beyond the cap is dropped. Returns the number of steps taken.
    pub fn step_simulation(
        &mut self,
        delta: f32,
        max_sub_steps: u32,
        fixed_time_step: f32,
    ) -> Result<u32, PhysicsError> {
        let world = self.world_mut()?;
        if fixed_time_step <= 0.0 {
            return Ok(0);
        }

        world.accumulator += delta.max(0.0);
        let mut steps = 0;
        while world.accumulator >= fixed_time_step && steps < max_sub_steps {
            world.step_once(fixed_time_step);
            world.accumulator -= fixed_time_step;
            steps += 1;
        }
        if steps == max_sub_steps {
            world.accumulator = world.accumulator.min(fixed_time_step);
        }
        Ok(steps)
    }

    /// Current body placement (center of mass for capsules)
    pub fn body_transform(&self, handle: BodyHandle) -> Option<Transform> {
        let body = self.world().ok()?.rigid_body_set.get(handle.0)?;
        Some(Transform {
            translation: from_vector(body.translation()),
            rotation: from_rotation(body.rotation()),
        })
    }

    pub fn linear_velocity(&self, handle: BodyHandle) -> Option<Vec3> {
        let body = self.world().ok()?.rigid_body_set.get(handle.0)?;
        Some(from_vector(body.linvel()))
    }

    pub fn set_linear_velocity(
        &mut self,
        handle: BodyHandle,
        velocity: Vec3,
    ) -> Result<(), PhysicsError> {
        let body = self
            .world_mut()?
            .rigid_body_set
            .get_mut(handle.0)
            .ok_or(PhysicsError::StaleHandle)?;
        body.set_linvel(to_vector(velocity), true);
        Ok(())
    }

    /// Closest hit on the segment `from -> to`
    pub fn raycast(&self, from: Vec3, to: Vec3, filter: RayFilter) -> Option<RayHit> {
        let world = self.world().ok()?;
        let (ray, max_distance) = segment_ray(from, to)?;
        let query = query_filter(&filter);

        let (collider, hit) = world.query_pipeline.cast_ray_and_get_normal(
            &world.rigid_body_set,
            &world.collider_set,
            &ray,
            max_distance,
            true,
            query,
        )?;
        ray_hit(world, &ray, collider, hit)
    }

    /// Every hit on the segment `from -> to`, nearest first
    pub fn raycast_all(&self, from: Vec3, to: Vec3, filter: RayFilter) -> Vec<RayHit> {
        let mut hits = Vec::new();
        let Ok(world) = self.world() else {
            return hits;
        };
        let Some((ray, max_distance)) = segment_ray(from, to) else {
            return hits;
        };

        world.query_pipeline.intersections_with_ray(
            &world.rigid_body_set,
            &world.collider_set,
            &ray,
            max_distance,
            true,
            query_filter(&filter),
            |collider, hit| {
                if let Some(hit) = ray_hit(world, &ray, collider, hit) {
                    hits.push(hit);
                }
                true
            },
        );
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }

    /// Remove a body and its colliders
    ///
    /// Fails with [`PhysicsError::StaleHandle`] if the handle was already removed.
    pub fn remove_body(&mut self, handle: BodyHandle) -> Result<(), PhysicsError> {
        let world = self.world_mut()?;
        world
            .rigid_body_set
            .remove(
                handle.0,
                &mut world.island_manager,
                &mut world.collider_set,
                &mut world.impulse_joint_set,
                &mut world.multibody_joint_set,
                true, // remove attached colliders
            )
            .ok_or(PhysicsError::StaleHandle)?;
        world.query_pipeline.update(&world.collider_set);
        Ok(())
    }

    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.world()
            .map(|w| w.rigid_body_set.contains(handle.0))
            .unwrap_or(false)
    }

    /// Number of live bodies
    pub fn body_count(&self) -> usize {
        self.world().map(|w| w.rigid_body_set.len()).unwrap_or(0)
    }
}

fn with_surface(builder: ColliderBuilder, surface: Surface) -> ColliderBuilder {
    builder
        .friction(surface.friction)
        .restitution(surface.restitution)
        .collision_groups(InteractionGroups::new(
            Group::from_bits_truncate(surface.group),
            Group::ALL,
        ))
}

fn query_filter(filter: &RayFilter) -> QueryFilter<'static> {
    let mut query = QueryFilter::new().groups(InteractionGroups::new(
        Group::from_bits_truncate(filter.group),
        Group::from_bits_truncate(filter.mask),
    ));
    if let Some(ignore) = filter.ignore {
        query = query.exclude_rigid_body(ignore.0);
    }
    query
}

/// Build a ray for a segment; `None` for degenerate segments
fn segment_ray(from: Vec3, to: Vec3) -> Option<(Ray, Real)> {
    let delta = to - from;
    let length = delta.length();
    if length <= f32::EPSILON {
        return None;
    }
    let dir = delta / length;
    Some((Ray::new(to_point(from), to_vector(dir)), length))
}

fn ray_hit(
    world: &World,
    ray: &Ray,
    collider: ColliderHandle,
    hit: RayIntersection,
) -> Option<RayHit> {
    let parent = world.collider_set.get(collider)?.parent()?;
    let point = ray.point_at(hit.time_of_impact);
    Some(RayHit {
        point: Vec3::new(point.x, point.y, point.z),
        normal: from_vector(&hit.normal),
        body: BodyHandle(parent),
        distance: hit.time_of_impact,
    })
}

/// Triangles from an indexed mesh, if the index buffer is usable
fn triangle_list(mesh: &MeshData) -> Option<Vec<[u32; 3]>> {
    let indices = mesh.indices.as_ref()?;
    let vertex_count = mesh.vertices.len() as u32;
    if indices.is_empty() || indices.len() % 3 != 0 || indices.iter().any(|&i| i >= vertex_count) {
        return None;
    }
    Some(
        indices
            .chunks_exact(3)
            .map(|tri| [tri[0], tri[1], tri[2]])
            .collect(),
    )
}

#[inline]
fn to_vector(v: Vec3) -> Vector<Real> {
    vector![v.x, v.y, v.z]
}

#[inline]
fn to_point(v: Vec3) -> Point<Real> {
    point![v.x, v.y, v.z]
}

#[inline]
fn from_vector(v: &Vector<Real>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

#[inline]
fn from_rotation(r: &na::UnitQuaternion<Real>) -> Quat {
    Quat::from_xyzw(r.i, r.j, r.k, r.w)
}

fn to_isometry(t: &Transform) -> na::Isometry3<Real> {
    let q = t.rotation.normalize();
    na::Isometry3::from_parts(
        na::Translation3::new(t.translation.x, t.translation.y, t.translation.z),
        na::UnitQuaternion::from_quaternion(na::Quaternion::new(q.w, q.x, q.y, q.z)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::groups;

    const DT: f32 = 1.0 / 60.0;

    fn surface(group: u32) -> Surface {
        Surface {
            friction: 0.5,
            restitution: 0.0,
            group,
        }
    }

    fn world_with_floor() -> PhysicsBridge {
        let mut bridge = PhysicsBridge::with_gravity(Vec3::new(0.0, -9.81, 0.0));
        bridge
            .create_static_box_body(
                Transform::from_translation(Vec3::new(0.0, -0.5, 0.0)),
                Vec3::new(50.0, 0.5, 50.0),
                surface(groups::STATIC),
            )
            .unwrap();
        bridge
    }

    #[test]
    fn test_creation_fails_closed_before_init() {
        let mut bridge = PhysicsBridge::new();
        let result = bridge.create_capsule_body(Vec3::ZERO, 1.8, 0.4, 70.0, surface(groups::CHARACTER));
        assert!(matches!(result, Err(PhysicsError::NotInitialized)));
        assert!(matches!(
            bridge.step_simulation(DT, 1, DT),
            Err(PhysicsError::NotInitialized)
        ));
        assert!(bridge.raycast(Vec3::ZERO, Vec3::X, RayFilter::default()).is_none());
        assert_eq!(bridge.body_count(), 0);
    }

    #[test]
    fn test_capsule_is_centered_above_feet() {
        let mut bridge = PhysicsBridge::with_gravity(Vec3::ZERO);
        let body = bridge
            .create_capsule_body(Vec3::new(1.0, 0.0, 2.0), 2.0, 0.5, 80.0, surface(groups::ENEMY))
            .unwrap();
        let t = bridge.body_transform(body).unwrap();
        assert!((t.translation - Vec3::new(1.0, 1.0, 2.0)).length() < 1e-5);
    }

    #[test]
    fn test_capsule_settles_on_floor() {
        let mut bridge = world_with_floor();
        let body = bridge
            .create_capsule_body(Vec3::new(0.0, 2.0, 0.0), 1.8, 0.4, 70.0, surface(groups::CHARACTER))
            .unwrap();

        for _ in 0..180 {
            bridge.step_simulation(DT, 4, DT).unwrap();
        }

        let t = bridge.body_transform(body).unwrap();
        // Center of mass rests half a height above the floor top (y = 0)
        assert!((t.translation.y - 0.9).abs() < 0.1, "y = {}", t.translation.y);
        // Rotation locked to Y: still upright
        assert!((t.rotation * Vec3::Y).dot(Vec3::Y) > 0.99);
    }

    #[test]
    fn test_remove_body_twice_is_rejected() {
        let mut bridge = world_with_floor();
        let body = bridge
            .create_capsule_body(Vec3::ZERO, 1.8, 0.4, 70.0, surface(groups::CHARACTER))
            .unwrap();
        assert_eq!(bridge.body_count(), 2);

        bridge.remove_body(body).unwrap();
        assert_eq!(bridge.body_count(), 1);
        assert!(!bridge.contains(body));
        assert!(matches!(bridge.remove_body(body), Err(PhysicsError::StaleHandle)));
        assert!(bridge.body_transform(body).is_none());
        assert!(matches!(
            bridge.set_linear_velocity(body, Vec3::X),
            Err(PhysicsError::StaleHandle)
        ));
        assert_eq!(bridge.body_count(), 1);
    }

    #[test]
    fn test_stale_handle_not_confused_with_recycled_slot() {
        let mut bridge = PhysicsBridge::with_gravity(Vec3::ZERO);
        let first = bridge
            .create_static_sphere_body(Vec3::ZERO, 1.0, surface(groups::OBSTACLE))
            .unwrap();
        bridge.remove_body(first).unwrap();
        let second = bridge
            .create_static_sphere_body(Vec3::X * 5.0, 1.0, surface(groups::OBSTACLE))
            .unwrap();

        assert!(matches!(bridge.remove_body(first), Err(PhysicsError::StaleHandle)));
        assert!(bridge.contains(second));
    }

    #[test]
    fn test_raycast_hits_box_and_honors_ignore() {
        let mut bridge = PhysicsBridge::with_gravity(Vec3::ZERO);
        let wall = bridge
            .create_static_box_body(
                Transform::from_translation(Vec3::new(0.0, 0.0, 5.0)),
                Vec3::new(1.0, 1.0, 0.5),
                surface(groups::STATIC),
            )
            .unwrap();

        let hit = bridge
            .raycast(Vec3::ZERO, Vec3::new(0.0, 0.0, 10.0), RayFilter::default())
            .unwrap();
        assert_eq!(hit.body, wall);
        assert!((hit.distance - 4.5).abs() < 1e-3);
        assert!((hit.point.z - 4.5).abs() < 1e-3);
        assert!(hit.normal.z < -0.9);

        let ignoring = RayFilter {
            ignore: Some(wall),
            ..Default::default()
        };
        assert!(bridge.raycast(Vec3::ZERO, Vec3::new(0.0, 0.0, 10.0), ignoring).is_none());

        // Segment too short to reach the wall
        assert!(bridge.raycast(Vec3::ZERO, Vec3::new(0.0, 0.0, 4.0), RayFilter::default()).is_none());
    }

    #[test]
    fn test_raycast_mask_filters_groups() {
        let mut bridge = PhysicsBridge::with_gravity(Vec3::ZERO);
        bridge
            .create_static_sphere_body(Vec3::new(0.0, 0.0, 3.0), 0.5, surface(groups::CHARACTER))
            .unwrap();
        let filter = RayFilter {
            mask: groups::BEAM_MASK,
            ..Default::default()
        };
        assert!(bridge.raycast(Vec3::ZERO, Vec3::new(0.0, 0.0, 10.0), filter).is_none());
    }

    #[test]
    fn test_raycast_all_is_sorted_by_distance() {
        let mut bridge = PhysicsBridge::with_gravity(Vec3::ZERO);
        let far = bridge
            .create_static_sphere_body(Vec3::new(0.0, 0.0, 8.0), 0.5, surface(groups::OBSTACLE))
            .unwrap();
        let near = bridge
            .create_static_sphere_body(Vec3::new(0.0, 0.0, 3.0), 0.5, surface(groups::OBSTACLE))
            .unwrap();

        let hits = bridge.raycast_all(Vec3::ZERO, Vec3::new(0.0, 0.0, 10.0), RayFilter::default());
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].body, near);
        assert_eq!(hits[1].body, far);
        assert!(hits[0].distance < hits[1].distance);
    }

    #[test]
    fn test_unindexed_mesh_falls_back_to_box() {
        let mut bridge = PhysicsBridge::with_gravity(Vec3::ZERO);
        let mesh = MeshData {
            vertices: vec![
                Vec3::new(-1.0, 0.0, -1.0),
                Vec3::new(1.0, 0.0, -1.0),
                Vec3::new(1.0, 2.0, 1.0),
                Vec3::new(-1.0, 2.0, 1.0),
            ],
            indices: None,
        };
        let body = bridge
            .create_trimesh_body(&mesh, Transform::from_translation(Vec3::new(0.0, 0.0, 5.0)), surface(groups::STATIC))
            .unwrap();

        let hit = bridge
            .raycast(Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, 1.0, 10.0), RayFilter::default())
            .unwrap();
        assert_eq!(hit.body, body);
        // Box spans z in [4, 6]
        assert!((hit.distance - 4.0).abs() < 1e-3);
    }

    #[test]
    fn test_indexed_ramp_is_hit() {
        let mut bridge = PhysicsBridge::with_gravity(Vec3::ZERO);
        let mesh = MeshData {
            vertices: vec![
                Vec3::new(-1.0, 0.0, -1.0),
                Vec3::new(1.0, 0.0, -1.0),
                Vec3::new(1.0, 2.0, 1.0),
                Vec3::new(-1.0, 2.0, 1.0),
            ],
            indices: Some(vec![0, 1, 2, 0, 2, 3]),
        };
        let body = bridge
            .create_trimesh_body(&mesh, Transform::from_translation(Vec3::ZERO), surface(groups::STATIC))
            .unwrap();
        let hit = bridge
            .raycast(Vec3::new(0.0, 5.0, 0.0), Vec3::new(0.0, -5.0, 0.0), RayFilter::default())
            .unwrap();
        assert_eq!(hit.body, body);
        // Ramp surface at z = 0 sits at height 1
        assert!((hit.point.y - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_step_caps_substeps() {
        let mut bridge = PhysicsBridge::with_gravity(Vec3::ZERO);
        assert_eq!(bridge.step_simulation(1.0, 5, DT).unwrap(), 5);
        // Leftover beyond the cap was dropped
        assert!(bridge.step_simulation(0.0, 5, DT).unwrap() <= 1);
        // Sub-step deltas accumulate
        let mut bridge = PhysicsBridge::with_gravity(Vec3::ZERO);
        assert_eq!(bridge.step_simulation(DT * 0.6, 5, DT).unwrap(), 0);
        assert_eq!(bridge.step_simulation(DT * 0.6, 5, DT).unwrap(), 1);
    }

    #[test]
    fn test_invalid_shapes_rejected() {
        let mut bridge = PhysicsBridge::with_gravity(Vec3::ZERO);
        assert!(matches!(
            bridge.create_static_box_body(Transform::from_translation(Vec3::ZERO), Vec3::ZERO, surface(0)),
            Err(PhysicsError::InvalidShape(_))
        ));
        assert!(matches!(
            bridge.create_trimesh_body(&MeshData::default(), Transform::from_translation(Vec3::ZERO), surface(0)),
            Err(PhysicsError::InvalidShape(_))
        ));
    }
}
