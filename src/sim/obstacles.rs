//! Maze geometry and destructible props
//!
//! The maze is built once from the ASCII layout: a floor slab, a box per wall
//! cell and a tri-mesh wedge per ramp cell. Spheres and crates can be shot;
//! a destroyed prop is only marked, and the next [`ObstacleManager::sweep`]
//! releases it with the same ordering enemies use.

use glam::{Quat, Vec3};

use super::scene::{NodeId, NodeKind, Scene};
use super::targets::{SharedTargets, TargetId};
use crate::config::{MazeConfig, ObstacleConfig};
use crate::consts::groups;
use crate::error::PhysicsError;
use crate::physics::{BodyHandle, MeshData, PhysicsBridge, Surface, Transform};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObstacleKind {
    /// Beams pass through after destroying it
    Sphere,
    /// Stops the beam that destroys it
    Crate,
}

impl ObstacleKind {
    /// Tag reported to scoring
    pub fn tag(&self) -> &'static str {
        match self {
            ObstacleKind::Sphere => "sphere",
            ObstacleKind::Crate => "crate",
        }
    }
}

#[derive(Debug)]
pub struct Obstacle {
    pub id: u32,
    pub kind: ObstacleKind,
    pub center: Vec3,
    pub points: u64,
    pub destroyed: bool,
    body: Option<BodyHandle>,
    node: Option<NodeId>,
}

impl Obstacle {
    pub fn body(&self) -> Option<BodyHandle> {
        self.body
    }
}

/// Static maze piece
#[derive(Debug)]
struct Piece {
    body: Option<BodyHandle>,
    node: Option<NodeId>,
    /// Raycast target id (walls and ramps; the floor is not a target)
    target: Option<TargetId>,
}

pub struct ObstacleManager {
    targets: SharedTargets,
    pieces: Vec<Piece>,
    obstacles: Vec<Obstacle>,
    next_id: u32,
}

/// Cell center on the XZ plane
fn cell_center(row: usize, col: usize, cell_size: f32) -> Vec3 {
    Vec3::new(
        col as f32 * cell_size + cell_size / 2.0,
        0.0,
        row as f32 * cell_size + cell_size / 2.0,
    )
}

/// Wedge filling one cell, rising toward +Z from the floor to `height`
pub fn ramp_mesh(cell_size: f32, height: f32) -> MeshData {
    let h = cell_size / 2.0;
    MeshData {
        vertices: vec![
            Vec3::new(-h, 0.0, -h),
            Vec3::new(h, 0.0, -h),
            Vec3::new(h, height, h),
            Vec3::new(-h, height, h),
            Vec3::new(-h, 0.0, h),
            Vec3::new(h, 0.0, h),
        ],
        indices: Some(vec![
            0, 1, 2, 0, 2, 3, // slope
            4, 5, 2, 4, 2, 3, // back
            0, 4, 3, // left side
            1, 5, 2, // right side
            0, 1, 5, 0, 5, 4, // bottom
        ]),
    }
}

impl ObstacleManager {
    pub fn new(targets: SharedTargets) -> Self {
        Self {
            targets,
            pieces: Vec::new(),
            obstacles: Vec::new(),
            next_id: 0,
        }
    }

    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    /// Build floor, walls and ramps from the layout
    pub fn build_maze(
        &mut self,
        maze: &MazeConfig,
        physics: &mut PhysicsBridge,
        scene: &mut Scene,
    ) -> Result<(), PhysicsError> {
        let surface = Surface {
            friction: maze.friction,
            restitution: maze.restitution,
            group: groups::STATIC,
        };
        let rows = maze.layout.len();
        let cols = maze.layout.iter().map(|r| r.chars().count()).max().unwrap_or(0);
        let cell = maze.cell_size;

        let width = cols as f32 * cell;
        let depth = rows as f32 * cell;
        let floor = Transform::from_translation(Vec3::new(width / 2.0, -0.5, depth / 2.0));
        let body = physics.create_static_box_body(
            floor,
            Vec3::new(width / 2.0, 0.5, depth / 2.0),
            surface,
        )?;
        let node = scene.add(NodeKind::Floor, floor);
        self.pieces.push(Piece {
            body: Some(body),
            node: Some(node),
            target: None,
        });

        let mut walls = 0;
        let mut ramps = 0;
        for (row, line) in maze.layout.iter().enumerate() {
            for (col, c) in line.chars().enumerate() {
                let center = cell_center(row, col, cell);
                let (body, kind, transform) = match c {
                    '#' => {
                        let transform = Transform::from_translation(
                            center + Vec3::Y * (maze.wall_height / 2.0),
                        );
                        let half = Vec3::new(cell / 2.0, maze.wall_height / 2.0, cell / 2.0);
                        walls += 1;
                        (
                            physics.create_static_box_body(transform, half, surface)?,
                            NodeKind::Wall,
                            transform,
                        )
                    }
                    '/' => {
                        let transform = Transform {
                            translation: center,
                            rotation: Quat::IDENTITY,
                        };
                        let mesh = ramp_mesh(cell, maze.wall_height / 2.0);
                        ramps += 1;
                        (
                            physics.create_trimesh_body(&mesh, transform, surface)?,
                            NodeKind::Ramp,
                            transform,
                        )
                    }
                    _ => continue,
                };

                let target = TargetId::Wall(self.next_id());
                self.targets.borrow_mut().push(target, body);
                self.pieces.push(Piece {
                    body: Some(body),
                    node: Some(scene.add(kind, transform)),
                    target: Some(target),
                });
            }
        }

        log::info!("Maze built: {}x{} cells, {} walls, {} ramps", cols, rows, walls, ramps);
        Ok(())
    }

    /// Place destructible spheres and crates; failures skip that prop only
    pub fn spawn_props(
        &mut self,
        config: &ObstacleConfig,
        physics: &mut PhysicsBridge,
        scene: &mut Scene,
    ) -> usize {
        let surface = Surface {
            friction: 0.5,
            restitution: 0.0,
            group: groups::OBSTACLE,
        };
        let mut spawned = 0;

        for center in &config.spheres {
            let body = physics.create_static_sphere_body(*center, config.sphere_radius, surface);
            if self.add_prop(ObstacleKind::Sphere, *center, config.sphere_points, body, scene) {
                spawned += 1;
            }
        }
        for center in &config.crates {
            let body = physics.create_static_box_body(
                Transform::from_translation(*center),
                Vec3::splat(config.crate_half_extent),
                surface,
            );
            if self.add_prop(ObstacleKind::Crate, *center, config.crate_points, body, scene) {
                spawned += 1;
            }
        }
        spawned
    }

    fn add_prop(
        &mut self,
        kind: ObstacleKind,
        center: Vec3,
        points: u64,
        body: Result<BodyHandle, PhysicsError>,
        scene: &mut Scene,
    ) -> bool {
        let body = match body {
            Ok(body) => body,
            Err(e) => {
                log::warn!("Skipping {} at {:?}: {}", kind.tag(), center, e);
                return false;
            }
        };
        let id = self.next_id();
        let node_kind = match kind {
            ObstacleKind::Sphere => NodeKind::Sphere,
            ObstacleKind::Crate => NodeKind::Crate,
        };
        self.targets.borrow_mut().push(TargetId::Obstacle(id), body);
        self.obstacles.push(Obstacle {
            id,
            kind,
            center,
            points,
            destroyed: false,
            body: Some(body),
            node: Some(scene.add(node_kind, Transform::from_translation(center))),
        });
        true
    }

    /// Mark a prop destroyed; `None` if it was already destroyed or removed
    pub fn destroy(&mut self, id: u32) -> Option<&Obstacle> {
        let obstacle = self
            .obstacles
            .iter_mut()
            .find(|o| o.id == id && !o.destroyed)?;
        obstacle.destroyed = true;
        Some(&*obstacle)
    }

    /// Release props destroyed since the last sweep
    pub fn sweep(&mut self, physics: &mut PhysicsBridge, scene: &mut Scene) -> usize {
        let mut removed = 0;
        for index in (0..self.obstacles.len()).rev() {
            if self.obstacles[index].destroyed {
                self.remove_at(index, physics, scene);
                removed += 1;
            }
        }
        removed
    }

    fn remove_at(&mut self, index: usize, physics: &mut PhysicsBridge, scene: &mut Scene) {
        let obstacle = &mut self.obstacles[index];
        if let Some(body) = obstacle.body.take() {
            if let Err(e) = physics.remove_body(body) {
                log::debug!("Obstacle {} body already gone: {}", obstacle.id, e);
            }
        }
        self.targets.borrow_mut().remove(TargetId::Obstacle(obstacle.id));
        if let Some(node) = obstacle.node.take() {
            scene.remove(node);
        }
        self.obstacles.remove(index);
    }

    /// Tear down props and maze
    pub fn clear(&mut self, physics: &mut PhysicsBridge, scene: &mut Scene) {
        for index in (0..self.obstacles.len()).rev() {
            self.remove_at(index, physics, scene);
        }
        for mut piece in self.pieces.drain(..).rev() {
            if let Some(body) = piece.body.take() {
                if let Err(e) = physics.remove_body(body) {
                    log::debug!("Maze body already gone: {}", e);
                }
            }
            if let Some(target) = piece.target {
                self.targets.borrow_mut().remove(target);
            }
            if let Some(node) = piece.node.take() {
                scene.remove(node);
            }
        }
    }

    pub fn get(&self, id: u32) -> Option<&Obstacle> {
        self.obstacles.iter().find(|o| o.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Obstacle> {
        self.obstacles.iter()
    }

    /// Props not yet destroyed
    pub fn remaining(&self) -> usize {
        self.obstacles.iter().filter(|o| !o.destroyed).count()
    }

    /// Floor, walls and ramps
    pub fn piece_count(&self) -> usize {
        self.pieces.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::RayFilter;
    use crate::sim::targets::RaycastTargets;

    fn small_maze() -> MazeConfig {
        MazeConfig {
            layout: vec!["###".into(), "#/.".into(), "#..".into()],
            ..Default::default()
        }
    }

    #[test]
    fn test_maze_builds_walls_ramps_and_floor() {
        let mut physics = PhysicsBridge::with_gravity(Vec3::ZERO);
        let mut scene = Scene::new();
        let targets = RaycastTargets::shared();
        let mut manager = ObstacleManager::new(targets.clone());
        manager.build_maze(&small_maze(), &mut physics, &mut scene).unwrap();

        // floor + 5 walls + 1 ramp
        assert_eq!(manager.piece_count(), 7);
        assert_eq!(physics.body_count(), 7);
        assert_eq!(targets.borrow().len(), 6);

        // The ramp surface is walkable: a downward ray in its middle lands half way up
        let cell = small_maze().cell_size;
        let center = cell_center(1, 1, cell);
        let hit = physics
            .raycast(center + Vec3::Y * 10.0, center - Vec3::Y, RayFilter::default())
            .unwrap();
        let ramp_height = small_maze().wall_height / 2.0;
        assert!((hit.point.y - ramp_height / 2.0).abs() < 1e-3);

        manager.clear(&mut physics, &mut scene);
        assert_eq!(physics.body_count(), 0);
        assert!(targets.borrow().is_empty());
        assert!(scene.is_empty());
    }

    #[test]
    fn test_maze_needs_physics() {
        let mut manager = ObstacleManager::new(RaycastTargets::shared());
        let result = manager.build_maze(&small_maze(), &mut PhysicsBridge::new(), &mut Scene::new());
        assert!(matches!(result, Err(PhysicsError::NotInitialized)));
    }

    #[test]
    fn test_destroy_then_sweep() {
        let mut physics = PhysicsBridge::with_gravity(Vec3::ZERO);
        let mut scene = Scene::new();
        let targets = RaycastTargets::shared();
        let mut manager = ObstacleManager::new(targets.clone());
        let config = ObstacleConfig::default();
        let spawned = manager.spawn_props(&config, &mut physics, &mut scene);
        assert_eq!(spawned, config.spheres.len() + config.crates.len());

        let id = manager.iter().find(|o| o.kind == ObstacleKind::Crate).unwrap().id;
        let destroyed = manager.destroy(id).map(|o| (o.kind, o.points));
        assert_eq!(destroyed, Some((ObstacleKind::Crate, config.crate_points)));
        // Second destroy is a no-op
        assert!(manager.destroy(id).is_none());
        // Still registered until the sweep
        assert!(targets.borrow().contains(TargetId::Obstacle(id)));

        assert_eq!(manager.sweep(&mut physics, &mut scene), 1);
        assert!(!targets.borrow().contains(TargetId::Obstacle(id)));
        assert!(manager.get(id).is_none());
        assert_eq!(physics.body_count(), spawned - 1);
        assert_eq!(manager.sweep(&mut physics, &mut scene), 0);
    }
}
