//! Simulation module
//!
//! All gameplay logic lives here. One [`tick`] runs to completion per frame:
//! - time-based behavior compares [`SimClock`] timestamps, never tick counts
//! - randomness comes from the seeded RNG in [`GameState`]
//! - rendering and platform code only see the [`Scene`] and [`GameEvent`]s

pub mod animation;
pub mod character;
pub mod clock;
pub mod effects;
pub mod enemy;
pub mod enemy_manager;
pub mod obstacles;
pub mod projectile;
pub mod resources;
pub mod scene;
pub mod state;
pub mod targets;
pub mod tick;

pub use animation::{AnimationPlayer, Pose};
pub use character::{Character, MoveInput, movement_direction};
pub use clock::SimClock;
pub use effects::{Effect, EffectKind, EffectManager};
pub use enemy::{DamageOutcome, Enemy, EnemyAi, EnemyAiState, EnemyKind};
pub use enemy_manager::EnemyManager;
pub use obstacles::{Obstacle, ObstacleKind, ObstacleManager};
pub use projectile::{BeamHit, BeamSpec, HitHandler, HitResponse, Projectile, ProjectileKind, ProjectileManager};
pub use resources::{OwnedResource, ResourceArena, ResourceSet, SharedResource};
pub use scene::{NodeId, NodeKind, Scene};
pub use state::{GameEvent, GamePhase, GameState, Scoring};
pub use targets::{RaycastTargets, SharedTargets, TargetId};
pub use tick::{CollisionResolver, FRAME_DT, TickInput, tick};
