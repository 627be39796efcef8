//! Game tuning
//!
//! Every speed, radius, duration and threshold the simulation reads comes from
//! here. Defaults are the shipped tuning; a JSON override can be stored in
//! LocalStorage on the web build.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::sim::enemy::EnemyKind;

/// Inclusive `[min, max]` range in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DurationRange {
    pub min: f32,
    pub max: f32,
}

impl DurationRange {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }
}

/// Rigid-body world settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Vertical gravity (m/s², negative is down)
    pub gravity: f32,
    /// Solver step length (seconds)
    pub fixed_time_step: f32,
    /// Substep cap per frame to prevent spiral of death
    pub max_sub_steps: u32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: -9.81,
            fixed_time_step: 1.0 / 60.0,
            max_sub_steps: 5,
        }
    }
}

/// Player character
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterConfig {
    pub asset: String,
    /// Foot position at spawn
    pub spawn: Vec3,
    pub height: f32,
    pub radius: f32,
    pub mass: f32,
    pub friction: f32,
    pub restitution: f32,
    /// Max horizontal speed (m/s)
    pub move_speed: f32,
    /// Model turn rate before damping
    pub rotation_speed: f32,
    /// Seconds between kick start and beam release
    pub kick_beam_delay: f32,
    /// Beam origin height above the feet
    pub beam_height: f32,
    /// Beam origin distance in front of the body axis
    pub beam_forward_offset: f32,
}

impl Default for CharacterConfig {
    fn default() -> Self {
        Self {
            asset: "character".into(),
            spawn: Vec3::new(6.0, 0.0, 6.0),
            height: 1.8,
            radius: 0.4,
            mass: 70.0,
            friction: 0.5,
            restitution: 0.0,
            move_speed: 6.0,
            rotation_speed: 3.0,
            kick_beam_delay: 0.35,
            beam_height: 1.0,
            beam_forward_offset: 0.6,
        }
    }
}

/// Standard beam
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BeamConfig {
    pub damage: f32,
    pub speed: f32,
    /// Visual length behind the leading edge
    pub length: f32,
    /// Fan extent across the travel direction
    pub width: f32,
    pub height: f32,
    pub rays_horizontal: u32,
    pub rays_vertical: u32,
    /// Seconds before an unhit beam expires
    pub lifetime: f32,
}

impl Default for BeamConfig {
    fn default() -> Self {
        Self {
            damage: 25.0,
            speed: 30.0,
            length: 3.0,
            width: 0.6,
            height: 0.6,
            rays_horizontal: 3,
            rays_vertical: 2,
            lifetime: 1.5,
        }
    }
}

/// Spiral beam shape (unlocked by power level)
///
/// Damage and speed come from the power level that enables it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpiralConfig {
    pub length: f32,
    pub lifetime: f32,
    pub strands: u32,
    pub strand_radius: f32,
    /// Distance along the beam for one full turn of a strand
    pub pitch: f32,
    /// Strand phase speed (rad/s)
    pub rotation_speed: f32,
    pub points_per_strand: u32,
}

impl Default for SpiralConfig {
    fn default() -> Self {
        Self {
            length: 6.0,
            lifetime: 1.2,
            strands: 2,
            strand_radius: 0.35,
            pitch: 1.5,
            rotation_speed: 12.0,
            points_per_strand: 32,
        }
    }
}

/// Decorative ring launched with each beam
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RingConfig {
    pub speed: f32,
    pub lifetime: f32,
    pub start_radius: f32,
    /// Radius growth (m/s)
    pub growth: f32,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            speed: 12.0,
            lifetime: 0.6,
            start_radius: 0.3,
            growth: 3.0,
        }
    }
}

/// One enemy type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnemyTypeConfig {
    pub kind: EnemyKind,
    pub asset: String,
    pub hp: f32,
    pub height: f32,
    pub radius: f32,
    pub mass: f32,
    pub friction: f32,
    pub restitution: f32,
    pub move_speed: f32,
    /// Turn rate (rad/s)
    pub turn_speed: f32,
    pub idle_duration: DurationRange,
    pub run_duration: DurationRange,
    /// Probability of turning on each decision
    pub turn_chance: f32,
    /// Force a turn after this many straight runs
    pub max_consecutive_straights: u32,
    /// Score awarded on kill
    pub points: u64,
    /// AT-field placement: enemy radius times this, toward the shooter
    pub at_field_offset_factor: f32,
    /// Foot positions
    pub spawn_points: Vec<Vec3>,
}

impl EnemyTypeConfig {
    fn enemy_001() -> Self {
        Self {
            kind: EnemyKind::Enemy001,
            asset: "enemy_001".into(),
            hp: 75.0,
            height: 2.0,
            radius: 0.6,
            mass: 90.0,
            friction: 0.5,
            restitution: 0.0,
            move_speed: 2.5,
            turn_speed: 2.0,
            idle_duration: DurationRange::new(1.0, 3.0),
            run_duration: DurationRange::new(1.5, 4.0),
            turn_chance: 0.35,
            max_consecutive_straights: 3,
            points: 100,
            at_field_offset_factor: 1.2,
            spawn_points: vec![Vec3::new(14.0, 0.0, 14.0), Vec3::new(30.0, 0.0, 6.0)],
        }
    }

    fn enemy_002() -> Self {
        Self {
            kind: EnemyKind::Enemy002,
            asset: "enemy_002".into(),
            hp: 150.0,
            height: 3.0,
            radius: 1.0,
            mass: 200.0,
            friction: 0.6,
            restitution: 0.0,
            move_speed: 1.5,
            turn_speed: 1.2,
            idle_duration: DurationRange::new(2.0, 4.0),
            run_duration: DurationRange::new(2.0, 5.0),
            turn_chance: 0.25,
            max_consecutive_straights: 2,
            points: 250,
            at_field_offset_factor: 1.5,
            spawn_points: vec![Vec3::new(34.0, 0.0, 34.0)],
        }
    }
}

/// Destructible props
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObstacleConfig {
    pub sphere_radius: f32,
    pub sphere_points: u64,
    pub crate_half_extent: f32,
    pub crate_points: u64,
    /// Sphere centers
    pub spheres: Vec<Vec3>,
    /// Crate centers
    pub crates: Vec<Vec3>,
}

impl Default for ObstacleConfig {
    fn default() -> Self {
        Self {
            sphere_radius: 0.5,
            sphere_points: 10,
            crate_half_extent: 0.6,
            crate_points: 30,
            spheres: vec![
                Vec3::new(10.0, 1.0, 6.0),
                Vec3::new(11.0, 1.0, 6.0),
                Vec3::new(14.0, 1.0, 22.0),
            ],
            crates: vec![Vec3::new(22.0, 0.6, 6.0), Vec3::new(6.0, 0.6, 26.0)],
        }
    }
}

/// Maze geometry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MazeConfig {
    /// Side length of one grid cell
    pub cell_size: f32,
    pub wall_height: f32,
    pub friction: f32,
    pub restitution: f32,
    /// `#` wall, `/` ramp, anything else floor; row 0 is z = 0
    pub layout: Vec<String>,
}

impl Default for MazeConfig {
    fn default() -> Self {
        Self {
            cell_size: 4.0,
            wall_height: 3.0,
            friction: 0.8,
            restitution: 0.0,
            layout: [
                "##########",
                "#........#",
                "#.##.###.#",
                "#.#....#.#",
                "#.#./#.#.#",
                "#...##...#",
                "#.#....#.#",
                "#.###.##.#",
                "#........#",
                "##########",
            ]
            .iter()
            .map(|row| row.to_string())
            .collect(),
        }
    }
}

/// Visual effect tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectConfig {
    pub gravity: f32,
    pub ground_level: f32,
    /// Random per-particle start delay cap
    pub particle_stagger: f32,

    pub impact_particles: u32,
    pub impact_lifetime: f32,
    pub impact_speed: f32,

    pub spark_particles: u32,
    pub spark_lifetime: f32,
    pub spark_speed: f32,

    pub debris_pieces: u32,
    pub debris_speed: f32,
    pub debris_restitution: f32,
    /// Horizontal/angular velocity kept per bounce
    pub debris_damping: f32,
    pub debris_max_bounces: u32,
    /// Hard cap on a debris group's life
    pub debris_timeout: f32,

    pub cross_lifetime: f32,
    /// Fraction of lifetime spent fading in
    pub cross_fade_in: f32,
    /// Fraction of lifetime spent fading out
    pub cross_fade_out: f32,
    pub cross_peak_opacity: f32,

    pub wave_rings: u32,
    pub wave_interval: f32,
    pub wave_ring_duration: f32,
    pub wave_start_scale: f32,
    /// Tail fraction of each ring's life spent fading
    pub wave_fade_tail: f32,
    pub wave_radius: f32,

    pub field_duration: f32,
    /// Fraction of the duration held at full opacity
    pub field_hold: f32,
}

impl Default for EffectConfig {
    fn default() -> Self {
        Self {
            gravity: 9.81,
            ground_level: 0.0,
            particle_stagger: 0.08,
            impact_particles: 12,
            impact_lifetime: 0.5,
            impact_speed: 6.0,
            spark_particles: 16,
            spark_lifetime: 0.4,
            spark_speed: 8.0,
            debris_pieces: 8,
            debris_speed: 5.0,
            debris_restitution: 0.4,
            debris_damping: 0.7,
            debris_max_bounces: 3,
            debris_timeout: 4.0,
            cross_lifetime: 0.8,
            cross_fade_in: 0.2,
            cross_fade_out: 0.3,
            cross_peak_opacity: 1.0,
            wave_rings: 4,
            wave_interval: 0.12,
            wave_ring_duration: 0.5,
            wave_start_scale: 0.2,
            wave_fade_tail: 0.4,
            wave_radius: 1.5,
            field_duration: 1.0,
            field_hold: 0.6,
        }
    }
}

/// Score thresholds for power levels
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Cumulative score unlocking level N at index N-1 (strictly increasing)
    pub thresholds: Vec<u64>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            thresholds: vec![100, 300, 600, 1000],
        }
    }
}

/// What one power level changes on the character
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerLevelConfig {
    pub beam_damage: f32,
    pub beam_speed: f32,
    pub rays_horizontal: u32,
    pub rays_vertical: u32,
    pub beam_width: f32,
    pub beam_height: f32,
    /// Fire the spiral beam instead of the standard one
    pub spiral: bool,
    pub move_speed_multiplier: f32,
}

/// Complete game configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub seed: u64,
    pub physics: PhysicsConfig,
    pub character: CharacterConfig,
    pub beam: BeamConfig,
    pub spiral: SpiralConfig,
    pub ring: RingConfig,
    pub enemies: Vec<EnemyTypeConfig>,
    pub obstacles: ObstacleConfig,
    pub maze: MazeConfig,
    pub effects: EffectConfig,
    pub scoring: ScoringConfig,
    /// Entry N-1 applies at power level N
    pub power_levels: Vec<PowerLevelConfig>,
}

impl Default for GameConfig {
    fn default() -> Self {
        let level = |damage, speed, rays_h, rays_v, size, spiral, mult| PowerLevelConfig {
            beam_damage: damage,
            beam_speed: speed,
            rays_horizontal: rays_h,
            rays_vertical: rays_v,
            beam_width: size,
            beam_height: size,
            spiral,
            move_speed_multiplier: mult,
        };
        Self {
            seed: 0x5EED,
            physics: PhysicsConfig::default(),
            character: CharacterConfig::default(),
            beam: BeamConfig::default(),
            spiral: SpiralConfig::default(),
            ring: RingConfig::default(),
            enemies: vec![EnemyTypeConfig::enemy_001(), EnemyTypeConfig::enemy_002()],
            obstacles: ObstacleConfig::default(),
            maze: MazeConfig::default(),
            effects: EffectConfig::default(),
            scoring: ScoringConfig::default(),
            power_levels: vec![
                level(35.0, 32.0, 3, 2, 0.8, false, 1.0),
                level(45.0, 34.0, 4, 3, 1.0, false, 1.1),
                level(60.0, 40.0, 1, 1, 1.0, true, 1.15),
                level(80.0, 45.0, 1, 1, 1.2, true, 1.25),
            ],
        }
    }
}

impl GameConfig {
    /// Parse and validate a JSON config (missing fields take defaults)
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the simulation cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.physics.fixed_time_step <= 0.0 || self.physics.max_sub_steps == 0 {
            return invalid("physics step must be positive with at least one substep".into());
        }
        if self.character.height <= self.character.radius {
            return invalid("character height must exceed its radius".into());
        }
        if self.beam.rays_horizontal == 0 || self.beam.rays_vertical == 0 {
            return invalid("beam needs at least one ray per axis".into());
        }
        if self.beam.lifetime <= 0.0 || self.spiral.lifetime <= 0.0 || self.ring.lifetime <= 0.0 {
            return invalid("projectile lifetimes must be positive".into());
        }
        for enemy in &self.enemies {
            let tag = enemy.kind.tag();
            for (name, range) in [("idle", enemy.idle_duration), ("run", enemy.run_duration)] {
                if range.min < 0.0 || range.min > range.max {
                    return invalid(format!("{tag}: {name} duration range is empty"));
                }
            }
            if !(0.0..=1.0).contains(&enemy.turn_chance) {
                return invalid(format!("{tag}: turn_chance must be in [0, 1]"));
            }
            if enemy.hp <= 0.0 {
                return invalid(format!("{tag}: hp must be positive"));
            }
        }
        if self
            .scoring
            .thresholds
            .windows(2)
            .any(|pair| pair[0] >= pair[1])
        {
            return invalid("score thresholds must be strictly increasing".into());
        }
        if self.power_levels.len() < self.scoring.thresholds.len() {
            return invalid("every score threshold needs a power level entry".into());
        }
        if self
            .power_levels
            .iter()
            .any(|l| l.rays_horizontal == 0 || l.rays_vertical == 0)
        {
            return invalid("power level needs at least one ray per axis".into());
        }
        if self.effects.wave_rings == 0 || self.effects.wave_ring_duration <= 0.0 {
            return invalid("wave field needs at least one ring with a positive duration".into());
        }
        Ok(())
    }

    /// LocalStorage key
    #[allow(dead_code)]
    const STORAGE_KEY: &'static str = "beam_maze_config";

    /// Load config override from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                match Self::from_json(&json) {
                    Ok(config) => {
                        log::info!("Loaded config override from LocalStorage");
                        return config;
                    }
                    Err(e) => log::warn!("Ignoring stored config: {}", e),
                }
            }
        }

        log::info!("Using default config");
        Self::default()
    }

    /// Native builds always use the shipped tuning
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        GameConfig::default().validate().unwrap();
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let config = GameConfig::from_json(r#"{ "beam": { "damage": 50.0 } }"#).unwrap();
        assert_eq!(config.beam.damage, 50.0);
        assert_eq!(config.beam.rays_horizontal, 3);
        assert_eq!(config.enemies.len(), 2);
    }

    #[test]
    fn test_non_increasing_thresholds_rejected() {
        let err = GameConfig::from_json(r#"{ "scoring": { "thresholds": [100, 100] } }"#);
        assert!(matches!(err, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_inverted_duration_range_rejected() {
        let mut config = GameConfig::default();
        config.enemies[0].idle_duration = DurationRange::new(3.0, 1.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        assert!(matches!(
            GameConfig::from_json("{ nope"),
            Err(ConfigError::Parse(_))
        ));
    }
}
