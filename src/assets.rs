//! Asset-provider contract
//!
//! File formats are loaded by the host. The simulation only needs a clonable
//! model prototype per key and the list of animation clips it can play.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::StartupError;

/// Named animation slots an actor can play
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnimationKind {
    Idle,
    Run,
    Kick,
}

impl AnimationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnimationKind::Idle => "idle",
            AnimationKind::Run => "run",
            AnimationKind::Kick => "kick",
        }
    }
}

/// An animation clip handle as seen by the simulation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClipInfo {
    /// Clip length in seconds
    pub duration: f32,
    /// Looping clips never report completion
    pub looping: bool,
}

impl ClipInfo {
    pub fn looping(duration: f32) -> Self {
        Self {
            duration,
            looping: true,
        }
    }

    pub fn once(duration: f32) -> Self {
        Self {
            duration,
            looping: false,
        }
    }

    /// A clip with no length cannot be played
    pub fn is_playable(&self) -> bool {
        self.duration.is_finite() && self.duration > 0.0
    }
}

/// Model prototype registered per asset key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPrototype {
    pub key: String,
    /// Skinned meshes need their skeleton rebound on clone
    pub skinned: bool,
    pub bone_count: u32,
}

/// A per-instance copy of a prototype
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInstance {
    pub prototype: String,
    pub instance: u32,
    /// Bones owned by this instance (skinned models only)
    pub skeleton: Option<Vec<u32>>,
}

impl ModelPrototype {
    /// Clone the prototype for one spawned actor
    ///
    /// Skinned models get their own skeleton so instances animate independently.
    pub fn instantiate(&self, instance: u32) -> ModelInstance {
        let skeleton = self
            .skinned
            .then(|| (0..self.bone_count).collect::<Vec<_>>());
        ModelInstance {
            prototype: self.key.clone(),
            instance,
            skeleton,
        }
    }
}

/// Model plus its animation clips
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetBundle {
    pub model: ModelPrototype,
    pub clips: HashMap<AnimationKind, ClipInfo>,
}

impl AssetBundle {
    pub fn new(model: ModelPrototype) -> Self {
        Self {
            model,
            clips: HashMap::new(),
        }
    }

    pub fn with_clip(mut self, kind: AnimationKind, clip: ClipInfo) -> Self {
        self.clips.insert(kind, clip);
        self
    }
}

/// All bundles resolved by the host before the frame loop starts
#[derive(Debug, Clone, Default)]
pub struct AssetLibrary {
    bundles: HashMap<String, AssetBundle>,
}

impl AssetLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, bundle: AssetBundle) {
        log::debug!("Registered asset '{}'", bundle.model.key);
        self.bundles.insert(bundle.model.key.clone(), bundle);
    }

    pub fn get(&self, key: &str) -> Option<&AssetBundle> {
        self.bundles.get(key)
    }

    /// Look up a bundle that must exist for the game to start
    pub fn require(&self, key: &str) -> Result<&AssetBundle, StartupError> {
        self.get(key)
            .ok_or_else(|| StartupError::MissingAsset(key.to_owned()))
    }

    /// Bundles matching the shipped config, with placeholder clip lengths
    pub fn builtin() -> Self {
        let mut library = Self::new();
        library.register(
            AssetBundle::new(ModelPrototype {
                key: "character".into(),
                skinned: true,
                bone_count: 24,
            })
            .with_clip(AnimationKind::Idle, ClipInfo::looping(2.0))
            .with_clip(AnimationKind::Run, ClipInfo::looping(0.8))
            .with_clip(AnimationKind::Kick, ClipInfo::once(0.9)),
        );
        library.register(
            AssetBundle::new(ModelPrototype {
                key: "enemy_001".into(),
                skinned: true,
                bone_count: 18,
            })
            .with_clip(AnimationKind::Idle, ClipInfo::looping(1.6))
            .with_clip(AnimationKind::Run, ClipInfo::looping(0.7)),
        );
        library.register(
            AssetBundle::new(ModelPrototype {
                key: "enemy_002".into(),
                skinned: false,
                bone_count: 0,
            })
            .with_clip(AnimationKind::Idle, ClipInfo::looping(1.2)),
        );
        library
    }
}
