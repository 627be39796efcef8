//! Error types
//!
//! Only startup failures are fatal. Per-tick problems degrade locally and are
//! logged, so they never show up here.

use crate::assets::AnimationKind;

/// Failures reported by the physics bridge
#[derive(Debug, thiserror::Error)]
pub enum PhysicsError {
    /// A creation or query call arrived before `init`
    #[error("physics world is not initialized")]
    NotInitialized,

    /// The handle was already removed (or never belonged to this world)
    #[error("body handle is stale or was already removed")]
    StaleHandle,

    /// Shape parameters cannot produce a collider
    #[error("invalid collision shape: {0}")]
    InvalidShape(String),
}

/// Failures while reading or validating configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Fatal errors that keep the frame loop from starting
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("physics unavailable: {0}")]
    Physics(#[from] PhysicsError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("required asset '{0}' is missing")]
    MissingAsset(String),

    #[error("asset '{asset}' has no '{animation:?}' animation")]
    MissingAnimation {
        asset: String,
        animation: AnimationKind,
    },
}
