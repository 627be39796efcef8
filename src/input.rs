//! Input- and camera-provider contracts
//!
//! The host feeds raw key events into [`KeyboardState`]; the simulation only
//! asks "is this key held" and "was the action pressed since last asked".

use std::collections::HashSet;

use glam::Vec3;

/// Logical keys the game reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Forward,
    Back,
    Left,
    Right,
    Kick,
    Pause,
}

impl Key {
    /// Map a DOM `KeyboardEvent.code` to a logical key
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "KeyW" | "ArrowUp" => Some(Key::Forward),
            "KeyS" | "ArrowDown" => Some(Key::Back),
            "KeyA" | "ArrowLeft" => Some(Key::Left),
            "KeyD" | "ArrowRight" => Some(Key::Right),
            "Space" | "KeyJ" => Some(Key::Kick),
            "Escape" | "KeyP" => Some(Key::Pause),
            _ => None,
        }
    }
}

/// What the simulation needs from an input source
pub trait InputProvider {
    /// Is the key currently held down
    fn is_held(&self, key: Key) -> bool;

    /// Edge-triggered press: true at most once per physical press
    fn consume_press(&mut self, key: Key) -> bool;
}

/// Held/pressed key tracking fed by host key events
#[derive(Debug, Clone, Default)]
pub struct KeyboardState {
    held: HashSet<Key>,
    pending: HashSet<Key>,
}

impl KeyboardState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Key went down (auto-repeat while held does not queue another press)
    pub fn key_down(&mut self, key: Key) {
        if self.held.insert(key) {
            self.pending.insert(key);
        }
    }

    pub fn key_up(&mut self, key: Key) {
        self.held.remove(&key);
    }

    /// Drop everything (window blur)
    pub fn clear(&mut self) {
        self.held.clear();
        self.pending.clear();
    }
}

impl InputProvider for KeyboardState {
    fn is_held(&self, key: Key) -> bool {
        self.held.contains(&key)
    }

    fn consume_press(&mut self, key: Key) -> bool {
        self.pending.remove(&key)
    }
}

/// Read-only camera orientation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraView {
    /// World-space look direction
    pub forward: Vec3,
    /// World up
    pub up: Vec3,
}

impl Default for CameraView {
    fn default() -> Self {
        // Chase camera looking down the maze along +Z
        Self {
            forward: Vec3::new(0.0, -0.4, 1.0).normalize(),
            up: Vec3::Y,
        }
    }
}
