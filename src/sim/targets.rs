//! Raycast target list
//!
//! One shared list of bodies beams may collide with. Managers receive a
//! [`SharedTargets`] when constructed, push on spawn and remove by identity on
//! removal. Indices are never cached.

use std::cell::RefCell;
use std::rc::Rc;

use crate::physics::BodyHandle;

/// What a raycast target belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetId {
    Wall(u32),
    Enemy(u32),
    Obstacle(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Entry {
    id: TargetId,
    body: BodyHandle,
}

#[derive(Debug, Default)]
pub struct RaycastTargets {
    entries: Vec<Entry>,
}

/// The list as handed to managers
pub type SharedTargets = Rc<RefCell<RaycastTargets>>;

impl RaycastTargets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedTargets {
        Rc::new(RefCell::new(Self::new()))
    }

    pub fn push(&mut self, id: TargetId, body: BodyHandle) {
        self.entries.push(Entry { id, body });
    }

    /// Remove by identity; false if it was not registered
    pub fn remove(&mut self, id: TargetId) -> bool {
        match self.entries.iter().position(|e| e.id == id) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// Resolve a raycast hit back to its owner
    pub fn lookup(&self, body: BodyHandle) -> Option<TargetId> {
        self.entries.iter().find(|e| e.body == body).map(|e| e.id)
    }

    pub fn contains(&self, id: TargetId) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
