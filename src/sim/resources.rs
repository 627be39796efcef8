//! GPU-resource ownership
//!
//! Shared geometries and materials are created once when a manager starts
//! and live as long as the arena. Per-instance resources are cloned from
//! them as [`OwnedResource`] values, which are neither `Clone` nor `Copy`.
//! Releasing one consumes it, so it can only be released once, and a shared
//! resource has no owning handle that could release it.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Geometry,
    Material,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceId(u32);

/// Resource owned by the arena for its whole lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SharedResource {
    id: ResourceId,
    kind: ResourceKind,
}

impl SharedResource {
    pub fn id(&self) -> ResourceId {
        self.id
    }
}

/// Resource owned by one effect or projectile instance
#[derive(Debug, PartialEq, Eq)]
#[must_use = "owned resources must be released through the arena"]
pub struct OwnedResource {
    id: ResourceId,
    kind: ResourceKind,
}

impl OwnedResource {
    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn dispose(self, arena: &mut ResourceArena) {
        arena.release(self);
    }
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    kind: ResourceKind,
    shared: bool,
    label: &'static str,
}

#[derive(Debug, Default)]
pub struct ResourceArena {
    slots: HashMap<ResourceId, Slot>,
    next_id: u32,
    released: u64,
}

impl ResourceArena {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self, kind: ResourceKind, shared: bool, label: &'static str) -> ResourceId {
        self.next_id += 1;
        let id = ResourceId(self.next_id);
        self.slots.insert(id, Slot { kind, shared, label });
        id
    }

    /// Create a resource shared by all instances
    pub fn create_shared(&mut self, kind: ResourceKind, label: &'static str) -> SharedResource {
        let id = self.allocate(kind, true, label);
        SharedResource { id, kind }
    }

    /// Create a fresh per-instance resource
    pub fn create_owned(&mut self, kind: ResourceKind, label: &'static str) -> OwnedResource {
        let id = self.allocate(kind, false, label);
        OwnedResource { id, kind }
    }

    /// Per-instance copy of a shared resource (e.g. a material whose opacity animates)
    pub fn clone_shared(&mut self, source: &SharedResource) -> OwnedResource {
        let label = self
            .slots
            .get(&source.id)
            .map(|slot| slot.label)
            .unwrap_or("clone");
        let id = self.allocate(source.kind, false, label);
        OwnedResource {
            id,
            kind: source.kind,
        }
    }

    fn release(&mut self, resource: OwnedResource) {
        match self.slots.get(&resource.id) {
            Some(slot) if !slot.shared => {
                self.slots.remove(&resource.id);
                self.released += 1;
            }
            Some(slot) => {
                log::warn!("Refusing to release shared resource '{}'", slot.label);
            }
            None => {
                log::debug!("Resource {:?} was not live", resource.id);
            }
        }
    }

    pub fn is_live(&self, id: ResourceId) -> bool {
        self.slots.contains_key(&id)
    }

    /// Live per-instance resources
    pub fn owned_count(&self) -> usize {
        self.slots.values().filter(|s| !s.shared).count()
    }

    pub fn shared_count(&self) -> usize {
        self.slots.values().filter(|s| s.shared).count()
    }

    /// Total per-instance releases so far
    pub fn released_count(&self) -> u64 {
        self.released
    }
}

/// The resources belonging to one instance, released together
#[derive(Debug, Default)]
pub struct ResourceSet {
    owned: Vec<OwnedResource>,
}

impl ResourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, resource: OwnedResource) {
        self.owned.push(resource);
    }

    pub fn len(&self) -> usize {
        self.owned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owned.is_empty()
    }

    pub fn dispose(self, arena: &mut ResourceArena) {
        for resource in self.owned {
            resource.dispose(arena);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owned_released_once_shared_kept() {
        let mut arena = ResourceArena::new();
        let geometry = arena.create_shared(ResourceKind::Geometry, "particle");
        let material = arena.create_shared(ResourceKind::Material, "particle");

        let mut set = ResourceSet::new();
        set.push(arena.clone_shared(&material));
        set.push(arena.create_owned(ResourceKind::Geometry, "tube"));
        assert_eq!(arena.owned_count(), 2);

        set.dispose(&mut arena);
        assert_eq!(arena.owned_count(), 0);
        assert_eq!(arena.released_count(), 2);
        assert!(arena.is_live(geometry.id()));
        assert!(arena.is_live(material.id()));
        assert_eq!(arena.shared_count(), 2);
    }

    #[test]
    fn test_clone_keeps_kind() {
        let mut arena = ResourceArena::new();
        let material = arena.create_shared(ResourceKind::Material, "ring");
        let clone = arena.clone_shared(&material);
        assert_eq!(clone.kind(), ResourceKind::Material);
        assert_ne!(clone.id(), material.id());
        clone.dispose(&mut arena);
    }
}
