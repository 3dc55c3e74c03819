//! Entity handles and the entity allocator.
//!
//! An [`Entity`] is a plain value: an index into the per-type stores and the
//! capability mask array, paired with a generation counter. Destroying an
//! entity bumps the generation stored for its index and recycles the index
//! through a free list, so stale handles to a recycled slot can always be
//! told apart from the current occupant.

/// A handle to an entity: slot index plus generation.
///
/// Two handles are equal iff both fields match; a recycled index with a
/// newer generation is a different entity. Handles carry no other validity
/// signal — liveness is checked through
/// [`World::is_alive`](crate::World::is_alive).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Entity {
    index: u32,
    generation: u32,
}

impl Entity {
    /// The reserved "no entity" value.
    pub const NULL: Entity = Entity {
        index: u32::MAX,
        generation: u32::MAX,
    };

    pub(crate) fn new(index: u32, generation: u32) -> Entity {
        Entity { index, generation }
    }

    /// The slot index this handle addresses.
    pub fn index(self) -> u32 {
        self.index
    }

    /// The generation this handle was created with.
    pub fn generation(self) -> u32 {
        self.generation
    }

    /// Returns true if this is the [`NULL`](Self::NULL) sentinel.
    pub fn is_null(self) -> bool {
        self == Entity::NULL
    }
}

impl Default for Entity {
    fn default() -> Entity {
        Entity::NULL
    }
}

/// Owns entity identity: the generation for every slot ever allocated plus
/// a free list of recycled indices.
#[derive(Default)]
pub(crate) struct EntityAllocator {
    generations: Vec<u32>,
    free: Vec<u32>,
}

impl EntityAllocator {
    pub fn new() -> EntityAllocator {
        EntityAllocator::default()
    }

    /// Allocate an entity, preferring a recycled index. Fresh slots start at
    /// generation 1.
    pub fn allocate(&mut self) -> Entity {
        if let Some(index) = self.free.pop() {
            // The stored generation was already bumped on deallocate.
            Entity::new(index, self.generations[index as usize])
        } else {
            let index = self.generations.len() as u32;
            assert!(index != u32::MAX, "entity index space exhausted");
            self.generations.push(1);
            Entity::new(index, 1)
        }
    }

    /// Release an entity's index back to the free list, invalidating every
    /// outstanding handle with its generation. Returns false if the handle
    /// was already dead.
    pub fn deallocate(&mut self, entity: Entity) -> bool {
        if !self.is_alive(entity) {
            return false;
        }
        let slot = &mut self.generations[entity.index() as usize];
        debug_assert!(
            *slot != u32::MAX,
            "slot {} recycled u32::MAX times; generation would wrap and alias \
             a stale handle",
            entity.index(),
        );
        *slot = slot.wrapping_add(1);
        self.free.push(entity.index());
        true
    }

    /// True iff the stored generation for the handle's index still matches.
    pub fn is_alive(&self, entity: Entity) -> bool {
        let index = entity.index() as usize;
        index < self.generations.len() && self.generations[index] == entity.generation()
    }

    /// The current generation for a slot. Index must have been allocated.
    pub fn generation(&self, index: u32) -> u32 {
        self.generations[index as usize]
    }

    /// Number of live entities.
    pub fn live(&self) -> usize {
        self.generations.len() - self.free.len()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_recycling_bumps_generation() {
        let mut alloc = EntityAllocator::new();

        let a = alloc.allocate();
        assert_eq!(a.generation(), 1);
        assert!(alloc.deallocate(a));

        let b = alloc.allocate();
        assert_eq!(b.index(), a.index());
        assert_ne!(b.generation(), a.generation());
        assert!(!alloc.is_alive(a));
        assert!(alloc.is_alive(b));
    }

    #[test]
    fn test_double_deallocate_is_noop() {
        let mut alloc = EntityAllocator::new();
        let a = alloc.allocate();
        assert!(alloc.deallocate(a));
        assert!(!alloc.deallocate(a));
        assert_eq!(alloc.live(), 0);
    }

    #[test]
    fn test_null_is_never_alive() {
        let alloc = EntityAllocator::new();
        assert!(Entity::NULL.is_null());
        assert!(!alloc.is_alive(Entity::NULL));
        assert_eq!(Entity::default(), Entity::NULL);
    }

    #[test]
    fn test_fresh_indices_are_sequential() {
        let mut alloc = EntityAllocator::new();
        let ids: Vec<u32> = (0..4).map(|_| alloc.allocate().index()).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
        assert_eq!(alloc.live(), 4);
    }
}
