//! A world which holds entities and their components.
//!
//! The [`World`] is the single owner of everything: the entity allocator,
//! one [`SparseSet`] per component type used so far, and the per-entity
//! capability masks that keep the two in sync. All operations run to
//! completion on the calling thread; there is no internal locking and no
//! deferral. A host that mutates a world from several threads must provide
//! its own mutual exclusion.

use std::collections::HashMap;

use crate::component::{Component, ComponentTypeID};
use crate::entity::{Entity, EntityAllocator};
use crate::mask::{self, Group, MaskSet};
use crate::query::{ComponentSet, Sealed};
use crate::sparse::{AnyStore, SparseSet};

/// A container of entities and their components.
///
/// Component type IDs are process-global, but every `World` owns its own
/// stores and masks; nothing is shared between worlds.
#[derive(Default)]
pub struct World {
    allocator: EntityAllocator,
    masks: MaskSet,
    stores: HashMap<ComponentTypeID, Box<dyn AnyStore>>,
}

impl World {
    /// Create an empty world.
    pub fn new() -> World {
        World::default()
    }

    // -- Entity lifecycle ---------------------------------------------------

    /// Create a new entity with no components.
    ///
    /// Recycled indices come back with a fresh generation, so handles to
    /// the destroyed previous occupant stay dead.
    pub fn create(&mut self) -> Entity {
        let entity = self.allocator.allocate();
        self.masks.ensure_entity(entity.index());
        entity
    }

    /// Destroy an entity: erase it from every component store, zero its
    /// capability mask and recycle its index.
    ///
    /// Destroying an already-dead handle is a no-op; returns whether the
    /// entity was alive.
    pub fn destroy(&mut self, entity: Entity) -> bool {
        if !self.allocator.deallocate(entity) {
            return false;
        }
        log::debug!("destroying entity {:?}", entity);
        for store in self.stores.values_mut() {
            store.erase(entity.index());
        }
        self.masks.clear(entity.index());
        true
    }

    /// True iff `entity` refers to the current occupant of its slot.
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.allocator.is_alive(entity)
    }

    /// Number of live entities.
    pub fn entity_count(&self) -> usize {
        self.allocator.live()
    }

    // -- Components ---------------------------------------------------------

    /// Attach a component to `entity`, replacing any previous value of the
    /// same type, and return a reference to the stored value.
    ///
    /// The reference is valid until the next mutating call on this world.
    ///
    /// # Panics
    ///
    /// Panics if `entity` is dead. Attaching to a dead entity is always a
    /// caller bug, unlike [`detach`](Self::detach), which tolerates one.
    pub fn attach<T: Component>(&mut self, entity: Entity, value: T) -> &mut T {
        assert!(
            self.is_alive(entity),
            "cannot attach component to dead entity {:?}",
            entity
        );
        self.masks.set(entity.index(), T::type_id());
        self.store_mut::<T>().insert(entity.index(), value)
    }

    /// Detach a component from `entity`. A no-op if the entity is dead,
    /// the type was never used, or the entity lacks the component.
    pub fn detach<T: Component>(&mut self, entity: Entity) {
        if !self.is_alive(entity) {
            return;
        }
        let id = T::type_id();
        if let Some(store) = self.stores.get_mut(&id) {
            store.erase(entity.index());
            self.masks.reset(entity.index(), id);
        }
    }

    /// True iff `entity` is alive and currently holds a `T`.
    pub fn has<T: Component>(&self, entity: Entity) -> bool {
        self.is_alive(entity)
            && self
                .storage::<T>()
                .map_or(false, |set| set.contains(entity.index()))
    }

    /// Access `entity`'s component of type `T`.
    ///
    /// # Panics
    ///
    /// Panics if the entity is dead or lacks the component; check
    /// [`has`](Self::has) first. Both cases are caller bugs.
    pub fn get<T: Component>(&self, entity: Entity) -> &T {
        assert!(self.is_alive(entity), "get on dead entity {:?}", entity);
        match self.storage::<T>() {
            Some(set) => set.get(entity.index()),
            None => panic!(
                "entity {:?} has no {} component",
                entity,
                T::type_id().name()
            ),
        }
    }

    /// Mutable access to `entity`'s component of type `T`.
    ///
    /// The reference is valid until the next mutating call on this world.
    ///
    /// # Panics
    ///
    /// Panics if the entity is dead or lacks the component; check
    /// [`has`](Self::has) first.
    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> &mut T {
        assert!(self.is_alive(entity), "get_mut on dead entity {:?}", entity);
        let id = T::type_id();
        match self
            .stores
            .get_mut(&id)
            .and_then(|store| store.as_any_mut().downcast_mut::<SparseSet<T>>())
        {
            Some(set) => set.get_mut(entity.index()),
            None => panic!("entity {:?} has no {} component", entity, id.name()),
        }
    }

    /// Number of stored components of type `T` across all entities.
    pub fn count<T: Component>(&self) -> usize {
        self.storage::<T>().map_or(0, SparseSet::len)
    }

    // -- Queries ------------------------------------------------------------

    /// Visit every live entity holding all components of the tuple `Q`,
    /// passing `&mut` references to each component.
    ///
    /// Iteration is driven by the store with the fewest entries and
    /// filtered through the capability masks; if any component type in `Q`
    /// has never been attached to anything, the view visits nothing. Order
    /// is the driving store's current physical order — unrelated to
    /// creation order and not stable across detaches.
    ///
    /// The visitor may mutate component values freely. Structural changes
    /// (attach/detach/create/destroy) are impossible from inside the
    /// visitor, since the world is exclusively borrowed for the whole
    /// call: collect targets and apply the changes after the view returns.
    ///
    /// ```
    /// # use packed::{component, World};
    /// # #[derive(Debug)] struct Position(f32);
    /// # #[derive(Debug)] struct Velocity(f32);
    /// # component!(Position);
    /// # component!(Velocity);
    /// # let mut world = World::new();
    /// # let e = world.create();
    /// # world.attach(e, Position(0.0));
    /// # world.attach(e, Velocity(1.0));
    /// world.view::<(Position, Velocity), _>(|_entity, (position, velocity)| {
    ///     position.0 += velocity.0;
    /// });
    /// ```
    pub fn view<Q, F>(&mut self, mut f: F)
    where
        Q: ComponentSet,
        F: for<'a> FnMut(Entity, <Q as Sealed>::Item<'a>),
    {
        let required = mask::required_mask(&<Q as Sealed>::type_ids());
        let (mut fetch, dense_ptr, dense_len) =
            match <Q as Sealed>::init_fetch(&mut self.stores) {
                Some(fetch) => fetch,
                None => return,
            };

        for i in 0..dense_len {
            // In bounds: the driving store is not structurally mutated
            // while `self` is exclusively borrowed by this call.
            let index = unsafe { *dense_ptr.add(i) };
            if !self.masks.matches(index, &required) {
                continue;
            }
            // Mask match implies presence in every store; each index is
            // fetched once, and all tuple types are distinct.
            if let Some(item) = unsafe { <Q as Sealed>::fetch(&mut fetch, index) } {
                let entity = Entity::new(index, self.allocator.generation(index));
                f(entity, item);
            }
        }
    }

    /// Build a cached required-mask for the component tuple `Q`, for use
    /// with [`group_matches`](Self::group_matches).
    ///
    /// Every type in `Q` is registered while the mask is built, so the
    /// group stays valid no matter which types register later.
    pub fn create_group<Q: ComponentSet>(&self) -> Group {
        Group::new(mask::required_mask(&<Q as Sealed>::type_ids()))
    }

    /// True iff `entity` is alive and holds every component of `group`.
    pub fn group_matches(&self, entity: Entity, group: &Group) -> bool {
        self.is_alive(entity) && self.masks.matches(entity.index(), group.required())
    }

    // -- Internal helpers ---------------------------------------------------

    fn storage<T: Component>(&self) -> Option<&SparseSet<T>> {
        self.stores
            .get(&T::type_id())
            .and_then(|store| store.as_any().downcast_ref::<SparseSet<T>>())
    }

    fn store_mut<T: Component>(&mut self) -> &mut SparseSet<T> {
        self.stores
            .entry(T::type_id())
            .or_insert_with(|| {
                log::trace!("creating store for {}", T::type_id().name());
                Box::new(SparseSet::<T>::new())
            })
            .as_any_mut()
            .downcast_mut::<SparseSet<T>>()
            .expect("component store registered under a foreign type id")
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::component;
    use rand::{Rng, SeedableRng};

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Position {
        x: f32,
        y: f32,
    }
    component!(Position);

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Velocity {
        dx: f32,
        dy: f32,
    }
    component!(Velocity);

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Health(i32);
    component!(Health);

    fn pos(x: f32, y: f32) -> Position {
        Position { x, y }
    }

    fn vel(dx: f32, dy: f32) -> Velocity {
        Velocity { dx, dy }
    }

    #[test]
    fn test_attach_roundtrip() {
        let mut world = World::new();
        let e = world.create();

        world.attach(e, pos(1.0, 2.0));
        assert!(world.has::<Position>(e));
        assert_eq!(*world.get::<Position>(e), pos(1.0, 2.0));
        assert!(!world.has::<Health>(e));
    }

    #[test]
    fn test_detach_is_idempotent() {
        let mut world = World::new();
        let e = world.create();
        world.attach(e, Health(50));

        world.detach::<Health>(e);
        assert!(!world.has::<Health>(e));
        world.detach::<Health>(e);
        assert!(!world.has::<Health>(e));
        assert_eq!(world.count::<Health>(), 0);
    }

    #[test]
    fn test_basic_lifecycle() {
        let mut world = World::new();

        let e1 = world.create();
        let e2 = world.create();
        let e3 = world.create();

        world.attach(e1, pos(1.0, 2.0));
        world.attach(e1, vel(0.1, 0.2));
        world.attach(e2, pos(10.0, 20.0));
        world.attach(e3, pos(-1.0, -2.0));
        world.attach(e3, vel(5.0, 6.0));
        world.attach(e3, Health(50));

        assert!(world.has::<Position>(e1));
        assert!(!world.has::<Health>(e1));
        assert_eq!(world.get::<Position>(e1).x, 1.0);
        assert_eq!(world.get::<Velocity>(e3).dx, 5.0);

        world.detach::<Velocity>(e1);
        assert!(!world.has::<Velocity>(e1));

        world.destroy(e2);
        assert!(!world.is_alive(e2));
        assert_eq!(world.entity_count(), 2);
    }

    #[test]
    fn test_recycling_distinguishes_handles() {
        let mut world = World::new();

        let old = world.create();
        world.attach(old, Health(1));
        world.destroy(old);

        let new = world.create();
        assert_eq!(new.index(), old.index());
        assert_ne!(new.generation(), old.generation());
        assert!(!world.is_alive(old));
        assert!(world.is_alive(new));
        // The recycled slot must not inherit the old component.
        assert!(!world.has::<Health>(new));
    }

    #[test]
    fn test_destroy_erases_all_stores() {
        let mut world = World::new();
        let e = world.create();
        world.attach(e, pos(0.0, 0.0));
        world.attach(e, vel(0.0, 0.0));
        world.attach(e, Health(10));

        assert!(world.destroy(e));
        assert_eq!(world.count::<Position>(), 0);
        assert_eq!(world.count::<Velocity>(), 0);
        assert_eq!(world.count::<Health>(), 0);
        // Second destroy is benign.
        assert!(!world.destroy(e));
    }

    #[test]
    fn test_mask_and_store_agree() {
        let mut world = World::new();
        let group = world.create_group::<(Position,)>();

        let entities: Vec<Entity> = (0..8).map(|_| world.create()).collect();
        for (i, &e) in entities.iter().enumerate() {
            if i % 2 == 0 {
                world.attach(e, pos(i as f32, 0.0));
            }
        }
        world.detach::<Position>(entities[0]);

        for &e in &entities {
            assert_eq!(world.has::<Position>(e), world.group_matches(e, &group));
        }
    }

    #[test]
    fn test_view_counts() {
        let mut world = World::new();

        let a = world.create();
        let b = world.create();
        let c = world.create();
        let d = world.create();

        world.attach(a, pos(1.0, 1.0));
        world.attach(a, vel(2.0, 2.0));
        world.attach(b, pos(10.0, 10.0));
        world.attach(c, vel(-1.0, -1.0));
        world.attach(d, pos(0.0, 0.0));
        world.attach(d, vel(4.0, 4.0));

        let mut count_pos = 0;
        world.view::<(Position,), _>(|_, _| count_pos += 1);
        assert_eq!(count_pos, 3);

        let mut matched = Vec::new();
        world.view::<(Position, Velocity), _>(|e, _| matched.push(e));
        assert_eq!(matched.len(), 2);
        assert!(matched.contains(&a) && matched.contains(&d));
    }

    #[test]
    fn test_view_completeness_either_driving_store() {
        // Position store larger than Velocity, then the reverse; the match
        // set must not depend on which store drives the scan.
        for flip in [false, true] {
            let mut world = World::new();
            let mut expected = Vec::new();

            for i in 0..32 {
                let e = world.create();
                let wide = i % 2 == 0;
                let narrow = i % 4 == 0;
                if wide {
                    if flip {
                        world.attach(e, vel(0.0, 0.0));
                    } else {
                        world.attach(e, pos(0.0, 0.0));
                    }
                }
                if narrow {
                    if flip {
                        world.attach(e, pos(0.0, 0.0));
                    } else {
                        world.attach(e, vel(0.0, 0.0));
                    }
                }
                if wide && narrow {
                    expected.push(e);
                }
            }

            let mut visited = Vec::new();
            world.view::<(Position, Velocity), _>(|e, _| visited.push(e));
            visited.sort_by_key(|e| e.index());
            assert_eq!(visited, expected);
        }
    }

    #[test]
    fn test_view_mutation_sticks() {
        let mut world = World::new();
        let e = world.create();
        world.attach(e, pos(0.0, 0.0));
        world.attach(e, vel(1.0, 2.0));

        for _ in 0..3 {
            world.view::<(Position, Velocity), _>(|_, (p, v)| {
                p.x += v.dx;
                p.y += v.dy;
            });
        }

        assert_eq!(*world.get::<Position>(e), pos(3.0, 6.0));
    }

    #[test]
    fn test_view_over_unused_type_is_empty() {
        #[derive(Debug)]
        struct NeverAttached;
        component!(NeverAttached);

        let mut world = World::new();
        let e = world.create();
        world.attach(e, pos(0.0, 0.0));

        let mut visits = 0;
        world.view::<(Position, NeverAttached), _>(|_, _| visits += 1);
        assert_eq!(visits, 0);
    }

    #[test]
    fn test_view_skips_destroyed() {
        let mut world = World::new();
        let keep = world.create();
        let drop = world.create();
        world.attach(keep, Health(1));
        world.attach(drop, Health(2));

        world.destroy(drop);

        let mut visited = Vec::new();
        world.view::<(Health,), _>(|e, _| visited.push(e));
        assert_eq!(visited, vec![keep]);
    }

    #[test]
    fn test_group_created_early_still_matches() {
        let mut world = World::new();
        let group = world.create_group::<(Position,)>();

        // Health registers after the group exists; matching must be
        // unaffected.
        let e = world.create();
        world.attach(e, Health(3));
        assert!(!world.group_matches(e, &group));

        world.attach(e, pos(0.0, 0.0));
        assert!(world.group_matches(e, &group));

        world.destroy(e);
        assert!(!world.group_matches(e, &group));
    }

    #[test]
    fn test_random_churn() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(123_456);
        let mut world = World::new();
        let n = 2_000;

        let entities: Vec<Entity> = (0..n).map(|_| world.create()).collect();
        for _ in 0..n {
            let e = entities[rng.gen_range(0..n)];
            world.attach(e, pos(rng.gen(), rng.gen()));
        }
        for _ in 0..n / 3 {
            let e = entities[rng.gen_range(0..n)];
            world.detach::<Position>(e);
        }

        let mut visited = Vec::new();
        world.view::<(Position,), _>(|e, _| visited.push(e));
        assert_eq!(visited.len(), world.count::<Position>());
        assert!(!visited.is_empty());
        for e in visited {
            assert!(world.has::<Position>(e));
        }
    }
}
