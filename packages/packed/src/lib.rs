//! An entity component system built on packed sparse sets.
//!
//! Every component type gets its own [`SparseSet`]: a paged index table over
//! tightly packed value arrays, giving O(1) attach/detach/lookup and
//! cache-friendly iteration. A [`World`] ties the per-type sets together with
//! generation-counted [`Entity`] handles and per-entity capability masks, so
//! multi-component queries can skip non-matching entities with a handful of
//! bitwise compares.

pub use component::{Component, ComponentTypeID};
pub use entity::Entity;
pub use mask::Group;
pub use query::ComponentSet;
pub use sparse::SparseSet;
pub use world::World;

pub mod component;
pub mod entity;
pub mod mask;
pub mod query;
pub mod sparse;
pub mod world;
