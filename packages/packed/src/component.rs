//! Base definitions for components.
//!
//! All entities in this library are built out of components. There is no
//! intrinsic value to an entity. This module provides means of defining and
//! managing components.
//!
//! Each component type is allocated a dense unique ID the first time it is
//! touched (attach, query or group creation). IDs are stable for the lifetime
//! of the process and are never reused; they double as bit positions in the
//! per-entity capability masks. There is a macro (`component`) to help you
//! assign this unique ID.

use std::any::type_name;
use std::fmt;
use std::fmt::{Debug, Formatter};
use std::sync::RwLock;

use once_cell::sync::{Lazy, OnceCell};

/// A component type ID which is unique for a specific component type.
///
/// IDs are handed out densely starting from zero, so they can index arrays
/// and bit masks directly.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentTypeID(usize);

struct ComponentRegistry {
    names: Vec<&'static str>,
}

static COMPONENT_REGISTRY: Lazy<RwLock<ComponentRegistry>> =
    Lazy::new(|| RwLock::new(ComponentRegistry { names: Vec::new() }));

impl ComponentTypeID {
    /// Create a new globally unique `ComponentTypeID` for the named type.
    pub fn register(name: &'static str) -> ComponentTypeID {
        let mut r = COMPONENT_REGISTRY.write().unwrap();
        let id = ComponentTypeID(r.names.len());
        r.names.push(name);
        log::debug!("registered component type {} as #{}", name, id.0);
        id
    }

    /// Return the inner unique ID.
    pub fn id(&self) -> usize {
        self.0
    }

    /// Return the name of the type this ID was registered for.
    pub fn name(&self) -> &'static str {
        let r = COMPONENT_REGISTRY.read().unwrap();
        r.names.get(self.0).copied().unwrap_or("<unregistered>")
    }

    /// Return the number of component type IDs handed out so far.
    pub fn count() -> usize {
        COMPONENT_REGISTRY.read().unwrap().names.len()
    }
}

impl Debug for ComponentTypeID {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A struct for lazily assigning unique `ComponentTypeID`s.
pub struct AutoComponentTypeID(OnceCell<ComponentTypeID>);

impl AutoComponentTypeID {
    /// Create a new `AutoComponentTypeID`.
    pub const fn new() -> AutoComponentTypeID {
        AutoComponentTypeID(OnceCell::new())
    }

    /// Get the `ComponentTypeID` this struct wraps, registering it on first
    /// use.
    pub fn get<T: Component>(&self) -> ComponentTypeID {
        *self
            .0
            .get_or_init(|| ComponentTypeID::register(type_name::<T>()))
    }
}

/// The component trait is implemented on all component types.
///
/// The only requirement on a component is a stable [`ComponentTypeID`];
/// values are stored in their own typed [`SparseSet`](crate::SparseSet) and
/// recovered through checked downcasts, so any `'static` type qualifies.
pub trait Component: 'static {
    /// Get the unique type ID of this component.
    fn type_id() -> ComponentTypeID;
}

/// Implement the `Component` trait on a type.
#[macro_export]
macro_rules! component {
    ($i:ident) => {
        const _: () = {
            static INIT_TYPE: $crate::component::AutoComponentTypeID =
                $crate::component::AutoComponentTypeID::new();

            impl $crate::component::Component for $i {
                fn type_id() -> $crate::component::ComponentTypeID {
                    INIT_TYPE.get::<$i>()
                }
            }

            ()
        };
    };
}
