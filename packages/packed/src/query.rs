//! Multi-component query machinery.
//!
//! [`ComponentSet`] is implemented for tuples of component types (1 through
//! 8 elements) and drives [`World::view`](crate::World::view): it lists the
//! tuple's type IDs, borrows each type's store out of the world's registry
//! through a checked downcast, picks the store with the fewest packed
//! entries to drive iteration, and fetches one component per store for a
//! visited index.
//!
//! Handing out `&mut` references into several stores at once requires raw
//! pointers under the hood; the safety argument is local and small (see
//! [`FetchEntry`]). The trait is sealed so the argument cannot be broken
//! from outside the crate.

use std::collections::HashMap;

use crate::component::{Component, ComponentTypeID};
use crate::sparse::{AnyStore, SparseSet};

/// A raw handle to one typed store, valid while the owning `World` is
/// exclusively borrowed by a `view` call.
///
/// # Safety
///
/// `get` hands out `&mut T` with a caller-chosen lifetime. This is sound
/// under the conditions `view` maintains:
/// - the set lives in a `Box` inside the world's store map and is neither
///   moved nor structurally mutated while the world is borrowed for the
///   view;
/// - all component types in a tuple are distinct (asserted in
///   `init_fetch`), so entries point at different sets;
/// - each index is fetched at most once per iteration step, so no two live
///   `&mut` refer to the same value.
#[doc(hidden)]
pub struct FetchEntry<T> {
    set: *mut SparseSet<T>,
}

impl<T: 'static> FetchEntry<T> {
    unsafe fn get<'a>(&mut self, index: u32) -> Option<&'a mut T> {
        (*self.set).try_get_mut(index).map(|value| &mut *(value as *mut T))
    }
}

fn assert_distinct(ids: &[ComponentTypeID]) {
    for (i, a) in ids.iter().enumerate() {
        for b in &ids[i + 1..] {
            assert!(
                a != b,
                "view: all component types in a tuple must be distinct"
            );
        }
    }
}

mod sealed {
    use super::*;

    pub trait Sealed: 'static {
        type Item<'a>;
        type Fetch;

        /// Type IDs of every component in the set, registering them on
        /// first use.
        fn type_ids() -> Vec<ComponentTypeID>;

        /// Borrow every store, returning fetch entries plus the dense index
        /// slice of the smallest store (`ptr`, `len`). `None` if any store
        /// was never created.
        fn init_fetch(
            stores: &mut HashMap<ComponentTypeID, Box<dyn AnyStore>>,
        ) -> Option<(Self::Fetch, *const u32, usize)>;

        /// Fetch one component per store for `index`.
        ///
        /// # Safety
        ///
        /// The conditions on [`FetchEntry`] must hold: stores pinned by an
        /// exclusive world borrow, and `index` not fetched again while the
        /// returned references live.
        unsafe fn fetch<'a>(fetch: &mut Self::Fetch, index: u32) -> Option<Self::Item<'a>>;
    }
}

pub(crate) use sealed::Sealed;

/// A set of component types usable as a query, implemented for tuples of
/// 1 to 8 [`Component`] types.
pub trait ComponentSet: sealed::Sealed {}

impl<T: sealed::Sealed> ComponentSet for T {}

macro_rules! impl_component_set {
    ($($name:ident),+) => {
        #[allow(non_snake_case)]
        impl<$($name: Component),+> sealed::Sealed for ($($name,)+) {
            type Item<'a> = ($(&'a mut $name,)+);
            type Fetch = ($(FetchEntry<$name>,)+);

            fn type_ids() -> Vec<ComponentTypeID> {
                vec![$($name::type_id()),+]
            }

            fn init_fetch(
                stores: &mut HashMap<ComponentTypeID, Box<dyn AnyStore>>,
            ) -> Option<(Self::Fetch, *const u32, usize)> {
                assert_distinct(&Self::type_ids());

                $(
                    let $name: FetchEntry<$name> = {
                        let store = stores.get_mut(&$name::type_id())?;
                        let set = store
                            .as_any_mut()
                            .downcast_mut::<SparseSet<$name>>()?;
                        FetchEntry { set: set as *mut _ }
                    };
                )+

                // Drive iteration from the smallest packed store. Any store
                // would be correct; the smallest minimizes the scan.
                let mut dense_ptr: *const u32 = std::ptr::null();
                let mut dense_len = usize::MAX;
                $(
                    {
                        // Reborrow through the raw pointer; the exclusive
                        // borrow of `stores` is still in scope.
                        let set = unsafe { &*$name.set };
                        if set.len() < dense_len {
                            dense_len = set.len();
                            dense_ptr = set.indices().as_ptr();
                        }
                    }
                )+

                Some((($($name,)+), dense_ptr, dense_len))
            }

            unsafe fn fetch<'a>(
                fetch: &mut Self::Fetch,
                index: u32,
            ) -> Option<Self::Item<'a>> {
                let ($($name,)+) = fetch;
                Some(($( $name.get(index)?, )+))
            }
        }
    };
}

impl_component_set!(A);
impl_component_set!(A, B);
impl_component_set!(A, B, C);
impl_component_set!(A, B, C, D);
impl_component_set!(A, B, C, D, E);
impl_component_set!(A, B, C, D, E, F);
impl_component_set!(A, B, C, D, E, F, G);
impl_component_set!(A, B, C, D, E, F, G, H);
