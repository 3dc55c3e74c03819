//! Per-entity capability masks.
//!
//! Every entity slot owns a growable bit vector with one bit per registered
//! component type: bit `b` is set iff the entity currently holds a component
//! with type ID `b`. Multi-component queries and [`Group`]s test "has all of
//! {A, B, C}" with a few block-wise AND compares instead of probing each
//! per-type store.
//!
//! Mask vectors grow lazily, entity by entity, as higher type IDs are set.
//! Bits beyond a vector's current length read as zero, so a mask written
//! before some later component type was registered stays correct forever.

use bit_vec::BitVec;

use crate::component::ComponentTypeID;

/// Build the required-bits mask for a set of component type IDs.
pub(crate) fn required_mask(ids: &[ComponentTypeID]) -> BitVec {
    let bits = ids.iter().map(|id| id.id() + 1).max().unwrap_or(0);
    let mut mask = BitVec::from_elem(bits, false);
    for id in ids {
        mask.set(id.id(), true);
    }
    mask
}

/// The capability masks for every entity slot in a world.
#[derive(Default)]
pub(crate) struct MaskSet {
    masks: Vec<BitVec>,
}

impl MaskSet {
    pub fn new() -> MaskSet {
        MaskSet::default()
    }

    /// Make sure a mask vector exists for `index`. New masks start empty
    /// (all bits implicitly zero).
    pub fn ensure_entity(&mut self, index: u32) {
        let needed = index as usize + 1;
        if needed > self.masks.len() {
            self.masks.resize_with(needed, BitVec::new);
        }
    }

    /// Set the bit for `type_id` on entity slot `index`, growing the mask
    /// if the ID is past its current length.
    pub fn set(&mut self, index: u32, type_id: ComponentTypeID) {
        let mask = &mut self.masks[index as usize];
        let bit = type_id.id();
        if bit >= mask.len() {
            log::trace!(
                "growing mask of entity slot {} to {} bits",
                index,
                bit + 1
            );
            mask.grow(bit + 1 - mask.len(), false);
        }
        mask.set(bit, true);
    }

    /// Clear the bit for `type_id` on entity slot `index`. Bits beyond the
    /// mask's length are already zero.
    pub fn reset(&mut self, index: u32, type_id: ComponentTypeID) {
        let mask = &mut self.masks[index as usize];
        if type_id.id() < mask.len() {
            mask.set(type_id.id(), false);
        }
    }

    /// Zero every bit for entity slot `index`.
    pub fn clear(&mut self, index: u32) {
        self.masks[index as usize].clear();
    }

    /// Is the bit for `type_id` set on entity slot `index`?
    pub fn test(&self, index: u32, type_id: ComponentTypeID) -> bool {
        self.masks
            .get(index as usize)
            .and_then(|mask| mask.get(type_id.id()))
            .unwrap_or(false)
    }

    /// True iff every set bit of `required` is set on entity slot `index`.
    ///
    /// Compared block-wise; blocks past either vector's length count as
    /// zero. O(blocks of `required`), independent of entity count.
    pub fn matches(&self, index: u32, required: &BitVec) -> bool {
        let mut entity_blocks = self
            .masks
            .get(index as usize)
            .map(|mask| mask.blocks());
        for required_block in required.blocks() {
            let entity_block = entity_blocks
                .as_mut()
                .and_then(|blocks| blocks.next())
                .unwrap_or(0);
            if entity_block & required_block != required_block {
                return false;
            }
        }
        true
    }
}

/// A cached required-component mask for a fixed set of component types.
///
/// Build one with [`World::create_group`](crate::World::create_group) and
/// test entities against it with
/// [`World::group_matches`](crate::World::group_matches). Creating the group
/// registers every participating type, so the mask always carries a bit for
/// each of them and never goes stale.
#[derive(Clone, Debug)]
pub struct Group {
    required: BitVec,
}

impl Group {
    pub(crate) fn new(required: BitVec) -> Group {
        Group { required }
    }

    pub(crate) fn required(&self) -> &BitVec {
        &self.required
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn id(n: usize) -> ComponentTypeID {
        // Burn registry slots until one with the wanted index exists.
        loop {
            let id = ComponentTypeID::register("mask-test");
            if id.id() >= n {
                return id;
            }
        }
    }

    #[test]
    fn test_set_reset_roundtrip() {
        let a = id(0);
        let mut masks = MaskSet::new();
        masks.ensure_entity(3);

        assert!(!masks.test(3, a));
        masks.set(3, a);
        assert!(masks.test(3, a));
        masks.reset(3, a);
        assert!(!masks.test(3, a));
    }

    #[test]
    fn test_matches_with_short_entity_mask() {
        let low = id(0);
        let high = id(low.id() + 64); // guaranteed a later storage block
        let mut masks = MaskSet::new();
        masks.ensure_entity(0);
        masks.set(0, low);

        // Entity mask has one block; requiring a bit in the second block
        // must fail without growing anything.
        let only_low = required_mask(&[low]);
        let both = required_mask(&[low, high]);
        assert!(masks.matches(0, &only_low));
        assert!(!masks.matches(0, &both));

        masks.set(0, high);
        assert!(masks.matches(0, &both));
    }

    #[test]
    fn test_empty_required_matches_everything() {
        let masks = {
            let mut m = MaskSet::new();
            m.ensure_entity(0);
            m
        };
        assert!(masks.matches(0, &BitVec::new()));
        // Even a slot that was never ensured.
        assert!(masks.matches(99, &BitVec::new()));
    }

    #[test]
    fn test_clear_zeroes_all_bits() {
        let a = id(0);
        let b = id(2);
        let mut masks = MaskSet::new();
        masks.ensure_entity(0);
        masks.set(0, a);
        masks.set(0, b);

        masks.clear(0);
        assert!(!masks.test(0, a));
        assert!(!masks.test(0, b));
    }
}
